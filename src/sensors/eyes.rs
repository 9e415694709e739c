// Phototaxis heading from three light sensors
//
// The left and right eyes look 60 degrees either side of forward and the back
// eye looks straight back. Their readings are summed as vectors to find where
// the light comes from.

/// Angle between forward and each front eye (degrees)
const FRONT_EYE_ANGLE_DEG: f64 = 60.0;

/// One light sensor, normalised to 0..1
pub trait Photosensor: Send + Sync {
    fn read(&self) -> f64;
}

/// Direction and strength of the ambient light
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Heading {
    /// Body-frame direction of the brightest light in [-pi, pi], 0 = forward
    pub brightest_direction: f64,
    /// Length of the brightness vector
    pub direction_magnitude: f64,
    /// Mean brightness, 0..1
    pub light_level: f64,
}

pub trait HeadingSensor: Send + Sync {
    fn read(&self) -> Heading;
}

pub struct Eyes {
    left: Box<dyn Photosensor>,
    right: Box<dyn Photosensor>,
    back: Box<dyn Photosensor>,
    cos_theta: f64,
    sin_theta: f64,
}

impl Eyes {
    pub fn new(
        left: Box<dyn Photosensor>,
        right: Box<dyn Photosensor>,
        back: Box<dyn Photosensor>,
    ) -> Self {
        let (sin_theta, cos_theta) = FRONT_EYE_ANGLE_DEG.to_radians().sin_cos();
        Self {
            left,
            right,
            back,
            cos_theta,
            sin_theta,
        }
    }

    /// Heading computed from one set of readings
    fn heading(&self, left: f64, right: f64, back: f64) -> Heading {
        let x = (left + right) * self.cos_theta - back;
        let y = (left - right) * self.sin_theta;

        Heading {
            brightest_direction: y.atan2(x),
            direction_magnitude: x.hypot(y),
            light_level: (left + right + back) / 3.0,
        }
    }
}

impl HeadingSensor for Eyes {
    fn read(&self) -> Heading {
        self.heading(self.left.read(), self.right.read(), self.back.read())
    }
}

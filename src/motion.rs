// Constant-speed position smoothing
//
// A smoother moves a point toward its target along a straight line at a
// bounded speed. The position is advanced lazily whenever it is read, based
// on how much time passed since the last update, so callers may poll at any
// rate and still observe a consistent trajectory.

use tokio::time::Instant;

use crate::geometry::Point3D;

/// Distance under which the smoother counts as having arrived (meters)
pub const DEFAULT_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct PositionSmoother {
    position: Point3D,
    target: Point3D,
    speed: f64,
    tolerance: f64,
    last_update: Instant,
}

impl PositionSmoother {
    /// Create a smoother resting at `position`
    pub fn new(position: Point3D, speed: f64) -> Self {
        Self::with_tolerance(position, speed, DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(position: Point3D, speed: f64, tolerance: f64) -> Self {
        Self {
            position,
            target: position,
            speed,
            tolerance,
            last_update: Instant::now(),
        }
    }

    /// Current position, advanced to the present moment
    pub fn position(&mut self) -> Point3D {
        self.update_position();
        self.position
    }

    /// Teleport to `position`; motion toward the target restarts from here
    pub fn set_position(&mut self, position: Point3D) {
        self.position = position;
        self.last_update = Instant::now();
    }

    pub fn target(&self) -> Point3D {
        self.target
    }

    /// Replace the target and speed; the clock restarts now
    pub fn set_target(&mut self, target: Point3D, speed: f64) {
        self.target = target;
        self.speed = speed;
        self.last_update = Instant::now();
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Change speed mid-flight without restarting the clock
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Whether the last computed position is within tolerance of the target
    pub fn at_target(&self) -> bool {
        self.position.almost_equal(self.target, self.tolerance)
    }

    fn update_position(&mut self) {
        if self.at_target() {
            return;
        }

        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        if self.speed.is_infinite() {
            self.position = self.target;
            return;
        }

        let error = self.target - self.position;
        let distance = error.norm();
        let step = (error / distance) * self.speed * dt;

        if step.norm() < distance {
            self.position = self.position + step;
        } else {
            self.position = self.target;
        }
    }
}

// One three-joint leg: smoother, solver, calibration and servos
//
// A leg is driven by giving it a foot target and then calling `advance` every
// tick. Each tick reads the smoothed foot position, solves the joint angles,
// maps them onto this leg's servo zero positions and writes them out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::LegSpec;
use crate::geometry::Point3D;
use crate::kinematics::{JointAngles, KinematicsError, LegSolver};
use crate::motion::PositionSmoother;
use crate::servo::{Actuator, ChannelSpace, ServoError};

/// Servo travel (degrees); flipped servos are commanded as `SERVO_RANGE - angle`
pub const SERVO_RANGE: f64 = 180.0;

/// Maps one solver angle onto a servo: `offset + sign * degrees(theta)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCalibration {
    pub offset: f64,
    pub sign: f64,
}

impl JointCalibration {
    pub const fn new(offset: f64, sign: f64) -> Self {
        Self { offset, sign }
    }

    pub fn servo_angle(&self, theta: f64) -> f64 {
        self.offset + self.sign * theta.to_degrees()
    }
}

/// Coxa and femur are centred at 90 degrees and turn against the solver;
/// the tibia is straight at 180 degrees.
pub const DEFAULT_CALIBRATION: [JointCalibration; 3] = [
    JointCalibration::new(90.0, -1.0),
    JointCalibration::new(90.0, -1.0),
    JointCalibration::new(180.0, 1.0),
];

#[derive(Debug, thiserror::Error)]
pub enum LegError {
    #[error("Leg {leg}: no solution for foot at {foot}")]
    NoSolution {
        leg: String,
        foot: Point3D,
        #[source]
        source: KinematicsError,
    },

    #[error("Leg {leg}: failed to command servo angles {angles:?}: {source}")]
    Servo {
        leg: String,
        angles: [Option<f64>; 3],
        #[source]
        source: ServoError,
    },

    #[error("Leg {leg}: speed must be positive, got {speed}")]
    InvalidSpeed { leg: String, speed: f64 },
}

pub struct Leg {
    id: String,
    /// Proximal to distal
    actuators: [Arc<dyn Actuator>; 3],
    flip: [bool; 3],
    calibration: [JointCalibration; 3],
    angle_from_base: f64,
    solver: LegSolver,
    smoother: PositionSmoother,
}

impl std::fmt::Debug for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leg")
            .field("id", &self.id)
            .field("angle_from_base", &self.angle_from_base)
            .field("target", &self.smoother.target())
            .finish_non_exhaustive()
    }
}

impl Leg {
    /// Create a leg whose foot starts at rest on `position`
    pub fn new(
        id: impl Into<String>,
        actuators: [Arc<dyn Actuator>; 3],
        flip: [bool; 3],
        angle_from_base: f64,
        solver: LegSolver,
        position: Point3D,
    ) -> Self {
        Self {
            id: id.into(),
            actuators,
            flip,
            calibration: DEFAULT_CALIBRATION,
            angle_from_base,
            solver,
            smoother: PositionSmoother::new(position, f64::INFINITY),
        }
    }

    /// Create the leg described by `spec` on the channel space
    pub fn from_spec(
        spec: &LegSpec,
        space: &ChannelSpace,
        solver: LegSolver,
        position: Point3D,
    ) -> Result<Self, ServoError> {
        let actuators = space.actuators(spec.channels)?;
        Ok(Self::new(
            spec.id,
            actuators,
            spec.flip,
            spec.angle_from_base,
            solver,
            position,
        ))
    }

    pub fn with_calibration(mut self, calibration: [JointCalibration; 3]) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn angle_from_base(&self) -> f64 {
        self.angle_from_base
    }

    /// Joint angles in degrees as seen from the leg, `None` for unpowered joints
    pub fn angles(&self) -> [Option<f64>; 3] {
        std::array::from_fn(|i| self.actuators[i].angle().map(|raw| self.unflip(i, raw)))
    }

    /// Command joint angles in degrees, proximal to distal
    pub fn set_angles(&self, angles: [Option<f64>; 3]) -> Result<(), LegError> {
        for (i, angle) in angles.iter().enumerate() {
            let raw = angle.map(|a| self.unflip(i, a));
            self.actuators[i]
                .set_angle(raw)
                .map_err(|source| LegError::Servo {
                    leg: self.id.clone(),
                    angles,
                    source,
                })?;
        }
        Ok(())
    }

    /// Flipping is its own inverse
    fn unflip(&self, joint: usize, angle: f64) -> f64 {
        if self.flip[joint] {
            SERVO_RANGE - angle
        } else {
            angle
        }
    }

    /// Start moving the foot toward `foot` at `speed` m/s
    pub fn set_target(&mut self, foot: Point3D, speed: f64) {
        debug!("Leg {} target {} at {} m/s", self.id, foot, speed);
        self.smoother.set_target(foot, speed);
    }

    pub fn target(&self) -> Point3D {
        self.smoother.target()
    }

    /// Smoothed foot position right now
    pub fn position(&mut self) -> Point3D {
        self.smoother.position()
    }

    pub fn at_target(&self) -> bool {
        self.smoother.at_target()
    }

    /// Stop where the foot currently is
    pub fn freeze(&mut self) {
        let here = self.smoother.position();
        let speed = self.smoother.speed();
        self.smoother.set_target(here, speed);
    }

    /// Servo angles (leg view, before flipping) that realise `joints`
    pub fn servo_angles(&self, joints: JointAngles) -> [f64; 3] {
        let joints = joints.as_array();
        std::array::from_fn(|i| self.calibration[i].servo_angle(joints[i]))
    }

    /// One control tick: move the servos to the current smoothed foot position
    pub fn advance(&mut self) -> Result<(), LegError> {
        if self.at_target() {
            return Ok(());
        }

        let foot = self.smoother.position();
        let joints = self.solver.solve(foot).map_err(|source| LegError::NoSolution {
            leg: self.id.clone(),
            foot,
            source,
        })?;

        self.set_angles(self.servo_angles(joints).map(Some))
    }

    /// Unpower all three servos
    pub fn disable(&self) -> Result<(), LegError> {
        self.set_angles([None; 3])
    }

    /// Park the foot at `rest_position`, let it settle, then go limp
    pub async fn rest(&mut self, speed: f64, rest_position: Point3D, tick: Duration) -> Result<(), LegError> {
        if !(speed > 0.0) {
            return Err(LegError::InvalidSpeed {
                leg: self.id.clone(),
                speed,
            });
        }

        self.set_target(rest_position, speed);
        loop {
            if let Err(e) = self.advance() {
                warn!("{}", e);
            }
            if self.at_target() {
                break;
            }
            sleep(tick).await;
        }

        sleep(crate::config::LEG_SETTLE_TIME).await;
        self.disable()
    }
}

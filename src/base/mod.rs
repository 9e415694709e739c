// Walking base: six legs and the tripod gait that drives them
//
// Provides:
// - Leg: smoother + solver + calibration over three servos
// - Stride geometry shared by both tripods
// - Base: tripod partition, stepping, resting, standing

pub mod leg;
mod sequencer;
pub mod stride;

use std::time::Duration;

pub use leg::{JointCalibration, Leg, LegError};
pub use sequencer::{Base, GaitConfig, GaitState, StrideSummary, TRIPOD_A, TRIPOD_B};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GaitError {
    #[error("Gait speed must be positive, got {0}")]
    InvalidSpeed(f64),

    #[error("Walking direction must be within [-pi, pi], got {0}")]
    InvalidDirection(f64),

    #[error("Legs {legs:?} did not reach their targets within {timeout:?}")]
    ConvergenceTimeout { legs: Vec<String>, timeout: Duration },
}

pub type Result<T> = std::result::Result<T, GaitError>;

// Servo control for the hexapod legs
//
// Provides:
// - The actuator abstraction legs write joint angles to
// - Hobby-servo PWM encoding (angle -> duty cycle)
// - A logical channel space spanning several PWM driver chips

mod channel_space;
pub mod pwm;

pub use channel_space::{ChannelSpace, ServoChip};
pub use pwm::{PwmOutput, PwmServo};

/// Error types for servo access
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServoError {
    #[error("Invalid servo channel {channel} (channel space has {count} channels)")]
    InvalidChannel { channel: usize, count: usize },

    #[error("Servo angle {angle} outside actuation range [0, {range}]")]
    AngleOutOfRange { angle: f64, range: f64 },

    #[error("Driver chip at 0x{address:02X} has {found} channels, expected {expected}")]
    ChipLayout {
        address: u8,
        found: usize,
        expected: usize,
    },

    #[error("Channel space needs at least one driver chip with channels")]
    NoChips,

    #[error("PWM bus error: {0}")]
    Bus(String),
}

pub type Result<T> = std::result::Result<T, ServoError>;

/// A positional actuator driven in degrees
///
/// `None` means unpowered: no pulses are sent and the joint holds no torque.
pub trait Actuator: Send + Sync {
    fn angle(&self) -> Option<f64>;

    fn set_angle(&self, angle: Option<f64>) -> Result<()>;
}

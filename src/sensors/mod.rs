// Sensors and indicators around the motion core
//
// Each piece of hardware is reached through a small capability trait so the
// runtime can be wired to real devices or to the simulated ones in `sim`.

pub mod battery;
pub mod button;
pub mod buzzer;
pub mod eyes;

pub use battery::{Batteries, BatteryReport, BatterySource};
pub use button::{DebouncedButton, DigitalInput};
pub use buzzer::{Buzzer, chirp, timed_buzz};
pub use eyes::{Eyes, Heading, HeadingSensor, Photosensor};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("Invalid sensor channel {channel}")]
    InvalidChannel { channel: u8 },

    #[error("Sensor bus error: {0}")]
    Bus(String),
}

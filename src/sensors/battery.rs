// Logic and motor battery monitoring

use serde::{Deserialize, Serialize};

use super::SensorError;

/// Voltage source, typically an ADC behind a resistor divider
pub trait BatterySource: Send + Sync {
    /// Voltage on `channel` in volts
    fn read(&self, channel: u8) -> Result<f64, SensorError>;
}

/// Snapshot of both batteries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryReport {
    pub logic_voltage: f64,
    pub motor_voltage: f64,
    pub logic_low: bool,
    pub motor_low: bool,
}

pub struct Batteries {
    source: Box<dyn BatterySource>,
    logic_channel: u8,
    motor_channel: u8,
    low_voltage: f64,
}

impl Batteries {
    pub fn new(
        source: Box<dyn BatterySource>,
        logic_channel: u8,
        motor_channel: u8,
        low_voltage: f64,
    ) -> Self {
        Self {
            source,
            logic_channel,
            motor_channel,
            low_voltage,
        }
    }

    pub fn low_voltage(&self) -> f64 {
        self.low_voltage
    }

    /// Read both batteries; at or below the threshold counts as low
    pub fn read(&self) -> Result<BatteryReport, SensorError> {
        let logic_voltage = self.source.read(self.logic_channel)?;
        let motor_voltage = self.source.read(self.motor_channel)?;

        Ok(BatteryReport {
            logic_voltage,
            motor_voltage,
            logic_low: logic_voltage <= self.low_voltage,
            motor_low: motor_voltage <= self.low_voltage,
        })
    }
}

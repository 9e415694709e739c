// Hardware layout, gait timing, behavior tuning, topics
use std::f64::consts::{FRAC_PI_4, PI};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::Point3D;

// PWM driver chips (two PCA9685 on one I2C bus)
pub const PCA9685_0_I2C_ADDRESS: u8 = 0x40;
pub const PCA9685_1_I2C_ADDRESS: u8 = 0x41;
pub const PCA9685_PWM_FREQ: u32 = 50;

// Battery ADC channels and shared low-voltage threshold
pub const LOGIC_BATTERY_CHANNEL: u8 = 0;
pub const MOTOR_BATTERY_CHANNEL: u8 = 1;
pub const LOW_BATTERY_VOLTAGE: f64 = 6.6;

/// Where one leg is wired and mounted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegSpec {
    pub id: &'static str,
    /// Servo channels, proximal to distal
    pub channels: [usize; 3],
    /// Servos mounted mirrored (commanded as 180 - angle)
    pub flip: [bool; 3],
    /// Mount angle around the body centre, counter-clockwise from the
    /// right-middle leg (radians)
    pub angle_from_base: f64,
}

// Leg wiring, front to back
pub const LEFT_LEGS: [LegSpec; 3] = [
    LegSpec {
        id: "left_front",
        channels: [25, 24, 15],
        flip: [true, true, true],
        angle_from_base: 3.0 * FRAC_PI_4,
    },
    LegSpec {
        id: "left_middle",
        channels: [28, 27, 26],
        flip: [true, true, true],
        angle_from_base: PI,
    },
    LegSpec {
        id: "left_back",
        channels: [31, 30, 29],
        flip: [true, true, true],
        angle_from_base: -3.0 * FRAC_PI_4,
    },
];

pub const RIGHT_LEGS: [LegSpec; 3] = [
    LegSpec {
        id: "right_front",
        channels: [6, 7, 11],
        flip: [false, false, false],
        angle_from_base: FRAC_PI_4,
    },
    LegSpec {
        id: "right_middle",
        channels: [3, 4, 5],
        flip: [false, false, false],
        angle_from_base: 0.0,
    },
    LegSpec {
        id: "right_back",
        channels: [0, 1, 2],
        flip: [false, false, false],
        angle_from_base: -FRAC_PI_4,
    },
];

// Foot position legs park at (leg frame, meters)
pub const REST_POSITION: Point3D = Point3D::new(0.12, 0.0, -0.02);

// Gait loop frequency
pub const GAIT_LOOP_HZ: u64 = 50;

// Give up on legs that have not converged after this long
pub const CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(10);

// Time for a single leg to settle before its servos are released
pub const LEG_SETTLE_TIME: Duration = Duration::from_millis(500);

// Walking speeds (foot speed, m/s)
pub const FAST_WALK_SPEED: f64 = 0.1;
pub const SLOW_WALK_SPEED: f64 = 0.05;
pub const REST_SPEED: f64 = 0.1;

// Slow walking: stay put when already this bright, wait this long between strides
pub const BRIGHTNESS_CEILING: f64 = 0.92;
pub const SLOW_WALK_COOLDOWN: Duration = Duration::from_secs(60);

// Battery polling
pub const BATTERY_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const LOW_LOGIC_BATTERY_POLL_INTERVAL: Duration = Duration::from_secs(1);

// Pause between driver loop iterations that did nothing
pub const IDLE_INTERVAL: Duration = Duration::from_millis(100);

// Zenoh topics
pub const TOPIC_CMD_BEHAVIOR: &str = "phyto/cmd/behavior"; // remote button presses
pub const TOPIC_STATUS: &str = "phyto/state/status"; // mode, speed, batteries

// Status publish rate
pub const STATUS_HZ: u64 = 10;

/// Tunable runtime settings, loadable from a JSON file
///
/// Missing fields take the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub fast_walk_speed: f64,
    pub slow_walk_speed: f64,
    pub rest_speed: f64,
    pub brightness_ceiling: f64,
    pub slow_walk_cooldown_secs: f64,
    pub low_battery_voltage: f64,
    pub battery_poll_secs: f64,
    pub low_logic_battery_poll_secs: f64,
    pub gait_loop_hz: u64,
    pub convergence_timeout_secs: f64,
    pub rest_position: Point3D,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fast_walk_speed: FAST_WALK_SPEED,
            slow_walk_speed: SLOW_WALK_SPEED,
            rest_speed: REST_SPEED,
            brightness_ceiling: BRIGHTNESS_CEILING,
            slow_walk_cooldown_secs: SLOW_WALK_COOLDOWN.as_secs_f64(),
            low_battery_voltage: LOW_BATTERY_VOLTAGE,
            battery_poll_secs: BATTERY_POLL_INTERVAL.as_secs_f64(),
            low_logic_battery_poll_secs: LOW_LOGIC_BATTERY_POLL_INTERVAL.as_secs_f64(),
            gait_loop_hz: GAIT_LOOP_HZ,
            convergence_timeout_secs: CONVERGENCE_TIMEOUT.as_secs_f64(),
            rest_position: REST_POSITION,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl RuntimeConfig {
    /// Load from a JSON file and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gait and behavior loops cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, speed) in [
            ("fast_walk_speed", self.fast_walk_speed),
            ("slow_walk_speed", self.slow_walk_speed),
            ("rest_speed", self.rest_speed),
        ] {
            if !(speed > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {speed}")));
            }
        }

        for (name, secs) in [
            ("slow_walk_cooldown_secs", self.slow_walk_cooldown_secs),
            ("battery_poll_secs", self.battery_poll_secs),
            ("low_logic_battery_poll_secs", self.low_logic_battery_poll_secs),
            ("convergence_timeout_secs", self.convergence_timeout_secs),
        ] {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number of seconds, got {secs}")));
            }
        }

        if self.gait_loop_hz == 0 {
            return Err(ConfigError::Invalid("gait_loop_hz must be positive".to_string()));
        }

        Ok(())
    }

    pub fn gait_tick(&self) -> Duration {
        Duration::from_millis(1000 / self.gait_loop_hz)
    }

    pub fn slow_walk_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.slow_walk_cooldown_secs)
    }

    pub fn battery_poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.battery_poll_secs)
    }

    pub fn low_logic_battery_poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.low_logic_battery_poll_secs)
    }

    pub fn convergence_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.convergence_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legs_use_distinct_channels() {
        let mut channels: Vec<usize> = LEFT_LEGS
            .iter()
            .chain(RIGHT_LEGS.iter())
            .flat_map(|leg| leg.channels)
            .collect();
        channels.sort_unstable();
        channels.dedup();
        assert_eq!(channels.len(), 18);
        assert!(channels.iter().all(|&c| c < 32));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "fast_walk_speed": 0.2, "gait_loop_hz": 100 }"#).unwrap();
        assert_eq!(config.fast_walk_speed, 0.2);
        assert_eq!(config.gait_tick(), Duration::from_millis(10));
        assert_eq!(config.slow_walk_speed, SLOW_WALK_SPEED);
        assert_eq!(config.rest_position, REST_POSITION);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = RuntimeConfig {
            slow_walk_speed: 0.0,
            ..RuntimeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = RuntimeConfig {
            gait_loop_hz: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RuntimeConfig {
            battery_poll_secs: f64::NAN,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

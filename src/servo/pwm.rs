// Hobby servo PWM encoding
//
// Servos read the width of a pulse repeated at the PWM frequency. The pulse
// width is mapped linearly from MIN_PULSE_US (0 degrees) to MAX_PULSE_US (the
// full actuation range). Duty cycles are 16-bit fractions of the PWM period;
// a duty cycle of zero sends no pulses at all.

use tracing::debug;

use super::{Actuator, Result, ServoError};

/// Default pulse width range (microseconds)
pub const MIN_PULSE_US: f64 = 750.0;
pub const MAX_PULSE_US: f64 = 2250.0;

/// Default actuation range (degrees)
pub const ACTUATION_RANGE: f64 = 180.0;

const DUTY_FULL_SCALE: f64 = 0xFFFF as f64;

/// One PWM output channel holding a 16-bit duty cycle
pub trait PwmOutput: Send + Sync {
    /// PWM frequency in Hz
    fn frequency(&self) -> u32;

    fn duty_cycle(&self) -> u16;

    fn set_duty_cycle(&self, duty: u16) -> Result<()>;
}

/// Servo driven through a PWM output
#[derive(Debug)]
pub struct PwmServo<P> {
    pwm: P,
    min_duty: u16,
    duty_range: u16,
    actuation_range: f64,
}

impl<P: PwmOutput> PwmServo<P> {
    pub fn new(pwm: P) -> Self {
        Self::with_pulse_range(pwm, MIN_PULSE_US, MAX_PULSE_US, ACTUATION_RANGE)
    }

    pub fn with_pulse_range(pwm: P, min_pulse_us: f64, max_pulse_us: f64, actuation_range: f64) -> Self {
        let (min_duty, duty_range) = duty_bounds(pwm.frequency(), min_pulse_us, max_pulse_us);
        Self {
            pwm,
            min_duty,
            duty_range,
            actuation_range,
        }
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    /// Duty cycle for an angle, or 0 for unpowered
    pub fn encode(&self, angle: Option<f64>) -> Result<u16> {
        let Some(angle) = angle else {
            return Ok(0);
        };

        if !(0.0..=self.actuation_range).contains(&angle) {
            return Err(ServoError::AngleOutOfRange {
                angle,
                range: self.actuation_range,
            });
        }

        let fraction = angle / self.actuation_range;
        Ok(self.min_duty + (fraction * self.duty_range as f64) as u16)
    }

    /// Angle commanded by a duty cycle, `None` when no pulses are sent
    pub fn decode(&self, duty: u16) -> Option<f64> {
        if duty == 0 {
            return None;
        }
        let fraction = (duty as f64 - self.min_duty as f64) / self.duty_range as f64;
        Some(fraction * self.actuation_range)
    }
}

impl<P: PwmOutput> Actuator for PwmServo<P> {
    fn angle(&self) -> Option<f64> {
        self.decode(self.pwm.duty_cycle())
    }

    fn set_angle(&self, angle: Option<f64>) -> Result<()> {
        let duty = self.encode(angle)?;
        debug!("Servo angle {:?} -> duty {}", angle, duty);
        self.pwm.set_duty_cycle(duty)
    }
}

/// Minimum duty and duty span for a pulse range at `frequency` Hz
fn duty_bounds(frequency: u32, min_pulse_us: f64, max_pulse_us: f64) -> (u16, u16) {
    let freq = frequency as f64;
    let min_duty = (min_pulse_us * freq / 1_000_000.0 * DUTY_FULL_SCALE) as u16;
    let max_duty = max_pulse_us * freq / 1_000_000.0 * DUTY_FULL_SCALE;
    let duty_range = (max_duty - min_duty as f64) as u16;
    (min_duty, duty_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering};

    struct FakePwm(AtomicU16);

    impl PwmOutput for FakePwm {
        fn frequency(&self) -> u32 {
            50
        }

        fn duty_cycle(&self) -> u16 {
            self.0.load(Ordering::Relaxed)
        }

        fn set_duty_cycle(&self, duty: u16) -> Result<()> {
            self.0.store(duty, Ordering::Relaxed);
            Ok(())
        }
    }

    fn servo() -> PwmServo<FakePwm> {
        PwmServo::new(FakePwm(AtomicU16::new(0)))
    }

    #[test]
    fn test_duty_bounds_at_50hz() {
        // 750us and 2250us pulses within a 20ms period
        assert_eq!(duty_bounds(50, MIN_PULSE_US, MAX_PULSE_US), (2457, 4915));
    }

    #[test]
    fn test_encode_angles() {
        let s = servo();
        assert_eq!(s.encode(Some(0.0)).unwrap(), 2457);
        assert_eq!(s.encode(Some(90.0)).unwrap(), 2457 + 2457);
        assert_eq!(s.encode(Some(180.0)).unwrap(), 2457 + 4915);
        assert_eq!(s.encode(None).unwrap(), 0);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let s = servo();
        assert_eq!(
            s.encode(Some(180.5)),
            Err(ServoError::AngleOutOfRange {
                angle: 180.5,
                range: 180.0
            })
        );
        assert!(s.encode(Some(-1.0)).is_err());
        assert!(s.encode(Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_actuator_roundtrip_within_resolution() {
        let s = servo();
        assert_eq!(s.angle(), None);

        s.set_angle(Some(45.0)).unwrap();
        let angle = s.angle().unwrap();
        assert!((angle - 45.0).abs() < 0.05, "read back {angle}");

        s.set_angle(None).unwrap();
        assert_eq!(s.pwm().duty_cycle(), 0);
        assert_eq!(s.angle(), None);
    }
}

// Simulated hardware
//
// In-memory stand-ins for every hardware trait. Each type is a cheap handle
// around shared state: clone it, hand one copy to the runtime, and keep the
// other to inspect outputs or inject readings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};

use tracing::debug;

use crate::config::{
    LOGIC_BATTERY_CHANNEL, MOTOR_BATTERY_CHANNEL, PCA9685_0_I2C_ADDRESS, PCA9685_1_I2C_ADDRESS,
    PCA9685_PWM_FREQ, RuntimeConfig,
};
use crate::sensors::{
    Batteries, BatterySource, Buzzer, DebouncedButton, DigitalInput, Eyes, Photosensor,
    SensorError,
};
use crate::servo::{self, Actuator, ChannelSpace, PwmOutput, PwmServo, ServoChip};

/// Channels per simulated driver chip
pub const SIM_CHIP_CHANNELS: usize = 16;

/// f64 stored in an atomic
#[derive(Debug, Clone)]
struct SharedF64(Arc<AtomicU64>);

impl SharedF64 {
    fn new(value: f64) -> Self {
        Self(Arc::new(AtomicU64::new(value.to_bits())))
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// One PWM channel register
#[derive(Debug)]
pub struct SimPwm {
    frequency: u32,
    duty: AtomicU16,
}

impl PwmOutput for SimPwm {
    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn duty_cycle(&self) -> u16 {
        self.duty.load(Ordering::Relaxed)
    }

    fn set_duty_cycle(&self, duty: u16) -> servo::Result<()> {
        self.duty.store(duty, Ordering::Relaxed);
        Ok(())
    }
}

/// A 16-channel PWM driver chip
#[derive(Debug, Clone)]
pub struct SimServoChip {
    address: u8,
    servos: Arc<Vec<Arc<PwmServo<SimPwm>>>>,
}

impl SimServoChip {
    pub fn new(address: u8, frequency: u32) -> Self {
        Self::with_channels(address, frequency, SIM_CHIP_CHANNELS)
    }

    pub fn with_channels(address: u8, frequency: u32, channels: usize) -> Self {
        let servos = (0..channels)
            .map(|_| {
                Arc::new(PwmServo::new(SimPwm {
                    frequency,
                    duty: AtomicU16::new(0),
                }))
            })
            .collect();
        Self {
            address,
            servos: Arc::new(servos),
        }
    }

    /// Angle commanded on a local channel, `None` when unpowered or absent
    pub fn angle(&self, channel: usize) -> Option<f64> {
        self.servos.get(channel).and_then(|servo| servo.angle())
    }

    /// Raw duty cycle on a local channel
    pub fn duty_cycle(&self, channel: usize) -> Option<u16> {
        self.servos.get(channel).map(|servo| servo.pwm().duty_cycle())
    }
}

impl ServoChip for SimServoChip {
    fn address(&self) -> u8 {
        self.address
    }

    fn channel_count(&self) -> usize {
        self.servos.len()
    }

    fn actuator(&self, channel: usize) -> servo::Result<Arc<dyn Actuator>> {
        let servo = self
            .servos
            .get(channel)
            .ok_or(servo::ServoError::InvalidChannel {
                channel,
                count: self.servos.len(),
            })?;
        let actuator: Arc<dyn Actuator> = servo.clone();
        Ok(actuator)
    }
}

/// Light sensor with a settable reading
#[derive(Debug, Clone)]
pub struct SimLight(SharedF64);

impl SimLight {
    pub fn new(level: f64) -> Self {
        Self(SharedF64::new(level))
    }

    pub fn set(&self, level: f64) {
        self.0.set(level);
    }
}

impl Photosensor for SimLight {
    fn read(&self) -> f64 {
        self.0.get()
    }
}

/// Battery voltages on the logic and motor channels
#[derive(Debug, Clone)]
pub struct SimBatteries {
    logic: SharedF64,
    motor: SharedF64,
}

impl SimBatteries {
    pub fn new(logic: f64, motor: f64) -> Self {
        Self {
            logic: SharedF64::new(logic),
            motor: SharedF64::new(motor),
        }
    }

    pub fn set_logic(&self, volts: f64) {
        self.logic.set(volts);
    }

    pub fn set_motor(&self, volts: f64) {
        self.motor.set(volts);
    }
}

impl BatterySource for SimBatteries {
    fn read(&self, channel: u8) -> Result<f64, SensorError> {
        match channel {
            LOGIC_BATTERY_CHANNEL => Ok(self.logic.get()),
            MOTOR_BATTERY_CHANNEL => Ok(self.motor.get()),
            _ => Err(SensorError::InvalidChannel { channel }),
        }
    }
}

/// Digital input with a settable level
#[derive(Debug, Clone)]
pub struct SimInput(Arc<AtomicBool>);

impl SimInput {
    pub fn new(high: bool) -> Self {
        Self(Arc::new(AtomicBool::new(high)))
    }

    pub fn set(&self, high: bool) {
        self.0.store(high, Ordering::Relaxed);
    }
}

impl DigitalInput for SimInput {
    fn is_high(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Buzzer that counts the tones it was asked to play
#[derive(Debug, Clone, Default)]
pub struct SimBuzzer {
    pulses: Arc<AtomicUsize>,
    sounding: Arc<AtomicBool>,
}

impl SimBuzzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tones started so far
    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::Relaxed)
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding.load(Ordering::Relaxed)
    }
}

impl Buzzer for SimBuzzer {
    fn start(&self, frequency: f64) {
        debug!("Buzzer on at {} Hz", frequency);
        self.pulses.fetch_add(1, Ordering::Relaxed);
        self.sounding.store(true, Ordering::Relaxed);
    }

    fn stop(&self) {
        debug!("Buzzer off");
        self.sounding.store(false, Ordering::Relaxed);
    }
}

/// A complete simulated robot: driver chips, eyes, batteries, buttons, buzzer
#[derive(Debug, Clone)]
pub struct SimHardware {
    pub chips: [SimServoChip; 2],
    pub left_eye: SimLight,
    pub right_eye: SimLight,
    pub back_eye: SimLight,
    pub batteries: SimBatteries,
    /// Mode button input, pulled up (low while pressed)
    pub mode_input: SimInput,
    /// Speed button input, pulled up (low while pressed)
    pub speed_input: SimInput,
    pub buzzer: SimBuzzer,
}

impl Default for SimHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHardware {
    /// Dim room, charged batteries, buttons released
    pub fn new() -> Self {
        Self {
            chips: [
                SimServoChip::new(PCA9685_0_I2C_ADDRESS, PCA9685_PWM_FREQ),
                SimServoChip::new(PCA9685_1_I2C_ADDRESS, PCA9685_PWM_FREQ),
            ],
            left_eye: SimLight::new(0.3),
            right_eye: SimLight::new(0.2),
            back_eye: SimLight::new(0.1),
            batteries: SimBatteries::new(7.4, 7.4),
            mode_input: SimInput::new(true),
            speed_input: SimInput::new(true),
            buzzer: SimBuzzer::new(),
        }
    }

    pub fn channel_space(&self) -> servo::Result<ChannelSpace> {
        let [chip0, chip1] = self.chips.clone();
        ChannelSpace::open(vec![Box::new(chip0), Box::new(chip1)])
    }

    pub fn eyes(&self) -> Eyes {
        Eyes::new(
            Box::new(self.left_eye.clone()),
            Box::new(self.right_eye.clone()),
            Box::new(self.back_eye.clone()),
        )
    }

    pub fn batteries(&self, config: &RuntimeConfig) -> Batteries {
        Batteries::new(
            Box::new(self.batteries.clone()),
            LOGIC_BATTERY_CHANNEL,
            MOTOR_BATTERY_CHANNEL,
            config.low_battery_voltage,
        )
    }

    /// Mode and speed buttons
    pub fn buttons(&self) -> (DebouncedButton, DebouncedButton) {
        (
            DebouncedButton::new(Box::new(self.mode_input.clone()), false),
            DebouncedButton::new(Box::new(self.speed_input.clone()), false),
        )
    }

    /// Angle on a logical servo channel
    pub fn servo_angle(&self, channel: usize) -> Option<f64> {
        self.chips
            .get(channel / SIM_CHIP_CHANNELS)
            .and_then(|chip| chip.angle(channel % SIM_CHIP_CHANNELS))
    }

    /// Whether any servo is currently powered
    pub fn any_servo_powered(&self) -> bool {
        (0..2 * SIM_CHIP_CHANNELS).any(|channel| self.servo_angle(channel).is_some())
    }
}

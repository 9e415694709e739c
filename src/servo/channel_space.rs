// Logical servo channel space spanning several PWM driver chips
//
// Two 16-channel driver chips act like one 32-channel controller. Channel n
// lives on chip n / 16 at local channel n % 16.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Actuator, Result, ServoError};

/// A PWM driver chip exposing a bank of servo channels
pub trait ServoChip: Send + Sync {
    /// I2C address of the chip
    fn address(&self) -> u8;

    fn channel_count(&self) -> usize;

    /// Actuator on a local channel of this chip
    fn actuator(&self, channel: usize) -> Result<Arc<dyn Actuator>>;
}

/// All servo channels of all driver chips as one array
///
/// Every actuator is disabled when the channel space is dropped, so leaving
/// scope on any path (including errors and panics) leaves the servos limp.
pub struct ChannelSpace {
    chips: Vec<Box<dyn ServoChip>>,
    channels_per_chip: usize,
}

impl ChannelSpace {
    /// Open a channel space over `chips`, which must all have the same width
    pub fn open(chips: Vec<Box<dyn ServoChip>>) -> Result<Self> {
        let first = chips.first().ok_or(ServoError::NoChips)?;
        let channels_per_chip = first.channel_count();
        if channels_per_chip == 0 {
            return Err(ServoError::NoChips);
        }

        for chip in &chips {
            if chip.channel_count() != channels_per_chip {
                return Err(ServoError::ChipLayout {
                    address: chip.address(),
                    found: chip.channel_count(),
                    expected: channels_per_chip,
                });
            }
        }

        let addresses: Vec<String> = chips
            .iter()
            .map(|chip| format!("0x{:02X}", chip.address()))
            .collect();
        info!(
            "Opened servo channel space: {} chips ({}), {} channels",
            chips.len(),
            addresses.join(", "),
            chips.len() * channels_per_chip
        );

        Ok(Self {
            chips,
            channels_per_chip,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.chips.len() * self.channels_per_chip
    }

    /// Actuator on a logical channel
    pub fn actuator(&self, channel: usize) -> Result<Arc<dyn Actuator>> {
        let chip = self
            .chips
            .get(channel / self.channels_per_chip)
            .ok_or(ServoError::InvalidChannel {
                channel,
                count: self.channel_count(),
            })?;
        chip.actuator(channel % self.channels_per_chip)
    }

    /// Actuators for a leg, proximal to distal
    pub fn actuators(&self, channels: [usize; 3]) -> Result<[Arc<dyn Actuator>; 3]> {
        let [a, b, c] = channels;
        Ok([self.actuator(a)?, self.actuator(b)?, self.actuator(c)?])
    }

    /// Unpower every channel, continuing past failures
    ///
    /// Returns the first failure, if any.
    pub fn disable_all(&self) -> Result<()> {
        debug!("Disabling all {} servo channels", self.channel_count());
        let mut first_error = None;

        for channel in 0..self.channel_count() {
            let result = self
                .actuator(channel)
                .and_then(|actuator| actuator.set_angle(None));
            if let Err(e) = result {
                warn!("Failed to disable servo channel {}: {}", channel, e);
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for ChannelSpace {
    fn drop(&mut self) {
        info!("Closing servo channel space");
        if let Err(e) = self.disable_all() {
            warn!("Failed to disable all servos on close: {}", e);
        }
    }
}

// Debounced push buttons
//
// A mechanical contact chatters for a few milliseconds when it changes state.
// The debouncer only accepts a new level once the raw input has held it for
// the whole debounce interval.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Default debounce interval
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(10);

/// How often the edge waits sample the input
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Raw digital input level
pub trait DigitalInput: Send + Sync {
    fn is_high(&self) -> bool;
}

pub struct DebouncedButton {
    input: Box<dyn DigitalInput>,
    pressed_level: bool,
    interval: Duration,
    stable: bool,
    unstable: bool,
    changed_at: Instant,
}

impl DebouncedButton {
    /// Button that reads `pressed_level` while held (low for pull-up wiring)
    pub fn new(input: Box<dyn DigitalInput>, pressed_level: bool) -> Self {
        Self::with_interval(input, pressed_level, DEBOUNCE_INTERVAL)
    }

    pub fn with_interval(input: Box<dyn DigitalInput>, pressed_level: bool, interval: Duration) -> Self {
        let level = input.is_high();
        Self {
            input,
            pressed_level,
            interval,
            stable: level,
            unstable: level,
            changed_at: Instant::now(),
        }
    }

    /// Sample the input and report the debounced state
    pub fn pressed(&mut self) -> bool {
        self.update();
        self.stable == self.pressed_level
    }

    /// Wait until the button is held down
    pub async fn until_pressed(&mut self) {
        while !self.pressed() {
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until the button is let go
    pub async fn until_released(&mut self) {
        while self.pressed() {
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait for one full press-and-release
    pub async fn clicked(&mut self) {
        self.until_pressed().await;
        self.until_released().await;
    }

    fn update(&mut self) {
        let level = self.input.is_high();
        let now = Instant::now();

        if level != self.unstable {
            self.unstable = level;
            self.changed_at = now;
        } else if level != self.stable && now.duration_since(self.changed_at) >= self.interval {
            self.stable = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimInput;
    use tokio::time::advance;

    // Pull-up wiring: the input reads low while pressed
    fn button() -> (DebouncedButton, SimInput) {
        let input = SimInput::new(true);
        (DebouncedButton::new(Box::new(input.clone()), false), input)
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_is_accepted_after_interval() {
        let (mut button, input) = button();
        assert!(!button.pressed());

        input.set(false);
        assert!(!button.pressed(), "level just changed");

        advance(Duration::from_millis(5)).await;
        assert!(!button.pressed(), "not stable long enough");

        advance(Duration::from_millis(5)).await;
        assert!(button.pressed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chatter_is_ignored() {
        let (mut button, input) = button();

        for _ in 0..5 {
            input.set(false);
            button.pressed();
            advance(Duration::from_millis(4)).await;
            input.set(true);
            button.pressed();
            advance(Duration::from_millis(4)).await;
        }

        assert!(!button.pressed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clicked_waits_for_release() {
        let (mut button, input) = button();

        let presser = async {
            sleep(Duration::from_millis(100)).await;
            input.set(false);
            sleep(Duration::from_millis(200)).await;
            input.set(true);
        };

        let start = Instant::now();
        tokio::join!(button.clicked(), presser);

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(!button.pressed());
    }
}

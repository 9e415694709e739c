// Buzzer tone patterns

use std::time::Duration;

use tokio::time::sleep;

/// Tone used for chirps (Hz)
pub const CHIRP_FREQUENCY: f64 = 2000.0;
pub const CHIRP_DURATION: Duration = Duration::from_millis(100);
pub const CHIRP_GAP: Duration = Duration::from_millis(100);

pub trait Buzzer: Send + Sync {
    /// Start a continuous tone
    fn start(&self, frequency: f64);

    fn stop(&self);
}

/// Sound a tone for `duration`
pub async fn timed_buzz(buzzer: &dyn Buzzer, frequency: f64, duration: Duration) {
    buzzer.start(frequency);
    sleep(duration).await;
    buzzer.stop();
}

/// Emit `count` short pulses
pub async fn chirp(buzzer: &dyn Buzzer, count: usize) {
    for i in 0..count {
        if i > 0 {
            sleep(CHIRP_GAP).await;
        }
        timed_buzz(buzzer, CHIRP_FREQUENCY, CHIRP_DURATION).await;
    }
}

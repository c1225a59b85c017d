//! Retry policy: decides backoff delays for transient delta failures.

use std::time::Duration;

use rand::Rng;

/// Retry policy for transient network errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Base delay for the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Randomize each delay within `[delay/2, delay]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Should another attempt follow `attempts` failed ones?
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before the next attempt.
    ///
    /// `attempts` is the number of attempts already made (1-indexed).
    /// delay = base_delay * multiplier^(attempts - 1)
    ///
    /// With base_delay=500ms and multiplier=2.0:
    /// - attempt 1: 500ms
    /// - attempt 2: 1s
    /// - attempt 3: 2s
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        if self.jitter && delay_secs > 0.0 {
            let factor = rand::thread_rng().gen_range(0.5..=1.0);
            Duration::from_secs_f64(delay_secs * factor)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

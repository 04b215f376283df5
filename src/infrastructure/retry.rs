//! Exponential backoff for loops that keep failing.
//!
//! Each failure multiplies the delay up to a ceiling and adds up to 20%
//! random jitter so loops of different accounts do not retry in lockstep.
//! A success resets the delay.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::workers::RetryConfig;

#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    current_delay_ms: u64,
    consecutive_failures: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        let initial = config.initial_delay_ms;
        Self {
            config,
            current_delay_ms: initial,
            consecutive_failures: 0,
        }
    }

    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record a failure and return how long to wait before the next try.
    pub fn next_delay(&mut self) -> Duration {
        self.consecutive_failures += 1;
        let base_ms = self.current_delay_ms;
        let jitter_range_ms = base_ms / 5;
        let jitter_ms = if jitter_range_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_range_ms)
        };

        let next = (base_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next.clamp(self.config.initial_delay_ms, self.config.max_delay_ms);

        Duration::from_millis(base_ms + jitter_ms)
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RetryConfig {
        RetryConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn delay_grows_until_ceiling() {
        let mut backoff = Backoff::new(config());
        let bases: Vec<u64> = (0..6)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();

        // Each delay is its base plus at most 20% jitter.
        assert!((100..=120).contains(&bases[0]));
        assert!((200..=240).contains(&bases[1]));
        assert!((400..=480).contains(&bases[2]));
        assert!((800..=960).contains(&bases[3]));
        assert!((1000..=1200).contains(&bases[4]));
        assert!((1000..=1200).contains(&bases[5]));
        assert_eq!(backoff.consecutive_failures(), 6);
    }

    #[test]
    fn reset_returns_to_initial_delay() {
        let mut backoff = Backoff::new(config());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.consecutive_failures(), 0);
        assert!(backoff.next_delay() <= Duration::from_millis(120));
    }
}

//! Capped exponential restart backoff.

use std::time::Duration;

use crate::config::BackoffConfig;

/// Tracks consecutive restart failures and the delay before the next attempt.
///
/// The n-th consecutive failure waits `base * 2^(n-1)`, capped at `max`.
/// Retries never stop; past `alert_after` failures they are flagged for an
/// alert-level log.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    failures: u32,
}

impl Backoff {
    /// Creates a backoff with no recorded failures.
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Records a failure and returns how long to wait before restarting.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let exponent = (self.failures - 1).min(31);
        self.config
            .base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.config.max)
            .min(self.config.max)
    }

    /// Clears the failure count after a successful connection.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Returns true once failures reached the alert threshold.
    pub fn should_alert(&self) -> bool {
        self.config.alert_after > 0 && self.failures >= self.config.alert_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(BackoffConfig {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(10),
            alert_after: 3,
        })
    }

    #[test]
    fn test_delay_doubles_until_cap() {
        let mut backoff = backoff();
        let delays: Vec<u128> = (0..6).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10000, 10000]);
    }

    #[test]
    fn test_reset_starts_over() {
        let mut backoff = backoff();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();

        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_alert_threshold() {
        let mut backoff = backoff();
        backoff.next_delay();
        backoff.next_delay();
        assert!(!backoff.should_alert());
        backoff.next_delay();
        assert!(backoff.should_alert());
    }

    #[test]
    fn test_never_overflows() {
        let mut backoff = backoff();
        for _ in 0..100 {
            assert!(backoff.next_delay() <= Duration::from_secs(10));
        }
        assert_eq!(backoff.failures(), 100);
    }
}

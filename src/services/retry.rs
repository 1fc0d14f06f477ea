//! Exponential backoff for data-source failures.

use std::time::Duration;

/// Retry schedule applied uniformly to transport and timeout errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (default: 3).
    pub max_retries: u32,
    /// Delay before the first retry (default: 1s).
    pub base_delay: Duration,
    /// Upper bound on any single delay (default: 30s).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    ///
    /// Formula: `min(base_delay * 2^attempt, max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Whether another retry is allowed after `failures` failed attempts.
    pub fn should_retry(&self, failures: u32) -> bool {
        failures <= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..3).map(|a| policy.delay_for_attempt(a).as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000]);
    }

    #[test]
    fn test_backoff_capped_at_max_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(16_000));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(30_000));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(30_000));
    }

    #[test]
    fn test_should_retry_counts_failures() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(3));
        assert!(!policy.should_retry(4));
        assert!(!RetryPolicy::none().should_retry(1));
    }
}

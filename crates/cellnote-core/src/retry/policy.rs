//! Retry policy: decides backoff delays.

use rand::Rng;
use std::time::Duration;

/// Retry policy for one task's retryable unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub base_delay: Duration,

    /// Backoff factor for exponential backoff.
    pub factor: u32,

    /// Upper bound for any single delay.
    pub max_delay: Duration,

    /// Random extra fraction added to each delay (0.0 disables jitter).
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            factor: 2,
            max_delay,
            jitter: 0.0,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Calculate delay for the next retry based on attempt number.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    ///
    /// delay = min(base_delay * factor^(attempts - 1) * (1 + jitter), max_delay)
    ///
    /// Example with base_delay=300ms, factor=2, max_delay=1s:
    /// - after attempt 1: 300ms
    /// - after attempt 2: 600ms
    /// - after attempt 3: 1s (capped)
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1);
        let delay = self
            .factor
            .checked_pow(exponent)
            .and_then(|scale| self.base_delay.checked_mul(scale))
            .map_or(self.max_delay, |d| d.min(self.max_delay));

        if self.jitter > 0.0 {
            let extra = rand::thread_rng().gen_range(0.0..self.jitter);
            (delay + delay.mul_f64(extra)).min(self.max_delay)
        } else {
            delay
        }
    }

    /// Sum of every inter-attempt delay when all attempts fail.
    pub fn worst_case_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|k| self.next_delay(k)).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(300), Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_has_reasonable_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(300));
        assert_eq!(policy.factor, 2);
        assert_eq!(policy.jitter, 0.0);
    }

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(4, 800)]
    #[case(5, 1_000)]
    #[case(9, 1_000)]
    fn exponential_backoff_is_capped(#[case] attempts: u32, #[case] expected_ms: u64) {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(policy.next_delay(attempts), Duration::from_millis(expected_ms));
    }

    #[test]
    fn backoff_is_non_decreasing() {
        let policy = RetryPolicy::new(12, Duration::from_millis(50), Duration::from_secs(2));
        let delays: Vec<_> = (1..policy.max_attempts).map(|k| policy.next_delay(k)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn jitter_stays_within_fraction() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1)).with_jitter(0.5);
        for _ in 0..50 {
            let d = policy.next_delay(2);
            assert!(d >= Duration::from_millis(200));
            assert!(d < Duration::from_millis(300));
        }

        let at_cap = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_millis(100)).with_jitter(0.5);
        for _ in 0..200 {
            assert_eq!(at_cap.next_delay(1), Duration::from_millis(100));
        }
    }

    #[test]
    fn worst_case_is_sum_of_gaps() {
        let policy = RetryPolicy::new(3, Duration::from_millis(300), Duration::from_secs(5));
        assert_eq!(policy.worst_case_backoff(), Duration::from_millis(900));
    }
}

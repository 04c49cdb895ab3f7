//! Decision model: what to do after a failed attempt.
//!
//! The Decider is a pure function of (attempts made, error kind). The actual
//! sleeping and re-running is done by `RetryController`.

use std::time::Duration;

use super::SessionError;
use crate::retry::RetryPolicy;

/// The next action after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Run the unit again after `delay`.
    Retry { delay: Duration, reason: String },

    /// Report the task as failed.
    GiveUp { reason: String },
}

pub trait Decider: Send + Sync {
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    /// * `error` - The error of the most recent attempt.
    fn decide(&self, attempts: u32, error: &SessionError) -> Decision;
}

/// Retry retryable kinds until `max_attempts`, with the policy's backoff.
#[derive(Debug, Clone)]
pub struct DefaultDecider {
    retry_policy: RetryPolicy,
}

impl DefaultDecider {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self { retry_policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

impl Decider for DefaultDecider {
    fn decide(&self, attempts: u32, error: &SessionError) -> Decision {
        if !error.is_retryable() {
            return Decision::GiveUp {
                reason: format!("{} is not retryable", error.kind()),
            };
        }
        if attempts >= self.retry_policy.max_attempts {
            return Decision::GiveUp {
                reason: format!(
                    "Max attempts reached: {}/{}",
                    attempts, self.retry_policy.max_attempts
                ),
            };
        }
        let delay = self.retry_policy.next_delay(attempts);
        Decision::Retry {
            delay,
            reason: format!(
                "Retry attempt {}/{} after {:?}",
                attempts + 1,
                self.retry_policy.max_attempts,
                delay
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    fn decider() -> DefaultDecider {
        DefaultDecider::new(RetryPolicy::new(3, Duration::from_millis(300), Duration::from_secs(5)))
    }

    #[test]
    fn transient_failures_retry_until_limit() {
        let d = decider();
        let err = SessionError::transient("busy");

        assert_eq!(
            d.decide(1, &err),
            Decision::Retry {
                delay: Duration::from_millis(300),
                reason: "Retry attempt 2/3 after 300ms".into()
            }
        );
        assert!(matches!(d.decide(2, &err), Decision::Retry { delay, .. } if delay == Duration::from_millis(600)));
        assert!(matches!(d.decide(3, &err), Decision::GiveUp { .. }));
    }

    #[test]
    fn non_retryable_kinds_give_up_on_first_failure() {
        let d = decider();
        for kind in [
            ErrorKind::EditModeActive,
            ErrorKind::MalformedTask,
            ErrorKind::ConnectionUnavailable,
            ErrorKind::ContentFetch,
        ] {
            let err = SessionError::new(kind, "nope");
            assert!(matches!(d.decide(1, &err), Decision::GiveUp { .. }), "{kind}");
        }
    }
}

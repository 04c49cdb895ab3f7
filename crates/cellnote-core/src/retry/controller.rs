//! RetryController: runs one task's unit of work with bounded backoff.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::RetryPolicy;
use crate::domain::{Decider, Decision, DefaultDecider, SessionError};

/// What happened across all attempts of one unit.
#[derive(Debug)]
pub struct RetryReport<T> {
    pub result: Result<T, SessionError>,
    pub attempts: u32,
    /// Time spent sleeping between attempts.
    pub backoff: Duration,
}

pub struct RetryController {
    decider: Box<dyn Decider>,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_decider(DefaultDecider::new(policy))
    }

    pub fn with_decider(decider: impl Decider + 'static) -> Self {
        Self {
            decider: Box::new(decider),
        }
    }

    /// Run `op` until it succeeds, the decider gives up, or attempts run out.
    ///
    /// `op` receives the 1-indexed attempt number. Exhaustion is returned in the
    /// report, not raised.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> RetryReport<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        let mut attempts = 0;
        let mut backoff = Duration::ZERO;

        loop {
            attempts += 1;
            let err = match op(attempts).await {
                Ok(value) => {
                    debug!(unit = label, attempts, "unit succeeded");
                    return RetryReport {
                        result: Ok(value),
                        attempts,
                        backoff,
                    };
                }
                Err(err) => err,
            };

            match self.decider.decide(attempts, &err) {
                Decision::Retry { delay, reason } => {
                    warn!(unit = label, attempt = attempts, error = %err, %reason, "attempt failed; backing off");
                    tokio::time::sleep(delay).await;
                    backoff += delay;
                }
                Decision::GiveUp { reason } => {
                    warn!(unit = label, attempts, error = %err, %reason, "giving up");
                    return RetryReport {
                        result: Err(err),
                        attempts,
                        backoff,
                    };
                }
            }
        }
    }
}

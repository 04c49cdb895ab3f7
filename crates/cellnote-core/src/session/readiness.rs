//! Readiness probe: wait until the host answers calls without error.
//!
//! After an alt-tab or a sheet switch the host can reject calls for a moment.
//! The probe polls a fixed set of checks until all pass or the timeout runs out.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::ports::HostInstance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessProber {
    timeout: Duration,
    poll_interval: Duration,
}

impl ReadinessProber {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `true` once every check passes; `false` when the timeout is exhausted.
    /// Never returns an error: the caller decides what "not ready" means.
    pub async fn probe(&self, instance: &dyn HostInstance) -> bool {
        let deadline = Instant::now() + self.timeout;
        let mut ticks = 0u32;

        loop {
            ticks += 1;
            match check(instance) {
                Ok(document) => {
                    debug!(ticks, %document, "host ready");
                    return true;
                }
                Err(reason) => trace!(ticks, %reason, "host not ready yet"),
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(ticks, timeout_ms = self.timeout.as_millis() as u64, "readiness probe timed out");
                return false;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

impl Default for ReadinessProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_millis(100))
    }
}

/// All checks, in order. Returns the active document name.
fn check(instance: &dyn HostInstance) -> Result<String, String> {
    instance.version().map_err(|f| format!("liveness: {f}"))?;
    if !instance.is_ready().map_err(|f| format!("ready flag: {f}"))? {
        return Err("ready flag not set".into());
    }
    let document = instance
        .active_document()
        .map_err(|f| format!("active document: {f}"))?
        .ok_or("no active document")?;
    if document.is_empty() {
        return Err("active document name unreadable".into());
    }
    Ok(document)
}

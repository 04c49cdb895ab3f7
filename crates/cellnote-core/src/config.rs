//! Runtime settings for the annotator.
//!
//! Every field has a default so a partial file (or none) is enough. Loading from
//! files and environment is done by the binary; this module only owns the shape
//! and validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::ports::WindowHandle;
use crate::retry::RetryPolicy;
use crate::session::{HeaderRule, ReadinessProber};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("retry: {0}")]
    Retry(String),

    #[error("readiness: {0}")]
    Readiness(String),

    #[error("worker: {0}")]
    Worker(String),

    #[error("annotation: {0}")]
    Annotation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub readiness: ReadinessSettings,

    #[serde(default)]
    pub worker: WorkerSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub annotation: AnnotationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Fraction of each delay added as random jitter (0.0 = none).
    #[serde(default)]
    pub jitter: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    300
}

fn default_max_delay_ms() -> u64 {
    5_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessSettings {
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Queue poll timeout for each idle tick.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Run a health probe right after INIT and log the result.
    #[serde(default = "default_true")]
    pub startup_probe: bool,
}

fn default_idle_poll_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            idle_poll_ms: default_idle_poll_ms(),
            startup_probe: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Pin a specific instance window instead of following foreground focus.
    #[serde(default)]
    pub target_window: Option<u64>,

    #[serde(default = "default_correction_passes")]
    pub correction_passes: u32,
}

fn default_correction_passes() -> u32 {
    3
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            target_window: None,
            correction_passes: default_correction_passes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSettings {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub header_rule: HeaderRule,
}

fn default_max_chars() -> usize {
    32_767
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            header_rule: HeaderRule::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retry.max_attempts == 0 {
            return Err(ValidationError::Retry("max_attempts must be at least 1".into()));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ValidationError::Retry(format!(
                "max_delay_ms ({}) is below base_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.base_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ValidationError::Retry("jitter must be within 0.0..=1.0".into()));
        }
        if self.readiness.poll_interval_ms == 0 {
            return Err(ValidationError::Readiness("poll_interval_ms must be positive".into()));
        }
        if self.worker.idle_poll_ms == 0 {
            return Err(ValidationError::Worker("idle_poll_ms must be positive".into()));
        }
        if self.annotation.max_chars == 0 {
            return Err(ValidationError::Annotation("max_chars must be positive".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
        .with_jitter(self.retry.jitter)
    }

    pub fn prober(&self) -> ReadinessProber {
        ReadinessProber::new(
            Duration::from_millis(self.readiness.timeout_ms),
            Duration::from_millis(self.readiness.poll_interval_ms),
        )
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.worker.idle_poll_ms)
    }

    pub fn target_window(&self) -> Option<WindowHandle> {
        self.session.target_window.map(WindowHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.retry.max_attempts, 3);
        assert_eq!(s.retry.base_delay_ms, 300);
        assert_eq!(s.readiness.timeout_ms, 2_000);
        assert_eq!(s.readiness.poll_interval_ms, 100);
        assert_eq!(s.worker.idle_poll_ms, 50);
        assert_eq!(s.annotation.header_rule, HeaderRule::NonEmpty);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{ "retry": { "max_attempts": 5 }, "annotation": { "header_rule": "label" } }"#)
                .unwrap();
        assert_eq!(s.retry.max_attempts, 5);
        assert_eq!(s.retry.base_delay_ms, 300);
        assert_eq!(s.annotation.header_rule, HeaderRule::Label);
        assert_eq!(s.session.correction_passes, 3);
    }

    #[test]
    fn validation_rejects_nonsense() {
        let mut s = Settings::default();
        s.retry.max_attempts = 0;
        assert!(matches!(s.validate(), Err(ValidationError::Retry(_))));

        let mut s = Settings::default();
        s.retry.max_delay_ms = 10;
        assert!(matches!(s.validate(), Err(ValidationError::Retry(_))));

        let mut s = Settings::default();
        s.readiness.poll_interval_ms = 0;
        assert!(matches!(s.validate(), Err(ValidationError::Readiness(_))));
    }

    #[test]
    fn retry_policy_reflects_settings() {
        let p = Settings::default().retry_policy();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.base_delay, Duration::from_millis(300));
        assert_eq!(p.max_delay, Duration::from_secs(5));
    }
}

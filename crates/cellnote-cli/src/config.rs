//! Layered configuration: serde defaults → optional TOML file → `CELLNOTE__*` env vars.

use std::path::Path;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use cellnote_core::config::{
    AnnotationSettings, ReadinessSettings, RetrySettings, SessionSettings, Settings,
    WorkerSettings,
};

use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
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
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CliConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            retry: self.retry.clone(),
            readiness: self.readiness.clone(),
            worker: self.worker.clone(),
            session: self.session.clone(),
            annotation: self.annotation.clone(),
        }
    }
}

type Builder = ConfigBuilder<config::builder::DefaultState>;

fn environment() -> Environment {
    // CELLNOTE__RETRY__MAX_ATTEMPTS=5
    Environment::with_prefix("CELLNOTE")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: Builder) -> Result<CliConfig, ConfigError> {
    builder.add_source(environment()).build()?.try_deserialize()
}

/// Load from an optional file plus the environment. A given file must exist.
pub fn load(path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    finish(builder)
}

/// Same layering with the file content given inline.
pub fn from_toml_str(toml: &str) -> Result<CliConfig, ConfigError> {
    finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellnote_core::session::HeaderRule;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = from_toml_str("").unwrap();
        assert_eq!(cfg.settings(), Settings::default());
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = from_toml_str(
            r#"
            [retry]
            max_attempts = 5

            [annotation]
            header_rule = "label"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        let settings = cfg.settings();
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.base_delay_ms, 300);
        assert_eq!(settings.annotation.header_rule, HeaderRule::Label);
        assert_eq!(cfg.logging.format, "json");
        assert_eq!(cfg.logging.output, "stderr");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/cellnote.toml"))).is_err());
    }
}

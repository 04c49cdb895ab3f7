//! Logging System
//!
//! Structured logging using `tracing`. Level, format and destination come from
//! config; `CELLNOTE_LOG` overrides the level filter. Logs default to stderr so
//! stdout carries only task reports.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// stdout or stderr
    #[serde(default = "default_output")]
    pub output: String,

    /// Colored text output.
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            color: default_true(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Stdout,
    Stderr,
}

fn parse_format(raw: &str) -> Result<Format> {
    match raw {
        "text" => Ok(Format::Text),
        "json" => Ok(Format::Json),
        other => bail!("invalid log format: {other} (must be 'json' or 'text')"),
    }
}

fn parse_output(raw: &str) -> Result<Output> {
    match raw {
        "stdout" => Ok(Output::Stdout),
        "stderr" => Ok(Output::Stderr),
        other => bail!("invalid log output: {other} (must be 'stdout' or 'stderr')"),
    }
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env("CELLNOTE_LOG") {
        return Ok(filter);
    }
    Ok(EnvFilter::try_new(&config.level)?)
}

/// Install the global subscriber. Call once, before the app starts.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config)?;
    let format = parse_format(&config.format)?;
    let output = parse_output(&config.output)?;
    let base = Registry::default().with(filter);

    match (format, output) {
        (Format::Json, Output::Stdout) => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stdout),
            )
            .try_init()?,
        (Format::Json, Output::Stderr) => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        (Format::Text, Output::Stdout) => base
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color)
                    .with_writer(std::io::stdout),
            )
            .try_init()?,
        (Format::Text, Output::Stderr) => base
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_format_and_output() {
        assert!(parse_format("yaml").is_err());
        assert!(parse_output("file").is_err());
        assert_eq!(parse_format("json").unwrap(), Format::Json);
        assert_eq!(parse_output("stdout").unwrap(), Output::Stdout);
    }

    #[test]
    fn defaults_log_to_stderr() {
        let config = LoggingConfig::default();
        assert_eq!(config.output, "stderr");
        assert_eq!(config.level, "info");
    }
}

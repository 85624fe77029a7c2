//! Logging configuration and initialization.
//!
//! Supports JSON and pretty-printed formats with configurable output paths.
//! An optional [`LogMetricsLayer`] counts every event that passes the filter.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::log_metrics::LogMetricsLayer;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging (default for production).
    #[default]
    Json,
    /// Human-readable pretty printing (for development).
    Pretty,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(LogError::InvalidFormat(other.to_string())),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format (JSON or Pretty).
    pub format: LogFormat,
    /// Log level filter (e.g., "info", "debug", "opmetrics=trace").
    pub level: String,
    /// Optional file path for log output. If None, logs to stderr.
    pub output_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            output_path: None,
        }
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),
    #[error("Failed to open log file: {0}")]
    FileOpen(String),
    #[error("Subscriber already initialized")]
    AlreadyInitialized,
}

/// Initialize the global tracing subscriber.
///
/// Call once at start-up. `metrics` is installed below the formatter so log
/// volume is counted for exactly the events that get written.
pub fn init_logging(config: &LogConfig, metrics: Option<LogMetricsLayer>) -> Result<(), LogError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| LogError::InvalidFilter(e.to_string()))?;

    match config.format {
        LogFormat::Json => init_json_subscriber(filter, metrics, &config.output_path),
        LogFormat::Pretty => init_pretty_subscriber(filter, metrics),
    }
}

fn init_json_subscriber(
    filter: EnvFilter,
    metrics: Option<LogMetricsLayer>,
    path: &Option<PathBuf>,
) -> Result<(), LogError> {
    let registry = tracing_subscriber::registry().with(filter).with(metrics);

    if let Some(path) = path {
        let file = std::fs::File::create(path)
            .map_err(|e| LogError::FileOpen(e.to_string()))?;
        registry
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .try_init()
            .map_err(|_| LogError::AlreadyInitialized)?;
    } else {
        registry
            .with(fmt::layer().json())
            .try_init()
            .map_err(|_| LogError::AlreadyInitialized)?;
    }

    Ok(())
}

fn init_pretty_subscriber(
    filter: EnvFilter,
    metrics: Option<LogMetricsLayer>,
) -> Result<(), LogError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(metrics)
        .with(fmt::layer().pretty())
        .try_init()
        .map_err(|_| LogError::AlreadyInitialized)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!("xml".parse::<LogFormat>(), Err(LogError::InvalidFormat(_))));
    }

    #[test]
    fn invalid_filter_is_rejected_before_install() {
        let config = LogConfig { level: "opmetrics=verbose".to_string(), ..LogConfig::default() };
        assert!(matches!(init_logging(&config, None), Err(LogError::InvalidFilter(_))));
    }

    #[test]
    fn unwritable_output_path_is_rejected_before_install() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            output_path: Some(dir.path().to_path_buf()),
            ..LogConfig::default()
        };
        assert!(matches!(init_logging(&config, None), Err(LogError::FileOpen(_))));
    }
}

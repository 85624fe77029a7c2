//! Configuration loading from environment variables.
//!
//! All values are loaded from `OPMETRICS_*` environment variables with
//! sensible defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `OPMETRICS_METRICS_ADDR` | 0.0.0.0:9090 | Scrape endpoint bind address |
//! | `OPMETRICS_SERVICE_ADDR` | 0.0.0.0:8080 | Demo service bind address |
//! | `OPMETRICS_SERVICE_NAME` | opmetrics | Service name for build info |
//! | `OPMETRICS_ENV` | development | Deployment environment |
//! | `OPMETRICS_GIT_REVISION` | unknown | Source revision |
//! | `OPMETRICS_GIT_BRANCH` | unknown | Source branch |
//! | `OPMETRICS_LOG_LEVEL` | info | `EnvFilter` directive |
//! | `OPMETRICS_LOG_FORMAT` | json | `json` or `pretty` |
//! | `OPMETRICS_SHUTDOWN_TIMEOUT` | 5 | Graceful shutdown timeout (secs) |
//! | `OPMETRICS_POOL_STATS_INTERVAL_MS` | 15000 | Pool sampler interval (ms) |

use std::time::Duration;

use serde::Serialize;

use crate::exposition::MetricsServerConfig;
use crate::telemetry::{LogConfig, LogFormat};

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub metrics_addr: String,
    pub service_addr: String,
    pub service_name: String,
    pub environment: String,
    pub git_revision: String,
    pub git_branch: String,
    pub log_level: String,
    pub log_format: String,
    pub shutdown_timeout_secs: u64,
    pub pool_stats_interval_ms: u64,
}

/// All configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub metrics_server: MetricsServerConfig,
    pub service_addr: String,
    pub service_name: String,
    pub environment: String,
    pub git_revision: String,
    pub git_branch: String,
    pub log: LogConfig,
    pub shutdown_timeout: Duration,
    pub pool_stats_interval: Duration,
}

/// Read a string env var, returning `default` when missing or blank.
fn parse_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Load logging configuration from environment.
fn load_log_config() -> LogConfig {
    let level = parse_string("OPMETRICS_LOG_LEVEL", "info");
    let format = parse_string("OPMETRICS_LOG_FORMAT", "json")
        .parse::<LogFormat>()
        .unwrap_or_default();
    LogConfig { format, level, output_path: None }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let shutdown_secs = parse_u64("OPMETRICS_SHUTDOWN_TIMEOUT", 5);
    let shutdown_secs = shutdown_secs.max(1);
    let interval_ms = parse_u64("OPMETRICS_POOL_STATS_INTERVAL_MS", 15_000);
    let interval_ms = interval_ms.max(100); // floor: 100ms

    EnvConfig {
        metrics_server: MetricsServerConfig::new(parse_string(
            "OPMETRICS_METRICS_ADDR",
            "0.0.0.0:9090",
        )),
        service_addr: parse_string("OPMETRICS_SERVICE_ADDR", "0.0.0.0:8080"),
        service_name: parse_string("OPMETRICS_SERVICE_NAME", "opmetrics"),
        environment: parse_string("OPMETRICS_ENV", "development"),
        git_revision: parse_string("OPMETRICS_GIT_REVISION", "unknown"),
        git_branch: parse_string("OPMETRICS_GIT_BRANCH", "unknown"),
        log: load_log_config(),
        shutdown_timeout: Duration::from_secs(shutdown_secs),
        pool_stats_interval: Duration::from_millis(interval_ms),
    }
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        let log_format = match self.log.format {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        };
        EffectiveConfig {
            metrics_addr: self.metrics_server.bind_address.clone(),
            service_addr: self.service_addr.clone(),
            service_name: self.service_name.clone(),
            environment: self.environment.clone(),
            git_revision: self.git_revision.clone(),
            git_branch: self.git_branch.clone(),
            log_level: self.log.level.clone(),
            log_format: log_format.to_string(),
            shutdown_timeout_secs: self.shutdown_timeout.as_secs(),
            pool_stats_interval_ms: self.pool_stats_interval.as_millis() as u64,
        }
    }
}

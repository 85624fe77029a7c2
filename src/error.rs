//! Construction-time errors for the metrics subsystem.
//!
//! Runtime telemetry calls (begin, end, observe, inc) never fail and never
//! return one of these.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while wiring metrics up at start-up.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Metric already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Invalid metric descriptor {name}: {reason}")]
    InvalidDescriptor { name: String, reason: String },

    #[error("Metric registration failed: {0}")]
    Registration(#[source] prometheus::Error),

    #[error("Resource handle is missing")]
    MissingResource,

    #[error("Sampling interval must be positive and schedulable, got {0:?}")]
    InvalidInterval(Duration),

    #[error("No async runtime available: {0}")]
    Runtime(String),

    #[error("Metric encoding error: {0}")]
    Encoding(String),

    #[error("Failed to bind to address {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Metrics server error: {0}")]
    Server(String),
}

impl From<prometheus::Error> for MetricsError {
    fn from(err: prometheus::Error) -> Self {
        match err {
            prometheus::Error::AlreadyReg => {
                MetricsError::AlreadyRegistered("<unnamed collector>".to_string())
            }
            other => MetricsError::Registration(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;

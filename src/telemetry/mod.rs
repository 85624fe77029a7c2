//! Telemetry plumbing: structured logging and log volume counters.

mod log_metrics;
mod logging;

pub use log_metrics::{
    level_label, HttpContext, LogMetrics, LogMetricsLayer, LogRecord, RpcContext,
    FIELD_GRPC_METHOD, FIELD_GRPC_SERVICE, FIELD_HTTP_HANDLER, FIELD_HTTP_METHOD,
};
pub use logging::{init_logging, LogConfig, LogError, LogFormat};

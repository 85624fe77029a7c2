//! Histogram bucket ladders.
//!
//! Ladders are fixed at registration and never change afterwards.

const KB: f64 = 1e3;
const MB: f64 = 1e6;

/// Request latency ladder for HTTP and RPC handlers, in seconds.
pub const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.5, 5.0];

/// Database query latency ladder, in seconds.
pub const DB_LATENCY_BUCKETS: &[f64] = &[0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Payload size ladder, in bytes.
pub const SIZE_BUCKETS: &[f64] = &[
    100.0,
    200.0,
    500.0,
    KB,
    2.0 * KB,
    5.0 * KB,
    10.0 * KB,
    20.0 * KB,
    50.0 * KB,
    100.0 * KB,
    500.0 * KB,
    MB,
    2.0 * MB,
    5.0 * MB,
    10.0 * MB,
];

/// Which ladder a histogram descriptor uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buckets {
    /// [`LATENCY_BUCKETS`].
    Latency,
    /// [`DB_LATENCY_BUCKETS`].
    DbLatency,
    /// [`SIZE_BUCKETS`].
    Size,
    /// The prometheus client defaults (5ms .. 10s).
    Default,
}

impl Buckets {
    pub fn values(self) -> Vec<f64> {
        match self {
            Buckets::Latency => LATENCY_BUCKETS.to_vec(),
            Buckets::DbLatency => DB_LATENCY_BUCKETS.to_vec(),
            Buckets::Size => SIZE_BUCKETS.to_vec(),
            Buckets::Default => prometheus::DEFAULT_BUCKETS.to_vec(),
        }
    }
}

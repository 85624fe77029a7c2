//! opmetrics
//!
//! Uniform operational telemetry for heterogeneous call sites: request
//! volume, concurrency, latency distribution and outcome classification for
//! HTTP handlers, RPC calls, database queries, caches, object storage,
//! wide-column stores, search engines, queue workers and log volume.
//!
//! # Design
//!
//! - **One registry**: every family is registered on an explicit
//!   [`MetricsRegistry`] at start-up. There are no hidden global collectors.
//! - **One pattern**: timed adapters share [`Operation`]'s begin/end contract
//!   (in-flight gauge, outcome counter, duration histogram).
//! - **Never fail at runtime**: begin, end, observe and inc return nothing.
//!   Only construction (registration, sampler arguments, binding) can fail.
//!
//! ```no_run
//! # async fn demo() -> opmetrics::Result<()> {
//! let telemetry = opmetrics::Telemetry::new()?;
//! let mut query = telemetry.db.query("users", "find_by_id");
//! query.begin();
//! query.end(None);
//! println!("{}", telemetry.registry.encode()?);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod exposition;
pub mod labels;
pub mod operation;
pub mod registry;
pub mod sampler;
pub mod telemetry;

pub use error::{MetricsError, Result};
pub use labels::LabelSet;
pub use operation::{
    Canceled, DurationLabels, Operation, OperationDescriptors, OperationMetricer,
    OperationSession, PendingOperation, ResultCode,
};
pub use registry::{Buckets, MetricDescriptor, MetricKind, MetricsRegistry, MetricsSnapshot};
pub use sampler::{PoolStats, PoolStatsMetrics, PoolStatsSource, SamplerHandle};

use adapters::{
    ApiCallMetrics, ApiRequestMetrics, CacheMetrics, DbMetrics, DynamoMetrics, HttpMetrics,
    RpcMetrics, S3Metrics, SearchMetrics, ServiceMetrics, WorkerMetrics,
};
use telemetry::LogMetrics;

/// Every metric family, registered once on one registry.
#[derive(Clone)]
pub struct Telemetry {
    pub registry: MetricsRegistry,
    pub api_calls: ApiCallMetrics,
    pub api_requests: ApiRequestMetrics,
    pub http: HttpMetrics,
    pub rpc: RpcMetrics,
    pub db: DbMetrics,
    pub pool_stats: PoolStatsMetrics,
    pub cache: CacheMetrics,
    pub s3: S3Metrics,
    pub dynamo: DynamoMetrics,
    pub search: SearchMetrics,
    pub worker: WorkerMetrics,
    pub service: ServiceMetrics,
    pub logs: LogMetrics,
}

impl Telemetry {
    /// Register every family on a fresh registry.
    pub fn new() -> Result<Self> {
        Self::register(MetricsRegistry::new())
    }

    /// Register every family on `registry`. Fails if any name is taken.
    pub fn register(registry: MetricsRegistry) -> Result<Self> {
        Ok(Self {
            api_calls: ApiCallMetrics::register(&registry)?,
            api_requests: ApiRequestMetrics::register(&registry)?,
            http: HttpMetrics::register(&registry)?,
            rpc: RpcMetrics::register(&registry)?,
            db: DbMetrics::register(&registry)?,
            pool_stats: PoolStatsMetrics::register(&registry)?,
            cache: CacheMetrics::register(&registry)?,
            s3: S3Metrics::register(&registry)?,
            dynamo: DynamoMetrics::register(&registry)?,
            search: SearchMetrics::register(&registry)?,
            worker: WorkerMetrics::register(&registry)?,
            service: ServiceMetrics::register(&registry)?,
            logs: LogMetrics::register(&registry)?,
            registry,
        })
    }
}

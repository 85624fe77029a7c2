//! Periodic connection-pool sampler.
//!
//! One tokio task per watched resource reads its [`PoolStats`] on a fixed
//! interval and republishes them as `database_stats_*` gauges. Cancellation
//! is checked between ticks only, so a sample in progress always finishes.

use std::sync::Arc;
use std::time::Duration;

use prometheus::GaugeVec;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;
use crate::registry::{series, MetricDescriptor, MetricsRegistry};

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub max_open: u64,
    pub open: u64,
    pub in_use: u64,
    pub idle: u64,
    /// Cumulative.
    pub wait_count: u64,
    /// Cumulative.
    pub wait_duration: Duration,
    pub max_idle_closed: u64,
    pub max_lifetime_closed: u64,
}

/// A live resource that can report its pool statistics.
pub trait PoolStatsSource: Send + Sync {
    fn stats(&self) -> PoolStats;
}

const MAX_OPEN: MetricDescriptor = MetricDescriptor::gauge(
    "database_stats_max_open_connections",
    "Maximum number of open connections to the database.",
    &["database"],
);
const OPEN: MetricDescriptor = MetricDescriptor::gauge(
    "database_stats_open_connections",
    "The number of established connections both in use and idle.",
    &["database"],
);
const IN_USE: MetricDescriptor = MetricDescriptor::gauge(
    "database_stats_in_use",
    "The number of connections currently in use.",
    &["database"],
);
const IDLE: MetricDescriptor =
    MetricDescriptor::gauge("database_stats_idle", "The number of idle connections.", &["database"]);
const WAIT_COUNT: MetricDescriptor = MetricDescriptor::gauge(
    "database_stats_wait_count",
    "The total number of connections waited for.",
    &["database"],
);
const WAIT_DURATION: MetricDescriptor = MetricDescriptor::gauge(
    "database_stats_wait_duration_in_seconds",
    "The total time in seconds blocked waiting for a new connection.",
    &["database"],
);
const MAX_IDLE_CLOSED: MetricDescriptor = MetricDescriptor::gauge(
    "database_stats_max_idle_closed",
    "The total number of connections closed due to the idle limit.",
    &["database"],
);
const MAX_LIFETIME_CLOSED: MetricDescriptor = MetricDescriptor::gauge(
    "database_stats_max_lifetime_closed",
    "The total number of connections closed due to the lifetime limit.",
    &["database"],
);

/// Registered pool gauges.
#[derive(Clone)]
pub struct PoolStatsMetrics {
    max_open: GaugeVec,
    open: GaugeVec,
    in_use: GaugeVec,
    idle: GaugeVec,
    wait_count: GaugeVec,
    wait_duration: GaugeVec,
    max_idle_closed: GaugeVec,
    max_lifetime_closed: GaugeVec,
}

impl PoolStatsMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            max_open: registry.float_gauge_vec(&MAX_OPEN)?,
            open: registry.float_gauge_vec(&OPEN)?,
            in_use: registry.float_gauge_vec(&IN_USE)?,
            idle: registry.float_gauge_vec(&IDLE)?,
            wait_count: registry.float_gauge_vec(&WAIT_COUNT)?,
            wait_duration: registry.float_gauge_vec(&WAIT_DURATION)?,
            max_idle_closed: registry.float_gauge_vec(&MAX_IDLE_CLOSED)?,
            max_lifetime_closed: registry.float_gauge_vec(&MAX_LIFETIME_CLOSED)?,
        })
    }

    /// Read `source` once and publish every gauge under `name`.
    pub fn sample_once(&self, source: &dyn PoolStatsSource, name: &str) {
        self.publish(&source.stats(), &LabelSet::new([name]));
    }

    fn publish(&self, stats: &PoolStats, labels: &LabelSet) {
        let values = labels.values();
        series::set_gauge(&self.max_open, &values, stats.max_open as f64);
        series::set_gauge(&self.open, &values, stats.open as f64);
        series::set_gauge(&self.in_use, &values, stats.in_use as f64);
        series::set_gauge(&self.idle, &values, stats.idle as f64);
        series::set_gauge(&self.wait_count, &values, stats.wait_count as f64);
        series::set_gauge(&self.wait_duration, &values, stats.wait_duration.as_secs_f64());
        series::set_gauge(&self.max_idle_closed, &values, stats.max_idle_closed as f64);
        series::set_gauge(&self.max_lifetime_closed, &values, stats.max_lifetime_closed as f64);
    }

    /// Start sampling `source` every `interval` on the current tokio runtime.
    ///
    /// The first sample is taken one interval after the call. An interval
    /// too large to schedule is rejected like a zero one.
    pub fn watch(
        &self,
        source: Option<Arc<dyn PoolStatsSource>>,
        name: &str,
        interval: Duration,
    ) -> Result<SamplerHandle> {
        let source = source.ok_or(MetricsError::MissingResource)?;
        if interval.is_zero() {
            return Err(MetricsError::InvalidInterval(interval));
        }
        let first_tick = Instant::now()
            .checked_add(interval)
            .ok_or(MetricsError::InvalidInterval(interval))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MetricsError::Runtime(e.to_string()))?;

        let token = CancellationToken::new();
        let metrics = self.clone();
        let labels = LabelSet::new([name]);
        let shutdown = token.clone();
        tracing::debug!(database = name, interval = ?interval, "pool sampler started");

        let task = runtime.spawn(async move {
            sample_loop(metrics, source, labels, first_tick, interval, shutdown).await;
        });
        Ok(SamplerHandle { token, task })
    }
}

async fn sample_loop(
    metrics: PoolStatsMetrics,
    source: Arc<dyn PoolStatsSource>,
    labels: LabelSet,
    first_tick: Instant,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::debug!(database = labels.get(0).unwrap_or_default(), "pool sampler stopped");
                break;
            }
            _ = ticker.tick() => {
                metrics.publish(&source.stats(), &labels);
            }
        }
    }
}

/// Cancellation handle for a running sampler.
pub struct SamplerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    /// Request a stop. Takes effect at the next tick boundary.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token that stops the sampler when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the task to exit.
    pub async fn stopped(self) {
        self.token.cancel();
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "pool sampler task ended abnormally");
        }
    }
}

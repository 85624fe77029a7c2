//! Process-wide metric registry.
//!
//! One [`MetricsRegistry`] is built during initialization and handed to every
//! metric family by reference. Each series descriptor may be registered once;
//! a second registration under the same name is rejected.

mod buckets;
pub(crate) mod series;
mod snapshot;

pub use buckets::{Buckets, DB_LATENCY_BUCKETS, LATENCY_BUCKETS, SIZE_BUCKETS};
pub use snapshot::{HistogramSummary, MetricsSnapshot};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use crate::error::{MetricsError, Result};

/// Kind of series a descriptor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// Immutable description of one metric family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub kind: MetricKind,
    pub buckets: Option<Buckets>,
}

impl MetricDescriptor {
    pub const fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self { name, help, labels, kind: MetricKind::Counter, buckets: None }
    }

    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self { name, help, labels, kind: MetricKind::Gauge, buckets: None }
    }

    pub const fn histogram(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
        buckets: Buckets,
    ) -> Self {
        Self { name, help, labels, kind: MetricKind::Histogram, buckets: Some(buckets) }
    }

    fn expect_kind(&self, kind: MetricKind) -> Result<()> {
        if self.name.is_empty() {
            return Err(self.invalid("empty metric name"));
        }
        if self.kind != kind {
            return Err(self.invalid(format!("expected {:?}, descriptor is {:?}", kind, self.kind)));
        }
        if self.kind != MetricKind::Histogram && self.buckets.is_some() {
            return Err(self.invalid("buckets are only valid for histograms"));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> MetricsError {
        MetricsError::InvalidDescriptor {
            name: self.name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Cloneable handle to the registry shared by every metric family.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    registry: Registry,
    names: Mutex<HashSet<&'static str>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a labeled counter family.
    pub fn counter_vec(&self, desc: &MetricDescriptor) -> Result<IntCounterVec> {
        desc.expect_kind(MetricKind::Counter)?;
        let counter = IntCounterVec::new(Opts::new(desc.name, desc.help), desc.labels)?;
        self.register(desc, counter)
    }

    /// Register a labeled integer gauge family (in-flight tracking).
    pub fn gauge_vec(&self, desc: &MetricDescriptor) -> Result<IntGaugeVec> {
        desc.expect_kind(MetricKind::Gauge)?;
        let gauge = IntGaugeVec::new(Opts::new(desc.name, desc.help), desc.labels)?;
        self.register(desc, gauge)
    }

    /// Register a labeled float gauge family (sampled values).
    pub fn float_gauge_vec(&self, desc: &MetricDescriptor) -> Result<GaugeVec> {
        desc.expect_kind(MetricKind::Gauge)?;
        let gauge = GaugeVec::new(Opts::new(desc.name, desc.help), desc.labels)?;
        self.register(desc, gauge)
    }

    /// Register a labeled histogram family using the descriptor's ladder.
    pub fn histogram_vec(&self, desc: &MetricDescriptor) -> Result<HistogramVec> {
        desc.expect_kind(MetricKind::Histogram)?;
        let buckets = desc.buckets.unwrap_or(Buckets::Default).values();
        let opts = HistogramOpts::new(desc.name, desc.help).buckets(buckets);
        let histogram = HistogramVec::new(opts, desc.labels)?;
        self.register(desc, histogram)
    }

    /// Register an unlabeled gauge carrying constant identity labels.
    pub fn const_gauge(
        &self,
        desc: &MetricDescriptor,
        const_labels: HashMap<String, String>,
    ) -> Result<IntGauge> {
        desc.expect_kind(MetricKind::Gauge)?;
        if !desc.labels.is_empty() {
            return Err(desc.invalid("constant gauges take no variable labels"));
        }
        let opts = Opts::new(desc.name, desc.help).const_labels(const_labels);
        let gauge = IntGauge::with_opts(opts)?;
        self.register(desc, gauge)
    }

    fn register<C>(&self, desc: &MetricDescriptor, collector: C) -> Result<C>
    where
        C: Collector + Clone + 'static,
    {
        let mut names = self.inner.names.lock();
        if names.contains(desc.name) {
            return Err(MetricsError::AlreadyRegistered(desc.name.to_string()));
        }
        self.inner
            .registry
            .register(Box::new(collector.clone()))
            .map_err(|err| match err {
                prometheus::Error::AlreadyReg => MetricsError::AlreadyRegistered(desc.name.to_string()),
                other => MetricsError::Registration(other),
            })?;
        names.insert(desc.name);
        tracing::debug!(metric = desc.name, kind = ?desc.kind, "registered metric");
        Ok(collector)
    }

    /// Whether a family with this name has been registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.names.lock().contains(name)
    }

    /// Collect every registered family.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.inner.registry.gather()
    }

    /// Encode every registered family in the text exposition format.
    pub fn encode(&self) -> Result<String> {
        let families = self.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    /// Point-in-time view of every series.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_families(&self.gather())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUESTS: MetricDescriptor =
        MetricDescriptor::counter("test_requests_total", "Test requests.", &["route", "code"]);

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = MetricsRegistry::new();
        registry.counter_vec(&REQUESTS).unwrap();

        let err = registry.counter_vec(&REQUESTS).unwrap_err();
        assert!(matches!(err, MetricsError::AlreadyRegistered(name) if name == "test_requests_total"));
    }

    #[test]
    fn same_name_with_other_kind_is_rejected() {
        let registry = MetricsRegistry::new();
        registry.counter_vec(&REQUESTS).unwrap();

        let gauge = MetricDescriptor::gauge("test_requests_total", "Clash.", &["route"]);
        assert!(matches!(
            registry.gauge_vec(&gauge),
            Err(MetricsError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn kind_mismatch_is_invalid() {
        let registry = MetricsRegistry::new();
        let err = registry.gauge_vec(&REQUESTS).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidDescriptor { .. }));
        assert!(!registry.is_registered("test_requests_total"));
    }

    #[test]
    fn separate_registries_do_not_collide() {
        let a = MetricsRegistry::new();
        let b = MetricsRegistry::new();
        assert!(a.counter_vec(&REQUESTS).is_ok());
        assert!(b.counter_vec(&REQUESTS).is_ok());
    }

    #[test]
    fn encode_lists_registered_series() {
        let registry = MetricsRegistry::new();
        let counter = registry.counter_vec(&REQUESTS).unwrap();
        counter.with_label_values(&["/a", "200"]).inc();

        let text = registry.encode().unwrap();
        assert!(text.contains("# HELP test_requests_total Test requests."));
        assert!(text.contains("test_requests_total{code=\"200\",route=\"/a\"} 1"));
    }

    #[test]
    fn const_gauge_rejects_variable_labels() {
        let registry = MetricsRegistry::new();
        let desc = MetricDescriptor::gauge("test_info", "Info.", &["x"]);
        assert!(registry.const_gauge(&desc, HashMap::new()).is_err());
    }

    #[test]
    fn clones_share_state() {
        let registry = MetricsRegistry::new();
        let clone = registry.clone();
        registry.counter_vec(&REQUESTS).unwrap();
        assert!(clone.is_registered("test_requests_total"));
    }
}

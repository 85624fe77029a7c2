//! Cache access counters.
//!
//! A get that returned an error is a miss, otherwise a hit. A set is recorded
//! as `success` or `failure`. No timing is taken.

use std::error::Error;

use prometheus::IntCounterVec;

use crate::error::Result;
use crate::labels::LabelSet;
use crate::registry::{series, MetricDescriptor, MetricsRegistry};

const HITS: MetricDescriptor = MetricDescriptor::counter(
    "cache_hits_total",
    "The total number of the cache hits.",
    &["cache_name"],
);

const MISSES: MetricDescriptor = MetricDescriptor::counter(
    "cache_misses_total",
    "The total number of the cache misses.",
    &["cache_name"],
);

const SETS: MetricDescriptor = MetricDescriptor::counter(
    "cache_sets_total",
    "The total number of insertions to the cache.",
    &["cache_name", "result"],
);

pub const SET_SUCCESS: &str = "success";
pub const SET_FAILURE: &str = "failure";

pub trait CacheMetricer: Send + Sync {
    fn inc_get(&self, err: Option<&(dyn Error + 'static)>);
    fn inc_set(&self, err: Option<&(dyn Error + 'static)>);
}

/// Registered cache series.
#[derive(Clone)]
pub struct CacheMetrics {
    hits: IntCounterVec,
    misses: IntCounterVec,
    sets: IntCounterVec,
}

impl CacheMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            hits: registry.counter_vec(&HITS)?,
            misses: registry.counter_vec(&MISSES)?,
            sets: registry.counter_vec(&SETS)?,
        })
    }

    pub fn cache(&self, name: &str) -> CacheRecorder {
        CacheRecorder {
            metrics: self.clone(),
            labels: LabelSet::new([name]),
        }
    }
}

/// Counters bound to one named cache.
#[derive(Clone)]
pub struct CacheRecorder {
    metrics: CacheMetrics,
    labels: LabelSet,
}

impl CacheMetricer for CacheRecorder {
    fn inc_get(&self, err: Option<&(dyn Error + 'static)>) {
        let counter = if err.is_some() {
            &self.metrics.misses
        } else {
            &self.metrics.hits
        };
        series::inc_counter(counter, &self.labels.values());
    }

    fn inc_set(&self, err: Option<&(dyn Error + 'static)>) {
        let result = if err.is_some() { SET_FAILURE } else { SET_SUCCESS };
        series::inc_counter(&self.metrics.sets, &self.labels.with_code(result).values());
    }
}

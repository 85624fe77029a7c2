//! Service lifecycle event counter.

use prometheus::IntCounterVec;

use crate::error::Result;
use crate::labels::LabelSet;
use crate::registry::{series, MetricDescriptor, MetricsRegistry};

const ACTIVITIES: MetricDescriptor = MetricDescriptor::counter(
    "service_activities_total",
    "Starting and stopped service activities.",
    &["daemon", "activity"],
);

/// Lifecycle events a daemon reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Starting,
    Stopped,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Starting => "starting",
            Activity::Stopped => "stopped",
        }
    }
}

pub trait ServiceMetricer: Send + Sync {
    fn service_starting(&self);
    fn service_stopped(&self);
}

#[derive(Clone)]
pub struct ServiceMetrics {
    activities: IntCounterVec,
}

impl ServiceMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            activities: registry.counter_vec(&ACTIVITIES)?,
        })
    }

    pub fn daemon(&self, daemon: &str) -> DaemonMetrics {
        DaemonMetrics {
            activities: self.activities.clone(),
            labels: LabelSet::new([daemon]),
        }
    }
}

#[derive(Clone)]
pub struct DaemonMetrics {
    activities: IntCounterVec,
    labels: LabelSet,
}

impl DaemonMetrics {
    pub fn record(&self, activity: Activity) {
        series::inc_counter(&self.activities, &self.labels.with_code(activity.as_str()).values());
    }
}

impl ServiceMetricer for DaemonMetrics {
    fn service_starting(&self) {
        self.record(Activity::Starting);
    }

    fn service_stopped(&self) {
        self.record(Activity::Stopped);
    }
}

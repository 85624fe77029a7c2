//! Wide-column store put/get instrumentation.

use crate::error::Result;
use crate::labels::LabelSet;
use crate::operation::{DurationLabels, Operation, OperationDescriptors, PendingOperation};
use crate::registry::{Buckets, MetricDescriptor, MetricsRegistry};

const PUT: OperationDescriptors = OperationDescriptors {
    in_flight: None,
    total: MetricDescriptor::counter(
        "dynamo_put_total",
        "Total number of objects put to DynamoDB.",
        &["table", "code"],
    ),
    duration: MetricDescriptor::histogram(
        "dynamo_put_duration_seconds",
        "Duration of time it takes to put a new object to DynamoDB.",
        &["table", "code"],
        Buckets::Default,
    ),
    duration_labels: DurationLabels::WithCode,
};

const GET: OperationDescriptors = OperationDescriptors {
    in_flight: None,
    total: MetricDescriptor::counter(
        "dynamo_get_total",
        "Total number of objects got from DynamoDB.",
        &["table", "code"],
    ),
    duration: MetricDescriptor::histogram(
        "dynamo_get_duration_seconds",
        "Duration of time it takes to get an object from DynamoDB.",
        &["table", "code"],
        Buckets::Default,
    ),
    duration_labels: DurationLabels::WithCode,
};

/// Registered wide-column store series. Codes are caller-supplied.
#[derive(Clone)]
pub struct DynamoMetrics {
    put: Operation,
    get: Operation,
}

impl DynamoMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            put: Operation::register(registry, &PUT)?,
            get: Operation::register(registry, &GET)?,
        })
    }

    pub fn table(&self, table: &str) -> TableMetrics {
        TableMetrics {
            metrics: self.clone(),
            labels: LabelSet::new([table]),
        }
    }
}

#[derive(Clone)]
pub struct TableMetrics {
    metrics: DynamoMetrics,
    labels: LabelSet,
}

impl TableMetrics {
    pub fn begin_put(&self) -> PendingOperation {
        self.metrics.put.start(self.labels.clone())
    }

    pub fn begin_get(&self) -> PendingOperation {
        self.metrics.get.start(self.labels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ending_twice_counts_once() {
        let registry = MetricsRegistry::new();
        let table = DynamoMetrics::register(&registry).unwrap().table("Profiles");

        let mut get = table.begin_get();
        get.end("failed");
        get.end("ok");

        let snap = registry.snapshot();
        assert_eq!(
            snap.counter("dynamo_get_total", &[("table", "profiles"), ("code", "failed")]),
            Some(1.0)
        );
        assert_eq!(snap.counter("dynamo_get_total", &[("table", "profiles"), ("code", "ok")]), None);
    }
}

//! Object storage put/get instrumentation.
//!
//! No in-flight gauge. Codes are supplied by the caller and label both the
//! counter and the duration histogram.

use crate::error::Result;
use crate::labels::LabelSet;
use crate::operation::{DurationLabels, Operation, OperationDescriptors, PendingOperation};
use crate::registry::{Buckets, MetricDescriptor, MetricsRegistry};

const PUT: OperationDescriptors = OperationDescriptors {
    in_flight: None,
    total: MetricDescriptor::counter(
        "s3_objects_put_total",
        "Total number of objects put to S3.",
        &["bucket", "code"],
    ),
    duration: MetricDescriptor::histogram(
        "s3_objects_put_duration_seconds",
        "Duration of time it takes to put a new object to S3.",
        &["bucket", "code"],
        Buckets::Default,
    ),
    duration_labels: DurationLabels::WithCode,
};

const GET: OperationDescriptors = OperationDescriptors {
    in_flight: None,
    total: MetricDescriptor::counter(
        "s3_objects_get_total",
        "Total number of objects got from S3.",
        &["bucket", "code"],
    ),
    duration: MetricDescriptor::histogram(
        "s3_objects_got_duration_seconds",
        "Duration of time it takes to get an object from S3.",
        &["bucket", "code"],
        Buckets::Default,
    ),
    duration_labels: DurationLabels::WithCode,
};

/// Registered object storage series.
#[derive(Clone)]
pub struct S3Metrics {
    put: Operation,
    get: Operation,
}

impl S3Metrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            put: Operation::register(registry, &PUT)?,
            get: Operation::register(registry, &GET)?,
        })
    }

    pub fn bucket(&self, bucket: &str) -> BucketMetrics {
        BucketMetrics {
            metrics: self.clone(),
            labels: LabelSet::new([bucket]),
        }
    }
}

/// Series bound to one bucket.
#[derive(Clone)]
pub struct BucketMetrics {
    metrics: S3Metrics,
    labels: LabelSet,
}

impl BucketMetrics {
    pub fn begin_put(&self) -> PendingOperation {
        self.metrics.put.start(self.labels.clone())
    }

    pub fn begin_get(&self) -> PendingOperation {
        self.metrics.get.start(self.labels.clone())
    }
}

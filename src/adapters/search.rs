//! Search engine instrumentation.
//!
//! Every action carries `{provider, index}` (point-in-time requests use
//! `{provider, operation}`) and a caller-supplied code that labels both the
//! counter and the duration histogram.

use crate::error::Result;
use crate::labels::{join_sorted, LabelSet};
use crate::operation::{DurationLabels, Operation, OperationDescriptors, PendingOperation};
use crate::registry::{Buckets, MetricDescriptor, MetricsRegistry};

pub const CODE_OK: &str = "ok";
pub const CODE_FAILED: &str = "failed";
pub const CODE_CANCELED: &str = "canceled";
pub const CODE_TIMEOUT: &str = "timeout";

macro_rules! search_operation {
    ($prefix:literal, $target:literal, $what:literal) => {
        OperationDescriptors {
            in_flight: Some(MetricDescriptor::gauge(
                concat!($prefix, "_in_flight"),
                concat!("The current number of ", $what, " to the search engine."),
                &["provider", $target],
            )),
            total: MetricDescriptor::counter(
                concat!($prefix, "_total"),
                concat!("Total number of ", $what, " to the search engine."),
                &["provider", $target, "code"],
            ),
            duration: MetricDescriptor::histogram(
                concat!($prefix, "_duration_seconds"),
                concat!("Duration of ", $what, " to the search engine."),
                &["provider", $target, "code"],
                Buckets::Default,
            ),
            duration_labels: DurationLabels::WithCode,
        }
    };
}

const CREATE_INDEX: OperationDescriptors =
    search_operation!("search_create_index", "index", "index creations");
const INDEX_DOCUMENT: OperationDescriptors =
    search_operation!("search_index_document", "index", "document indexing requests");
const GET_DOCUMENT: OperationDescriptors =
    search_operation!("search_get_document", "index", "get document by ID requests");
const QUERY_DOCUMENTS: OperationDescriptors =
    search_operation!("search_query_documents", "index", "document queries");

const POINT_IN_TIME: OperationDescriptors = OperationDescriptors {
    in_flight: Some(MetricDescriptor::gauge(
        "search_point_in_time_requests_in_flight",
        "The current number of requests to the point in time API.",
        &["provider", "operation"],
    )),
    total: MetricDescriptor::counter(
        "search_point_in_time_requests_total",
        "Total number of requests to the point in time API.",
        &["provider", "operation", "code"],
    ),
    duration: MetricDescriptor::histogram(
        "search_point_in_time_request_duration_seconds",
        "Duration of requests made to the point in time API.",
        &["provider", "operation", "code"],
        Buckets::Default,
    ),
    duration_labels: DurationLabels::WithCode,
};

/// Registered search engine series.
#[derive(Clone)]
pub struct SearchMetrics {
    create_index: Operation,
    index_document: Operation,
    get_document: Operation,
    query_documents: Operation,
    point_in_time: Operation,
}

impl SearchMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            create_index: Operation::register(registry, &CREATE_INDEX)?,
            index_document: Operation::register(registry, &INDEX_DOCUMENT)?,
            get_document: Operation::register(registry, &GET_DOCUMENT)?,
            query_documents: Operation::register(registry, &QUERY_DOCUMENTS)?,
            point_in_time: Operation::register(registry, &POINT_IN_TIME)?,
        })
    }

    pub fn provider(&self, provider: &str) -> SearchProviderMetrics {
        SearchProviderMetrics {
            metrics: self.clone(),
            provider: provider.to_owned(),
        }
    }
}

/// Series bound to one search provider.
#[derive(Clone)]
pub struct SearchProviderMetrics {
    metrics: SearchMetrics,
    provider: String,
}

impl SearchProviderMetrics {
    pub fn begin_create_index(&self, index: &str) -> PendingOperation {
        self.metrics.create_index.start(self.labels(index))
    }

    pub fn begin_index_document(&self, index: &str) -> PendingOperation {
        self.metrics.index_document.start(self.labels(index))
    }

    pub fn begin_get_document(&self, index: &str) -> PendingOperation {
        self.metrics.get_document.start(self.labels(index))
    }

    /// Queries over several indexes share one series regardless of the
    /// order or casing of `indexes`.
    pub fn begin_search_documents<S: AsRef<str>>(&self, indexes: &[S]) -> PendingOperation {
        self.metrics.query_documents.start(self.labels(&join_sorted(indexes)))
    }

    pub fn begin_point_in_time(&self, operation: &str) -> PendingOperation {
        self.metrics.point_in_time.start(self.labels(operation))
    }

    fn labels(&self, target: &str) -> LabelSet {
        LabelSet::new([self.provider.as_str(), target])
    }
}

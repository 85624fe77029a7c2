//! Third-party API call instrumentation and the per-ID request series used by
//! the demo service.

use std::error::Error;

use prometheus::{HistogramVec, IntGaugeVec};

use crate::error::Result;
use crate::labels::LabelSet;
use crate::operation::{
    DurationLabels, Operation, OperationDescriptors, OperationSession, PendingOperation,
};
use crate::registry::{series, Buckets, MetricDescriptor, MetricsRegistry};

const CALLS: OperationDescriptors = OperationDescriptors {
    in_flight: Some(MetricDescriptor::gauge(
        "third_party_api_requests_in_flight",
        "The current number of third-party API requests being served.",
        &["api_name", "api_method"],
    )),
    total: MetricDescriptor::counter(
        "third_party_api_requests_total",
        "Total number of third-party API requests made and responded.",
        &["api_name", "api_method", "result"],
    ),
    duration: MetricDescriptor::histogram(
        "third_party_api_request_duration_seconds",
        "The request latencies of calling third-party API in seconds.",
        &["api_name", "api_method"],
        Buckets::Default,
    ),
    duration_labels: DurationLabels::Base,
};

const REQUESTS_IN_FLIGHT: MetricDescriptor = MetricDescriptor::gauge(
    "api_requests_in_flight",
    "The current number of API requests being served.",
    &["ID"],
);

const REQUEST_DURATION: MetricDescriptor = MetricDescriptor::histogram(
    "api_request_duration_seconds",
    "The API request latencies in seconds.",
    &["ID"],
    Buckets::Default,
);

/// Registered third-party API series. The result label is derived from the
/// call's error.
#[derive(Clone)]
pub struct ApiCallMetrics {
    calls: Operation,
}

impl ApiCallMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            calls: Operation::register(registry, &CALLS)?,
        })
    }

    pub fn begin(&self, api_name: &str, api_method: &str) -> ApiCall {
        ApiCall {
            pending: self.calls.start(LabelSet::new([api_name, api_method])),
        }
    }
}

/// One outstanding third-party call.
pub struct ApiCall {
    pending: PendingOperation,
}

impl ApiCall {
    pub fn end(&mut self, err: Option<&(dyn Error + 'static)>) {
        self.pending.end_with_error(err);
    }
}

/// Per-ID in-flight and latency series. No outcome counter.
#[derive(Clone)]
pub struct ApiRequestMetrics {
    in_flight: IntGaugeVec,
    duration: HistogramVec,
}

impl ApiRequestMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            in_flight: registry.gauge_vec(&REQUESTS_IN_FLIGHT)?,
            duration: registry.histogram_vec(&REQUEST_DURATION)?,
        })
    }

    pub fn begin(&self, id: &str) -> OperationSession {
        let labels = LabelSet::new([id]);
        series::add_gauge(&self.in_flight, &labels.values(), 1);
        OperationSession::started(labels)
    }

    pub fn end(&self, session: &mut OperationSession) {
        let Some(elapsed) = session.complete() else {
            return;
        };
        let values = session.labels().values();
        series::add_gauge(&self.in_flight, &values, -1);
        series::observe(&self.duration, &values, elapsed.as_secs_f64());
    }
}

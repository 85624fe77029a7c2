//! HTTP handler instrumentation.
//!
//! Series are keyed by `{method, handler}`; the total counter adds the numeric
//! status code. [`track_http`] wires all five series into an axum router.

use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use prometheus::HistogramVec;

use crate::error::Result;
use crate::labels::LabelSet;
use crate::operation::{DurationLabels, Operation, OperationDescriptors, OperationSession};
use crate::registry::{series, Buckets, MetricDescriptor, MetricsRegistry};

const REQUESTS: OperationDescriptors = OperationDescriptors {
    in_flight: Some(MetricDescriptor::gauge(
        "http_requests_in_flight",
        "The current number of HTTP requests being served.",
        &["method", "handler"],
    )),
    total: MetricDescriptor::counter(
        "http_requests_total",
        "Total number of HTTP requests made and responded.",
        &["method", "handler", "code"],
    ),
    duration: MetricDescriptor::histogram(
        "http_requests_duration_seconds",
        "The HTTP request latencies in seconds.",
        &["method", "handler"],
        Buckets::Latency,
    ),
    duration_labels: DurationLabels::Base,
};

const REQUEST_SIZE: MetricDescriptor = MetricDescriptor::histogram(
    "http_requests_size_bytes",
    "The HTTP request sizes in bytes.",
    &["method", "handler"],
    Buckets::Size,
);

const RESPONSE_SIZE: MetricDescriptor = MetricDescriptor::histogram(
    "http_responses_size_bytes",
    "The HTTP response sizes in bytes.",
    &["method", "handler"],
    Buckets::Size,
);

/// Per-handler recording surface.
pub trait HttpHandlerMetricer: Send + Sync {
    fn inc(&self, status: u16);
    fn inc_in_flight(&self);
    fn dec_in_flight(&self);
    fn observe_request_size(&self, bytes: u64);
    fn observe_response_size(&self, bytes: u64);
    fn observe_duration(&self, duration: Duration);
}

/// Registered HTTP series.
#[derive(Clone)]
pub struct HttpMetrics {
    requests: Operation,
    request_size: HistogramVec,
    response_size: HistogramVec,
}

impl HttpMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            requests: Operation::register(registry, &REQUESTS)?,
            request_size: registry.histogram_vec(&REQUEST_SIZE)?,
            response_size: registry.histogram_vec(&RESPONSE_SIZE)?,
        })
    }

    pub fn with_handler(&self, method: &str, handler: &str) -> HttpHandlerMetrics {
        HttpHandlerMetrics {
            metrics: self.clone(),
            labels: LabelSet::new([method, handler]),
        }
    }

    /// Attach [`track_http`] to every route of `router`.
    pub fn instrument<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn_with_state(self.clone(), track_http))
    }
}

/// Series bound to one `{method, handler}` pair.
#[derive(Clone)]
pub struct HttpHandlerMetrics {
    metrics: HttpMetrics,
    labels: LabelSet,
}

impl HttpHandlerMetrics {
    /// Session form: in-flight, total and duration in one begin/end pair.
    pub fn begin(&self) -> OperationSession {
        self.metrics.requests.begin(self.labels.clone())
    }

    pub fn end(&self, session: &mut OperationSession, status: u16) {
        self.metrics.requests.end(session, &status.to_string());
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

impl HttpHandlerMetricer for HttpHandlerMetrics {
    fn inc(&self, status: u16) {
        let labels = self.labels.with_code(&status.to_string());
        series::inc_counter(self.metrics.requests.total(), &labels.values());
    }

    fn inc_in_flight(&self) {
        if let Some(gauge) = self.metrics.requests.in_flight() {
            series::add_gauge(gauge, &self.labels.values(), 1);
        }
    }

    fn dec_in_flight(&self) {
        if let Some(gauge) = self.metrics.requests.in_flight() {
            series::add_gauge(gauge, &self.labels.values(), -1);
        }
    }

    fn observe_request_size(&self, bytes: u64) {
        series::observe(&self.metrics.request_size, &self.labels.values(), bytes as f64);
    }

    fn observe_response_size(&self, bytes: u64) {
        series::observe(&self.metrics.response_size, &self.labels.values(), bytes as f64);
    }

    fn observe_duration(&self, duration: Duration) {
        series::observe(
            self.metrics.requests.duration(),
            &self.labels.values(),
            duration.as_secs_f64(),
        );
    }
}

/// Handler label for requests no route matched.
pub const UNMATCHED_HANDLER: &str = "unmatched";

/// axum middleware recording every HTTP series for the wrapped routes.
///
/// The handler label is the matched route template. Requests that reach the
/// fallback all share [`UNMATCHED_HANDLER`], so raw paths never become labels.
pub async fn track_http(
    State(metrics): State<HttpMetrics>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_HANDLER.to_owned());
    let recorder = metrics.with_handler(request.method().as_str(), &handler);

    if let Some(size) = body_size(request.headers(), request.body()) {
        recorder.observe_request_size(size);
    }

    let mut session = recorder.begin();
    let response = next.run(request).await;
    recorder.end(&mut session, response.status().as_u16());

    if let Some(size) = body_size(response.headers(), response.body()) {
        recorder.observe_response_size(size);
    }
    response
}

fn body_size(headers: &HeaderMap, body: &Body) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .or_else(|| body.size_hint().exact())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_case_labels_share_a_series() {
        let registry = MetricsRegistry::new();
        let http = HttpMetrics::register(&registry).unwrap();

        let upper = http.with_handler("GET", "/Foo");
        let lower = http.with_handler("get", "/foo");
        let mut a = upper.begin();
        let mut b = lower.begin();
        upper.end(&mut a, 200);
        lower.end(&mut b, 200);

        assert_eq!(
            registry.snapshot().counter(
                "http_requests_total",
                &[("method", "get"), ("handler", "/foo"), ("code", "200")]
            ),
            Some(2.0)
        );
    }

    #[test]
    fn discrete_calls_update_each_series() {
        let registry = MetricsRegistry::new();
        let http = HttpMetrics::register(&registry).unwrap();
        let handler = http.with_handler("POST", "/upload");

        handler.inc_in_flight();
        handler.observe_request_size(2048);
        handler.observe_response_size(10);
        handler.observe_duration(Duration::from_millis(30));
        handler.inc(201);
        handler.dec_in_flight();

        let snap = registry.snapshot();
        let labels = [("method", "post"), ("handler", "/upload")];
        assert_eq!(snap.gauge("http_requests_in_flight", &labels), Some(0.0));
        assert_eq!(snap.histogram("http_requests_size_bytes", &labels).unwrap().sum, 2048.0);
        assert_eq!(snap.histogram("http_responses_size_bytes", &labels).unwrap().count, 1);
        assert_eq!(snap.histogram("http_requests_duration_seconds", &labels).unwrap().count, 1);
        assert_eq!(
            snap.counter(
                "http_requests_total",
                &[("method", "post"), ("handler", "/upload"), ("code", "201")]
            ),
            Some(1.0)
        );
    }
}

//! Log volume counters.
//!
//! Every log record increments `logrus_logs_total{level}`. A record that
//! carries an RPC context also increments the RPC-scoped counter; otherwise
//! one carrying an HTTP context increments the HTTP-scoped counter.
//!
//! [`LogMetricsLayer`] feeds these from `tracing` events. Context fields are
//! read from the event first, then from enclosing spans, innermost first.

use std::fmt;

use prometheus::IntCounterVec;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::error::Result;
use crate::labels::LabelSet;
use crate::registry::{series, MetricDescriptor, MetricsRegistry};

const LOGS: MetricDescriptor = MetricDescriptor::counter(
    "logrus_logs_total",
    "Total number of logs recorded in the system.",
    &["level"],
);

const HTTP_LOGS: MetricDescriptor = MetricDescriptor::counter(
    "http_logrus_logs_total",
    "Total number of logs recorded in http service.",
    &["level", "method", "handler"],
);

const GRPC_LOGS: MetricDescriptor = MetricDescriptor::counter(
    "grpc_logrus_logs_total",
    "Total number of logs recorded in grpc services.",
    &["level", "grpc_service", "grpc_method"],
);

pub const FIELD_GRPC_SERVICE: &str = "grpc_service";
pub const FIELD_GRPC_METHOD: &str = "grpc_method";
pub const FIELD_HTTP_METHOD: &str = "method";
pub const FIELD_HTTP_HANDLER: &str = "handler";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcContext {
    pub service: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpContext {
    pub method: String,
    pub handler: String,
}

/// What the counters need to know about one log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub rpc: Option<RpcContext>,
    pub http: Option<HttpContext>,
}

impl LogRecord {
    pub fn new(level: Level) -> Self {
        Self { level, rpc: None, http: None }
    }

    pub fn with_rpc(mut self, service: impl Into<String>, method: impl Into<String>) -> Self {
        self.rpc = Some(RpcContext { service: service.into(), method: method.into() });
        self
    }

    pub fn with_http(mut self, method: impl Into<String>, handler: impl Into<String>) -> Self {
        self.http = Some(HttpContext { method: method.into(), handler: handler.into() });
        self
    }
}

/// Level label, using the logrus level vocabulary.
pub fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warning",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        Level::TRACE => "trace",
    }
}

/// Registered log volume counters.
#[derive(Clone)]
pub struct LogMetrics {
    logs: IntCounterVec,
    http_logs: IntCounterVec,
    grpc_logs: IntCounterVec,
}

impl LogMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            logs: registry.counter_vec(&LOGS)?,
            http_logs: registry.counter_vec(&HTTP_LOGS)?,
            grpc_logs: registry.counter_vec(&GRPC_LOGS)?,
        })
    }

    /// Count one record. Never fails, never blocks.
    pub fn observe(&self, record: &LogRecord) {
        let level = level_label(&record.level);
        series::inc_counter(&self.logs, &[level]);

        if let Some(rpc) = &record.rpc {
            let labels = LabelSet::new([level, rpc.service.as_str(), rpc.method.as_str()]);
            series::inc_counter(&self.grpc_logs, &labels.values());
        } else if let Some(http) = &record.http {
            let labels = LabelSet::new([level, http.method.as_str(), http.handler.as_str()]);
            series::inc_counter(&self.http_logs, &labels.values());
        }
    }

    pub fn layer(&self) -> LogMetricsLayer {
        LogMetricsLayer { metrics: self.clone() }
    }
}

/// `tracing` layer counting every event that reaches it.
#[derive(Clone)]
pub struct LogMetricsLayer {
    metrics: LogMetrics,
}

impl<S> Layer<S> for LogMetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = ContextFields::default();
        attrs.record(&mut fields);
        if fields.is_empty() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let mut update = ContextFields::default();
        values.record(&mut update);
        if update.is_empty() {
            return;
        }
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<ContextFields>() {
            Some(existing) => existing.overwrite_with(update),
            None => extensions.insert(update),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = ContextFields::default();
        event.record(&mut fields);

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if fields.is_complete() {
                    break;
                }
                if let Some(found) = span.extensions().get::<ContextFields>() {
                    fields.fill_from(found);
                }
            }
        }

        self.metrics.observe(&fields.into_record(*event.metadata().level()));
    }
}

/// Context fields picked off an event or span.
#[derive(Debug, Clone, Default)]
struct ContextFields {
    grpc_service: Option<String>,
    grpc_method: Option<String>,
    method: Option<String>,
    handler: Option<String>,
}

impl ContextFields {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            FIELD_GRPC_SERVICE => Some(&mut self.grpc_service),
            FIELD_GRPC_METHOD => Some(&mut self.grpc_method),
            FIELD_HTTP_METHOD => Some(&mut self.method),
            FIELD_HTTP_HANDLER => Some(&mut self.handler),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: String) {
        if let Some(slot) = self.slot(name) {
            if slot.is_none() {
                *slot = Some(value);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.grpc_service.is_none()
            && self.grpc_method.is_none()
            && self.method.is_none()
            && self.handler.is_none()
    }

    fn is_complete(&self) -> bool {
        self.grpc_service.is_some()
            && self.grpc_method.is_some()
            && self.method.is_some()
            && self.handler.is_some()
    }

    /// Fill only the fields still missing.
    fn fill_from(&mut self, other: &ContextFields) {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }
        fill(&mut self.grpc_service, &other.grpc_service);
        fill(&mut self.grpc_method, &other.grpc_method);
        fill(&mut self.method, &other.method);
        fill(&mut self.handler, &other.handler);
    }

    fn overwrite_with(&mut self, update: ContextFields) {
        fn replace(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        replace(&mut self.grpc_service, update.grpc_service);
        replace(&mut self.grpc_method, update.grpc_method);
        replace(&mut self.method, update.method);
        replace(&mut self.handler, update.handler);
    }

    fn into_record(self, level: Level) -> LogRecord {
        let rpc = match (self.grpc_service, self.grpc_method) {
            (Some(service), Some(method)) => Some(RpcContext { service, method }),
            _ => None,
        };
        let http = match (self.method, self.handler) {
            (Some(method), Some(handler)) => Some(HttpContext { method, handler }),
            _ => None,
        };
        LogRecord { level, rpc, http }
    }
}

impl Visit for ContextFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field.name(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if self.slot(field.name()).is_some() {
            self.set(field.name(), format!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn setup() -> (MetricsRegistry, LogMetrics) {
        let registry = MetricsRegistry::new();
        let metrics = LogMetrics::register(&registry).unwrap();
        (registry, metrics)
    }

    #[test]
    fn rpc_context_wins_over_http() {
        let (registry, metrics) = setup();
        let record = LogRecord::new(Level::ERROR)
            .with_rpc("Orders", "Get")
            .with_http("GET", "/orders");
        metrics.observe(&record);

        let snap = registry.snapshot();
        assert_eq!(snap.counter("logrus_logs_total", &[("level", "error")]), Some(1.0));
        assert_eq!(
            snap.counter(
                "grpc_logrus_logs_total",
                &[("level", "error"), ("grpc_service", "orders"), ("grpc_method", "get")]
            ),
            Some(1.0)
        );
        assert_eq!(snap.counter_family_total("http_logrus_logs_total"), 0.0);
    }

    #[test]
    fn http_labels_are_not_swapped() {
        let (registry, metrics) = setup();
        metrics.observe(&LogRecord::new(Level::WARN).with_http("POST", "/v1/items"));

        assert_eq!(
            registry.snapshot().counter(
                "http_logrus_logs_total",
                &[("level", "warning"), ("method", "post"), ("handler", "/v1/items")]
            ),
            Some(1.0)
        );
    }

    #[test]
    fn layer_reads_event_and_span_fields() {
        let (registry, metrics) = setup();
        let subscriber = tracing_subscriber::registry().with(metrics.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("plain");
            let span = tracing::info_span!("request", method = "GET", handler = "/v1/ping");
            let _entered = span.enter();
            tracing::warn!("inside request");
            tracing::error!(grpc_service = "orders", grpc_method = "get", "rpc inside http span");
        });

        let snap = registry.snapshot();
        assert_eq!(snap.counter_family_total("logrus_logs_total"), 3.0);
        assert_eq!(
            snap.counter(
                "http_logrus_logs_total",
                &[("level", "warning"), ("method", "get"), ("handler", "/v1/ping")]
            ),
            Some(1.0)
        );
        assert_eq!(
            snap.counter(
                "grpc_logrus_logs_total",
                &[("level", "error"), ("grpc_service", "orders"), ("grpc_method", "get")]
            ),
            Some(1.0)
        );
    }

    #[test]
    fn partial_context_counts_globally_only() {
        let (registry, metrics) = setup();
        metrics.observe(&LogRecord::new(Level::INFO));
        let subscriber = tracing_subscriber::registry().with(metrics.layer());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(grpc_service = "orders", "no method");
        });

        let snap = registry.snapshot();
        assert_eq!(snap.counter("logrus_logs_total", &[("level", "info")]), Some(2.0));
        assert_eq!(snap.counter_family_total("grpc_logrus_logs_total"), 0.0);
        assert_eq!(snap.counter_family_total("http_logrus_logs_total"), 0.0);
    }
}

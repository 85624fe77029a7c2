//! Log volume counters fed through the tracing layer.

use opmetrics::telemetry::{LogMetrics, LogRecord};
use opmetrics::MetricsRegistry;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

fn setup() -> (MetricsRegistry, LogMetrics) {
    let registry = MetricsRegistry::new();
    let logs = LogMetrics::register(&registry).unwrap();
    (registry, logs)
}

#[test]
fn test_rpc_record_counts_rpc_scope_once() {
    let (registry, logs) = setup();
    logs.observe(&LogRecord::new(Level::ERROR).with_rpc("orders", "get"));

    let snap = registry.snapshot();
    assert_eq!(
        snap.counter(
            "grpc_logrus_logs_total",
            &[("level", "error"), ("grpc_service", "orders"), ("grpc_method", "get")]
        ),
        Some(1.0)
    );
    assert_eq!(snap.counter("logrus_logs_total", &[("level", "error")]), Some(1.0));
    assert_eq!(snap.counter_family_total("http_logrus_logs_total"), 0.0);
}

#[test]
fn test_every_level_is_counted_globally() {
    let (registry, logs) = setup();
    let subscriber = tracing_subscriber::registry().with(logs.layer());

    tracing::subscriber::with_default(subscriber, || {
        tracing::trace!("t");
        tracing::debug!("d");
        tracing::info!("i");
        tracing::warn!("w");
        tracing::error!("e");
        tracing::error!("e again");
    });

    let snap = registry.snapshot();
    for level in ["trace", "debug", "info", "warning"] {
        assert_eq!(snap.counter("logrus_logs_total", &[("level", level)]), Some(1.0));
    }
    assert_eq!(snap.counter("logrus_logs_total", &[("level", "error")]), Some(2.0));
}

#[test]
fn test_nested_spans_resolve_innermost_first() {
    let (registry, logs) = setup();
    let subscriber = tracing_subscriber::registry().with(logs.layer());

    tracing::subscriber::with_default(subscriber, || {
        let outer = tracing::info_span!("server", method = "GET", handler = "/outer");
        let _outer = outer.enter();
        let inner = tracing::info_span!("route", handler = "/Inner");
        let _inner = inner.enter();
        tracing::info!("handled");
    });

    assert_eq!(
        registry.snapshot().counter(
            "http_logrus_logs_total",
            &[("level", "info"), ("method", "get"), ("handler", "/inner")]
        ),
        Some(1.0)
    );
}

#[test]
fn test_fields_recorded_after_span_creation_are_seen() {
    let (registry, logs) = setup();
    let subscriber = tracing_subscriber::registry().with(logs.layer());

    tracing::subscriber::with_default(subscriber, || {
        let span = tracing::info_span!(
            "call",
            grpc_service = tracing::field::Empty,
            grpc_method = tracing::field::Empty
        );
        span.record("grpc_service", "Billing");
        span.record("grpc_method", "Charge");
        let _entered = span.enter();
        tracing::warn!("retrying");
    });

    assert_eq!(
        registry.snapshot().counter(
            "grpc_logrus_logs_total",
            &[("level", "warning"), ("grpc_service", "billing"), ("grpc_method", "charge")]
        ),
        Some(1.0)
    );
}

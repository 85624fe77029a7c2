//! Tests for the generic begin/end contract under concurrency.

use std::sync::Arc;

use opmetrics::adapters::HttpMetrics;
use opmetrics::{
    Buckets, Canceled, DurationLabels, LabelSet, MetricDescriptor, MetricsRegistry, Operation,
    OperationDescriptors, OperationMetricer, OperationSession, ResultCode,
};

const JOBS: OperationDescriptors = OperationDescriptors {
    in_flight: Some(MetricDescriptor::gauge("jobs_in_flight", "Jobs running.", &["kind"])),
    total: MetricDescriptor::counter("jobs_total", "Jobs finished.", &["kind", "code"]),
    duration: MetricDescriptor::histogram(
        "jobs_duration_seconds",
        "Job latency.",
        &["kind"],
        Buckets::Latency,
    ),
    duration_labels: DurationLabels::Base,
};

fn setup() -> (MetricsRegistry, Operation) {
    let registry = MetricsRegistry::new();
    let op = Operation::register(&registry, &JOBS).unwrap();
    (registry, op)
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pairs_return_gauge_to_zero() {
    let (registry, op) = setup();
    let op = Arc::new(op);

    let mut tasks = Vec::new();
    for i in 0..200 {
        let op = op.clone();
        tasks.push(tokio::spawn(async move {
            let mut session = op.begin(LabelSet::new(["import"]));
            tokio::task::yield_now().await;
            let code = if i % 4 == 0 { "failed" } else { "ok" };
            op.end(&mut session, code);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let snap = registry.snapshot();
    assert_eq!(snap.gauge("jobs_in_flight", &[("kind", "import")]), Some(0.0));
    assert_eq!(snap.counter("jobs_total", &[("kind", "import"), ("code", "ok")]), Some(150.0));
    assert_eq!(snap.counter("jobs_total", &[("kind", "import"), ("code", "failed")]), Some(50.0));
    assert_eq!(snap.histogram("jobs_duration_seconds", &[("kind", "import")]).unwrap().count, 200);
}

#[test]
fn test_threads_share_series_without_locking() {
    let (registry, op) = setup();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..100 {
                    let mut session = op.begin(LabelSet::new(["export"]));
                    op.end(&mut session, "ok");
                }
            });
        }
    });

    let snap = registry.snapshot();
    assert_eq!(snap.counter("jobs_total", &[("kind", "export"), ("code", "ok")]), Some(800.0));
    assert_eq!(snap.gauge("jobs_in_flight", &[("kind", "export")]), Some(0.0));
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_end_without_begin_mutates_nothing() {
    let (registry, op) = setup();
    let before = registry.snapshot();

    let mut session = OperationSession::detached(LabelSet::new(["import"]));
    op.end(&mut session, "ok");

    let after = registry.snapshot();
    assert_eq!(before.counters, after.counters);
    assert_eq!(before.gauges, after.gauges);
    assert_eq!(before.histograms, after.histograms);
}

#[test]
fn test_second_end_mutates_nothing() {
    let (registry, op) = setup();
    let mut session = op.begin(LabelSet::new(["import"]));
    op.end(&mut session, "ok");
    let before = registry.snapshot();

    op.end(&mut session, "ok");
    op.end(&mut session, "failed");

    let after = registry.snapshot();
    assert_eq!(before.counters, after.counters);
    assert_eq!(before.gauges, after.gauges);
    assert_eq!(before.histograms, after.histograms);
}

#[test]
fn test_double_begin_yields_independent_sessions() {
    let (registry, op) = setup();
    let mut first = op.begin(LabelSet::new(["import"]));
    let mut second = op.begin(LabelSet::new(["import"]));
    assert_eq!(registry.snapshot().gauge("jobs_in_flight", &[("kind", "import")]), Some(2.0));

    op.end(&mut first, "ok");
    op.end(&mut second, "ok");
    assert_eq!(registry.snapshot().gauge("jobs_in_flight", &[("kind", "import")]), Some(0.0));
}

// ============================================================================
// Codes and labels
// ============================================================================

#[test]
fn test_error_to_code_mapping() {
    let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
    assert_eq!(ResultCode::from_error(None).as_str(), "ok");
    assert_eq!(ResultCode::from_error(Some(&Canceled)).as_str(), "canceled");
    assert_eq!(ResultCode::from_error(Some(&other)).as_str(), "failed");
}

#[test]
fn test_label_values_are_case_insensitive() {
    let registry = MetricsRegistry::new();
    let http = HttpMetrics::register(&registry).unwrap();

    let upper = http.with_handler("GET", "/Foo");
    let mut session = upper.begin();
    upper.end(&mut session, 200);

    let lower = http.with_handler("get", "/foo");
    let mut session = lower.begin();
    lower.end(&mut session, 200);

    let snap = registry.snapshot();
    let labels = [("method", "get"), ("handler", "/foo")];
    assert_eq!(snap.histogram("http_requests_duration_seconds", &labels).unwrap().count, 2);
    assert!(snap
        .counters
        .keys()
        .all(|key| !key.contains("GET") && !key.contains("/Foo")));
}

struct CountingMetricer {
    begins: std::sync::atomic::AtomicUsize,
}

impl OperationMetricer for CountingMetricer {
    fn begin(&self, labels: LabelSet) -> OperationSession {
        self.begins.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        OperationSession::detached(labels)
    }

    fn end(&self, _session: &mut OperationSession, _code: &str) {}
}

fn run_instrumented(metricer: &dyn OperationMetricer) {
    let mut session = metricer.begin(LabelSet::new(["import"]));
    metricer.end(&mut session, "ok");
}

#[test]
fn test_metricer_trait_accepts_doubles() {
    let double = CountingMetricer { begins: Default::default() };
    run_instrumented(&double);
    assert_eq!(double.begins.load(std::sync::atomic::Ordering::SeqCst), 1);

    let (registry, op) = setup();
    run_instrumented(&op);
    assert_eq!(registry.snapshot().counter_family_total("jobs_total"), 1.0);
}

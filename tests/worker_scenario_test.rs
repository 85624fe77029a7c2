//! End-to-end worker scenario: mixed outcomes plus dead-lettering.

use opmetrics::adapters::{WorkerMetricer, WorkerMetrics};
use opmetrics::MetricsRegistry;

async fn process(worker: &WorkerMetrics, code: &'static str) {
    let mut msg = worker.queue("Orders");
    msg.begin();
    tokio::task::yield_now().await;
    msg.end(code);
}

#[tokio::test]
async fn test_ten_messages_seven_ok_two_failed_one_dead_lettered() {
    let registry = MetricsRegistry::new();
    let worker = WorkerMetrics::register(&registry).unwrap();

    let mut codes = vec!["ok"; 7];
    codes.extend(["failed", "FAILED"]);

    let mut tasks = Vec::new();
    for code in codes {
        let worker = worker.clone();
        tasks.push(tokio::spawn(async move { process(&worker, code).await }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // The tenth message is routed to the dead-letter queue without an
    // instrumented processing attempt.
    let mut dead = worker.queue("orders");
    dead.inc_dead_letter();

    let snap = registry.snapshot();
    assert_eq!(
        snap.counter("worker_messages_total", &[("queue", "orders"), ("code", "ok")]),
        Some(7.0)
    );
    assert_eq!(
        snap.counter("worker_messages_total", &[("queue", "orders"), ("code", "failed")]),
        Some(2.0)
    );
    assert_eq!(
        snap.counter("worker_dead_letter_messages_total", &[("queue", "orders")]),
        Some(1.0)
    );
    assert_eq!(snap.gauge("worker_messages_in_flight", &[("queue", "orders")]), Some(0.0));
    assert_eq!(
        snap.histogram(
            "worker_messages_processing_duration_seconds",
            &[("queue", "orders"), ("code", "failed")]
        )
        .unwrap()
        .count,
        2
    );

    // Nothing was begun on the dead-letter handle, so ending it records nothing.
    dead.end("ok");
    assert_eq!(registry.snapshot().counter_family_total("worker_messages_total"), 9.0);
}

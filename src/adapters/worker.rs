//! Queue worker instrumentation.
//!
//! Codes are supplied by the caller (`ok`, `failed`, `canceled`, ...). The
//! dead-letter counter is independent of any processing session.

use prometheus::IntCounterVec;

use crate::error::Result;
use crate::labels::LabelSet;
use crate::operation::{DurationLabels, Operation, OperationDescriptors, OperationSession};
use crate::registry::{series, Buckets, MetricDescriptor, MetricsRegistry};

const MESSAGES: OperationDescriptors = OperationDescriptors {
    in_flight: Some(MetricDescriptor::gauge(
        "worker_messages_in_flight",
        "The current number of messages being processed by the worker.",
        &["queue"],
    )),
    total: MetricDescriptor::counter(
        "worker_messages_total",
        "Total number of messages processed by the worker.",
        &["queue", "code"],
    ),
    duration: MetricDescriptor::histogram(
        "worker_messages_processing_duration_seconds",
        "Duration of time from when the message is received from the queue until it is processed in seconds.",
        &["queue", "code"],
        Buckets::Default,
    ),
    duration_labels: DurationLabels::WithCode,
};

const DEAD_LETTER: MetricDescriptor = MetricDescriptor::counter(
    "worker_dead_letter_messages_total",
    "Total number of messages sent to the dead-letter queue by the worker.",
    &["queue"],
);

/// Per-message worker contract.
pub trait WorkerMetricer: Send {
    /// Start processing. Repeated calls while in flight are ignored.
    fn begin(&mut self);
    /// Finish processing with a caller-classified code.
    fn end(&mut self, code: &str);
    fn inc_dead_letter(&self);
}

/// Registered worker series.
#[derive(Clone)]
pub struct WorkerMetrics {
    messages: Operation,
    dead_letter: IntCounterVec,
}

impl WorkerMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            messages: Operation::register(registry, &MESSAGES)?,
            dead_letter: registry.counter_vec(&DEAD_LETTER)?,
        })
    }

    /// Handle for one message pulled from `queue`.
    pub fn queue(&self, queue: &str) -> QueueMetrics {
        let labels = LabelSet::new([queue]);
        QueueMetrics {
            messages: self.messages.clone(),
            dead_letter: self.dead_letter.clone(),
            session: OperationSession::detached(labels.clone()),
            labels,
        }
    }
}

/// Stateful handle for one message. Reusable after `end`.
pub struct QueueMetrics {
    messages: Operation,
    dead_letter: IntCounterVec,
    labels: LabelSet,
    session: OperationSession,
}

impl QueueMetrics {
    pub fn is_in_flight(&self) -> bool {
        self.session.is_pending()
    }
}

impl WorkerMetricer for QueueMetrics {
    fn begin(&mut self) {
        if self.session.is_pending() {
            return;
        }
        self.session = self.messages.begin(self.labels.clone());
    }

    fn end(&mut self, code: &str) {
        self.messages.end(&mut self.session, code);
    }

    fn inc_dead_letter(&self) {
        series::inc_counter(&self.dead_letter, &self.labels.values());
    }
}

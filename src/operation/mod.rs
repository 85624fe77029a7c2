//! Generic begin/end instrumentation shared by every timed adapter.
//!
//! One instrumented call drives three series:
//!
//! - an in-flight gauge under the base labels (optional per family),
//! - a total counter under the base labels plus the result code,
//! - a duration histogram under the base labels, or under base labels plus
//!   code for families that split latency by outcome.
//!
//! A crash between begin and end leaves the in-flight gauge elevated. That is
//! an alarm condition and is not corrected here.

mod code;
mod session;

pub use code::{Canceled, ResultCode};
pub use session::OperationSession;

use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec};

use crate::error::Result;
use crate::labels::LabelSet;
use crate::registry::series;
use crate::registry::{MetricDescriptor, MetricsRegistry};

/// Label layout of an operation's duration histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationLabels {
    /// Same labels as the in-flight gauge.
    Base,
    /// Base labels plus the result code.
    WithCode,
}

/// Descriptors for one operation family.
#[derive(Debug, Clone, Copy)]
pub struct OperationDescriptors {
    pub in_flight: Option<MetricDescriptor>,
    pub total: MetricDescriptor,
    pub duration: MetricDescriptor,
    pub duration_labels: DurationLabels,
}

/// Begin/end contract, implemented by [`Operation`] and by test doubles.
pub trait OperationMetricer: Send + Sync {
    fn begin(&self, labels: LabelSet) -> OperationSession;
    fn end(&self, session: &mut OperationSession, code: &str);
}

/// Registered series for one kind of operation.
#[derive(Clone)]
pub struct Operation {
    in_flight: Option<IntGaugeVec>,
    total: IntCounterVec,
    duration: HistogramVec,
    duration_labels: DurationLabels,
}

impl Operation {
    pub fn register(registry: &MetricsRegistry, desc: &OperationDescriptors) -> Result<Self> {
        let in_flight = desc
            .in_flight
            .as_ref()
            .map(|d| registry.gauge_vec(d))
            .transpose()?;
        let total = registry.counter_vec(&desc.total)?;
        let duration = registry.histogram_vec(&desc.duration)?;

        Ok(Self {
            in_flight,
            total,
            duration,
            duration_labels: desc.duration_labels,
        })
    }

    /// Start timing; bumps the in-flight gauge. Never blocks, never fails.
    pub fn begin(&self, labels: LabelSet) -> OperationSession {
        if let Some(in_flight) = &self.in_flight {
            series::add_gauge(in_flight, &labels.values(), 1);
        }
        OperationSession::started(labels)
    }

    /// Finish timing with a result code.
    ///
    /// No-op for a session that is already completed or was never begun.
    pub fn end(&self, session: &mut OperationSession, code: &str) {
        let Some(elapsed) = session.complete() else {
            return;
        };
        let labels = session.labels();
        let with_code = labels.with_code(code);

        if let Some(in_flight) = &self.in_flight {
            series::add_gauge(in_flight, &labels.values(), -1);
        }
        series::inc_counter(&self.total, &with_code.values());

        let duration_labels = match self.duration_labels {
            DurationLabels::Base => labels.values(),
            DurationLabels::WithCode => with_code.values(),
        };
        series::observe(&self.duration, &duration_labels, elapsed.as_secs_f64());
    }

    /// Finish timing, deriving the code from an optional error.
    pub fn end_with_error(
        &self,
        session: &mut OperationSession,
        err: Option<&(dyn std::error::Error + 'static)>,
    ) {
        self.end(session, ResultCode::from_error(err).as_str());
    }

    /// Begin and keep the session together with its operation.
    pub fn start(&self, labels: LabelSet) -> PendingOperation {
        PendingOperation {
            session: self.begin(labels),
            operation: self.clone(),
        }
    }

    pub(crate) fn in_flight(&self) -> Option<&IntGaugeVec> {
        self.in_flight.as_ref()
    }

    pub(crate) fn total(&self) -> &IntCounterVec {
        &self.total
    }

    pub(crate) fn duration(&self) -> &HistogramVec {
        &self.duration
    }
}

/// A begun operation that knows how to end itself.
///
/// Dropping it without calling [`PendingOperation::end`] leaves the in-flight
/// gauge raised.
pub struct PendingOperation {
    operation: Operation,
    session: OperationSession,
}

impl PendingOperation {
    pub fn end(&mut self, code: &str) {
        self.operation.end(&mut self.session, code);
    }

    pub fn end_with_error(&mut self, err: Option<&(dyn std::error::Error + 'static)>) {
        self.operation.end_with_error(&mut self.session, err);
    }

    pub fn session(&self) -> &OperationSession {
        &self.session
    }

    pub fn is_completed(&self) -> bool {
        self.session.is_completed()
    }
}

impl OperationMetricer for Operation {
    fn begin(&self, labels: LabelSet) -> OperationSession {
        Operation::begin(self, labels)
    }

    fn end(&self, session: &mut OperationSession, code: &str) {
        Operation::end(self, session, code)
    }
}

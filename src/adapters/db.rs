//! Database query instrumentation.
//!
//! The code is derived from the query error with [`ResultCode::from_error`];
//! callers that know better (`not_found`) use [`DbQuery::end_with_code`].

use std::error::Error;

use crate::error::Result;
use crate::labels::LabelSet;
use crate::operation::{
    DurationLabels, Operation, OperationDescriptors, OperationSession, ResultCode,
};
use crate::registry::{Buckets, MetricDescriptor, MetricsRegistry};

const QUERIES: OperationDescriptors = OperationDescriptors {
    in_flight: Some(MetricDescriptor::gauge(
        "database_queries_in_flight",
        "The current number of database queries being processed.",
        &["database", "method"],
    )),
    total: MetricDescriptor::counter(
        "database_queries_total",
        "Total number of database queries made and responded.",
        &["database", "method", "code"],
    ),
    duration: MetricDescriptor::histogram(
        "database_queries_duration_seconds",
        "The database query latencies in seconds.",
        &["database", "method"],
        Buckets::DbLatency,
    ),
    duration_labels: DurationLabels::Base,
};

/// Registered database query series.
#[derive(Clone)]
pub struct DbMetrics {
    queries: Operation,
}

impl DbMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            queries: Operation::register(registry, &QUERIES)?,
        })
    }

    pub fn query(&self, database: &str, method: &str) -> DbQuery {
        let labels = LabelSet::new([database, method]);
        DbQuery {
            queries: self.queries.clone(),
            session: OperationSession::detached(labels.clone()),
            labels,
        }
    }
}

/// Stateful handle for one query method. Reusable after `end`.
pub struct DbQuery {
    queries: Operation,
    labels: LabelSet,
    session: OperationSession,
}

impl DbQuery {
    /// Start timing. Ignored while a previous begin is still in flight.
    pub fn begin(&mut self) {
        if self.session.is_pending() {
            return;
        }
        self.session = self.queries.begin(self.labels.clone());
    }

    pub fn end(&mut self, err: Option<&(dyn Error + 'static)>) {
        self.end_with_code(ResultCode::from_error(err).as_str());
    }

    pub fn end_with_code(&mut self, code: &str) {
        self.queries.end(&mut self.session, code);
    }

    pub fn is_in_flight(&self) -> bool {
        self.session.is_pending()
    }
}

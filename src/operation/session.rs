//! Per-call timing state between begin and end.

use std::time::{Duration, Instant};

use crate::labels::LabelSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// Built without a begin; ending it records nothing.
    Detached,
    Pending(Instant),
    Completed,
}

/// Value returned by `begin` and consumed by `end`.
///
/// Owned by the caller. Once completed, further `end` calls are no-ops.
#[derive(Debug, Clone)]
pub struct OperationSession {
    labels: LabelSet,
    state: SessionState,
}

impl OperationSession {
    pub(crate) fn started(labels: LabelSet) -> Self {
        Self {
            labels,
            state: SessionState::Pending(Instant::now()),
        }
    }

    /// A session that was never begun. Ending it mutates no series.
    pub fn detached(labels: LabelSet) -> Self {
        Self {
            labels,
            state: SessionState::Detached,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SessionState::Pending(_))
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Time since begin, while pending.
    pub fn elapsed(&self) -> Option<Duration> {
        match self.state {
            SessionState::Pending(start) => Some(start.elapsed()),
            _ => None,
        }
    }

    /// Transition pending -> completed, returning the elapsed time.
    /// Returns `None` (and changes nothing) for detached or completed sessions.
    pub(crate) fn complete(&mut self) -> Option<Duration> {
        match self.state {
            SessionState::Pending(start) => {
                self.state = SessionState::Completed;
                Some(start.elapsed())
            }
            SessionState::Detached | SessionState::Completed => None,
        }
    }
}

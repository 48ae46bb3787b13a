//! Error types for policy execution.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Opaque failure produced by a user task.
///
/// The library never inspects these beyond carrying them to the retry loop
/// and, ultimately, the fallback handler or the caller.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a bulkhead refused to admit an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No admission permit became available within the wait budget.
    WaitTimeout,
    /// The pending queue stayed at capacity for the whole wait budget.
    CapacityExceeded,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitTimeout => write!(f, "wait timeout"),
            Self::CapacityExceeded => write!(f, "capacity exceeded"),
        }
    }
}

/// Failures surfaced by [`Attempt::run`](crate::Attempt::run) and the
/// components underneath it.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The bulkhead refused the attempt before the task could start.
    #[error("bulkhead rejected: {reason}")]
    BulkheadRejected {
        /// Which admission stage refused the attempt.
        reason: RejectReason,
    },

    /// The task did not settle within its configured time limit. The
    /// carrier has been signalled; the task itself may still be running.
    #[error("time limit of {limit:?} exceeded")]
    TimedOut {
        /// The deadline that elapsed.
        limit: Duration,
    },

    /// No pool is registered under the given id. Create it first with the
    /// capacity-taking `bulkhead` call; attaching never creates pools.
    #[error("pool `{0}` not found; create it with bulkhead(id, max_concurrent, max_queue, max_wait_millis) before attaching")]
    PoolNotFound(String),

    /// The user task itself failed. Carried through unchanged.
    #[error("task failed: {0}")]
    Task(TaskError),
}

impl ExecError {
    /// True for the two bulkhead admission failures.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::BulkheadRejected { .. })
    }

    /// True when the failure is the deadline kind.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

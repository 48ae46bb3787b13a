//! Cooperative cancellation for in-flight tasks.
//!
//! Cancellation is signalling, not preemption. When a deadline elapses the
//! library sets the job's [`CancelToken`]; a job whose token is set before
//! a carrier picks it up is dropped without running, and a job that is
//! already running keeps its carrier until it returns on its own. Tasks
//! that want to cooperate poll [`cancel_requested`] at convenient points.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag attached to one submitted job.
///
/// Cloning is cheap; all clones observe the same flag. Once set, the flag
/// never clears.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Run `f` with this token installed as the carrier's current token,
    /// restoring the previous one afterwards (also on panic, so carriers
    /// can be reused).
    pub(crate) fn run_scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = CURRENT.with(|cell| cell.replace(Some(self.clone())));
        let _restore = Restore(previous);
        f()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<CancelToken>> = const { RefCell::new(None) };
}

struct Restore(Option<CancelToken>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT.with(|cell| *cell.borrow_mut() = previous);
    }
}

/// Whether the task currently running on this carrier has been asked to
/// stop.
///
/// Returns `false` outside a pool carrier. Interrupt-aware tasks poll this
/// between units of work and bail out early; tasks that never check simply
/// run to completion after the caller has already observed
/// [`ExecError::TimedOut`](crate::ExecError::TimedOut).
#[must_use]
pub fn cancel_requested() -> bool {
    CURRENT.with(|cell| {
        cell.borrow()
            .as_ref()
            .map_or(false, CancelToken::is_cancelled)
    })
}

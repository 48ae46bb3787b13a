//! Deadline enforcement for a single attempt.
//!
//! The timer needs its own carrier: the task body is submitted to the
//! pool while the wrapping job waits on the completion handle with a
//! timeout. On expiry the body's token is set and the caller gets
//! [`ExecError::TimedOut`] immediately; a body that already started and
//! ignores the token finishes on its carrier unobserved.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::core::cancel::CancelToken;
use crate::core::error::{ExecError, TaskError};
use crate::core::worker_pool::WorkerPool;

/// Shared user task, cloned into each attempt.
pub(crate) type TaskFn<T> = Arc<dyn Fn() -> Result<T, TaskError> + Send + Sync + 'static>;

/// Run `task` on `pool` and wait at most `limit` for it to settle.
///
/// Inside the deadline, the task's value or failure propagates unchanged.
/// A queue-capacity refusal of the body surfaces as a bulkhead rejection,
/// which the retry loop treats like any other attempt failure.
pub(crate) fn run_with_deadline<T: Send + 'static>(
    task: TaskFn<T>,
    limit: Duration,
    pool: &WorkerPool,
) -> Result<T, ExecError> {
    let token = CancelToken::new();
    let completion = pool.submit(token.clone(), move || (*task)().map_err(ExecError::Task))?;

    match completion.wait_for(limit) {
        Some(outcome) => outcome,
        None => {
            token.cancel();
            warn!(limit = ?limit, pool = %pool.name(), "deadline elapsed, task cancelled");
            Err(ExecError::TimedOut { limit })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RejectReason;
    use std::thread;
    use std::time::Instant;

    fn task<T: Send + Sync + 'static>(
        f: impl Fn() -> Result<T, TaskError> + Send + Sync + 'static,
    ) -> TaskFn<T> {
        Arc::new(f)
    }

    #[test]
    fn value_inside_deadline_passes_through() {
        let pool = WorkerPool::new("timed-ok", 2, 8);
        let value =
            run_with_deadline(task(|| Ok(5)), Duration::from_secs(1), &pool).unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn failure_inside_deadline_passes_through() {
        let pool = WorkerPool::new("timed-err", 2, 8);
        let err = run_with_deadline(
            task(|| Err::<(), _>("user broke it".into())),
            Duration::from_secs(1),
            &pool,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "task failed: user broke it");
    }

    #[test]
    fn expiry_returns_promptly_and_cancels() {
        let pool = WorkerPool::new("timed-late", 2, 8);
        let start = Instant::now();
        let err = run_with_deadline(
            task(|| {
                thread::sleep(Duration::from_millis(400));
                Ok(())
            }),
            Duration::from_millis(50),
            &pool,
        )
        .unwrap_err();

        assert!(err.is_timeout());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(300), "elapsed {elapsed:?}");
    }

    #[test]
    fn body_refused_by_a_full_queue_is_a_rejection() {
        let pool = WorkerPool::new("timed-full", 1, 1);
        // Park the only carrier and fill the queue slot behind it.
        let gate = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let release = Arc::clone(&gate);
        let busy = pool
            .submit(CancelToken::new(), move || {
                while !release.load(std::sync::atomic::Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            })
            .unwrap();
        while pool.stats().idle_workers > 0 || pool.stats().queued_jobs > 0 {
            thread::sleep(Duration::from_millis(1));
        }
        let _parked = pool.submit(CancelToken::new(), || Ok(())).unwrap();

        let err = run_with_deadline(task(|| Ok(())), Duration::from_millis(50), &pool)
            .unwrap_err();
        match err {
            ExecError::BulkheadRejected { reason } => {
                assert_eq!(reason, RejectReason::CapacityExceeded);
            }
            other => panic!("expected capacity rejection, got {other:?}"),
        }

        gate.store(true, std::sync::atomic::Ordering::Release);
        busy.wait().unwrap();
    }
}

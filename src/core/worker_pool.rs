//! Worker pool executing submitted jobs on dedicated carrier threads.
//!
//! Each pool owns a bounded FIFO ingress queue and a set of named OS
//! threads ("carriers") spawned on demand up to the pool's concurrency
//! ceiling. Carriers block on the queue, survive task panics, and live for
//! the remainder of the process. Submission never runs user code on the
//! caller's thread; the caller gets a [`Completion`] handle and decides
//! how long to wait on it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tracing::{debug, error, info, warn};

use crate::core::cancel::CancelToken;
use crate::core::error::{ExecError, RejectReason};
use crate::core::queue::BoundedQueue;

/// A unit of work shipped through the ingress queue to a carrier.
struct Job {
    run: Box<dyn FnOnce() + Send + 'static>,
    cancel: CancelToken,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    rejected: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time snapshot of a pool's activity.
///
/// Counter fields are monotonic totals; gauge fields (workers, queued) are
/// stale the moment they are read.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Carriers currently alive.
    pub live_workers: usize,
    /// Carriers blocked waiting for work.
    pub idle_workers: usize,
    /// Jobs accepted but not yet picked up by a carrier.
    pub queued_jobs: usize,
    /// Jobs accepted into the queue since pool creation.
    pub submitted_jobs: u64,
    /// Jobs a carrier finished processing (successfully or not).
    pub completed_jobs: u64,
    /// Jobs refused because the queue stayed full.
    pub rejected_jobs: u64,
    /// Jobs dropped unrun because they were cancelled before start.
    pub cancelled_jobs: u64,
}

/// Handle to one submitted job's eventual outcome.
#[derive(Debug)]
pub struct Completion<T> {
    rx: Receiver<Result<T, ExecError>>,
}

impl<T> Completion<T> {
    /// Block until the job settles.
    ///
    /// # Errors
    ///
    /// Whatever the job failed with, or a task-kind error if its carrier
    /// dropped the job without running it.
    pub fn wait(self) -> Result<T, ExecError> {
        match self.rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(abandoned()),
        }
    }

    /// Block up to `limit`. `None` means the deadline elapsed with the job
    /// still unsettled; the job keeps running regardless.
    pub fn wait_for(&self, limit: Duration) -> Option<Result<T, ExecError>> {
        match self.rx.recv_timeout(limit) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(abandoned())),
        }
    }
}

fn abandoned() -> ExecError {
    ExecError::Task("carrier abandoned the task before completion".into())
}

/// Fixed-ceiling pool of carrier threads fed by a bounded FIFO queue.
pub struct WorkerPool {
    name: String,
    max_workers: usize,
    queue: Arc<BoundedQueue<Job>>,
    live: Arc<AtomicUsize>,
    idle: Arc<AtomicUsize>,
    counters: Arc<Counters>,
    worker_seq: AtomicUsize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("max_workers", &self.max_workers)
            .field("live", &self.live.load(Ordering::Relaxed))
            .field("idle", &self.idle.load(Ordering::Relaxed))
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool running at most `max_concurrent` carriers with a
    /// pending queue of `max_queue` jobs. Values below 1 are raised to 1.
    ///
    /// Carriers are spawned lazily as jobs arrive, never eagerly.
    #[must_use]
    pub fn new(name: impl Into<String>, max_concurrent: usize, max_queue: usize) -> Self {
        let name = name.into();
        let max_workers = max_concurrent.max(1);
        info!(
            pool = %name,
            max_concurrent = max_workers,
            max_queue = max_queue.max(1),
            "worker pool created"
        );
        Self {
            name,
            max_workers,
            queue: Arc::new(BoundedQueue::new(max_queue)),
            live: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(AtomicUsize::new(0)),
            counters: Arc::new(Counters::default()),
            worker_seq: AtomicUsize::new(0),
        }
    }

    /// Pool identifier used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The carrier ceiling this pool was created with.
    #[must_use]
    pub const fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Submit `task` without waiting for queue space.
    ///
    /// # Errors
    ///
    /// [`ExecError::BulkheadRejected`] with reason `CapacityExceeded` when
    /// the queue is full right now.
    pub fn submit<T, F>(&self, cancel: CancelToken, task: F) -> Result<Completion<T>, ExecError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ExecError> + Send + 'static,
    {
        self.enqueue(cancel, task, Duration::ZERO)
    }

    /// Submit `task`, waiting up to `wait` for queue space.
    ///
    /// # Errors
    ///
    /// [`ExecError::BulkheadRejected`] with reason `CapacityExceeded` when
    /// the queue stayed full for the whole budget.
    pub fn try_enqueue<T, F>(
        &self,
        cancel: CancelToken,
        task: F,
        wait: Duration,
    ) -> Result<Completion<T>, ExecError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ExecError> + Send + 'static,
    {
        self.enqueue(cancel, task, wait)
    }

    /// Current activity snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live_workers: self.live.load(Ordering::Acquire),
            idle_workers: self.idle.load(Ordering::Acquire),
            queued_jobs: self.queue.len(),
            submitted_jobs: self.counters.submitted.load(Ordering::Relaxed),
            completed_jobs: self.counters.completed.load(Ordering::Relaxed),
            rejected_jobs: self.counters.rejected.load(Ordering::Relaxed),
            cancelled_jobs: self.counters.cancelled.load(Ordering::Relaxed),
        }
    }

    fn enqueue<T, F>(
        &self,
        cancel: CancelToken,
        task: F,
        wait: Duration,
    ) -> Result<Completion<T>, ExecError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ExecError> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let job = Job {
            cancel,
            run: Box::new(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|_| {
                    error!("task panicked on its carrier");
                    Err(ExecError::Task("task panicked".into()))
                });
                // The caller may have stopped waiting; that is not an error.
                let _ = tx.send(outcome);
            }),
        };

        if !self.queue.offer(job, wait) {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(pool = %self.name, "queue capacity exceeded, job rejected");
            return Err(ExecError::BulkheadRejected {
                reason: RejectReason::CapacityExceeded,
            });
        }
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(pool = %self.name, "job enqueued");
        self.ensure_worker();
        Ok(Completion { rx })
    }

    /// Spawn a carrier iff nobody is idle and the ceiling allows one more.
    fn ensure_worker(&self) {
        if self.idle.load(Ordering::Acquire) > 0 {
            return;
        }
        let mut live = self.live.load(Ordering::Acquire);
        loop {
            if live >= self.max_workers {
                return;
            }
            match self.live.compare_exchange(
                live,
                live + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.spawn_worker();
                    return;
                }
                Err(observed) => live = observed,
            }
        }
    }

    fn spawn_worker(&self) {
        let id = self.worker_seq.fetch_add(1, Ordering::Relaxed);
        let name = self.name.clone();
        let queue = Arc::clone(&self.queue);
        let live = Arc::clone(&self.live);
        let idle = Arc::clone(&self.idle);
        let counters = Arc::clone(&self.counters);

        thread::Builder::new()
            .name(format!("bw-worker-{id}"))
            .spawn(move || {
                debug!(pool = %name, worker = id, "carrier started");
                loop {
                    idle.fetch_add(1, Ordering::Release);
                    let job = queue.take();
                    idle.fetch_sub(1, Ordering::Release);
                    let Some(job) = job else { break };

                    if job.cancel.is_cancelled() {
                        counters.cancelled.fetch_add(1, Ordering::Relaxed);
                        debug!(pool = %name, worker = id, "dropping job cancelled before start");
                        continue;
                    }

                    let Job { run, cancel } = job;
                    if panic::catch_unwind(AssertUnwindSafe(|| cancel.run_scoped(run))).is_err() {
                        error!(pool = %name, worker = id, "job escaped its completion guard");
                    }
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                live.fetch_sub(1, Ordering::Release);
                debug!(pool = %name, worker = id, "carrier exiting");
            })
            .expect("failed to spawn worker thread");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Registry-owned pools live for the process; this path only runs
        // for pools constructed directly (tests, embedding). Carriers
        // drain the queue and exit; they are detached, never joined.
        self.queue.close();
        debug!(pool = %self.name, "worker pool dropped, carriers draining");
    }
}

//! Fluent execution façade composing retry, bulkhead and time limit.
//!
//! An [`Attempt`] is an owned configuration value: chain policy methods,
//! then consume it with [`run`](Attempt::run). The call blocks until the
//! pipeline settles and returns the task's value, the fallback's value, or
//! the last failure.
//!
//! ```
//! use bulwark::{Attempt, TaskError};
//!
//! let greeting = Attempt::new(|| Ok::<_, TaskError>(String::from("hello")))
//!     .retry(3, 10)
//!     .run()?;
//! assert_eq!(greeting, "hello");
//! # Ok::<(), bulwark::ExecError>(())
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{PoolConfig, DEFAULT_POOL_ID};
use crate::core::cancel::CancelToken;
use crate::core::error::{ExecError, RejectReason, TaskError};
use crate::core::registry::{PoolEntry, PoolRegistry};
use crate::core::retry::RetryPolicy;
use crate::core::timed::{run_with_deadline, TaskFn};

type Fallback<T> = Box<dyn FnOnce(ExecError) -> T + Send>;

/// One configurable execution of a user task.
///
/// Every attempt runs the task off the caller's thread, on the configured
/// pool's carriers (or the shared default pool when no bulkhead is set).
/// The caller blocks in [`run`](Attempt::run) until the value, fallback or
/// final failure is known.
pub struct Attempt<T> {
    task: TaskFn<T>,
    fallback: Option<Fallback<T>>,
    retry: RetryPolicy,
    time_limit: Option<Duration>,
    pool: Option<Arc<PoolEntry>>,
}

impl<T: Send + 'static> Attempt<T> {
    /// Start configuring the execution of `task`.
    ///
    /// The task may fail with any boxed error; failures flow through retry
    /// untouched and reach the fallback handler (or the caller) unchanged.
    #[must_use]
    pub fn new(task: impl Fn() -> Result<T, TaskError> + Send + Sync + 'static) -> Self {
        Self {
            task: Arc::new(task),
            fallback: None,
            retry: RetryPolicy::default(),
            time_limit: None,
            pool: None,
        }
    }

    /// Convert a terminal failure into a value instead of returning it.
    ///
    /// The handler sees the failure of the *last* attempt and is invoked at
    /// most once per `run`.
    ///
    /// ```
    /// use bulwark::Attempt;
    ///
    /// let value = Attempt::new(|| Err::<String, _>("boom".into()))
    ///     .retry(2, 0)
    ///     .on_failure(|err| format!("recovered: {err}"))
    ///     .run()?;
    /// assert_eq!(value, "recovered: task failed: boom");
    /// # Ok::<(), bulwark::ExecError>(())
    /// ```
    #[must_use]
    pub fn on_failure(mut self, handler: impl FnOnce(ExecError) -> T + Send + 'static) -> Self {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Try up to `count` times total with `delay_millis` between failures.
    /// A count of 0 behaves as 1.
    #[must_use]
    pub fn retry(mut self, count: u32, delay_millis: u64) -> Self {
        self.retry = RetryPolicy::new(count, delay_millis);
        self
    }

    /// Isolate the task in the pool registered under `pool_id`, creating it
    /// with these capacities on first use.
    ///
    /// Pools are shared process-wide by id; if `pool_id` already exists the
    /// capacities given here are ignored in favour of the creator's.
    #[must_use]
    pub fn bulkhead(
        mut self,
        pool_id: &str,
        max_concurrent: usize,
        max_queue: usize,
        max_wait_millis: u64,
    ) -> Self {
        let config = PoolConfig {
            max_concurrent,
            max_queue,
            max_wait_millis,
        };
        self.pool = Some(PoolRegistry::global().get_or_create(pool_id, &config));
        self
    }

    /// Isolate the task in an already-registered pool.
    ///
    /// # Errors
    ///
    /// [`ExecError::PoolNotFound`] when nothing is registered under
    /// `pool_id`; attaching never creates pools.
    pub fn attach(mut self, pool_id: &str) -> Result<Self, ExecError> {
        self.pool = Some(PoolRegistry::global().get(pool_id)?);
        Ok(self)
    }

    /// Fail the task with [`ExecError::TimedOut`] if it has not settled
    /// after `millis`. A limit of 0 disables the deadline.
    ///
    /// Expiry cancels cooperatively: the task's carrier is signalled (see
    /// [`cancel_requested`](crate::cancel_requested)) and the caller moves
    /// on without waiting for acknowledgement.
    #[must_use]
    pub fn time_limit(mut self, millis: u64) -> Self {
        self.time_limit = Some(Duration::from_millis(millis));
        self
    }

    /// Execute under the configured policies and return the task's value.
    ///
    /// Attempts are strictly sequential; each one acquires an admission
    /// permit, waits for a queue slot, then awaits the task. The permit is
    /// released when the attempt settles, on every path.
    ///
    /// # Errors
    ///
    /// Without a fallback, the failure of the last attempt:
    /// [`ExecError::BulkheadRejected`], [`ExecError::TimedOut`], or the
    /// user failure as [`ExecError::Task`]. With a fallback, `run` returns
    /// `Ok` with the handler's value instead.
    pub fn run(self) -> Result<T, ExecError> {
        let Self {
            task,
            fallback,
            retry,
            time_limit,
            pool,
        } = self;

        let entry = pool.unwrap_or_else(|| {
            PoolRegistry::global().get_or_create(DEFAULT_POOL_ID, &PoolConfig::unbounded())
        });
        let limit = time_limit.filter(|limit| !limit.is_zero());

        let outcome = retry.run(|attempt| {
            debug!(attempt, pool = %entry.workers().name(), "starting attempt");
            run_attempt(&entry, &task, limit)
        });

        match outcome {
            Ok(value) => Ok(value),
            Err(err) => match fallback {
                Some(handler) => Ok(handler(err)),
                None => Err(err),
            },
        }
    }
}

/// One pass through the admission pipeline: permit, queue slot, await.
fn run_attempt<T: Send + 'static>(
    entry: &PoolEntry,
    task: &TaskFn<T>,
    limit: Option<Duration>,
) -> Result<T, ExecError> {
    let wait = entry.config().max_wait();

    // Held for the whole attempt; drop releases on every exit path.
    let _permit = entry.gate().try_acquire(wait).ok_or(ExecError::BulkheadRejected {
        reason: RejectReason::WaitTimeout,
    })?;

    let completion = match limit {
        Some(limit) => {
            let task = Arc::clone(task);
            let pool = Arc::clone(entry.workers());
            entry.workers().try_enqueue(
                CancelToken::new(),
                move || run_with_deadline(task, limit, &pool),
                wait,
            )?
        }
        None => {
            let task = Arc::clone(task);
            entry.workers().try_enqueue(
                CancelToken::new(),
                move || (*task)().map_err(ExecError::Task),
                wait,
            )?
        }
    };

    completion.wait()
}

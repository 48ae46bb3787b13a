//! Core execution machinery: pools, admission, deadlines, retry.

pub mod cancel;
pub mod error;
pub mod gate;
pub mod queue;
pub mod registry;
pub mod retry;
pub(crate) mod timed;
pub mod worker_pool;

pub use cancel::{cancel_requested, CancelToken};
pub use error::{ExecError, RejectReason, TaskError};
pub use gate::{AdmissionGate, Permit};
pub use queue::BoundedQueue;
pub use registry::{PoolEntry, PoolRegistry};
pub use retry::RetryPolicy;
pub use worker_pool::{Completion, PoolStats, WorkerPool};

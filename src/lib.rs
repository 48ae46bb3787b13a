//! # Bulwark
//!
//! Retry, bulkhead and time-limit execution policies for synchronous
//! workloads, built on the battle-tested `parking_lot` crate.
//!
//! Wrap any fallible computation in an [`Attempt`], chain the policies you
//! want, and call [`run`](Attempt::run): the task executes on a shared
//! worker pool under a concurrency ceiling, a bounded pending queue, a
//! bounded admission wait and an optional hard deadline, with fixed-delay
//! retries around the whole pipeline and an optional fallback that turns
//! the final failure into a value.
//!
//! ## Modules
//!
//! - [`attempt`] - The fluent execution façade
//! - [`core`] - Pools, admission gates, deadlines and the retry loop
//! - [`config`] - Pool capacities and default-pool constants
//! - [`util`] - Telemetry helpers
//!
//! ## Examples
//!
//! ### Retry with a fallback
//!
//! ```
//! use bulwark::Attempt;
//!
//! let report = Attempt::new(|| Err::<String, _>("upstream unavailable".into()))
//!     .retry(3, 5)
//!     .on_failure(|err| format!("degraded: {err}"))
//!     .run()?;
//! assert!(report.starts_with("degraded:"));
//! # Ok::<(), bulwark::ExecError>(())
//! ```
//!
//! ### Bulkhead isolation with a deadline
//!
//! ```
//! use bulwark::{Attempt, TaskError};
//!
//! let value = Attempt::new(|| Ok::<_, TaskError>(21 * 2))
//!     .bulkhead("docs-pool", 2, 16, 100)
//!     .time_limit(1_000)
//!     .run()?;
//! assert_eq!(value, 42);
//! # Ok::<(), bulwark::ExecError>(())
//! ```
//!
//! ### Sharing a pool across call sites
//!
//! ```
//! use bulwark::{Attempt, TaskError};
//!
//! // First caller creates the pool; later callers attach by id.
//! Attempt::new(|| Ok::<_, TaskError>(()))
//!     .bulkhead("docs-shared", 4, 32, 250)
//!     .run()?;
//!
//! let attached = Attempt::new(|| Ok::<_, TaskError>("fast"))
//!     .attach("docs-shared")?
//!     .run()?;
//! assert_eq!(attached, "fast");
//! # Ok::<(), bulwark::ExecError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod attempt;
pub mod config;
pub mod core;
pub mod util;

// Re-export the main types for convenience
pub use crate::attempt::Attempt;
pub use crate::config::{PoolConfig, RegistryConfig, DEFAULT_POOL_ID};
pub use crate::core::cancel::{cancel_requested, CancelToken};
pub use crate::core::error::{ExecError, RejectReason, TaskError};
pub use crate::core::gate::{AdmissionGate, Permit};
pub use crate::core::queue::BoundedQueue;
pub use crate::core::registry::{PoolEntry, PoolRegistry};
pub use crate::core::retry::RetryPolicy;
pub use crate::core::worker_pool::{Completion, PoolStats, WorkerPool};

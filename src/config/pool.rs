//! Pool capacity configuration and default-pool constants.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of the pool used when a caller never configures a bulkhead.
pub const DEFAULT_POOL_ID: &str = "Default-Pool-Id";

/// Concurrency ceiling of the default pool: practically unbounded.
pub const DEFAULT_MAX_CONCURRENT: usize = usize::MAX;

/// Pending-queue capacity of the default pool: practically unbounded.
pub const DEFAULT_MAX_QUEUE: usize = usize::MAX;

/// Admission wait budget of the default pool: practically unbounded.
pub const DEFAULT_MAX_WAIT_MILLIS: u64 = u64::MAX;

/// Default concurrency for explicitly-built pools: one slot per CPU.
fn default_max_concurrent() -> usize {
    num_cpus::get()
}

/// Default pending-queue capacity for explicitly-built pools.
fn default_max_queue() -> usize {
    1000
}

/// Default admission wait for explicitly-built pools: 30 seconds.
fn default_max_wait_millis() -> u64 {
    30_000
}

/// Capacities of one bulkhead pool.
///
/// `max_concurrent` caps in-flight tasks (admission permits and carrier
/// threads), `max_queue` caps tasks pending in the ingress queue, and
/// `max_wait_millis` bounds how long one admission stage may block, so a
/// single attempt waits at most twice that before being rejected.
///
/// # Example
///
/// ```
/// use bulwark::PoolConfig;
///
/// let config = PoolConfig::new()
///     .with_max_concurrent(4)
///     .with_max_queue(64)
///     .with_max_wait_millis(250);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum tasks in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Maximum tasks pending before rejection.
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,

    /// Wait budget per admission stage, in milliseconds.
    #[serde(default = "default_max_wait_millis")]
    pub max_wait_millis: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_queue: default_max_queue(),
            max_wait_millis: default_max_wait_millis(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The capacities of the shared default pool: everything at the host's
    /// practical infinity.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_queue: DEFAULT_MAX_QUEUE,
            max_wait_millis: DEFAULT_MAX_WAIT_MILLIS,
        }
    }

    /// Set the concurrency ceiling.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set the pending-queue capacity.
    #[must_use]
    pub const fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    /// Set the per-stage admission wait budget in milliseconds.
    #[must_use]
    pub const fn with_max_wait_millis(mut self, max_wait_millis: u64) -> Self {
        self.max_wait_millis = max_wait_millis;
        self
    }

    /// The admission wait budget as a `Duration`.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_millis)
    }

    /// Validate explicitly-built capacities.
    ///
    /// A zero wait budget is legal (reject immediately under contention);
    /// zero concurrency or queue capacity is not.
    ///
    /// # Errors
    ///
    /// A human-readable message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.max_queue == 0 {
            return Err("max_queue must be greater than 0".into());
        }
        Ok(())
    }
}

/// A set of named pools to pre-register, typically loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Map of pool id to its capacities.
    pub pools: HashMap<String, PoolConfig>,
}

impl RegistryConfig {
    /// Validate all pools and require at least one.
    ///
    /// # Errors
    ///
    /// A human-readable message naming the offending pool and field.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (id, pool) in &self.pools {
            if id.is_empty() {
                return Err("pool ids must be non-empty".into());
            }
            pool.validate()
                .map_err(|e| format!("pool `{id}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse a registry configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// A parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        config.validate()?;
        Ok(config)
    }
}

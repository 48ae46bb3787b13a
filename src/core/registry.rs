//! Process-wide registry mapping pool identifiers to their entries.
//!
//! Entries are created lazily on first use and live until process exit;
//! there is deliberately no removal or clearing. Creation is atomic with
//! respect to concurrent callers: for any id, exactly one entry is ever
//! constructed and the first writer's capacities win.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::{PoolConfig, RegistryConfig};
use crate::core::error::ExecError;
use crate::core::gate::AdmissionGate;
use crate::core::worker_pool::WorkerPool;

/// The (worker pool, admission gate) pair registered under one id.
#[derive(Debug)]
pub struct PoolEntry {
    workers: Arc<WorkerPool>,
    gate: Arc<AdmissionGate>,
    config: PoolConfig,
}

impl PoolEntry {
    fn new(id: &str, config: &PoolConfig) -> Self {
        Self {
            workers: Arc::new(WorkerPool::new(id, config.max_concurrent, config.max_queue)),
            gate: Arc::new(AdmissionGate::new(config.max_concurrent)),
            config: config.clone(),
        }
    }

    /// The entry's worker pool.
    #[must_use]
    pub fn workers(&self) -> &Arc<WorkerPool> {
        &self.workers
    }

    /// The entry's admission gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// The capacities the entry was created with. Later `get_or_create`
    /// calls never change these.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }
}

/// Identifier-keyed map of shared pool entries.
pub struct PoolRegistry {
    pools: RwLock<HashMap<String, Arc<PoolEntry>>>,
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolRegistry {
    /// An empty registry. Most callers want [`PoolRegistry::global`]; fresh
    /// instances exist for embedding and tests.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry, initialised on first access and never
    /// torn down before process exit.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<PoolRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Look up `id`, creating its entry from `config` if absent.
    ///
    /// First writer wins: when the entry already exists, `config` is
    /// ignored and a capacity mismatch is only logged.
    pub fn get_or_create(&self, id: &str, config: &PoolConfig) -> Arc<PoolEntry> {
        let mut pools = self.pools.write();
        if let Some(existing) = pools.get(id) {
            if existing.config() != config {
                warn!(
                    pool = id,
                    existing = ?existing.config(),
                    requested = ?config,
                    "pool already exists with different capacities, keeping the original"
                );
            }
            return Arc::clone(existing);
        }
        info!(pool = id, config = ?config, "registering pool");
        let entry = Arc::new(PoolEntry::new(id, config));
        pools.insert(id.to_owned(), Arc::clone(&entry));
        entry
    }

    /// Look up `id` without creating anything.
    ///
    /// # Errors
    ///
    /// [`ExecError::PoolNotFound`] when no entry is registered under `id`.
    pub fn get(&self, id: &str) -> Result<Arc<PoolEntry>, ExecError> {
        self.pools
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ExecError::PoolNotFound(id.to_owned()))
    }

    /// Pre-create every pool named in `config`. Existing ids keep their
    /// original capacities, like any other `get_or_create`.
    pub fn install(&self, config: &RegistryConfig) {
        for (id, pool_config) in &config.pools {
            self.get_or_create(id, pool_config);
        }
    }

    /// Ids currently registered, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.pools.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn small_config() -> PoolConfig {
        PoolConfig::new()
            .with_max_concurrent(2)
            .with_max_queue(4)
            .with_max_wait_millis(100)
    }

    #[test]
    fn get_or_create_returns_the_same_entry() {
        let registry = PoolRegistry::new();
        let first = registry.get_or_create("a", &small_config());
        let second = registry.get_or_create("a", &small_config());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn first_writer_wins_on_capacities() {
        let registry = PoolRegistry::new();
        let original = registry.get_or_create("b", &small_config());

        let bigger = PoolConfig::new()
            .with_max_concurrent(64)
            .with_max_queue(512)
            .with_max_wait_millis(9999);
        let again = registry.get_or_create("b", &bigger);

        assert!(Arc::ptr_eq(&original, &again));
        assert_eq!(again.config().max_concurrent, 2);
        assert_eq!(again.config().max_queue, 4);
    }

    #[test]
    fn get_on_missing_id_is_a_programmer_error() {
        let registry = PoolRegistry::new();
        match registry.get("nope") {
            Err(ExecError::PoolNotFound(id)) => assert_eq!(id, "nope"),
            other => panic!("expected PoolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_get_or_create_observes_one_entry() {
        let registry = Arc::new(PoolRegistry::new());
        let entries: Vec<_> = thread::scope(|scope| {
            (0..8)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    scope.spawn(move || registry.get_or_create("shared", &small_config()))
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });
        for entry in &entries[1..] {
            assert!(Arc::ptr_eq(&entries[0], entry));
        }
        assert_eq!(registry.ids(), vec!["shared".to_owned()]);
    }

    #[test]
    fn install_registers_every_configured_pool() {
        let registry = PoolRegistry::new();
        let config = RegistryConfig::from_json_str(
            r#"{"pools": {"fast": {"max_concurrent": 2, "max_queue": 8, "max_wait_millis": 50},
                           "slow": {"max_concurrent": 1, "max_queue": 2, "max_wait_millis": 500}}}"#,
        )
        .unwrap();
        registry.install(&config);

        let mut ids = registry.ids();
        ids.sort();
        assert_eq!(ids, ["fast", "slow"]);
        assert_eq!(registry.get("slow").unwrap().config().max_queue, 2);
    }
}

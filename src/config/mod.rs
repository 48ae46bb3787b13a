//! Pool configuration structures and default-pool constants.

pub mod pool;

pub use pool::{
    PoolConfig, RegistryConfig, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_QUEUE,
    DEFAULT_MAX_WAIT_MILLIS, DEFAULT_POOL_ID,
};

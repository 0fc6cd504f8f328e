//! Storage interfaces and implementations.
//!
//! The pipeline touches three concerns in the key-value store, each behind
//! its own trait:
//! - [`EventStore`]: the append-only canonical event stream plus the
//!   idempotency guards that keep it duplicate-free
//! - [`PositionStore`]: reconciliation watermarks
//! - [`RollupStore`]: materialized roll-up records with key-level TTLs

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};

mod event_store;
pub mod memory;
mod position_store;
mod rollup_store;

#[cfg(feature = "redis")]
pub mod redis;

pub use event_store::{EventStore, StreamEntry, StreamId};
pub use memory::{MemoryEventStore, MemoryPositionStore, MemoryRollupStore};
pub use position_store::PositionStore;
pub use rollup_store::{RollupFields, RollupKey, RollupStore};

#[cfg(feature = "redis")]
pub use self::redis::{RedisEventStore, RedisPositionStore, RedisRollupStore};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Every variant is treated as retryable by callers: a failed write leaves
/// the watermark where it was and the next pass re-scans the range.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stream id: {0}")]
    InvalidStreamId(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage backend not enabled: {0}")]
    BackendNotEnabled(String),
}

/// The trio of store handles the pipeline runs against.
#[derive(Clone)]
pub struct Stores {
    pub events: Arc<dyn EventStore>,
    pub positions: Arc<dyn PositionStore>,
    pub rollups: Arc<dyn RollupStore>,
}

impl Stores {
    /// Fresh in-memory stores.
    pub fn memory() -> Self {
        Self {
            events: Arc::new(MemoryEventStore::new()),
            positions: Arc::new(MemoryPositionStore::new()),
            rollups: Arc::new(MemoryRollupStore::new()),
        }
    }
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    match config.storage_type {
        StorageType::Memory => {
            info!(storage = "memory", "Storage initialized");
            Ok(Stores::memory())
        }
        #[cfg(feature = "redis")]
        StorageType::Redis => redis::connect(&config.redis, config.stream_max_len).await,
        #[cfg(not(feature = "redis"))]
        StorageType::Redis => {
            tracing::error!("Redis storage requested but 'redis' feature is not enabled");
            Err(StorageError::BackendNotEnabled("redis".to_string()))
        }
    }
}

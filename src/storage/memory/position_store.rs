//! In-memory PositionStore implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{PositionStore, Result, StorageError};

/// Watermarks held in memory.
#[derive(Default)]
pub struct MemoryPositionStore {
    positions: RwLock<HashMap<String, u64>>,
    fail_on_put: RwLock<bool>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_put(&self, fail: bool) {
        *self.fail_on_put.write().await = fail;
    }

    /// Number of positions written so far, for asserting "no mutation".
    pub async fn stored_count(&self) -> usize {
        self.positions.read().await.len()
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn get(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.positions.read().await.get(name).copied())
    }

    async fn put(&self, name: &str, block: u64) -> Result<()> {
        if *self.fail_on_put.read().await {
            return Err(StorageError::Unavailable(
                "memory store configured to fail position writes".to_string(),
            ));
        }
        self.positions.write().await.insert(name.to_string(), block);
        Ok(())
    }
}

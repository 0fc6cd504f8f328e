//! In-memory RollupStore implementation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::storage::{Result, RollupFields, RollupKey, RollupStore};

struct StoredRollup {
    fields: RollupFields,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

/// Roll-up records held in memory, honouring key-level TTLs on read.
#[derive(Default)]
pub struct MemoryRollupStore {
    records: RwLock<HashMap<RollupKey, StoredRollup>>,
}

impl MemoryRollupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL the record at `key` was last written with.
    ///
    /// `None` when the key is absent; `Some(None)` when it never expires.
    pub async fn ttl_of(&self, key: &RollupKey) -> Option<Option<Duration>> {
        self.records.read().await.get(key).map(|r| r.ttl)
    }

    /// All live keys, sorted.
    pub async fn keys(&self) -> Vec<RollupKey> {
        let now = Instant::now();
        let mut keys: Vec<RollupKey> = self
            .records
            .read()
            .await
            .iter()
            .filter(|(_, r)| r.expires_at.map_or(true, |at| at > now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl RollupStore for MemoryRollupStore {
    async fn put(
        &self,
        key: &RollupKey,
        fields: &RollupFields,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let stored = StoredRollup {
            fields: fields.clone(),
            ttl,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.records.write().await.insert(key.clone(), stored);
        Ok(())
    }

    async fn get(&self, key: &RollupKey) -> Result<Option<RollupFields>> {
        let records = self.records.read().await;
        Ok(records
            .get(key)
            .filter(|r| r.expires_at.map_or(true, |at| at > Instant::now()))
            .map(|r| r.fields.clone()))
    }
}

//! Redis PositionStore implementation.
//!
//! Stores watermarks as simple key-value pairs, one per name.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::debug;

use super::DEFAULT_KEY_PREFIX;
use crate::storage::{PositionStore, Result};

/// Redis implementation of PositionStore.
///
/// Key format: `{prefix}:position:{name}`
pub struct RedisPositionStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisPositionStore {
    /// Create a new Redis position store.
    pub async fn new(url: &str, key_prefix: Option<&str>) -> Result<Self> {
        let conn = super::connect_manager(url).await?;
        Ok(Self::from_connection(conn, key_prefix))
    }

    pub fn from_connection(conn: ConnectionManager, key_prefix: Option<&str>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.unwrap_or(DEFAULT_KEY_PREFIX).to_string(),
        }
    }

    fn position_key(&self, name: &str) -> String {
        format!("{}:position:{}", self.key_prefix, name)
    }
}

#[async_trait]
impl PositionStore for RedisPositionStore {
    async fn get(&self, name: &str) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn.get(self.position_key(name)).await?;
        Ok(value)
    }

    async fn put(&self, name: &str, block: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(self.position_key(name), block).await?;

        debug!(name = %name, block, "Stored position in Redis");
        Ok(())
    }
}

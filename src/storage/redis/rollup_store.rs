//! Redis RollupStore implementation.
//!
//! Each roll-up is a hash. Writes replace the whole hash and apply the TTL
//! inside one MULTI/EXEC so readers never see a half-written record.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::debug;

use super::DEFAULT_KEY_PREFIX;
use crate::storage::{Result, RollupFields, RollupKey, RollupStore};

pub struct RedisRollupStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisRollupStore {
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

    fn redis_key(&self, key: &RollupKey) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl RollupStore for RedisRollupStore {
    async fn put(
        &self,
        key: &RollupKey,
        fields: &RollupFields,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let redis_key = self.redis_key(key);
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let mut pipe = redis::pipe();
        pipe.atomic().del(&redis_key).ignore();
        if !items.is_empty() {
            pipe.hset_multiple(&redis_key, &items).ignore();
        }
        if let Some(ttl) = ttl {
            pipe.expire(&redis_key, ttl.as_secs() as i64).ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;

        debug!(key = %redis_key, fields = items.len(), "Stored roll-up in Redis");
        Ok(())
    }

    async fn get(&self, key: &RollupKey) -> Result<Option<RollupFields>> {
        let mut conn = self.conn.clone();
        let fields: RollupFields = conn.hgetall(self.redis_key(key)).await?;
        Ok(if fields.is_empty() { None } else { Some(fields) })
    }
}

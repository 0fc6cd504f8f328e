//! Redis storage implementations.
//!
//! Key layout (all under a configurable prefix, default `rollcall`):
//! - `{prefix}:events`: canonical event stream, one `data` field per entry
//! - `{prefix}:processed:{eventId}`: idempotency guards (`SET NX EX`)
//! - `{prefix}:position:{name}`: watermarks
//! - `{prefix}:rollup:...`: roll-up hashes with key-level TTLs

use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use redis::{aio::ConnectionManager, Client, RedisError};
use tracing::{info, warn};

use crate::config::RedisConfig;
use crate::storage::{Result, Stores};
use crate::utils::retry::connection_backoff;

mod event_store;
mod position_store;
mod rollup_store;

pub use event_store::RedisEventStore;
pub use position_store::RedisPositionStore;
pub use rollup_store::RedisRollupStore;

/// Default key prefix when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "rollcall";

/// Open a managed connection, retrying with backoff while Redis comes up.
pub async fn connect_manager(url: &str) -> Result<ConnectionManager> {
    let client = Client::open(url)?;
    let conn = (|| ConnectionManager::new(client.clone()))
        .retry(connection_backoff())
        .notify(|err: &RedisError, delay: Duration| {
            warn!(error = %err, delay = ?delay, "Redis connection failed, retrying");
        })
        .await?;

    info!("Connected to Redis");
    Ok(conn)
}

/// Build all three Redis-backed stores over one shared connection.
pub async fn connect(config: &RedisConfig, stream_max_len: Option<u64>) -> Result<Stores> {
    let conn = connect_manager(&config.url).await?;
    let prefix = config.key_prefix.as_deref();

    Ok(Stores {
        events: Arc::new(RedisEventStore::from_connection(
            conn.clone(),
            prefix,
            stream_max_len,
        )),
        positions: Arc::new(RedisPositionStore::from_connection(conn.clone(), prefix)),
        rollups: Arc::new(RedisRollupStore::from_connection(conn, prefix)),
    })
}

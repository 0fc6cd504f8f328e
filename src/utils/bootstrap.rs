//! Bootstrap utilities for rollcall binaries.
//!
//! Shared initialization code for the server and the one-shot pass binaries.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, ConfigError, LOG_ENV_VAR};

/// Initialize tracing with ROLLCALL_LOG environment variable.
///
/// Defaults to "info" level if ROLLCALL_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load and validate configuration (`config.yaml`, ROLLCALL_CONFIG, env).
pub fn load_config() -> Result<Config, ConfigError> {
    let config = Config::load(None)?;
    config.validate()?;
    info!(
        storage = ?config.storage.storage_type,
        watermark_mode = ?config.reconcile.watermark_mode,
        "Configuration loaded"
    );
    Ok(config)
}

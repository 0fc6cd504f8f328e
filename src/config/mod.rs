//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables. The struct
//! is passed explicitly into every component; nothing reads the environment
//! after startup.

mod chain;
mod pipeline;
mod server;
mod storage;

pub use chain::{ChainConfig, DEFAULT_RANGE_ERROR_CODES, DEFAULT_RANGE_ERROR_PATTERNS};
pub use pipeline::{MaterializeConfig, ReconcileConfig, WatermarkMode};
pub use server::ServerConfig;
pub use storage::{RedisConfig, StorageConfig, StorageType};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "ROLLCALL_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "ROLLCALL";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "ROLLCALL_LOG";

use serde::Deserialize;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trigger API server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Chain RPC and fetch backoff configuration.
    pub chain: ChainConfig,
    /// Reconciliation pass configuration.
    pub reconcile: ReconcileConfig,
    /// Materialization pass configuration.
    pub materialize: MaterializeConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix, `__` separated
    ///    (e.g. `ROLLCALL__CHAIN__RPC_URL`)
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.api_tokens")
                    .with_list_parse_key("chain.range_windows")
                    .with_list_parse_key("chain.range_error_patterns")
                    .with_list_parse_key("chain.range_error_codes")
                    .with_list_parse_key("reconcile.event_types"),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chain.validate()?;
        self.reconcile.validate()?;
        self.materialize.validate()?;
        if self.storage.guard_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "storage.guard_ttl_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.chain.rpc_url = "http://localhost:8545".to_string();
        config.chain.contract_address = "0x00000000000000000000000000000000000000aa".to_string();
        config.chain.retry_delay_ms = 0;
        config.server.api_tokens = vec!["test-token".to_string()];
        config
    }
}

#[cfg(test)]
mod tests;

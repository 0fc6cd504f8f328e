//! Trigger API server configuration.

use std::time::Duration;

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port for the trigger REST API.
    pub port: u16,
    /// Shared secrets accepted as bearer tokens (or `x-cron-secret`).
    pub api_tokens: Vec<String>,
    /// Wall-clock budget for one reconcile or materialize invocation.
    /// Keep below the scheduler's own execution limit.
    pub invocation_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_tokens: Vec::new(),
            invocation_timeout_secs: 55,
        }
    }
}

impl ServerConfig {
    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

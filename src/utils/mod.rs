//! Shared helpers for binaries and pipeline stages.

pub mod bootstrap;
#[cfg(feature = "otel")]
pub mod metrics;
pub mod retry;

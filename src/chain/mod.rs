//! Chain access: RPC provider seam, log decoding and the adaptive fetcher.
//!
//! The reconciliation core only needs two provider operations, "current
//! block number" and "logs matching topics over a block range". Everything
//! provider-specific (transport, error wording) stays behind
//! [`ChainProvider`] and [`ErrorClassifier`].

pub mod abi;
mod classify;
mod fetcher;
mod jsonrpc;
mod provider;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use abi::{decode_log, topic0, DecodeError};
pub use classify::{ErrorClass, ErrorClassifier, PatternClassifier};
pub use fetcher::{FetchError, LogFetcher};
pub use jsonrpc::JsonRpcProvider;
pub use provider::{ChainProvider, LogFilter, ProviderError, RawLog};

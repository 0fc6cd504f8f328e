//! Pipeline wiring.
//!
//! Builds the reconciler and materializer from one [`Config`] and a set of
//! stores. Binaries and the trigger API both go through here.

use std::sync::Arc;

use tracing::info;

use crate::chain::{ChainProvider, JsonRpcProvider, LogFetcher, PatternClassifier, ProviderError};
use crate::config::{Config, ConfigError};
use crate::materialize::{MaterializeError, MaterializeReport, Materializer};
use crate::processor::EventProcessor;
use crate::reconcile::{ReconcileError, ReconcileReport, Reconciler};
use crate::storage::{init_storage, RollupFields, RollupKey, RollupStore, StorageError, Stores};

/// Errors building a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Storage init failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Chain provider init failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Reconciler, materializer and the roll-up read side, sharing one set of stores.
pub struct Pipeline {
    reconciler: Reconciler,
    materializer: Materializer,
    rollups: Arc<dyn RollupStore>,
}

impl Pipeline {
    pub fn new(
        reconciler: Reconciler,
        materializer: Materializer,
        rollups: Arc<dyn RollupStore>,
    ) -> Self {
        Self {
            reconciler,
            materializer,
            rollups,
        }
    }

    /// Connect storage and the JSON-RPC provider described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let stores = init_storage(&config.storage).await?;
        let provider = JsonRpcProvider::new(&config.chain.rpc_url, config.chain.request_timeout())?;
        info!(
            contract = %config.chain.contract_address,
            windows = ?config.chain.range_windows,
            "Pipeline initialized"
        );
        Self::with_provider(config, stores, Arc::new(provider))
    }

    /// Wire a pipeline over existing stores and provider.
    pub fn with_provider(
        config: &Config,
        stores: Stores,
        provider: Arc<dyn ChainProvider>,
    ) -> Result<Self, PipelineError> {
        let contract = config.chain.contract()?;
        let fetcher = LogFetcher::new(
            provider,
            Arc::new(PatternClassifier::from_config(&config.chain)),
            config.chain.range_windows.clone(),
            config.chain.retry_delay(),
        );
        let processor = EventProcessor::new(stores.events.clone(), config.storage.guard_ttl());
        let reconciler = Reconciler::new(
            fetcher,
            processor,
            stores.positions.clone(),
            contract,
            config.chain.block_time(),
            config.reconcile.clone(),
        );
        let materializer = Materializer::new(
            stores.events.clone(),
            stores.rollups.clone(),
            config.materialize.clone(),
        );

        Ok(Self::new(reconciler, materializer, stores.rollups))
    }

    pub async fn reconcile(&self, from_block: Option<u64>) -> Result<ReconcileReport, ReconcileError> {
        self.reconciler.run(from_block).await
    }

    pub async fn materialize(&self) -> Result<MaterializeReport, MaterializeError> {
        self.materializer.run().await
    }

    pub async fn rollup(&self, key: &RollupKey) -> Result<Option<RollupFields>, StorageError> {
        self.rollups.get(key).await
    }
}

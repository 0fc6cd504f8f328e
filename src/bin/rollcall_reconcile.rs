//! rollcall-reconcile: One reconciliation pass
//!
//! Runs a single bounded pass against the configured chain and store, prints
//! the report as JSON and exits. Intended for cron-style schedulers that run
//! a command instead of calling the HTTP trigger.
//!
//! ## Usage
//! ```text
//! rollcall-reconcile [FROM_BLOCK]
//! ```
//! `FROM_BLOCK` overrides the watermark-derived start block for this pass.
//!
//! ## Configuration
//! Same sources as rollcall-server. The pass is bounded by
//! `server.invocation_timeout_secs`.

use tracing::{error, info};

use rollcall::pipeline::Pipeline;
use rollcall::utils::bootstrap::{init_tracing, load_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let from_block = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u64>())
        .transpose()
        .map_err(|e| format!("FROM_BLOCK must be a block number: {e}"))?;

    let config = load_config()?;
    let budget = config.server.invocation_timeout();
    info!(from_block = ?from_block, "starting rollcall-reconcile");

    let pipeline = Pipeline::from_config(&config).await?;
    let report = match tokio::time::timeout(budget, pipeline.reconcile(from_block)).await {
        Ok(result) => result?,
        Err(_) => {
            error!(budget_secs = budget.as_secs(), "reconcile pass exceeded its time budget");
            return Err("reconcile pass timed out".into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

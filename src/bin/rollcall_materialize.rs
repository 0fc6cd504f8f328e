//! rollcall-materialize: One materialization pass
//!
//! Rebuilds the hourly, daily, campaign and global roll-ups from the trailing
//! window of canonical events, prints the report as JSON and exits.
//!
//! ## Configuration
//! Same sources as rollcall-server. `materialize.window_secs` and
//! `materialize.batch_size` bound the pass.

use tracing::{error, info};

use rollcall::pipeline::Pipeline;
use rollcall::utils::bootstrap::{init_tracing, load_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config = load_config()?;
    let budget = config.server.invocation_timeout();
    info!(
        window_secs = config.materialize.window_secs,
        "starting rollcall-materialize"
    );

    let pipeline = Pipeline::from_config(&config).await?;
    let report = match tokio::time::timeout(budget, pipeline.materialize()).await {
        Ok(result) => result?,
        Err(_) => {
            error!(budget_secs = budget.as_secs(), "materialize pass exceeded its time budget");
            return Err("materialize pass timed out".into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

//! rollcall-server: Trigger API for the scheduler
//!
//! Serves the reconcile/materialize triggers and roll-up reads over HTTP.
//! An external scheduler calls the triggers on its own cadence; nothing
//! here runs on a timer.
//!
//! ## Architecture
//! ```text
//! [Scheduler] -> [rollcall-server] -> [Reconciler]   -> [JSON-RPC node]
//!                        |                 |
//!                        |                 v
//!                        +----------> [Materializer] -> [Redis / memory]
//! ```
//!
//! ## Configuration
//! - ROLLCALL_CONFIG: path to a YAML config file (default: config.yaml)
//! - ROLLCALL__SERVER__PORT: listen port (default: 8080)
//! - ROLLCALL__SERVER__API_TOKENS: accepted bearer/cron tokens
//! - ROLLCALL__CHAIN__RPC_URL, ROLLCALL__CHAIN__CONTRACT_ADDRESS
//! - ROLLCALL_LOG: tracing filter (default: info)

use std::sync::Arc;

use tracing::info;

use rollcall::api::{self, AppState};
use rollcall::pipeline::Pipeline;
use rollcall::utils::bootstrap::{init_tracing, load_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config = load_config()?;
    let addr = config.server.bind_address();
    let budget = config.server.invocation_timeout();

    info!(
        addr = %addr,
        budget_secs = budget.as_secs(),
        "starting rollcall-server"
    );

    let pipeline = Pipeline::from_config(&config).await?;
    let state = AppState::new(Arc::new(pipeline), config.server.api_tokens, budget);

    api::serve(state, &addr).await?;

    info!("rollcall-server stopped");
    Ok(())
}

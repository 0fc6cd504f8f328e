//! Trigger API.
//!
//! HTTP surface for the external scheduler:
//! - `POST /api/reconcile`: run a reconciliation pass (optional `fromBlock`)
//! - `POST /api/materialize`: rebuild roll-ups
//! - `GET /api/rollups/global`, `GET /api/rollups/{kind}/{key}`: read a roll-up
//! - `GET /api/health`: liveness, no auth
//!
//! Everything but health requires a configured token, checked before any
//! work starts.

mod auth;
mod error;
mod routes;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::ApiError;

use crate::pipeline::Pipeline;

/// Header accepted as an alternative to a bearer token.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    tokens: Arc<HashSet<String>>,
    budget: Duration,
}

impl AppState {
    /// `budget` bounds each reconcile/materialize invocation.
    pub fn new(pipeline: Arc<Pipeline>, tokens: impl IntoIterator<Item = String>, budget: Duration) -> Self {
        let tokens: HashSet<String> = tokens.into_iter().filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            warn!("No API tokens configured, every protected request will be rejected");
        }
        Self {
            pipeline,
            tokens: Arc::new(tokens),
            budget,
        }
    }
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/reconcile", post(routes::reconcile))
        .route("/api/materialize", post(routes::materialize))
        .route("/api/rollups/global", get(routes::global_rollup))
        .route("/api/rollups/:kind/:key", get(routes::rollup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/api/health", get(routes::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the trigger API on `addr` and serve until Ctrl-C.
pub async fn serve(
    state: AppState,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Trigger API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests;

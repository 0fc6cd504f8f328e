//! Trigger API handlers.

use std::future::Future;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::materialize::MaterializeReport;
use crate::reconcile::ReconcileReport;
use crate::storage::{RollupFields, RollupKey};

/// `fromBlock` override, from the query string or a JSON body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReconcileParams {
    from_block: Option<u64>,
}

/// Run `fut` within the invocation budget.
async fn within_budget<T, E, F>(budget: Duration, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, E>>,
    ApiError: From<E>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError::Timeout),
    }
}

pub(super) async fn health() -> StatusCode {
    StatusCode::OK
}

pub(super) async fn reconcile(
    State(state): State<AppState>,
    query: Result<Query<ReconcileParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<ReconcileReport>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let from_block = match query.from_block {
        Some(block) => Some(block),
        None if body.iter().all(u8::is_ascii_whitespace) => None,
        None => {
            serde_json::from_slice::<ReconcileParams>(&body)
                .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?
                .from_block
        }
    };

    let report = within_budget(state.budget, state.pipeline.reconcile(from_block)).await?;
    Ok(Json(report))
}

pub(super) async fn materialize(
    State(state): State<AppState>,
) -> Result<Json<MaterializeReport>, ApiError> {
    let report = within_budget(state.budget, state.pipeline.materialize()).await?;
    Ok(Json(report))
}

pub(super) async fn rollup(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
) -> Result<Json<RollupFields>, ApiError> {
    let key = RollupKey::from_parts(&kind, Some(&key))
        .ok_or_else(|| ApiError::BadRequest(format!("unknown roll-up kind: {kind}")))?;
    read_rollup(&state, &key).await
}

pub(super) async fn global_rollup(
    State(state): State<AppState>,
) -> Result<Json<RollupFields>, ApiError> {
    read_rollup(&state, &RollupKey::Global).await
}

async fn read_rollup(state: &AppState, key: &RollupKey) -> Result<Json<RollupFields>, ApiError> {
    match state.pipeline.rollup(key).await? {
        Some(fields) => Ok(Json(fields)),
        None => Err(ApiError::NotFound(format!(
            "no activity observed yet for {key}"
        ))),
    }
}

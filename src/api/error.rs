//! API error types and response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::materialize::MaterializeError;
use crate::reconcile::ReconcileError;
use crate::storage::StorageError;

/// API error type that converts to appropriate HTTP responses.
///
/// Internal details are logged with a trace id and never returned.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or unknown token. No work was done.
    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The invocation exceeded its wall-clock budget.
    #[error("invocation timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<MaterializeError> for ApiError {
    fn from(err: MaterializeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    trace_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let trace_id = Uuid::new_v4().to_string();
        let (status, error) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Timeout => {
                tracing::warn!(%trace_id, "invocation exceeded its time budget");
                (StatusCode::GATEWAY_TIMEOUT, "invocation timed out".to_string())
            }
            Self::Internal(err) => {
                tracing::error!(%trace_id, error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error, trace_id })).into_response()
    }
}

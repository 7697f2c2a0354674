//! HTTP error mapping for hcm-cms
//!
//! Every handler error becomes `{"error": {"code", "message"}}` with a status
//! derived from the core error kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hcm_common::{Error, StorageError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No live admin session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Core error, status chosen by kind
    #[error(transparent)]
    Core(#[from] Error),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Core(Error::Storage(err))
    }
}

fn core_parts(err: Error) -> (StatusCode, &'static str, String) {
    match err {
        Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        Error::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", msg),
        Error::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
        Error::Storage(StorageError::TooLarge { size, limit }) => (
            StatusCode::BAD_REQUEST,
            "FILE_TOO_LARGE",
            format!("upload of {} bytes exceeds the {} byte limit", size, limit),
        ),
        Error::Storage(e) => {
            error!("Asset storage failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_FAILED",
                "Could not store the uploaded file".to_string(),
            )
        }
        // Already logged with the orphaned reference by the coordinator
        Error::OrphanedAsset { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "WRITE_FAILED",
            "The change could not be saved".to_string(),
        ),
        other => {
            error!("Request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Core(err) => core_parts(err),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

use crate::error::StoreReadError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// No snapshot has been written yet
    #[error("No data yet")]
    NotReady,

    /// Snapshot exists but could not be loaded
    #[error("Snapshot unavailable: {0}")]
    Internal(String),
}

impl From<StoreReadError> for ApiError {
    fn from(e: StoreReadError) -> Self {
        if e.is_missing() {
            Self::NotReady
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let Self::Internal(msg) = &self {
            tracing::error!(error = %msg, "Failed to load snapshot");
        }

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

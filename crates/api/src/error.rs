//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sensor_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request rejected before reaching the store
    #[error("{0}")]
    BadRequest(String),

    /// Requested sensor does not exist
    #[error("{0}")]
    NotFound(String),

    /// Store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Constraint(_)) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        metrics::counter!("sensor_api_errors_total", "status" => status.as_str().to_string())
            .increment(1);

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

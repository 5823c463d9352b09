use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::directory::DirectoryError;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request fields
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Result type for HTTP handlers.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Directory(DirectoryError::UnknownCall(_))
            | AppError::Directory(DirectoryError::UnknownClient(_)) => StatusCode::NOT_FOUND,
            AppError::Directory(DirectoryError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        }
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

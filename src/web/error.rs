//! API error handling for the file storage API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::FileStoreError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable error kind.
    pub code: &'static str,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error kind.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Message sent to the client.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<FileStoreError> for ApiError {
    fn from(err: FileStoreError) -> Self {
        let code = err.code();
        let (status, message) = match &err {
            FileStoreError::UnsupportedType(_) => {
                (StatusCode::BAD_REQUEST, "Unsupported file type.".to_string())
            }
            FileStoreError::PayloadTooLarge { max_bytes } => (
                StatusCode::BAD_REQUEST,
                format!("File too large (max {} bytes).", max_bytes),
            ),
            FileStoreError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found.".to_string()),
            FileStoreError::StorageInconsistent(_) => (
                StatusCode::NOT_FOUND,
                "File not found on server.".to_string(),
            ),
            FileStoreError::MetadataWriteFailed(_) => {
                tracing::error!(error = %err, "Metadata write failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error saving file metadata.".to_string(),
                )
            }
            FileStoreError::StorageWriteFailed(_) => {
                tracing::error!(error = %err, "Storage write failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error saving the file.".to_string(),
                )
            }
            FileStoreError::StorageDeleteFailed(_) => {
                tracing::error!(error = %err, "Storage delete failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error deleting the file from server.".to_string(),
                )
            }
            FileStoreError::MetadataReadFailed(_) => {
                tracing::error!(error = %err, "Metadata read failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error retrieving the file.".to_string(),
                )
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };
        Self::new(status, code, message)
    }
}

//! Error types for the Docsync server

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::DocumentError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Client bytes are not a document of the expected shape
    #[error("Invalid document: {0}")]
    Decode(#[source] DocumentError),

    /// The CRDT engine rejected a merge or the merged document could not be read
    #[error("Merge failed: {0}")]
    Merge(#[source] DocumentError),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    #[error("Storage write failed: {0}")]
    StorageWrite(#[source] sqlx::Error),

    #[error("Storage timed out after {0:?}")]
    StorageTimeout(Duration),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Decode(e) => {
                tracing::error!("Rejected client document: {}", e);
                "Failed to decode document"
            }
            AppError::Merge(e) => {
                tracing::error!("Merge error: {}", e);
                "Failed to merge document"
            }
            AppError::StorageUnavailable(e) => {
                tracing::error!("Storage unavailable: {}", e);
                "Storage unavailable"
            }
            AppError::StorageWrite(e) => {
                tracing::error!("Storage write error: {}", e);
                "Failed to persist document"
            }
            AppError::StorageTimeout(after) => {
                tracing::error!("Storage timed out after {:?}", after);
                "Storage timed out"
            }
        };

        // Every core failure is a 500 with a single `error` string
        let body = Json(ErrorResponse {
            error: if cfg!(debug_assertions) {
                self.to_string()
            } else {
                message.to_string()
            },
        });

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_is_internal_server_error() {
        let errors = [
            AppError::Decode(DocumentError::MissingItems),
            AppError::StorageTimeout(Duration::from_secs(3)),
            AppError::StorageWrite(sqlx::Error::PoolClosed),
            AppError::Merge(DocumentError::MissingItems),
            AppError::StorageUnavailable(sqlx::Error::PoolClosed),
        ];

        for error in errors {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::StorageTimeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Storage timed out after 250ms");

        let err = AppError::Decode(DocumentError::MissingItems);
        assert_eq!(
            err.to_string(),
            "Invalid document: Document has no `items` list at its root"
        );
    }
}

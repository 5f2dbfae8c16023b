/// Unified error types for the cattle alert service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AlertError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write against the report store failed; surfaced, never retried
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// The report store could not be reached in time
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Vote target does not exist at increment time
    #[error("Vote failed: {0}")]
    Vote(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Classification service failed. Masked by the fallback result before
    /// it ever reaches a caller of the upload flow.
    #[error("Classification unavailable: {0}")]
    ClassificationUnavailable(String),

    /// Image could not be compressed
    #[error("Image compression failed: {0}")]
    CompressionFailure(String),

    /// Bearer token did not match the configured secret
    #[error("Unauthorized")]
    Unauthorized,

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AlertError {
    /// Whether a client may reasonably retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AlertError::StoreUnavailable(_) | AlertError::CompressionFailure(_)
        )
    }
}

/// Convert AlertError to HTTP response
impl IntoResponse for AlertError {
    fn into_response(self) -> Response {
        if let AlertError::Unauthorized = self {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response();
        }

        let (status, message) = match &self {
            AlertError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AlertError::NotFound(_) | AlertError::Vote(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AlertError::CompressionFailure(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AlertError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AlertError::Database(_) | AlertError::Internal(_) | AlertError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(), // Don't leak details
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "retryable": self.is_retryable(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type AlertResult<T> = Result<T, AlertError>;

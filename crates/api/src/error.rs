//! API error types
//!
//! Provides structured error responses for the debug routes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use lookout_tail::TailError;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request parameters
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Subscriber limit reached for a log
    #[error("too many viewers for log '{log}' (max {max})")]
    TooManySubscribers { log: String, max: usize },

    /// The server is shutting down
    #[error("shutting down")]
    ShuttingDown,

    /// Another CPU profile is being taken
    #[error("a profile is already being taken")]
    ProfileInProgress,

    /// Route exists but has no backing implementation in this build
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::TooManySubscribers { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::ProfileInProgress => StatusCode::CONFLICT,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::TooManySubscribers { .. } => "TOO_MANY_SUBSCRIBERS",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::ProfileInProgress => "PROFILE_IN_PROGRESS",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Create a not found error
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound(format!("{} '{}' not found", entity, id))
    }

    /// Map a subscribe failure on the named log
    pub fn from_tail(log: &str, err: TailError) -> Self {
        match err {
            TailError::MaxSubscribers { max } => Self::TooManySubscribers {
                log: log.to_string(),
                max,
            },
            TailError::Closed => Self::ShuttingDown,
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code (machine-readable)
    pub error: &'static str,
    /// Error message (human-readable)
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
        };

        tracing::warn!(
            error_code = body.error,
            error_message = %body.message,
            status = %status,
            "API error"
        );

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

//! Error types for the link server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use linksync_core::CoreError;
use linksync_sync_engine::SyncError;
use serde_json::json;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the link server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Buffer or validation error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Reconciliation error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing user identification.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Too many requests from one user.
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after_secs: u64,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Core(e) => core_status(e),
            ServerError::Sync(SyncError::Buffer(e)) => core_status(e),
            ServerError::Sync(SyncError::RemoteUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Sync(_) => StatusCode::BAD_GATEWAY,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Config(_) | ServerError::Io(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
        CoreError::Storage(_) | CoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert_eq!(
            ServerError::from(CoreError::not_found("1")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::from(CoreError::validation("name", "must not be empty")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(SyncError::unavailable("down")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(!ServerError::Unauthorized("x".into()).is_server_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
    }

    #[test]
    fn error_display() {
        let err = ServerError::RateLimited {
            retry_after_secs: 12,
        };
        assert!(err.to_string().contains("12"));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

        let err = ServerError::from(CoreError::not_found("42"));
        assert_eq!(err.to_string(), "link not found: 42");
    }
}

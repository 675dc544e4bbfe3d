//! Error types for the sync engine.

use linksync_core::CoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote store cannot be reached or failed server-side.
    #[error("remote store unavailable: {message}")]
    RemoteUnavailable {
        /// Error message.
        message: String,
    },

    /// The remote store refused an operation on one document.
    #[error("remote store rejected {id}: {message}")]
    RemoteRejected {
        /// Document id, or `*` for collection-level requests.
        id: String,
        /// Error message.
        message: String,
    },

    /// A request or response could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local buffer error.
    #[error("buffer error: {0}")]
    Buffer(#[from] CoreError),
}

impl SyncError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Creates a per-document rejection.
    pub fn rejected(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Returns true if the remote store as a whole is unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SyncError::RemoteUnavailable { .. })
    }

    /// Returns true if a later run may succeed without any local change.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::RemoteUnavailable { .. } => true,
            SyncError::Buffer(CoreError::Storage(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::unavailable("connection refused").is_retryable());
        assert!(!SyncError::rejected("1", "bad request").is_retryable());
        assert!(!SyncError::Protocol("garbage".into()).is_retryable());
        assert!(!SyncError::Buffer(CoreError::not_found("1")).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::unavailable("timeout");
        assert_eq!(err.to_string(), "remote store unavailable: timeout");
        assert!(err.is_unavailable());

        let err = SyncError::rejected("42", "no such document");
        assert!(err.to_string().contains("42"));
        assert!(!err.is_unavailable());
    }
}

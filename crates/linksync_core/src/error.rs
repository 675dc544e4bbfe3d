//! Error types for linksync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in buffer operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced link does not exist in the buffer.
    #[error("link not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// Input failed validation before any mutation happened.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field, as it appears on the wire.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] linksync_storage::StorageError),

    /// JSON encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a validation error for the given field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true for [`CoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }

    /// Returns true for [`CoreError::Validation`].
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::not_found("42");
        assert_eq!(err.to_string(), "link not found: 42");

        let err = CoreError::validation("name", "must not be empty");
        assert_eq!(err.to_string(), "invalid name: must not be empty");
    }

    #[test]
    fn error_classification() {
        assert!(CoreError::not_found("1").is_not_found());
        assert!(!CoreError::not_found("1").is_validation());
        assert!(CoreError::validation("iconUrl", "bad").is_validation());
    }
}

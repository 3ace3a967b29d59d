//! Registry error types.

use thiserror::Error;

/// Registry errors.
///
/// A missing record is never an error: reads return `Ok(None)`.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// SQL backend error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Key-value backend request failed.
    #[error("Registry {operation} failed: {message}")]
    Backend { operation: String, message: String },

    /// A stored record could not be decoded.
    #[error("Corrupt registry record for {principal_id}: {message}")]
    CorruptRecord {
        principal_id: String,
        message: String,
    },
}

impl RegistryError {
    /// Create a backend error.
    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a corrupt record error.
    pub fn corrupt(principal_id: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::CorruptRecord {
            principal_id: principal_id.into(),
            message: message.into(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

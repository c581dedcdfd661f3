//! Store error types

use thiserror::Error;

/// Errors raised by document store operations
///
/// Every variant is fatal for the invocation that hit it; callers propagate it
/// so the delivery layer can retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document does not exist (raised by `update`)
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Path is not a valid document or collection path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Write payload was rejected
    #[error("Invalid write on {path}: {reason}")]
    InvalidWrite {
        /// Target path
        path: String,
        /// Why the write was rejected
        reason: String,
    },

    /// Backend failure (network, storage engine, injected fault)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create an invalid write error
    pub fn invalid_write(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidWrite {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

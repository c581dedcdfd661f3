//! Error types for the versioning core

use revisor_store::StoreError;
use thiserror::Error;

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that abort a versioning invocation
///
/// Missing history entries and missing backup slots are not errors; they are
/// reported as soft outcomes by the navigator.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A store call failed; the whole invocation should be retried
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A version id could not be parsed
    #[error("Invalid version id: {0}")]
    InvalidVersionId(String),

    /// A stored history entry does not have the expected shape
    #[error("Corrupt history entry at {path}: {reason}")]
    CorruptEntry {
        /// Entry path
        path: String,
        /// What is wrong with it
        reason: String,
    },
}

impl HistoryError {
    /// Create an InvalidVersionId error
    pub fn invalid_version_id(raw: impl Into<String>) -> Self {
        Self::InvalidVersionId(raw.into())
    }

    /// Create a CorruptEntry error
    pub fn corrupt_entry(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptEntry {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the invocation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, HistoryError::Store(StoreError::Backend(_) | StoreError::Io(_)))
    }
}

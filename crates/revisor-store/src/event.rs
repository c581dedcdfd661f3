//! Trigger payload: one write observed on one document

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Fields;

/// Kind of write a [`ChangeEvent`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// Document appeared
    Create,
    /// Document existed before and after
    Modify,
    /// Document disappeared
    Delete,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Create => write!(f, "Create"),
            ChangeType::Modify => write!(f, "Modify"),
            ChangeType::Delete => write!(f, "Delete"),
        }
    }
}

/// Before/after snapshots of a single document write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Document path
    pub path: String,
    /// State before the write, `None` if the document did not exist
    pub before: Option<Fields>,
    /// State after the write, `None` if the document was deleted
    pub after: Option<Fields>,
    /// Event time; unique per path and increasing
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create a new change event
    pub fn new(
        path: impl Into<String>,
        before: Option<Fields>,
        after: Option<Fields>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
            timestamp,
        }
    }

    /// Classify the write; `None` when neither side exists
    pub fn change_type(&self) -> Option<ChangeType> {
        match (&self.before, &self.after) {
            (None, Some(_)) => Some(ChangeType::Create),
            (Some(_), Some(_)) => Some(ChangeType::Modify),
            (Some(_), None) => Some(ChangeType::Delete),
            (None, None) => None,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .change_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "Noop".to_string());
        write!(
            f,
            "[{}] {} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            kind,
            self.path
        )
    }
}

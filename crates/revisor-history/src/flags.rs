//! Flag protocol: control fields read from and cleared on live documents

use std::fmt;

use revisor_store::{DocumentStore, Fields, Patch, StoreError, Value};
use tracing::debug;

use crate::{entry::VersionId, error::Result};

pub use revisor_config::ControlFields;

/// Where a live document's version pointer stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointer {
    /// No pointer: the document is its own latest state
    Live,
    /// Parked on a history entry
    Parked(VersionId),
    /// Pointer field present but not a version id
    Invalid(String),
}

/// Request decoded from a document's control fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryCommand {
    /// No request, a plain edit
    None,
    /// Restore after delete
    Restore,
    /// Jump to a version; `None` when the target is not a valid id
    Goto(Option<VersionId>),
    /// Step back
    Undo,
    /// Step forward
    Redo,
}

impl fmt::Display for HistoryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryCommand::None => write!(f, "none"),
            HistoryCommand::Restore => write!(f, "restore"),
            HistoryCommand::Goto(Some(target)) => write!(f, "goto({})", target),
            HistoryCommand::Goto(None) => write!(f, "goto(invalid)"),
            HistoryCommand::Undo => write!(f, "undo"),
            HistoryCommand::Redo => write!(f, "redo"),
        }
    }
}

/// Reads and clears control fields
#[derive(Debug, Clone)]
pub struct FlagProtocol {
    fields: ControlFields,
}

impl FlagProtocol {
    /// Create a protocol over the configured field names
    pub fn new(fields: ControlFields) -> Self {
        Self { fields }
    }

    /// Field names in use
    pub fn fields(&self) -> &ControlFields {
        &self.fields
    }

    pub fn is_restoring(&self, doc: &Fields) -> bool {
        doc.contains_key(&self.fields.restore)
    }

    pub fn is_going_to(&self, doc: &Fields) -> bool {
        doc.contains_key(&self.fields.goto)
    }

    pub fn is_undoing(&self, doc: &Fields) -> bool {
        doc.contains_key(&self.fields.undo)
    }

    pub fn is_redoing(&self, doc: &Fields) -> bool {
        doc.contains_key(&self.fields.redo)
    }

    /// Pointer present
    pub fn can_redo(&self, doc: &Fields) -> bool {
        doc.contains_key(&self.fields.version)
    }

    /// Any request field present
    pub fn is_history_transaction(&self, doc: &Fields) -> bool {
        self.fields.requests().iter().any(|name| doc.contains_key(*name))
    }

    /// Decode the pointer field
    pub fn pointer(&self, doc: &Fields) -> Pointer {
        match doc.get(&self.fields.version) {
            None => Pointer::Live,
            Some(value) => match version_of(value) {
                Some(id) => Pointer::Parked(id),
                None => Pointer::Invalid(value.to_string()),
            },
        }
    }

    /// Decode the request, restore > goto > undo > redo
    pub fn decode(&self, doc: &Fields) -> HistoryCommand {
        if self.is_restoring(doc) {
            HistoryCommand::Restore
        } else if let Some(target) = doc.get(&self.fields.goto) {
            HistoryCommand::Goto(version_of(target))
        } else if self.is_undoing(doc) {
            HistoryCommand::Undo
        } else if self.is_redoing(doc) {
            HistoryCommand::Redo
        } else {
            HistoryCommand::None
        }
    }

    /// Control fields added or changed by a write
    pub fn stray<'a>(&'a self, before: &Fields, after: &Fields) -> Vec<&'a str> {
        self.fields
            .all()
            .into_iter()
            .filter(|name| match after.get(*name) {
                Some(value) => before.get(*name) != Some(value),
                None => false,
            })
            .collect()
    }

    /// Remove control fields from a live document
    ///
    /// A document that no longer exists has nothing to clean.
    pub async fn clean_flags(
        &self,
        store: &dyn DocumentStore,
        path: &str,
        names: &[&str],
    ) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        match store.update(path, Patch::deletes(names.iter().copied())).await {
            Ok(()) => {
                debug!(path = %path, fields = ?names, "Cleaned control fields");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                debug!(path = %path, "Document gone before flag cleanup");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every control field
    pub async fn clean_all(&self, store: &dyn DocumentStore, path: &str) -> Result<()> {
        self.clean_flags(store, path, &self.fields.all()).await
    }
}

fn version_of(value: &Value) -> Option<VersionId> {
    match value {
        Value::String(raw) => VersionId::parse(raw).ok(),
        Value::Timestamp(ts) => Some(VersionId::from_timestamp(*ts)),
        _ => None,
    }
}

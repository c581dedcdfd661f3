//! Configuration types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default watched collection pattern
pub const DEFAULT_COLLECTION: &str = "documents/{documentId}";
/// Default history root (a document path)
pub const DEFAULT_HISTORY_ROOT: &str = "history/database";

/// Names of the five control fields superimposed on a versioned document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlFields {
    /// Restore-after-delete request
    pub restore: String,
    /// Jump-to-version request; the value is the target version id
    pub goto: String,
    /// Undo request
    pub undo: String,
    /// Redo request
    pub redo: String,
    /// Current version pointer; absent means live
    pub version: String,
}

impl ControlFields {
    /// All five names, request fields first, pointer last
    pub fn all(&self) -> [&str; 5] {
        [
            self.restore.as_str(),
            self.goto.as_str(),
            self.undo.as_str(),
            self.redo.as_str(),
            self.version.as_str(),
        ]
    }

    /// The four request fields (everything but the pointer)
    pub fn requests(&self) -> [&str; 4] {
        [
            self.restore.as_str(),
            self.goto.as_str(),
            self.undo.as_str(),
            self.redo.as_str(),
        ]
    }

    /// Whether a top-level field name is one of the control fields
    pub fn contains(&self, name: &str) -> bool {
        self.all().contains(&name)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.all() {
            if name.trim().is_empty() {
                return Err(ConfigError::validation("Control field names must not be empty"));
            }
            if name.contains('.') {
                return Err(ConfigError::validation(format!(
                    "Control field name '{}' must be a top-level field",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(ConfigError::validation(format!(
                    "Control field name '{}' is used twice",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for ControlFields {
    fn default() -> Self {
        Self {
            restore: "restore".to_string(),
            goto: "goto".to_string(),
            undo: "undo".to_string(),
            redo: "redo".to_string(),
            version: "_version".to_string(),
        }
    }
}

/// Immutable versioning configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Watched document path pattern; `{name}` segments match any id
    pub collection: String,
    /// Document path under which every history path is rooted
    pub history_root: String,
    /// Keep a backup slot on delete and honour restore requests
    pub enable_restore: bool,
    /// Control field names
    pub fields: ControlFields,
    /// Dotted field paths excluded from versioning
    pub ignore_fields: Vec<String>,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            history_root: DEFAULT_HISTORY_ROOT.to_string(),
            enable_restore: true,
            fields: ControlFields::default(),
            ignore_fields: Vec::new(),
        }
    }
}

impl VersioningConfig {
    /// Check the invariants every component relies on
    pub fn validate(&self) -> Result<()> {
        self.fields.validate()?;

        let pattern = segment_count(&self.collection);
        if pattern == 0 || pattern % 2 != 0 {
            return Err(ConfigError::validation(format!(
                "Collection pattern '{}' must address documents",
                self.collection
            )));
        }

        let root = segment_count(&self.history_root);
        if root == 0 || root % 2 != 0 {
            return Err(ConfigError::validation(format!(
                "History root '{}' must be a document path",
                self.history_root
            )));
        }

        if let Some(empty) = self.ignore_fields.iter().find(|f| f.trim().is_empty()) {
            return Err(ConfigError::validation(format!(
                "Ignored field '{}' is empty",
                empty
            )));
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn segment_count(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

//! Field filter: flatten/nest and tracked vs ignored classification
//!
//! History entries store documents flattened to dotted paths
//! (`{"meta": {"title": "x"}}` becomes `{"meta.title": "x"}`). Maps are
//! descended into; every other value, timestamps included, is a leaf. An empty
//! map is kept as a leaf so it survives a round trip.

use revisor_config::{ControlFields, VersioningConfig};
use revisor_store::{Fields, Value};

/// Flatten nested maps into dotted keys
pub fn flatten(doc: &Fields) -> Fields {
    let mut flat = Fields::new();
    flatten_into(&mut flat, None, doc);
    flat
}

fn flatten_into(flat: &mut Fields, prefix: Option<&str>, doc: &Fields) {
    for (key, value) in doc {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Map(nested) if !nested.is_empty() => flatten_into(flat, Some(&path), nested),
            leaf => {
                flat.insert(path, leaf.clone());
            }
        }
    }
}

/// Rebuild nested maps from dotted keys
pub fn nest(flat: &Fields) -> Fields {
    let mut doc = Fields::new();
    for (path, value) in flat {
        insert_path(&mut doc, path, value.clone());
    }
    doc
}

fn insert_path(doc: &mut Fields, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Map(Fields::new()));
            if !slot.is_map() {
                *slot = Value::Map(Fields::new());
            }
            if let Value::Map(nested) = slot {
                insert_path(nested, rest, value);
            }
        }
    }
}

/// Decides which fields are versioned
#[derive(Debug, Clone)]
pub struct FieldFilter {
    ignored: Vec<String>,
    control: ControlFields,
}

impl FieldFilter {
    /// Create a filter from ignored dotted paths and the control field names
    pub fn new(ignored: Vec<String>, control: ControlFields) -> Self {
        Self { ignored, control }
    }

    /// Create a filter from configuration
    pub fn from_config(config: &VersioningConfig) -> Self {
        Self::new(config.ignore_fields.clone(), config.fields.clone())
    }

    /// Whether a dotted path is ignored (exact match or below an ignored prefix)
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignored.iter().any(|ignored| {
            path == ignored
                || (path.len() > ignored.len()
                    && path.starts_with(ignored.as_str())
                    && path.as_bytes()[ignored.len()] == b'.')
        })
    }

    /// Whether a dotted path belongs to a control field
    pub fn is_control(&self, path: &str) -> bool {
        let head = path.split('.').next().unwrap_or(path);
        self.control.contains(head)
    }

    /// Flattened versioned fields of a document
    pub fn tracked(&self, doc: &Fields) -> Fields {
        flatten(doc)
            .into_iter()
            .filter(|(path, _)| !self.is_control(path) && !self.is_ignored(path))
            .collect()
    }

    /// Flattened ignored fields of a document
    pub fn ignored_values(&self, doc: &Fields) -> Fields {
        flatten(doc)
            .into_iter()
            .filter(|(path, _)| !self.is_control(path) && self.is_ignored(path))
            .collect()
    }

    /// Whether the versioned fields differ between two snapshots
    pub fn changed(&self, before: &Fields, after: &Fields) -> bool {
        self.tracked(before) != self.tracked(after)
    }

    /// Live document for a historical snapshot
    ///
    /// Versioned fields come from `snapshot` (flattened); ignored fields come
    /// from `live`. Control fields are dropped from both.
    pub fn rebuild(&self, snapshot: &Fields, live: &Fields) -> Fields {
        let mut flat: Fields = snapshot
            .iter()
            .filter(|(path, _)| !self.is_control(path) && !self.is_ignored(path))
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect();
        flat.extend(self.ignored_values(live));
        nest(&flat)
    }
}

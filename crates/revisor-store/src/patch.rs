//! Write payloads with a field-delete sentinel

use std::collections::BTreeMap;

use crate::value::{Fields, Value};

/// Value slot in a write payload
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Write this value
    Value(Value),
    /// Remove the field (not the same as writing `Value::Null`)
    Delete,
}

/// How `set` treats the existing document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Deep-merge into the existing document instead of replacing it
    pub merge: bool,
}

impl SetOptions {
    /// Replace the whole document
    pub fn overwrite() -> Self {
        Self { merge: false }
    }

    /// Merge into the existing document, honouring delete sentinels
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// Top-level field name to [`FieldValue`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: BTreeMap<String, FieldValue>,
}

impl Patch {
    /// Create an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that removes every named field
    pub fn deletes<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        keys.into_iter().fold(Self::new(), |patch, key| patch.delete(key))
    }

    /// Builder: write a value
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), FieldValue::Value(value.into()));
        self
    }

    /// Builder: remove a field
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.fields.insert(key.into(), FieldValue::Delete);
        self
    }

    /// Insert a raw slot
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    /// Iterate slots in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Get a slot
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the patch writes nothing
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether any slot is a delete sentinel
    pub fn has_deletes(&self) -> bool {
        self.fields.values().any(|v| matches!(v, FieldValue::Delete))
    }

    /// Document produced by an overwriting `set`; delete sentinels are skipped
    pub fn to_document(&self) -> Fields {
        self.fields
            .iter()
            .filter_map(|(key, slot)| match slot {
                FieldValue::Value(value) => Some((key.clone(), value.clone())),
                FieldValue::Delete => None,
            })
            .collect()
    }

    /// Deep-merge into `target`: nested maps merge key by key, deletes remove
    pub fn merge_into(&self, target: &mut Fields) {
        for (key, slot) in &self.fields {
            match slot {
                FieldValue::Delete => {
                    target.remove(key);
                }
                FieldValue::Value(value) => merge_value(target, key, value),
            }
        }
    }

    /// Shallow update of `target`: values replace whole fields, deletes remove
    pub fn update_into(&self, target: &mut Fields) {
        for (key, slot) in &self.fields {
            match slot {
                FieldValue::Delete => {
                    target.remove(key);
                }
                FieldValue::Value(value) => {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

fn merge_value(target: &mut Fields, key: &str, value: &Value) {
    match (target.get_mut(key), value) {
        (Some(Value::Map(existing)), Value::Map(incoming)) => {
            for (nested_key, nested_value) in incoming {
                merge_value(existing, nested_key, nested_value);
            }
        }
        _ => {
            target.insert(key.to_string(), value.clone());
        }
    }
}

impl From<Fields> for Patch {
    fn from(fields: Fields) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(key, value)| (key, FieldValue::Value(value)))
                .collect(),
        }
    }
}

impl FromIterator<(String, FieldValue)> for Patch {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, FieldValue)> for Patch {
    fn extend<T: IntoIterator<Item = (String, FieldValue)>>(&mut self, iter: T) {
        self.fields.extend(iter);
    }
}

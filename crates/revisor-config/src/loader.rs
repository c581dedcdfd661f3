//! Configuration loading from a TOML file and the environment

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::Result,
    types::{ControlFields, VersioningConfig},
};

/// Settings as they appear in the environment (`COLLECTION`, `GOTO_FIELD`, ...)
/// or as lowercase keys in a TOML file
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSettings {
    collection: String,
    history_collection: String,
    enable_restore: bool,
    restore_field: String,
    goto_field: String,
    undo_field: String,
    redo_field: String,
    version_field: String,
    ignore_fields: IgnoreList,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IgnoreList {
    List(Vec<String>),
    Csv(String),
}

impl Default for RawSettings {
    fn default() -> Self {
        let fields = ControlFields::default();
        Self {
            collection: "documents".to_string(),
            history_collection: "history".to_string(),
            enable_restore: true,
            restore_field: fields.restore,
            goto_field: fields.goto,
            undo_field: fields.undo,
            redo_field: fields.redo,
            version_field: fields.version,
            ignore_fields: IgnoreList::Csv(String::new()),
        }
    }
}

impl RawSettings {
    fn into_config(self) -> VersioningConfig {
        let collection = self.collection.trim_matches('/').to_string();
        let collection = if collection.split('/').count() % 2 == 1 {
            format!("{}/{{documentId}}", collection)
        } else {
            collection
        };

        let ignore_fields = match self.ignore_fields {
            IgnoreList::List(items) => items,
            IgnoreList::Csv(raw) => raw.split(',').map(str::to_string).collect(),
        }
        .into_iter()
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect();

        VersioningConfig {
            collection,
            history_root: format!("{}/database", self.history_collection.trim_matches('/')),
            enable_restore: self.enable_restore,
            fields: ControlFields {
                restore: self.restore_field,
                goto: self.goto_field,
                undo: self.undo_field,
                redo: self.redo_field,
                version: self.version_field,
            },
            ignore_fields,
        }
    }
}

/// Builds a [`VersioningConfig`] from layered sources
///
/// Later sources win: the optional file first, then the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Loader reading the process environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader reading an explicit variable map instead of the process environment
    pub fn from_env_map(env: HashMap<String, String>) -> Self {
        Self {
            file: None,
            env: Some(env),
        }
    }

    /// Also read a TOML file; a missing file is skipped
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Load, normalise and validate
    pub fn load(&self) -> Result<VersioningConfig> {
        let mut builder = Config::builder();
        if let Some(path) = &self.file {
            builder = builder.add_source(File::from(path.clone()).required(false));
        }
        builder = builder.add_source(
            Environment::default()
                .try_parsing(true)
                .source(self.env.clone()),
        );

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        let config = raw.into_config();
        config.validate()?;

        debug!(
            collection = %config.collection,
            history_root = %config.history_root,
            enable_restore = config.enable_restore,
            ignored = config.ignore_fields.len(),
            "Loaded versioning configuration"
        );
        Ok(config)
    }
}

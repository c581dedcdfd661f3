//! Replay a log of document writes through the versioning handler

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use revisor_config::VersioningConfig;
use revisor_history::{drain_feed, FeedSummary, RetryPolicy, VersionDispatcher};
use revisor_store::{
    DocumentStore, FieldValue, Fields, InMemoryStore, Patch, SetOptions, StoreResult, Value,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::Command;
use crate::error::{CliError, CliResult};

/// One line of the write log
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WriteOp {
    /// Create or replace a document, or merge into it
    Set {
        path: String,
        data: Fields,
        #[serde(default)]
        merge: bool,
    },
    /// Update an existing document; a `null` field value removes the field
    Update { path: String, fields: Fields },
    /// Delete a document
    Delete { path: String },
}

impl WriteOp {
    pub fn path(&self) -> &str {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Update { path, .. } | WriteOp::Delete { path } => {
                path
            }
        }
    }

    /// Perform the write against a store
    pub async fn apply(&self, store: &dyn DocumentStore) -> StoreResult<()> {
        match self {
            WriteOp::Set { path, data, merge } => {
                let options = if *merge {
                    SetOptions::merge()
                } else {
                    SetOptions::overwrite()
                };
                store.set(path, Patch::from(data.clone()), options).await
            }
            WriteOp::Update { path, fields } => store.update(path, update_patch(fields)).await,
            WriteOp::Delete { path } => store.delete(path).await,
        }
    }
}

fn update_patch(fields: &Fields) -> Patch {
    fields
        .iter()
        .map(|(key, value)| {
            let slot = match value {
                Value::Null => FieldValue::Delete,
                other => FieldValue::Value(other.clone()),
            };
            (key.clone(), slot)
        })
        .collect()
}

/// Parse a JSON-lines write log; blank lines are skipped
pub fn parse_events(text: &str) -> CliResult<Vec<WriteOp>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| CliError::Event {
                line: index + 1,
                source,
            })
        })
        .collect()
}

/// Result of a replay
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    /// Every document after the last write settled
    pub snapshot: BTreeMap<String, Fields>,
    /// Handler outcomes across all writes, follow-up writes included
    pub summary: FeedSummary,
    /// Writes from the log that the store refused
    pub refused: usize,
}

/// Apply `ops` in order to a store seeded with `documents`, draining the change
/// feed through the dispatcher after each one
pub async fn replay(
    config: VersioningConfig,
    documents: BTreeMap<String, Fields>,
    ops: &[WriteOp],
    policy: &RetryPolicy,
) -> CliResult<ReplayOutcome> {
    let store = Arc::new(InMemoryStore::from_snapshot(documents));
    let mut feed = store.subscribe();
    let backend: Arc<dyn DocumentStore> = store.clone();
    let dispatcher = VersionDispatcher::new(Arc::new(config), backend);

    let mut summary = FeedSummary::default();
    let mut refused = 0;
    for (index, op) in ops.iter().enumerate() {
        if let Err(e) = op.apply(store.as_ref()).await {
            warn!(index, path = %op.path(), error = %e, "Write refused by store");
            refused += 1;
            continue;
        }
        let drained = drain_feed(&dispatcher, &mut feed, policy).await?;
        debug!(index, path = %op.path(), processed = drained.processed, "Write settled");
        summary += drained;
    }

    Ok(ReplayOutcome {
        snapshot: store.snapshot(),
        summary,
        refused,
    })
}

/// Replay a write log against a store snapshot
pub struct ReplayCommand {
    pub store: PathBuf,
    pub events: PathBuf,
    pub output: Option<PathBuf>,
    pub config: VersioningConfig,
}

impl ReplayCommand {
    pub fn new(
        store: PathBuf,
        events: PathBuf,
        output: Option<PathBuf>,
        config: VersioningConfig,
    ) -> Self {
        Self {
            store,
            events,
            output,
            config,
        }
    }

    fn load_snapshot(path: &Path) -> CliResult<BTreeMap<String, Fields>> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| CliError::Snapshot {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_snapshot(&self, snapshot: &BTreeMap<String, Fields>) -> CliResult<()> {
        let rendered = serde_json::to_string_pretty(snapshot)?;
        match &self.output {
            Some(path) => std::fs::write(path, rendered + "\n").map_err(|e| CliError::io(path, e)),
            None => {
                println!("{}", rendered);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Command for ReplayCommand {
    async fn execute(&self) -> CliResult<()> {
        let documents = Self::load_snapshot(&self.store)?;
        let text =
            std::fs::read_to_string(&self.events).map_err(|e| CliError::io(&self.events, e))?;
        let ops = parse_events(&text)?;
        info!(
            documents = documents.len(),
            writes = ops.len(),
            "Replaying write log"
        );

        let outcome = replay(self.config.clone(), documents, &ops, &RetryPolicy::default()).await?;
        info!(
            processed = outcome.summary.processed,
            applied = outcome.summary.applied,
            skipped = outcome.summary.skipped,
            refused = outcome.refused,
            "Replay finished"
        );
        self.write_snapshot(&outcome.snapshot)
    }
}

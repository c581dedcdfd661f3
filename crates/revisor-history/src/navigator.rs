//! Version navigator: the state machine behind restore, goto, undo and redo
//!
//! A live document is either `LIVE` (no pointer) or `PARKED(id)` (pointer set
//! to a history entry id). Leaving `LIVE` saves a `last` marker holding the
//! true latest state; returning to that marker consumes it.
//!
//! Multi-write transitions are ordered so that re-running the same event after
//! a partial failure converges on the same result: the live document is written
//! before a consumed marker or backup slot is deleted, and branch truncation
//! runs before the replacement entry is appended.

use std::fmt;
use std::sync::Arc;

use revisor_config::VersioningConfig;
use revisor_store::{Comparator, DocumentStore, Fields, Patch, SetOptions};
use tracing::{info, warn};

use crate::{
    adapter::HistoryLog,
    entry::{HistoryEntry, VersionId},
    error::Result,
    fields::FieldFilter,
    flags::{FlagProtocol, Pointer},
    paths::HistoryPaths,
};

/// Outcome of a navigator operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Backup slot written back to the document and consumed
    Restored,
    /// No backup slot; the restore request document was deleted
    NothingToRestore,
    /// Deleted document archived into its backup slot
    Archived {
        /// Redo-branch entries pruned first
        pruned: usize,
    },
    /// Deleted document's log removed (restore disabled)
    HistoryWiped {
        /// Entries removed
        removed: usize,
    },
    /// Document now parked on a history entry
    Parked {
        /// New pointer
        version: VersionId,
    },
    /// Document back at its latest state; the last marker was consumed
    Returned,
    /// Requested goto target does not exist
    VersionNotFound {
        /// Requested id
        target: VersionId,
    },
    /// Already at the oldest reachable state
    NothingToUndo,
    /// Already at the latest state
    NothingToRedo,
    /// Goto target equals the current pointer
    AlreadyAt {
        /// Current pointer
        version: VersionId,
    },
    /// Genuine edit recorded
    Committed {
        /// Id of the appended entry
        version: VersionId,
        /// Entries removed by branch truncation
        truncated: usize,
    },
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Restored => write!(f, "restored"),
            Transition::NothingToRestore => write!(f, "nothing to restore"),
            Transition::Archived { pruned } => write!(f, "archived ({} pruned)", pruned),
            Transition::HistoryWiped { removed } => write!(f, "history wiped ({} removed)", removed),
            Transition::Parked { version } => write!(f, "parked at {}", version),
            Transition::Returned => write!(f, "returned to latest"),
            Transition::VersionNotFound { target } => write!(f, "version {} not found", target),
            Transition::NothingToUndo => write!(f, "nothing to undo"),
            Transition::NothingToRedo => write!(f, "nothing to redo"),
            Transition::AlreadyAt { version } => write!(f, "already at {}", version),
            Transition::Committed { version, truncated } => {
                write!(f, "committed {} ({} truncated)", version, truncated)
            }
        }
    }
}

/// Moves documents through their history
#[derive(Clone)]
pub struct VersionNavigator {
    config: Arc<VersioningConfig>,
    store: Arc<dyn DocumentStore>,
    log: HistoryLog,
    filter: FieldFilter,
    flags: FlagProtocol,
}

impl VersionNavigator {
    /// Create a navigator over a store
    pub fn new(config: Arc<VersioningConfig>, store: Arc<dyn DocumentStore>) -> Self {
        let log = HistoryLog::new(store.clone(), HistoryPaths::new(config.history_root.clone()));
        let filter = FieldFilter::from_config(&config);
        let flags = FlagProtocol::new(config.fields.clone());
        Self {
            config,
            store,
            log,
            filter,
            flags,
        }
    }

    /// History log adapter
    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    /// Bring a deleted document back from its backup slot
    pub async fn restore(&self, path: &str) -> Result<Transition> {
        let Some(backup) = self.log.read_backup(path).await? else {
            warn!(path = %path, "No backup to restore; deleting request document");
            self.store.delete(path).await?;
            return Ok(Transition::NothingToRestore);
        };

        self.store
            .set(path, Patch::from(backup), SetOptions::overwrite())
            .await?;
        self.log.delete_backup(path).await?;

        info!(path = %path, "Restored document from backup");
        Ok(Transition::Restored)
    }

    /// Finish a restore whose document write already landed
    ///
    /// `None` when the live document is not the backup's contents, i.e. a later
    /// write replaced the request before it ran.
    pub async fn complete_restore(&self, path: &str, live: &Fields) -> Result<Option<Transition>> {
        match self.log.read_backup(path).await? {
            Some(backup) if &backup == live => {
                self.log.delete_backup(path).await?;
                info!(path = %path, "Consumed backup of an earlier restore");
                Ok(Some(Transition::Restored))
            }
            _ => Ok(None),
        }
    }

    /// Drop last markers stranded above `version` once the document is live
    pub async fn discard_markers(&self, path: &str, version: &VersionId) -> Result<usize> {
        let removed = self.log.delete_markers_after(path, version).await?;
        if removed > 0 {
            info!(path = %path, version = %version, removed, "Discarded stale last markers");
        }
        Ok(removed)
    }

    /// Archive a document that was just deleted
    pub async fn archive_on_delete(&self, path: &str, before: &Fields) -> Result<Transition> {
        if !self.config.enable_restore {
            let removed = self
                .delete_versions(path, &VersionId::EARLIEST, Comparator::GreaterOrEqual)
                .await?;
            info!(path = %path, removed, "Deleted document history");
            return Ok(Transition::HistoryWiped { removed });
        }

        let pruned = match self.flags.pointer(before) {
            Pointer::Parked(version) => {
                self.delete_versions(path, &version, Comparator::GreaterOrEqual)
                    .await?
            }
            Pointer::Live | Pointer::Invalid(_) => 0,
        };

        let backup: Fields = before
            .iter()
            .filter(|(key, _)| !self.flags.fields().contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.log.write_backup(path, backup).await?;

        info!(path = %path, pruned, "Archived deleted document");
        Ok(Transition::Archived { pruned })
    }

    /// Jump to a version
    pub async fn goto_version(
        &self,
        path: &str,
        doc: &Fields,
        target: VersionId,
        event: VersionId,
    ) -> Result<Transition> {
        let pointer = self.flags.pointer(doc);
        if pointer == Pointer::Parked(target) {
            self.flags
                .clean_flags(self.store.as_ref(), path, &[self.flags.fields().goto.as_str()])
                .await?;
            info!(path = %path, version = %target, "Goto target is current version");
            return Ok(Transition::AlreadyAt { version: target });
        }

        let Some(entry) = self.log.get(path, &target).await? else {
            warn!(path = %path, target = %target, "Goto target not found");
            self.flags
                .clean_flags(self.store.as_ref(), path, &[self.flags.fields().goto.as_str()])
                .await?;
            return Ok(Transition::VersionNotFound { target });
        };

        if pointer == Pointer::Live {
            self.save_last_marker(path, doc, event).await?;
        }

        let transition = if entry.last {
            self.write_live(path, doc, &entry, None).await?;
            self.log.remove(path, &entry.id).await?;
            Transition::Returned
        } else {
            self.write_live(path, doc, &entry, Some(entry.id)).await?;
            Transition::Parked { version: entry.id }
        };

        info!(path = %path, target = %target, outcome = %transition, "Applied goto");
        Ok(transition)
    }

    /// Step back one version
    pub async fn undo(&self, path: &str, doc: &Fields, event: VersionId) -> Result<Transition> {
        let pointer = self.flags.pointer(doc);
        // a marker left by an interrupted attempt at this event sits at `event`
        let bound = match &pointer {
            Pointer::Parked(version) => *version,
            Pointer::Live | Pointer::Invalid(_) => event,
        };

        let Some(entry) = self.log.newest_before(path, &bound).await? else {
            warn!(path = %path, "Nothing to undo");
            self.flags
                .clean_flags(self.store.as_ref(), path, &[self.flags.fields().undo.as_str()])
                .await?;
            return Ok(Transition::NothingToUndo);
        };

        if pointer == Pointer::Live {
            self.save_last_marker(path, doc, event).await?;
        }
        self.write_live(path, doc, &entry, Some(entry.id)).await?;

        info!(path = %path, version = %entry.id, "Applied undo");
        Ok(Transition::Parked { version: entry.id })
    }

    /// Step forward one version
    pub async fn redo(&self, path: &str, doc: &Fields) -> Result<Transition> {
        let fields = self.flags.fields();
        let Pointer::Parked(current) = self.flags.pointer(doc) else {
            warn!(path = %path, "Redo requested on a live document");
            self.flags
                .clean_flags(
                    self.store.as_ref(),
                    path,
                    &[fields.redo.as_str(), fields.version.as_str()],
                )
                .await?;
            return Ok(Transition::NothingToRedo);
        };

        let Some(entry) = self.log.oldest_after(path, &current).await? else {
            warn!(path = %path, version = %current, "Nothing to redo");
            self.flags
                .clean_flags(
                    self.store.as_ref(),
                    path,
                    &[fields.redo.as_str(), fields.version.as_str()],
                )
                .await?;
            return Ok(Transition::NothingToRedo);
        };

        let transition = if entry.last {
            self.write_live(path, doc, &entry, None).await?;
            self.log.remove(path, &entry.id).await?;
            Transition::Returned
        } else {
            self.write_live(path, doc, &entry, Some(entry.id)).await?;
            Transition::Parked { version: entry.id }
        };

        info!(path = %path, from = %current, outcome = %transition, "Applied redo");
        Ok(transition)
    }

    /// Remove every entry whose date satisfies `date <comparator> threshold`
    pub async fn delete_versions(
        &self,
        path: &str,
        threshold: &VersionId,
        comparator: Comparator,
    ) -> Result<usize> {
        self.log.delete_where(path, comparator, threshold).await
    }

    /// Record a genuine edit
    ///
    /// `before` is archived at the event time. When `after` is parked the
    /// future branch beyond the pointer is truncated and the pointer cleared.
    pub async fn commit_edit(
        &self,
        path: &str,
        before: &Fields,
        after: &Fields,
        event: VersionId,
    ) -> Result<Transition> {
        let pointer = self.flags.pointer(after);
        let truncated = match &pointer {
            Pointer::Parked(version) => {
                self.delete_versions(path, version, Comparator::Greater)
                    .await?
            }
            Pointer::Live | Pointer::Invalid(_) => 0,
        };

        self.log
            .append(path, &HistoryEntry::new(event, self.filter.tracked(before)))
            .await?;

        if pointer != Pointer::Live {
            self.flags
                .clean_flags(self.store.as_ref(), path, &[self.flags.fields().version.as_str()])
                .await?;
        }

        info!(path = %path, version = %event, truncated, "Committed edit");
        Ok(Transition::Committed {
            version: event,
            truncated,
        })
    }

    async fn save_last_marker(&self, path: &str, doc: &Fields, event: VersionId) -> Result<()> {
        self.log
            .append(path, &HistoryEntry::marker(event, self.filter.tracked(doc)))
            .await
    }

    /// Overwrite the live document with an entry's data
    ///
    /// Ignored fields keep their live values and every control field is
    /// dropped; `version` becomes the new pointer when given.
    async fn write_live(
        &self,
        path: &str,
        live: &Fields,
        entry: &HistoryEntry,
        version: Option<VersionId>,
    ) -> Result<()> {
        let mut doc = self.filter.rebuild(&entry.data, live);
        if let Some(version) = version {
            doc.insert(self.flags.fields().version.clone(), version.to_value());
        }
        self.store
            .set(path, Patch::from(doc), SetOptions::overwrite())
            .await?;
        Ok(())
    }
}

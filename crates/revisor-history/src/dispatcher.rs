//! Dispatcher: classifies one change event and drives the navigator
//!
//! Every write to a watched document produces one event, including the writes
//! the navigator makes itself. Those follow-up events are recognised here and
//! skipped so the handler never re-triggers on its own output.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use revisor_config::VersioningConfig;
use revisor_store::{ChangeEvent, DocumentStore, Fields};
use tracing::{debug, error, info, warn};

use crate::{
    entry::VersionId,
    error::Result,
    fields::FieldFilter,
    flags::{FlagProtocol, HistoryCommand, Pointer},
    lock::DocumentLocks,
    navigator::{Transition, VersionNavigator},
    paths::{HistoryPaths, WatchPattern},
};

/// Why an event needed no work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Event on a history log entry or backup slot
    HistoryPath,
    /// Path outside the watched collection
    Unwatched,
    /// Neither before nor after exists
    Empty,
    /// Plain document creation
    Created,
    /// Follow-up of a history transaction (flag cleanup or navigator write)
    FlagCleanup,
    /// Deletion the handler made itself when discarding a request document
    Discarded,
    /// Request no longer on the live document, or the document is gone
    Superseded,
    /// No tracked field changed and no stray flag to remove
    Unchanged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::HistoryPath => "history path",
            SkipReason::Unwatched => "unwatched path",
            SkipReason::Empty => "empty event",
            SkipReason::Created => "created",
            SkipReason::FlagCleanup => "flag cleanup",
            SkipReason::Discarded => "discarded",
            SkipReason::Superseded => "superseded",
            SkipReason::Unchanged => "unchanged",
        };
        f.write_str(reason)
    }
}

/// What the dispatcher did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing to do
    Skipped(SkipReason),
    /// New document carried an invalid request and was deleted
    Rejected,
    /// Control fields removed, no navigation
    Cleaned,
    /// Navigator ran
    Applied(Transition),
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Skipped(reason) => write!(f, "skipped ({})", reason),
            Dispatch::Rejected => write!(f, "rejected"),
            Dispatch::Cleaned => write!(f, "cleaned"),
            Dispatch::Applied(transition) => write!(f, "{}", transition),
        }
    }
}

/// Entry point invoked once per document write
#[derive(Clone)]
pub struct VersionDispatcher {
    config: Arc<VersioningConfig>,
    store: Arc<dyn DocumentStore>,
    paths: HistoryPaths,
    pattern: WatchPattern,
    filter: FieldFilter,
    flags: FlagProtocol,
    navigator: VersionNavigator,
    locks: DocumentLocks,
    discarded: Arc<Mutex<HashSet<String>>>,
}

impl VersionDispatcher {
    /// Create a dispatcher
    pub fn new(config: Arc<VersioningConfig>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            paths: HistoryPaths::new(config.history_root.clone()),
            pattern: WatchPattern::parse(&config.collection),
            filter: FieldFilter::from_config(&config),
            flags: FlagProtocol::new(config.fields.clone()),
            navigator: VersionNavigator::new(config.clone(), store.clone()),
            locks: DocumentLocks::new(),
            discarded: Arc::new(Mutex::new(HashSet::new())),
            config,
            store,
        }
    }

    /// Navigator used for transitions
    pub fn navigator(&self) -> &VersionNavigator {
        &self.navigator
    }

    /// Configuration in use
    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    /// Handle one change event
    ///
    /// Store failures are returned unchanged so the caller can redeliver the
    /// same event; every transition is safe to re-run.
    pub async fn handle(&self, event: &ChangeEvent) -> Result<Dispatch> {
        let path = event.path.as_str();

        if self.paths.is_history_path(path) {
            return Ok(Dispatch::Skipped(SkipReason::HistoryPath));
        }
        if !self.pattern.matches(path) {
            debug!(path = %path, "Ignoring unwatched path");
            return Ok(Dispatch::Skipped(SkipReason::Unwatched));
        }

        let _guard = self.locks.acquire(path).await;
        let id = VersionId::from_timestamp(event.timestamp);

        let outcome = match (&event.before, &event.after) {
            (None, Some(after)) => self.on_create(path, after).await,
            (Some(before), None) => self.on_delete(path, before).await,
            (Some(before), Some(after)) => self.on_update(path, before, after, id).await,
            (None, None) => Ok(Dispatch::Skipped(SkipReason::Empty)),
        };

        match &outcome {
            Ok(Dispatch::Skipped(reason)) => {
                debug!(path = %path, reason = %reason, "Skipped event")
            }
            Ok(dispatch) => debug!(path = %path, outcome = %dispatch, "Handled event"),
            Err(e) => error!(path = %path, event = %id, error = %e, "Versioning failed"),
        }
        outcome
    }

    async fn on_create(&self, path: &str, after: &Fields) -> Result<Dispatch> {
        match self.flags.decode(after) {
            HistoryCommand::None => Ok(Dispatch::Skipped(SkipReason::Created)),
            HistoryCommand::Restore if self.config.enable_restore => {
                let Some(live) = self.store.get(path).await? else {
                    debug!(path = %path, "Restore request deleted before it ran");
                    return Ok(Dispatch::Skipped(SkipReason::Superseded));
                };
                if !self.flags.is_restoring(&live) {
                    return Ok(match self.navigator.complete_restore(path, &live).await? {
                        Some(transition) => Dispatch::Applied(transition),
                        None => Dispatch::Skipped(SkipReason::Superseded),
                    });
                }
                let transition = self.navigator.restore(path).await?;
                if transition == Transition::NothingToRestore {
                    self.discarded.lock().insert(path.to_string());
                }
                Ok(Dispatch::Applied(transition))
            }
            command => {
                warn!(path = %path, command = %command, "Invalid request on new document; deleting it");
                self.store.delete(path).await?;
                self.discarded.lock().insert(path.to_string());
                Ok(Dispatch::Rejected)
            }
        }
    }

    async fn on_delete(&self, path: &str, before: &Fields) -> Result<Dispatch> {
        if self.discarded.lock().remove(path) {
            return Ok(Dispatch::Skipped(SkipReason::Discarded));
        }
        Ok(Dispatch::Applied(
            self.navigator.archive_on_delete(path, before).await?,
        ))
    }

    async fn on_update(
        &self,
        path: &str,
        before: &Fields,
        after: &Fields,
        id: VersionId,
    ) -> Result<Dispatch> {
        let fields = self.flags.fields();

        if self.flags.is_restoring(after) {
            return self.reject_restore(path).await;
        }

        if self.flags.is_history_transaction(before)
            || (self.flags.can_redo(before) && !self.flags.can_redo(after))
        {
            return Ok(Dispatch::Skipped(SkipReason::FlagCleanup));
        }

        if let Pointer::Invalid(raw) = self.flags.pointer(after) {
            warn!(path = %path, version = %raw, "Invalid version pointer; clearing control fields");
            self.flags.clean_all(self.store.as_ref(), path).await?;
            return Ok(Dispatch::Cleaned);
        }

        let transition = match self.flags.decode(after) {
            HistoryCommand::None => return self.on_edit(path, before, after, id).await,
            HistoryCommand::Goto(Some(target)) => {
                let Some(live) = self.live_request(path, after).await? else {
                    return Ok(Dispatch::Skipped(SkipReason::Superseded));
                };
                self.navigator.goto_version(path, &live, target, id).await?
            }
            HistoryCommand::Goto(None) => {
                warn!(path = %path, "Goto target is not a version id");
                self.flags
                    .clean_flags(self.store.as_ref(), path, &[fields.goto.as_str()])
                    .await?;
                return Ok(Dispatch::Cleaned);
            }
            HistoryCommand::Undo => {
                let Some(live) = self.live_request(path, after).await? else {
                    return Ok(Dispatch::Skipped(SkipReason::Superseded));
                };
                self.navigator.undo(path, &live, id).await?
            }
            HistoryCommand::Redo => {
                let Some(live) = self.live_request(path, after).await? else {
                    return Ok(Dispatch::Skipped(SkipReason::Superseded));
                };
                self.navigator.redo(path, &live).await?
            }
            HistoryCommand::Restore => return self.reject_restore(path).await,
        };
        Ok(Dispatch::Applied(transition))
    }

    /// Current document, if it still carries the request and pointer of `after`
    ///
    /// Navigation reads ignored fields and the pointer from this state, never
    /// from the event. A request that ran partway before a failure is no longer
    /// on the document; when that left the document live, a last marker above
    /// the old pointer may remain and is discarded.
    async fn live_request(&self, path: &str, after: &Fields) -> Result<Option<Fields>> {
        let Some(live) = self.store.get(path).await? else {
            debug!(path = %path, "Document deleted before its request ran");
            return Ok(None);
        };

        let requested = self.flags.pointer(after);
        let current = self.flags.pointer(&live);
        if self.flags.decode(&live) == self.flags.decode(after) && current == requested {
            return Ok(Some(live));
        }

        debug!(path = %path, "Request superseded by a later write");
        if let (Pointer::Parked(version), Pointer::Live) = (requested, current) {
            self.navigator.discard_markers(path, &version).await?;
        }
        Ok(None)
    }

    async fn reject_restore(&self, path: &str) -> Result<Dispatch> {
        warn!(path = %path, "Restore is only valid on creation");
        self.flags
            .clean_flags(
                self.store.as_ref(),
                path,
                &[self.flags.fields().restore.as_str()],
            )
            .await?;
        Ok(Dispatch::Cleaned)
    }

    async fn on_edit(
        &self,
        path: &str,
        before: &Fields,
        after: &Fields,
        id: VersionId,
    ) -> Result<Dispatch> {
        if self.filter.changed(before, after) {
            let transition = self.navigator.commit_edit(path, before, after, id).await?;
            return Ok(Dispatch::Applied(transition));
        }

        let stray = self.flags.stray(before, after);
        if stray.is_empty() {
            return Ok(Dispatch::Skipped(SkipReason::Unchanged));
        }
        info!(path = %path, fields = ?stray, "Removing stray control fields");
        self.flags
            .clean_flags(self.store.as_ref(), path, &stray)
            .await?;
        Ok(Dispatch::Cleaned)
    }
}

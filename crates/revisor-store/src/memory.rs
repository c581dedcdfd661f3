//! In-memory document store with a change feed
//!
//! Backs tests and the replay CLI. Every effective write emits one
//! [`ChangeEvent`] on the subscribed feed while the write lock is still held,
//! so the feed order is the write order.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{
    error::{StoreError, StoreResult},
    event::ChangeEvent,
    patch::{Patch, SetOptions},
    path,
    query::{Query, StoredDocument},
    store::DocumentStore,
    value::Fields,
};

/// Source of event timestamps; always strictly increasing
#[derive(Debug)]
enum Clock {
    /// Wall clock at microsecond precision
    Wall { last: Option<DateTime<Utc>> },
    /// Deterministic clock for tests
    Stepped { next: DateTime<Utc>, step: Duration },
}

impl Clock {
    fn tick(&mut self) -> DateTime<Utc> {
        match self {
            Clock::Wall { last } => {
                let mut now = Utc::now().trunc_subsecs(6);
                if let Some(previous) = *last {
                    if now <= previous {
                        now = previous + Duration::microseconds(1);
                    }
                }
                *last = Some(now);
                now
            }
            Clock::Stepped { next, step } => {
                let now = *next;
                *next = now + *step;
                now
            }
        }
    }
}

/// Thread-safe in-memory implementation of [`DocumentStore`]
///
/// Documents are keyed by their full path, so a document and the documents
/// of its subcollections are independent entries.
#[derive(Debug)]
pub struct InMemoryStore {
    documents: RwLock<BTreeMap<String, Fields>>,
    clock: Mutex<Clock>,
    feed: Mutex<Option<mpsc::UnboundedSender<ChangeEvent>>>,
}

impl InMemoryStore {
    /// Create an empty store stamped by the wall clock
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            clock: Mutex::new(Clock::Wall { last: None }),
            feed: Mutex::new(None),
        }
    }

    /// Create an empty store whose events are stamped `start`, `start + step`, ...
    pub fn with_clock(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            clock: Mutex::new(Clock::Stepped {
                next: start.trunc_subsecs(6),
                step,
            }),
            feed: Mutex::new(None),
        }
    }

    /// Create a store pre-loaded with documents (no events are emitted)
    pub fn from_snapshot(documents: BTreeMap<String, Fields>) -> Self {
        let store = Self::new();
        *store.documents.write() = documents
            .into_iter()
            .map(|(path, data)| (normalize(&path), data))
            .collect();
        store
    }

    /// Subscribe to the change feed, replacing any previous subscriber
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.feed.lock() = Some(sender);
        receiver
    }

    /// Copy of every document keyed by path
    pub fn snapshot(&self) -> BTreeMap<String, Fields> {
        self.documents.read().clone()
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Whether a document exists
    pub fn contains(&self, path: &str) -> bool {
        self.documents.read().contains_key(&normalize(path))
    }

    /// Paths of every document at or below a prefix
    pub fn paths_under(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize(prefix);
        self.documents
            .read()
            .keys()
            .filter(|key| *key == &prefix || key.starts_with(&format!("{}/", prefix)))
            .cloned()
            .collect()
    }

    fn write<F>(&self, path: &str, apply: F) -> StoreResult<()>
    where
        F: FnOnce(Option<&Fields>) -> StoreResult<Option<Fields>>,
    {
        let key = document_key(path)?;
        let mut documents = self.documents.write();
        let before = documents.get(&key).cloned();
        let after = apply(before.as_ref())?;

        if before == after {
            trace!(path = %key, "Write left document unchanged");
            return Ok(());
        }

        match &after {
            Some(data) => {
                documents.insert(key.clone(), data.clone());
            }
            None => {
                documents.remove(&key);
            }
        }

        self.emit(key, before, after);
        Ok(())
    }

    fn emit(&self, path: String, before: Option<Fields>, after: Option<Fields>) {
        let feed = self.feed.lock();
        if let Some(sender) = feed.as_ref() {
            let timestamp = self.clock.lock().tick();
            let event = ChangeEvent::new(path, before, after, timestamp);
            if sender.send(event).is_err() {
                debug!("Change feed receiver dropped");
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn document_key(path: &str) -> StoreResult<String> {
    if path::is_document_path(path) {
        Ok(normalize(path))
    } else {
        Err(StoreError::invalid_path(path))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Fields>> {
        let key = document_key(path)?;
        Ok(self.documents.read().get(&key).cloned())
    }

    async fn set(&self, path: &str, data: Patch, options: SetOptions) -> StoreResult<()> {
        if !options.merge && data.has_deletes() {
            return Err(StoreError::invalid_write(
                path,
                "delete sentinel requires a merge",
            ));
        }
        self.write(path, |existing| {
            let next = if options.merge {
                let mut merged = existing.cloned().unwrap_or_default();
                data.merge_into(&mut merged);
                merged
            } else {
                data.to_document()
            };
            Ok(Some(next))
        })
    }

    async fn update(&self, path: &str, patch: Patch) -> StoreResult<()> {
        self.write(path, |existing| {
            let mut next = existing
                .cloned()
                .ok_or_else(|| StoreError::not_found(path))?;
            patch.update_into(&mut next);
            Ok(Some(next))
        })
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.write(path, |_| Ok(None))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<StoredDocument>> {
        if !path::is_collection_path(&query.collection) {
            return Err(StoreError::invalid_path(&query.collection));
        }
        let prefix = format!("{}/", normalize(&query.collection));

        let mut rows: Vec<StoredDocument> = self
            .documents
            .read()
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .filter(|(_, data)| query.matches(data))
            .map(|(key, data)| StoredDocument {
                id: key[prefix.len()..].to_string(),
                path: key.clone(),
                data: data.clone(),
            })
            .collect();

        query.arrange(&mut rows);
        Ok(rows)
    }
}

//! Shared test harness: an in-memory store whose change feed is drained
//! through a dispatcher after every write

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use revisor_config::VersioningConfig;
use revisor_history::{
    drain_feed, FeedSummary, HistoryEntry, HistoryLog, HistoryPaths, RetryPolicy,
    VersionDispatcher,
};
use revisor_store::{
    ChangeEvent, DocumentStore, Fields, InMemoryStore, Patch, Query, SetOptions, StoreError,
    StoreResult, StoredDocument, Value,
};
use tokio::sync::mpsc::UnboundedReceiver;

pub const DOC: &str = "documents/d1";

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn doc(value: serde_json::Value) -> Fields {
    serde_json::from_value(value).unwrap()
}

pub fn quick_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        initial_delay_ms: 0,
        backoff_factor: 1.0,
        max_delay_ms: 0,
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub dispatcher: VersionDispatcher,
    pub log: HistoryLog,
    pub policy: RetryPolicy,
    feed: UnboundedReceiver<ChangeEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(VersioningConfig::default())
    }

    pub fn with_config(config: VersioningConfig) -> Self {
        let store = Arc::new(InMemoryStore::with_clock(start(), Duration::seconds(1)));
        let backend: Arc<dyn DocumentStore> = store.clone();
        Self::assemble(config, store, backend)
    }

    /// Dispatcher runs against `backend`; user writes go straight to `store`
    pub fn assemble(
        config: VersioningConfig,
        store: Arc<InMemoryStore>,
        backend: Arc<dyn DocumentStore>,
    ) -> Self {
        let feed = store.subscribe();
        let dispatcher = VersionDispatcher::new(Arc::new(config.clone()), backend);
        let log = HistoryLog::new(store.clone(), HistoryPaths::new(config.history_root));
        Self {
            store,
            dispatcher,
            log,
            policy: RetryPolicy::none(),
            feed,
        }
    }

    pub async fn drain(&mut self) -> FeedSummary {
        drain_feed(&self.dispatcher, &mut self.feed, &self.policy)
            .await
            .expect("feed should drain")
    }

    pub async fn create(&mut self, path: &str, data: serde_json::Value) -> FeedSummary {
        self.store
            .set(path, Patch::from(doc(data)), SetOptions::overwrite())
            .await
            .unwrap();
        self.drain().await
    }

    pub async fn update(&mut self, path: &str, patch: Patch) -> FeedSummary {
        self.store.update(path, patch).await.unwrap();
        self.drain().await
    }

    pub async fn edit(&mut self, path: &str, field: &str, value: impl Into<Value>) -> FeedSummary {
        self.update(path, Patch::new().set(field, value)).await
    }

    pub async fn request(&mut self, path: &str, flag: &str) -> FeedSummary {
        self.edit(path, flag, true).await
    }

    pub async fn goto(&mut self, path: &str, target: &str) -> FeedSummary {
        self.edit(path, "goto", target).await
    }

    pub async fn delete(&mut self, path: &str) -> FeedSummary {
        self.store.delete(path).await.unwrap();
        self.drain().await
    }

    pub async fn get(&self, path: &str) -> Option<Fields> {
        self.store.get(path).await.unwrap()
    }

    pub async fn entries(&self, path: &str) -> Vec<HistoryEntry> {
        self.log.entries(path).await.unwrap()
    }

    pub async fn backup(&self, path: &str) -> Option<Fields> {
        self.log.read_backup(path).await.unwrap()
    }

    pub async fn pointer(&self, path: &str) -> Option<String> {
        self.get(path)
            .await
            .and_then(|d| d.get("_version").and_then(|v| v.as_str().map(str::to_string)))
    }
}

/// Store wrapper that fails one chosen write
pub struct FailingStore {
    inner: Arc<InMemoryStore>,
    countdown: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            countdown: AtomicUsize::new(0),
        }
    }

    /// Fail the `nth` write from now on (1-based), once
    pub fn fail_write(&self, nth: usize) {
        self.countdown.store(nth, Ordering::SeqCst);
    }

    fn trip(&self, path: &str) -> StoreResult<()> {
        let previous = self
            .countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match previous {
            Ok(1) => Err(StoreError::backend(format!("injected failure writing {}", path))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Fields>> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &str, data: Patch, options: SetOptions) -> StoreResult<()> {
        self.trip(path)?;
        self.inner.set(path, data, options).await
    }

    async fn update(&self, path: &str, patch: Patch) -> StoreResult<()> {
        self.trip(path)?;
        self.inner.update(path, patch).await
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.trip(path)?;
        self.inner.delete(path).await
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<StoredDocument>> {
        self.inner.query(query).await
    }
}

//! History store adapter: the ordered log and the backup slot of each document

use std::sync::Arc;

use futures::future::try_join_all;
use revisor_store::{
    Comparator, Direction, DocumentStore, Fields, Patch, Query, SetOptions, Value,
};
use tracing::debug;

use crate::{
    entry::{HistoryEntry, VersionId, DATE_FIELD, LAST_FIELD},
    error::Result,
    paths::HistoryPaths,
};

/// Reads and writes history for documents through a [`DocumentStore`]
#[derive(Clone)]
pub struct HistoryLog {
    store: Arc<dyn DocumentStore>,
    paths: HistoryPaths,
}

impl HistoryLog {
    /// Create an adapter
    pub fn new(store: Arc<dyn DocumentStore>, paths: HistoryPaths) -> Self {
        Self { store, paths }
    }

    /// Path derivation in use
    pub fn paths(&self) -> &HistoryPaths {
        &self.paths
    }

    /// Write an entry at its id (overwrites an entry with the same id)
    pub async fn append(&self, doc_path: &str, entry: &HistoryEntry) -> Result<()> {
        let path = self.paths.entry_path(doc_path, &entry.id);
        self.store
            .set(&path, entry.to_patch(), SetOptions::overwrite())
            .await?;
        debug!(path = %doc_path, version = %entry.id, last = entry.last, "Appended history entry");
        Ok(())
    }

    /// Entry with an exact id
    pub async fn get(&self, doc_path: &str, id: &VersionId) -> Result<Option<HistoryEntry>> {
        let path = self.paths.entry_path(doc_path, id);
        match self.store.get(&path).await? {
            Some(stored) => Ok(Some(HistoryEntry::from_stored(&path, &stored)?)),
            None => Ok(None),
        }
    }

    /// Newest entry strictly older than `bound`
    pub async fn newest_before(
        &self,
        doc_path: &str,
        bound: &VersionId,
    ) -> Result<Option<HistoryEntry>> {
        self.first(doc_path, Comparator::Less, bound, Direction::Descending)
            .await
    }

    /// Oldest entry strictly newer than `bound`
    pub async fn oldest_after(
        &self,
        doc_path: &str,
        bound: &VersionId,
    ) -> Result<Option<HistoryEntry>> {
        self.first(doc_path, Comparator::Greater, bound, Direction::Ascending)
            .await
    }

    async fn first(
        &self,
        doc_path: &str,
        comparator: Comparator,
        bound: &VersionId,
        direction: Direction,
    ) -> Result<Option<HistoryEntry>> {
        let query = Query::collection(self.paths.versions_path(doc_path))
            .filter(DATE_FIELD, comparator, Value::Timestamp(bound.timestamp()))
            .order_by(DATE_FIELD, direction)
            .limit(1);
        match self.store.query(&query).await?.into_iter().next() {
            Some(row) => Ok(Some(HistoryEntry::from_stored(&row.path, &row.data)?)),
            None => Ok(None),
        }
    }

    /// Every entry, oldest first
    pub async fn entries(&self, doc_path: &str) -> Result<Vec<HistoryEntry>> {
        let query = Query::collection(self.paths.versions_path(doc_path))
            .order_by(DATE_FIELD, Direction::Ascending);
        self.store
            .query(&query)
            .await?
            .iter()
            .map(|row| HistoryEntry::from_stored(&row.path, &row.data))
            .collect()
    }

    /// Delete one entry; a missing entry is not an error
    pub async fn remove(&self, doc_path: &str, id: &VersionId) -> Result<()> {
        self.store
            .delete(&self.paths.entry_path(doc_path, id))
            .await?;
        Ok(())
    }

    /// Delete every entry whose date satisfies `date <comparator> threshold`
    ///
    /// The deletes run concurrently and all of them complete before this
    /// returns. Returns how many entries matched.
    pub async fn delete_where(
        &self,
        doc_path: &str,
        comparator: Comparator,
        threshold: &VersionId,
    ) -> Result<usize> {
        let query = Query::collection(self.paths.versions_path(doc_path)).filter(
            DATE_FIELD,
            comparator,
            Value::Timestamp(threshold.timestamp()),
        );
        let matched = self.store.query(&query).await?;
        let count = matched.len();

        try_join_all(matched.iter().map(|row| self.store.delete(&row.path))).await?;

        debug!(
            path = %doc_path,
            comparator = %comparator,
            threshold = %threshold,
            removed = count,
            "Deleted history entries"
        );
        Ok(count)
    }

    /// Delete the last markers newer than `threshold`
    pub async fn delete_markers_after(
        &self,
        doc_path: &str,
        threshold: &VersionId,
    ) -> Result<usize> {
        let query = Query::collection(self.paths.versions_path(doc_path))
            .filter(
                DATE_FIELD,
                Comparator::Greater,
                Value::Timestamp(threshold.timestamp()),
            )
            .filter(LAST_FIELD, Comparator::Equal, true);
        let matched = self.store.query(&query).await?;

        try_join_all(matched.iter().map(|row| self.store.delete(&row.path))).await?;

        debug!(path = %doc_path, threshold = %threshold, removed = matched.len(), "Deleted stale markers");
        Ok(matched.len())
    }

    /// Contents of the backup slot
    pub async fn read_backup(&self, doc_path: &str) -> Result<Option<Fields>> {
        Ok(self.store.get(&self.paths.backup_path(doc_path)).await?)
    }

    /// Replace the backup slot
    pub async fn write_backup(&self, doc_path: &str, data: Fields) -> Result<()> {
        self.store
            .set(
                &self.paths.backup_path(doc_path),
                Patch::from(data),
                SetOptions::overwrite(),
            )
            .await?;
        Ok(())
    }

    /// Drop the backup slot
    pub async fn delete_backup(&self, doc_path: &str) -> Result<()> {
        self.store
            .delete(&self.paths.backup_path(doc_path))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use revisor_store::InMemoryStore;

    const DOC: &str = "documents/d1";

    fn at(seconds: i64) -> VersionId {
        VersionId::from_timestamp(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds),
        )
    }

    fn data(n: i64) -> Fields {
        let mut fields = Fields::new();
        fields.insert("n".to_string(), Value::Integer(n));
        fields
    }

    async fn seeded() -> (Arc<InMemoryStore>, HistoryLog) {
        let store = Arc::new(InMemoryStore::new());
        let log = HistoryLog::new(store.clone(), HistoryPaths::new("history/database"));
        for n in 1..=4 {
            log.append(DOC, &HistoryEntry::new(at(n), data(n))).await.unwrap();
        }
        (store, log)
    }

    #[tokio::test]
    async fn test_get_exact_entry() {
        let (_, log) = seeded().await;
        let entry = log.get(DOC, &at(2)).await.unwrap().unwrap();
        assert_eq!(entry.data, data(2));
        assert!(log.get(DOC, &at(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_neighbours() {
        let (_, log) = seeded().await;
        assert_eq!(log.newest_before(DOC, &at(3)).await.unwrap().unwrap().id, at(2));
        assert_eq!(log.oldest_after(DOC, &at(3)).await.unwrap().unwrap().id, at(4));
        assert!(log.newest_before(DOC, &at(1)).await.unwrap().is_none());
        assert!(log.oldest_after(DOC, &at(4)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_where_greater() {
        let (_, log) = seeded().await;
        let removed = log.delete_where(DOC, Comparator::Greater, &at(2)).await.unwrap();
        assert_eq!(removed, 2);
        let ids: Vec<_> = log.entries(DOC).await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![at(1), at(2)]);
    }

    #[tokio::test]
    async fn test_delete_where_everything() {
        let (store, log) = seeded().await;
        let removed = log
            .delete_where(DOC, Comparator::GreaterOrEqual, &VersionId::EARLIEST)
            .await
            .unwrap();
        assert_eq!(removed, 4);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_logs_are_per_document() {
        let (_, log) = seeded().await;
        log.append("documents/d2", &HistoryEntry::new(at(10), data(10)))
            .await
            .unwrap();
        assert_eq!(log.entries(DOC).await.unwrap().len(), 4);
        assert_eq!(log.entries("documents/d2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backup_slot_round_trip() {
        let store = Arc::new(InMemoryStore::new());
        let log = HistoryLog::new(store.clone(), HistoryPaths::new("history/database"));

        assert!(log.read_backup(DOC).await.unwrap().is_none());
        log.write_backup(DOC, data(1)).await.unwrap();
        log.write_backup(DOC, data(2)).await.unwrap();
        assert_eq!(log.read_backup(DOC).await.unwrap(), Some(data(2)));
        log.delete_backup(DOC).await.unwrap();
        assert!(log.read_backup(DOC).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_markers_after_keeps_plain_entries() {
        let (_, log) = seeded().await;
        log.append(DOC, &HistoryEntry::marker(at(5), data(5)))
            .await
            .unwrap();
        log.append(DOC, &HistoryEntry::marker(at(0), data(0)))
            .await
            .unwrap();

        let removed = log.delete_markers_after(DOC, &at(2)).await.unwrap();
        assert_eq!(removed, 1);
        let ids: Vec<VersionId> = log
            .entries(DOC)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![at(0), at(1), at(2), at(3), at(4)]);
    }
}

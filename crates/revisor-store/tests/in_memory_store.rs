//! Contract tests for the in-memory document store

use std::sync::Arc;

use proptest::prelude::*;
use revisor_store::{
    ChangeType, Comparator, DocumentStore, Fields, InMemoryStore, Patch, Query, SetOptions,
    StoreError, Value,
};
use serde_json::json;

fn doc(value: serde_json::Value) -> Fields {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_store_is_usable_behind_trait_object() {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
    store
        .set("notes/n1", Patch::from(doc(json!({"title": "a"}))), SetOptions::overwrite())
        .await
        .unwrap();
    store
        .update("notes/n1", Patch::new().set("title", "b"))
        .await
        .unwrap();
    assert_eq!(
        store.get("notes/n1").await.unwrap(),
        Some(doc(json!({"title": "b"})))
    );
    store.delete("notes/n1").await.unwrap();
    assert!(store.get("notes/n1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_nested_collections_are_independent() {
    let store = InMemoryStore::new();
    store
        .set("a/b", Patch::new().set("x", 1), SetOptions::overwrite())
        .await
        .unwrap();
    store
        .set("a/b/c/d", Patch::new().set("y", 2), SetOptions::overwrite())
        .await
        .unwrap();

    store.delete("a/b").await.unwrap();
    assert!(store.contains("a/b/c/d"));

    let rows = store.query(&Query::collection("a/b/c")).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "d");
}

#[tokio::test]
async fn test_query_on_document_path_is_rejected() {
    let store = InMemoryStore::new();
    let result = store.query(&Query::collection("a/b")).await;
    assert!(matches!(result, Err(StoreError::InvalidPath(_))));
}

#[tokio::test]
async fn test_query_filters_by_timestamp() {
    use chrono::{Duration, TimeZone, Utc};

    let store = InMemoryStore::new();
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    for i in 0..5 {
        let date = base + Duration::minutes(i);
        store
            .set(
                &format!("log/{}", i),
                Patch::new().set("date", date),
                SetOptions::overwrite(),
            )
            .await
            .unwrap();
    }

    let rows = store
        .query(&Query::collection("log").filter(
            "date",
            Comparator::Less,
            Value::from(base + Duration::minutes(2)),
        ))
        .await
        .unwrap();
    let ids: Vec<_> = rows.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["0".to_string(), "1".to_string()]);
}

#[tokio::test]
async fn test_feed_reports_change_types_in_order() {
    let store = InMemoryStore::new();
    let mut feed = store.subscribe();

    store
        .set("c/d", Patch::new().set("v", 1), SetOptions::overwrite())
        .await
        .unwrap();
    store
        .set("c/d", Patch::new().set("w", 2), SetOptions::merge())
        .await
        .unwrap();
    store.delete("c/d").await.unwrap();

    let kinds: Vec<_> = std::iter::from_fn(|| feed.try_recv().ok())
        .map(|event| event.change_type())
        .collect();
    assert_eq!(
        kinds,
        vec![
            Some(ChangeType::Create),
            Some(ChangeType::Modify),
            Some(ChangeType::Delete)
        ]
    );
}

proptest! {
    #[test]
    fn prop_merge_then_read_sees_every_written_field(
        keys in proptest::collection::btree_set("[a-z]{1,6}", 1..8),
        value in any::<i64>(),
    ) {
        let store = InMemoryStore::new();
        let patch = keys
            .iter()
            .fold(Patch::new(), |patch, key| patch.set(key.clone(), value));

        let found = tokio_test::block_on(async {
            store.set("p/q", patch, SetOptions::merge()).await.unwrap();
            store.get("p/q").await.unwrap().unwrap()
        });

        prop_assert_eq!(found.len(), keys.len());
        for key in &keys {
            prop_assert_eq!(found.get(key), Some(&Value::Integer(value)));
        }
    }
}

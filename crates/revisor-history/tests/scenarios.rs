//! End-to-end versioning scenarios driven through the change feed

mod common;

use common::{doc, Harness, DOC};
use revisor_config::{ControlFields, VersioningConfig};
use revisor_store::{DocumentStore, Patch, Value};
use serde_json::json;

fn a_values(entries: &[revisor_history::HistoryEntry]) -> Vec<(Option<i64>, bool)> {
    entries
        .iter()
        .map(|e| {
            let a = match e.data.get("a") {
                Some(Value::Integer(n)) => Some(*n),
                _ => None,
            };
            (a, e.last)
        })
        .collect()
}

#[tokio::test]
async fn test_edit_undo_redo_round_trip() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "a", 2).await;

    let entries = h.entries(DOC).await;
    assert_eq!(a_values(&entries), vec![(Some(1), false)]);
    let t1 = entries[0].id.to_string();
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 2}))));

    h.request(DOC, "undo").await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 1, "_version": t1}))));
    assert_eq!(
        a_values(&h.entries(DOC).await),
        vec![(Some(1), false), (Some(2), true)]
    );

    h.request(DOC, "redo").await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 2}))));
    assert_eq!(a_values(&h.entries(DOC).await), vec![(Some(1), false)]);
}

#[tokio::test]
async fn test_goto_then_edit_truncates_branch() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "a", 2).await;
    let t1 = h.entries(DOC).await[0].id.to_string();

    h.goto(DOC, &t1).await;
    assert_eq!(h.pointer(DOC).await, Some(t1.clone()));
    assert_eq!(
        a_values(&h.entries(DOC).await),
        vec![(Some(1), false), (Some(2), true)]
    );

    h.edit(DOC, "a", 3).await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 3}))));
    let entries = h.entries(DOC).await;
    assert_eq!(a_values(&entries), vec![(Some(1), false), (Some(1), false)]);
    assert_eq!(entries[0].id.to_string(), t1);

    h.request(DOC, "redo").await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 3}))));
    assert_eq!(h.entries(DOC).await.len(), 2);
}

#[tokio::test]
async fn test_one_entry_per_tracked_change() {
    let config = VersioningConfig {
        ignore_fields: vec!["views".to_string()],
        ..VersioningConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.create(DOC, json!({"a": 1, "views": 0})).await;

    h.edit(DOC, "a", 2).await;
    h.edit(DOC, "views", 5).await;
    h.edit(DOC, "a", 3).await;
    h.edit(DOC, "views", 6).await;

    assert_eq!(
        a_values(&h.entries(DOC).await),
        vec![(Some(1), false), (Some(2), false)]
    );
}

#[tokio::test]
async fn test_ignored_fields_follow_live_document() {
    let config = VersioningConfig {
        ignore_fields: vec!["views".to_string()],
        ..VersioningConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.create(DOC, json!({"a": 1, "views": 0})).await;
    h.edit(DOC, "a", 2).await;
    h.edit(DOC, "views", 7).await;

    h.request(DOC, "undo").await;
    let parked = h.get(DOC).await.unwrap();
    assert_eq!(parked.get("a"), Some(&Value::Integer(1)));
    assert_eq!(parked.get("views"), Some(&Value::Integer(7)));

    h.edit(DOC, "views", 8).await;
    h.request(DOC, "redo").await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 2, "views": 8}))));
}

#[tokio::test]
async fn test_nested_fields_survive_navigation() {
    let mut h = Harness::new();
    h.create(DOC, json!({"meta": {"title": "first", "tags": {"x": true}}}))
        .await;
    h.update(
        DOC,
        Patch::new().set("meta", Value::from(doc(json!({"title": "second"})))),
    )
    .await;

    h.request(DOC, "undo").await;
    let parked = h.get(DOC).await.unwrap();
    assert_eq!(
        parked.get("meta"),
        Some(&Value::from(doc(json!({"title": "first", "tags": {"x": true}}))))
    );

    h.request(DOC, "redo").await;
    assert_eq!(
        h.get(DOC).await,
        Some(doc(json!({"meta": {"title": "second"}})))
    );
}

#[tokio::test]
async fn test_walk_back_to_oldest_and_forward_again() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 0})).await;
    for n in 1..=3 {
        h.edit(DOC, "a", n).await;
    }

    for expected in [2, 1, 0] {
        h.request(DOC, "undo").await;
        let live = h.get(DOC).await.unwrap();
        assert_eq!(live.get("a"), Some(&Value::Integer(expected)));
    }

    h.request(DOC, "undo").await;
    let oldest = h.get(DOC).await.unwrap();
    assert_eq!(oldest.get("a"), Some(&Value::Integer(0)));
    assert!(oldest.contains_key("_version"));
    assert!(!oldest.contains_key("undo"));

    for expected in [1, 2] {
        h.request(DOC, "redo").await;
        let live = h.get(DOC).await.unwrap();
        assert_eq!(live.get("a"), Some(&Value::Integer(expected)));
        assert!(live.contains_key("_version"));
    }
    h.request(DOC, "redo").await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 3}))));
    assert_eq!(h.entries(DOC).await.len(), 3);
}

#[tokio::test]
async fn test_goto_twice_is_idempotent() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "a", 2).await;
    h.edit(DOC, "a", 3).await;
    let t1 = h.entries(DOC).await[0].id.to_string();

    h.goto(DOC, &t1).await;
    let first = h.get(DOC).await;
    let entries = h.entries(DOC).await;

    h.goto(DOC, &t1).await;
    assert_eq!(h.get(DOC).await, first);
    assert_eq!(h.entries(DOC).await, entries);
}

#[tokio::test]
async fn test_goto_marker_returns_to_latest() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "a", 2).await;
    h.request(DOC, "undo").await;

    let marker = h.entries(DOC).await[1].id.to_string();
    h.goto(DOC, &marker).await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 2}))));
    assert_eq!(h.entries(DOC).await.len(), 1);
}

#[tokio::test]
async fn test_goto_unknown_or_invalid_target_only_clears_flag() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "a", 2).await;

    h.goto(DOC, "2000-01-01T00:00:00.000000Z").await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 2}))));

    h.goto(DOC, "not-a-version").await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 2}))));
    assert_eq!(h.entries(DOC).await.len(), 1);
}

#[tokio::test]
async fn test_delete_and_restore_round_trip() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1, "b": {"c": "x"}})).await;
    h.edit(DOC, "a", 2).await;

    h.delete(DOC).await;
    assert!(h.get(DOC).await.is_none());
    assert_eq!(h.backup(DOC).await, Some(doc(json!({"a": 2, "b": {"c": "x"}}))));

    h.create(DOC, json!({"restore": true})).await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 2, "b": {"c": "x"}}))));
    assert!(h.backup(DOC).await.is_none());

    h.request(DOC, "undo").await;
    let live = h.get(DOC).await.unwrap();
    assert_eq!(live.get("a"), Some(&Value::Integer(1)));
}

#[tokio::test]
async fn test_delete_while_parked_prunes_redo_branch() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 0})).await;
    for n in 1..=3 {
        h.edit(DOC, "a", n).await;
    }
    h.request(DOC, "undo").await;
    h.request(DOC, "undo").await;

    h.delete(DOC).await;
    assert_eq!(a_values(&h.entries(DOC).await), vec![(Some(0), false)]);
    assert_eq!(h.backup(DOC).await, Some(doc(json!({"a": 1}))));
}

#[tokio::test]
async fn test_restore_disabled_wipes_history_and_rejects_requests() {
    let config = VersioningConfig {
        enable_restore: false,
        ..VersioningConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "a", 2).await;

    h.delete(DOC).await;
    assert!(h.entries(DOC).await.is_empty());
    assert!(h.backup(DOC).await.is_none());

    h.create(DOC, json!({"restore": true})).await;
    assert!(h.get(DOC).await.is_none());
    assert!(h.store.paths_under("history").is_empty());
}

#[tokio::test]
async fn test_restore_without_backup_deletes_request() {
    let mut h = Harness::new();
    h.create(DOC, json!({"restore": true, "a": 1})).await;
    assert!(h.get(DOC).await.is_none());
    assert!(h.backup(DOC).await.is_none());
}

#[tokio::test]
async fn test_stray_flags_on_create_delete_document() {
    let mut h = Harness::new();
    for flag in ["undo", "redo", "goto"] {
        h.create(DOC, json!({"a": 1, flag: true})).await;
        assert!(h.get(DOC).await.is_none(), "{} should be rejected", flag);
    }
    assert!(h.store.paths_under("history").is_empty());
}

#[tokio::test]
async fn test_restore_flag_on_existing_document_is_cleared() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.request(DOC, "restore").await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 1}))));
    assert!(h.entries(DOC).await.is_empty());
}

#[tokio::test]
async fn test_invalid_pointer_is_cleared() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "_version", 42).await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 1}))));
}

#[tokio::test]
async fn test_unwatched_paths_have_no_history() {
    let mut h = Harness::new();
    h.create("notes/n1", json!({"a": 1})).await;
    h.edit("notes/n1", "a", 2).await;
    h.request("notes/n1", "undo").await;

    assert_eq!(
        h.get("notes/n1").await,
        Some(doc(json!({"a": 2, "undo": true})))
    );
    assert!(h.store.paths_under("history").is_empty());
}

#[tokio::test]
async fn test_custom_field_names_and_nested_collection() {
    let config = VersioningConfig {
        collection: "users/{uid}/notes/{noteId}".to_string(),
        history_root: "audit/root".to_string(),
        fields: ControlFields {
            undo: "back".to_string(),
            redo: "forward".to_string(),
            version: "rev".to_string(),
            ..ControlFields::default()
        },
        ..VersioningConfig::default()
    };
    let path = "users/u1/notes/n1";
    let mut h = Harness::with_config(config);
    h.create(path, json!({"a": 1})).await;
    h.edit(path, "a", 2).await;

    let logged = h
        .store
        .paths_under("audit/root/users_history/u1/notes_history/n1/versions_history");
    assert_eq!(logged.len(), 1);

    h.request(path, "back").await;
    let parked = h.get(path).await.unwrap();
    assert_eq!(parked.get("a"), Some(&Value::Integer(1)));
    assert!(parked.contains_key("rev"));

    h.request(path, "forward").await;
    assert_eq!(h.get(path).await, Some(doc(json!({"a": 2}))));
}

#[tokio::test]
async fn test_ignored_field_written_while_undo_is_queued_survives() {
    let config = VersioningConfig {
        ignore_fields: vec!["seen".to_string()],
        ..VersioningConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.create(DOC, json!({"a": 0, "seen": 0})).await;
    h.edit(DOC, "a", 1).await;

    // both writes land before the handler sees the undo
    h.store.update(DOC, Patch::new().set("undo", true)).await.unwrap();
    h.store.update(DOC, Patch::new().set("seen", 5)).await.unwrap();
    h.drain().await;

    let live = h.get(DOC).await.unwrap();
    assert_eq!(live.get("a"), Some(&Value::Integer(0)));
    assert_eq!(live.get("seen"), Some(&Value::Integer(5)));
    assert!(!live.contains_key("undo"));
    assert!(h.pointer(DOC).await.is_some());
}

#[tokio::test]
async fn test_delete_while_undo_is_queued_stays_deleted() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "a", 2).await;

    h.store.update(DOC, Patch::new().set("undo", true)).await.unwrap();
    h.store.delete(DOC).await.unwrap();
    h.drain().await;

    assert_eq!(h.get(DOC).await, None);
    assert_eq!(h.backup(DOC).await, Some(doc(json!({"a": 2}))));
    assert_eq!(a_values(&h.entries(DOC).await), vec![(Some(1), false)]);

    h.create(DOC, json!({"restore": true})).await;
    assert_eq!(h.get(DOC).await, Some(doc(json!({"a": 2}))));
}

#[tokio::test]
async fn test_delete_with_stuck_request_is_archived() {
    let mut h = Harness::new();
    h.create(DOC, json!({"a": 1})).await;
    h.edit(DOC, "a", 2).await;

    // a request still present at delete time, e.g. after failed deliveries
    h.store.update(DOC, Patch::new().set("redo", true)).await.unwrap();
    h.store.delete(DOC).await.unwrap();
    h.drain().await;

    assert_eq!(h.backup(DOC).await, Some(doc(json!({"a": 2}))));
}

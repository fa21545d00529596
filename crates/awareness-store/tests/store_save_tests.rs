#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use awareness_core::errors::AwarenessError;
use awareness_core::model::{EntityKind, Field, Scalar};
use awareness_core::logging_facility::test_capture::init_test_capture;
use awareness_store::{FieldValue, Store};
use common::{build_realtime_project, memory_store};
use serde_json::json;

#[tokio::test]
async fn test_fresh_create_persists_whole_graph() {
    let (backend, store) = memory_store();
    let graph = build_realtime_project(&store, "Workshop");

    store.save(graph.project).await.unwrap();

    for handle in [
        graph.project,
        graph.model,
        graph.session,
        graph.timed_note,
        graph.project_note,
    ] {
        let id = store.id(handle).expect("id assigned");
        assert_eq!(id.len(), 24);
        assert!(!store.is_dirty(handle));
        assert!(backend.raw(handle.kind().store_name(), &id).await.is_some());
    }

    let record = backend
        .raw("RealtimeProject", &store.id(graph.project).unwrap())
        .await
        .unwrap();
    assert_eq!(record["designModel"], json!(store.id(graph.model).unwrap()));
    assert_eq!(record["sessions"], json!([store.id(graph.session).unwrap()]));
    assert_eq!(record["name"], "Workshop");
}

#[tokio::test]
async fn test_dirty_tracking() {
    let (_, store) = memory_store();
    let note = store.new_entity(EntityKind::ProjectNote);
    store.save(note).await.unwrap();
    assert!(!store.is_dirty(note));

    // same value: stays clean
    store.set(note, Field::Content, Scalar::Text(String::new())).unwrap();
    assert!(!store.is_dirty(note));

    store.set(note, Field::Content, Scalar::Text("changed".into())).unwrap();
    assert!(store.is_dirty(note));
    store.save(note).await.unwrap();
    assert!(!store.is_dirty(note));
}

#[tokio::test]
async fn test_save_is_idempotent() {
    let (backend, store) = memory_store();
    let note = store.new_entity(EntityKind::TimedNote);
    store.save(note).await.unwrap();
    let writes = backend.write_count();

    store.save(note).await.unwrap();
    store.save(note).await.unwrap();
    assert_eq!(backend.write_count(), writes);
}

#[tokio::test]
async fn test_second_save_updates_existing_record() {
    let (backend, store) = memory_store();
    let note = store.new_entity(EntityKind::TimedNote);
    store.save(note).await.unwrap();
    store.set(note, Field::Time, Scalar::Number(3.5)).unwrap();
    store.save(note).await.unwrap();

    let record = backend
        .raw("TimedNote", &store.id(note).unwrap())
        .await
        .unwrap();
    assert_eq!(record["time"], json!(3.5));
}

#[tokio::test]
async fn test_deleted_entity_rejects_mutation() {
    let (backend, store) = memory_store();
    let note = store.new_entity(EntityKind::ProjectNote);
    store.save(note).await.unwrap();
    let id = store.id(note).unwrap();

    store.remove(note).await.unwrap();
    assert!(store.is_deleted(note));
    assert_eq!(store.id(note).as_deref(), Some(id.as_str()));
    assert_eq!(backend.raw("ProjectNote", &id).await, None);

    let err = store
        .set(note, Field::Content, Scalar::Text("x".into()))
        .unwrap_err();
    assert!(matches!(err, AwarenessError::Deleted { .. }));
    let err = store.save(note).await.unwrap_err();
    assert!(matches!(err, AwarenessError::Deleted { .. }));

    // idempotent
    store.remove(note).await.unwrap();
    assert_eq!(store.get(EntityKind::ProjectNote, &id).await.unwrap(), None);
}

#[tokio::test]
async fn test_removing_unsaved_entity_skips_backend() {
    let (backend, store) = memory_store();
    let note = store.new_entity(EntityKind::ProjectNote);
    store.remove(note).await.unwrap();
    assert_eq!(backend.write_count(), 0);
    assert!(matches!(
        store.save(note).await,
        Err(AwarenessError::Deleted { ref id, .. }) if id == "(unsaved)"
    ));
}

#[tokio::test]
async fn test_deleted_children_are_not_written() {
    let (backend, store) = memory_store();
    let graph = build_realtime_project(&store, "P");
    store.remove(graph.project_note).await.unwrap();
    store.save(graph.project).await.unwrap();

    let record = backend
        .raw("RealtimeProject", &store.id(graph.project).unwrap())
        .await
        .unwrap();
    assert_eq!(record["notes"], json!([]));
    assert_eq!(store.id(graph.project_note), None);
}

#[tokio::test]
async fn test_child_failure_aborts_parent_write() {
    let (backend, store) = memory_store();
    let graph = build_realtime_project(&store, "P");
    backend.fail_next_write_to("TimedNote");

    let err = store.save(graph.project).await.unwrap_err();
    assert!(matches!(err, AwarenessError::Storage { .. }));

    let project_id = store.id(graph.project).unwrap();
    assert_eq!(backend.raw("RealtimeProject", &project_id).await, None);
    assert!(store.is_dirty(graph.project));
    assert!(store.is_dirty(graph.timed_note));
    assert!(!store.is_saving(graph.project));

    // a retry re-runs the whole save with the same id
    store.save(graph.project).await.unwrap();
    assert_eq!(store.id(graph.project), Some(project_id.clone()));
    assert!(backend.raw("RealtimeProject", &project_id).await.is_some());
    assert!(backend
        .raw("TimedNote", &store.id(graph.timed_note).unwrap())
        .await
        .is_some());
}

#[tokio::test]
async fn test_save_with_id_uses_given_id_and_rejects_taken_ids() {
    let (_, store) = memory_store();
    let first = store.new_entity(EntityKind::DesignModel);
    store.save_with_id(first, "well-known:custom").await.unwrap();
    assert_eq!(store.id(first).as_deref(), Some("well-known:custom"));
    assert_eq!(
        store.cached(EntityKind::DesignModel, "well-known:custom"),
        Some(first)
    );

    let second = store.new_entity(EntityKind::DesignModel);
    let err = store
        .save_with_id(second, "well-known:custom")
        .await
        .unwrap_err();
    assert!(matches!(err, AwarenessError::AlreadyExists { .. }));
    assert_eq!(store.id(second), None);
}

#[tokio::test]
async fn test_save_all_saves_every_root() {
    let (_, store) = memory_store();
    let a = build_realtime_project(&store, "A");
    let b = build_realtime_project(&store, "B");
    store.save_all(&[a.project, b.project]).await.unwrap();
    assert!(!store.is_dirty(a.session));
    assert!(!store.is_dirty(b.model));
}

#[tokio::test]
async fn test_subscribers_see_effective_changes_only() {
    let (_, store) = memory_store();
    let mut changes = store.subscribe();
    let note = store.new_entity(EntityKind::TimedNote);

    store.set(note, Field::Time, Scalar::Number(0.0)).unwrap();
    store.set(note, Field::Time, Scalar::Number(9.0)).unwrap();

    let change = changes.try_recv().unwrap();
    assert_eq!(change.entity, note);
    assert_eq!(change.field, Field::Time);
    assert_eq!(change.value, FieldValue::Scalar(Scalar::Number(9.0)));
    assert!(changes.try_recv().is_err());
}

#[tokio::test]
async fn test_serialize_inlines_children() {
    let (_, store) = memory_store();
    let graph = build_realtime_project(&store, "Export me");
    store.save(graph.project).await.unwrap();

    let tree = store.to_serializable(graph.project).unwrap();
    assert_eq!(tree["name"], "Export me");
    assert_eq!(tree["designModel"]["name"], "Double Diamond");
    assert_eq!(tree["sessions"][0]["notes"][0]["content"], "first idea");
    assert!(tree["created"].as_str().unwrap().ends_with('Z'));

    let doc: serde_json::Value =
        serde_json::from_str(&store.serialize(graph.project, false).unwrap()).unwrap();
    assert_eq!(doc["$format"], "design-awareness");
    assert_eq!(doc["type"], "RealtimeProject");
    assert_eq!(doc["data"], tree);
}

#[tokio::test]
async fn test_save_logs_start_and_end() {
    let capture = init_test_capture();
    let (_, store) = memory_store();
    let note = store.new_entity(EntityKind::ProjectNote);
    store.save_with_id(note, "log-test-note-unique").await.unwrap();

    let starts = capture.count_events(|e| {
        e.op.as_deref() == Some("save")
            && e.event.as_deref() == Some("start")
            && e.entity_id.as_deref() == Some("log-test-note-unique")
    });
    assert_eq!(starts, 1);
    capture.assert_event_exists("save", "end");
}

#[tokio::test]
async fn test_reload_round_trip_matches_export() {
    let (backend, store) = memory_store();
    let graph = build_realtime_project(&store, "Round trip");
    store.save(graph.project).await.unwrap();
    let exported = store.to_serializable(graph.project).unwrap();

    let fresh = Store::new(backend);
    let project = fresh
        .get(EntityKind::RealtimeProject, &store.id(graph.project).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.to_serializable(project).unwrap(), exported);
}

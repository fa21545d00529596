#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use awareness_core::errors::{AwarenessError, ExErrorKind};
use awareness_core::logging_facility::test_capture::init_test_capture;
use awareness_core::model::EntityKind;
use awareness_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use awareness_import::{import_document, import_entity, import_value, ImportOptions};
use common::{memory_store, realtime_project};
use serde_json::json;

fn validation(err: AwarenessError) -> (String, String) {
    match err {
        AwarenessError::Validation { trace, reason } => (trace, reason),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_id_is_rejected() {
    let (_backend, store) = memory_store();
    let err = import_entity(
        &store,
        EntityKind::TimedNote,
        &json!({"content": "x", "time": 1}),
        &ImportOptions::default(),
    )
    .await
    .unwrap_err();
    let (trace, reason) = validation(err);
    assert_eq!(trace, "Root(TimedNote)|id");
    assert_eq!(reason, "missing id.");
}

#[tokio::test]
async fn test_duplicate_id_in_one_document_is_rejected() {
    let (backend, store) = memory_store();
    let mut data = realtime_project("a", "Critique");
    let session = data["sessions"][0].clone();
    let mut twin = session.clone();
    twin["notes"] = json!([]);
    data["sessions"] = json!([session, twin]);

    let err = import_entity(
        &store,
        EntityKind::RealtimeProject,
        &data,
        &ImportOptions::dry_run(),
    )
    .await
    .unwrap_err();
    let (trace, reason) = validation(err);
    assert_eq!(trace, "Root(RealtimeProject):sessions[1]|id");
    assert_eq!(reason, "more than one entity with id a-session!");
    assert_eq!(backend.write_count(), 0);
}

#[tokio::test]
async fn test_nested_typecheck_failure_carries_path() {
    let (_backend, store) = memory_store();
    let mut data = realtime_project("a", "Critique");
    data["sessions"][0]["notes"][0]
        .as_object_mut()
        .unwrap()
        .remove("time");

    let err = import_entity(
        &store,
        EntityKind::RealtimeProject,
        &data,
        &ImportOptions::default(),
    )
    .await
    .unwrap_err();
    let (trace, reason) = validation(err);
    assert_eq!(trace, "Root(RealtimeProject):sessions[0]:notes[0]|typecheck");
    assert_eq!(reason, "wrong type or missing property \"time\"");
}

#[tokio::test]
async fn test_unparsable_date_is_rejected() {
    let (_backend, store) = memory_store();
    let err = import_entity(
        &store,
        EntityKind::ProjectNote,
        &json!({"id": "n1", "content": "x", "created": "last tuesday"}),
        &ImportOptions::default(),
    )
    .await
    .unwrap_err();
    let (trace, reason) = validation(err);
    assert_eq!(trace, "Root(ProjectNote)|date");
    assert!(reason.starts_with("created couldn't be resolved to a Date"));
}

#[tokio::test]
async fn test_empty_project_name_is_rejected() {
    let (_backend, store) = memory_store();
    let err = import_entity(
        &store,
        EntityKind::RealtimeProject,
        &realtime_project("a", ""),
        &ImportOptions::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_envelope_is_checked() {
    let (_backend, store) = memory_store();
    let err = import_document(&store, "not json", &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AwarenessError::InvalidDocument { .. }));

    let wrong_version = json!({
        "$format": "design-awareness",
        "version": "2.0.0",
        "type": "TimedNote",
        "data": {"id": "t", "content": "x", "time": 1}
    });
    let err = import_value(&store, wrong_version, &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AwarenessError::InvalidDocument { .. }));
}

#[tokio::test]
async fn test_import_logs_start_and_end() {
    let capture = init_test_capture();
    let (_backend, store) = memory_store();

    import_entity(
        &store,
        EntityKind::ProjectNote,
        &json!({"id": "logged-note", "content": "x"}),
        &ImportOptions::default(),
    )
    .await
    .unwrap();

    let events = capture.events();
    let ours = |event: &str| {
        events.iter().any(|e| {
            e.op.as_deref() == Some("import")
                && e.event.as_deref() == Some(event)
                && e.field("entity_id") == Some("logged-note")
        })
    };
    assert!(ours(EVENT_END));
    assert!(events
        .iter()
        .any(|e| e.op.as_deref() == Some("import") && e.event.as_deref() == Some(EVENT_START)));

    let _ = import_entity(
        &store,
        EntityKind::ProjectNote,
        &json!({"id": "", "content": "x"}),
        &ImportOptions::default(),
    )
    .await;
    assert!(capture
        .events()
        .iter()
        .any(|e| e.op.as_deref() == Some("import") && e.event.as_deref() == Some(EVENT_END_ERROR)));
}

use std::sync::Arc;

use awareness_store::{MemoryBackend, Store};
use serde_json::{json, Value};

/// Store over a fresh in-memory backend, with the backend for inspection
#[allow(dead_code)]
pub fn memory_store() -> (Arc<MemoryBackend>, Store) {
    let backend = Arc::new(MemoryBackend::new());
    let store = Store::new(backend.clone());
    (backend, store)
}

/// Inlined realtime project with one session, one timed note and one
/// project note; every node id is prefixed with `prefix`
#[allow(dead_code)]
pub fn realtime_project(prefix: &str, name: &str) -> Value {
    json!({
        "id": format!("{}-project", prefix),
        "active": true,
        "created": "2021-03-01T09:00:00.000Z",
        "description": "studio critique",
        "modified": "2021-03-02T09:00:00.000Z",
        "name": name,
        "designModel": {
            "id": format!("{}-model", prefix),
            "name": "Double Diamond",
            "activities": [
                {"code": "D", "color": ["ff0000", "00ff00"], "description": "look wide", "name": "Discover"},
                {"code": "F", "color": ["0000ff", "ffff00"], "name": "Define"}
            ],
            "description": null
        },
        "sessions": [{
            "id": format!("{}-session", prefix),
            "data": [[[0, 10], [20, 30]], []],
            "duration": 60,
            "start": "2021-03-01T10:00:00.000Z",
            "notes": [{
                "id": format!("{}-timed", prefix),
                "content": "first idea",
                "created": "2021-03-01T10:00:05.000Z",
                "time": 5
            }]
        }],
        "notes": [{
            "id": format!("{}-note", prefix),
            "content": "kickoff",
            "created": "2021-03-01T09:30:00.000Z"
        }]
    })
}

/// Inlined async project with one entry
#[allow(dead_code)]
pub fn async_project(prefix: &str, name: &str) -> Value {
    json!({
        "id": format!("{}-project", prefix),
        "name": name,
        "reportingPeriod": "week",
        "periodAlignment": 1,
        "designModel": {
            "id": format!("{}-model", prefix),
            "name": "Weekly",
            "activities": [{"code": "W", "color": ["123456", "abcdef"], "name": "Work"}]
        },
        "entries": [{
            "id": format!("{}-entry", prefix),
            "period": "2021-03-01T00:00:00.000Z",
            "data": [{"value": 2}, {"value": 3.5, "note": "late night"}]
        }]
    })
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use awareness_core::errors::{AwarenessError, Result};
use awareness_core::model::{EntityKind, Field, Scalar};
use awareness_store::{EntityHandle, KvBackend, MemoryBackend, Store};
use serde_json::{json, Value};

/// Store over a fresh in-memory backend, with the backend for inspection
#[allow(dead_code)]
pub fn memory_store() -> (Arc<MemoryBackend>, Store) {
    let backend = Arc::new(MemoryBackend::new());
    let store = Store::new(backend.clone());
    (backend, store)
}

/// Handles of a small realtime project graph built in memory
#[allow(dead_code)]
pub struct ProjectGraph {
    pub project: EntityHandle,
    pub model: EntityHandle,
    pub session: EntityHandle,
    pub timed_note: EntityHandle,
    pub project_note: EntityHandle,
}

/// Build an unsaved realtime project with one session, one timed note and
/// one project note
#[allow(dead_code)]
pub fn build_realtime_project(store: &Store, name: &str) -> ProjectGraph {
    let model = store.new_entity(EntityKind::DesignModel);
    store
        .set(model, Field::Name, Scalar::Text("Double Diamond".into()))
        .unwrap();
    store
        .set(
            model,
            Field::Activities,
            Scalar::Json(json!([
                {"code": "D", "color": ["ff0000", "00ff00"], "description": "", "name": "Discover"}
            ])),
        )
        .unwrap();

    let timed_note = store.new_entity(EntityKind::TimedNote);
    store
        .set(timed_note, Field::Content, Scalar::Text("first idea".into()))
        .unwrap();
    store
        .set(timed_note, Field::Time, Scalar::Number(12.0))
        .unwrap();

    let session = store.new_entity(EntityKind::RealtimeSession);
    store
        .set(session, Field::Data, Scalar::Json(json!([[[0, 10]]])))
        .unwrap();
    store
        .set(session, Field::Duration, Scalar::Number(60.0))
        .unwrap();
    store.set(session, Field::Notes, vec![timed_note]).unwrap();

    let project_note = store.new_entity(EntityKind::ProjectNote);
    store
        .set(project_note, Field::Content, Scalar::Text("kickoff".into()))
        .unwrap();

    let project = store.new_entity(EntityKind::RealtimeProject);
    store
        .set(project, Field::Name, Scalar::Text(name.to_string()))
        .unwrap();
    store.set(project, Field::DesignModel, model).unwrap();
    store.set(project, Field::Sessions, vec![session]).unwrap();
    store.set(project, Field::Notes, vec![project_note]).unwrap();

    ProjectGraph {
        project,
        model,
        session,
        timed_note,
        project_note,
    }
}

/// In-memory backend that delays or fails reads of one collection
#[allow(dead_code)]
pub struct SlowBackend {
    pub inner: MemoryBackend,
    collection: &'static str,
    delay: Duration,
    fail_next: AtomicBool,
}

#[allow(dead_code)]
impl SlowBackend {
    pub fn delaying(collection: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(),
            collection,
            delay,
            fail_next: AtomicBool::new(false),
        })
    }

    /// Fail the next read of the collection once
    pub fn fail_next_read(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvBackend for SlowBackend {
    async fn get(&self, store: &str, id: &str) -> Result<Option<Value>> {
        if store == self.collection {
            tokio::time::sleep(self.delay).await;
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AwarenessError::storage(store, "get", "injected read failure"));
            }
        }
        self.inner.get(store, id).await
    }

    async fn add(&self, store: &str, record: Value) -> Result<()> {
        self.inner.add(store, record).await
    }

    async fn update(&self, store: &str, record: Value) -> Result<()> {
        self.inner.update(store, record).await
    }

    async fn remove(&self, store: &str, id: &str) -> Result<()> {
        self.inner.remove(store, id).await
    }

    async fn get_all_keys(&self, store: &str) -> Result<Vec<String>> {
        self.inner.get_all_keys(store).await
    }
}

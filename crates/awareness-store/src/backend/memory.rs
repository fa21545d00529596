use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use awareness_core::errors::{AwarenessError, Result};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{record_id, KvBackend};

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// In-process backend for tests and ephemeral sessions
///
/// Counts reads and successful writes, and can be told to fail the next write to a
/// collection.
#[derive(Default)]
pub struct MemoryBackend {
    collections: Mutex<Collections>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_next: StdMutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful add/update/remove calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next write to `store` fail with a storage error
    pub fn fail_next_write_to(&self, store: &str) {
        if let Ok(mut slot) = self.fail_next.lock() {
            *slot = Some(store.to_string());
        }
    }

    /// Number of records in `store`
    pub async fn len(&self, store: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(store)
            .map_or(0, BTreeMap::len)
    }

    /// Raw record as stored, bypassing the entity layer
    pub async fn raw(&self, store: &str, id: &str) -> Option<Value> {
        self.collections
            .lock()
            .await
            .get(store)
            .and_then(|c| c.get(id))
            .cloned()
    }

    fn check_injected_failure(&self, store: &str, op: &str) -> Result<()> {
        let mut slot = match self.fail_next.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_deref() == Some(store) {
            *slot = None;
            return Err(AwarenessError::storage(store, op, "injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, store: &str, id: &str) -> Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .collections
            .lock()
            .await
            .get(store)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn add(&self, store: &str, record: Value) -> Result<()> {
        self.check_injected_failure(store, "add")?;
        let id = record_id(store, "add", &record)?;
        let mut collections = self.collections.lock().await;
        let collection = collections.entry(store.to_string()).or_default();
        if collection.contains_key(&id) {
            return Err(AwarenessError::storage(
                store,
                "add",
                format!("Key already exists in the object store: {}", id),
            ));
        }
        collection.insert(id, record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, store: &str, record: Value) -> Result<()> {
        self.check_injected_failure(store, "update")?;
        let id = record_id(store, "update", &record)?;
        self.collections
            .lock()
            .await
            .entry(store.to_string())
            .or_default()
            .insert(id, record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, store: &str, id: &str) -> Result<()> {
        self.check_injected_failure(store, "remove")?;
        if let Some(collection) = self.collections.lock().await.get_mut(store) {
            collection.remove(id);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_all_keys(&self, store: &str) -> Result<Vec<String>> {
        Ok(self
            .collections
            .lock()
            .await
            .get(store)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_rejects_existing_id() {
        let backend = MemoryBackend::new();
        backend.add("TimedNote", json!({"id": "a"})).await.unwrap();
        let err = backend.add("TimedNote", json!({"id": "a"})).await.unwrap_err();
        assert!(matches!(err, AwarenessError::Storage { .. }));
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_sorted_and_scoped() {
        let backend = MemoryBackend::new();
        backend.update("A", json!({"id": "b"})).await.unwrap();
        backend.update("A", json!({"id": "a"})).await.unwrap();
        backend.update("B", json!({"id": "c"})).await.unwrap();
        assert_eq!(backend.get_all_keys("A").await.unwrap(), vec!["a", "b"]);
        assert!(backend.get_all_keys("C").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let backend = MemoryBackend::new();
        backend.fail_next_write_to("A");
        assert!(backend.update("B", json!({"id": "x"})).await.is_ok());
        assert!(backend.update("A", json!({"id": "x"})).await.is_err());
        assert!(backend.update("A", json!({"id": "x"})).await.is_ok());
    }
}

//! Flat key-value backends
//!
//! The entity graph is persisted through five primitives scoped to a named
//! collection ("store"). Records are JSON objects carrying their `"id"`.

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use async_trait::async_trait;
use awareness_core::errors::{AwarenessError, Result};
use serde_json::Value;

/// Backing store contract; each call is one transaction
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Fetch a record, `None` if absent
    async fn get(&self, store: &str, id: &str) -> Result<Option<Value>>;

    /// Insert a new record; fails if the id is already present
    async fn add(&self, store: &str, record: Value) -> Result<()>;

    /// Insert or replace a record
    async fn update(&self, store: &str, record: Value) -> Result<()>;

    /// Delete a record; deleting an absent id is not an error
    async fn remove(&self, store: &str, id: &str) -> Result<()>;

    /// Every id in the collection, ascending
    async fn get_all_keys(&self, store: &str) -> Result<Vec<String>>;
}

/// Extract the `"id"` of a record about to be written
pub(crate) fn record_id(store: &str, op: &str, record: &Value) -> Result<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AwarenessError::storage(store, op, "record has no string id"))
}

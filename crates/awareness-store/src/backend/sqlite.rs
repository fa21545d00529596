use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use awareness_core::errors::{AwarenessError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{record_id, KvBackend};
use crate::db;
use crate::errors::{corrupt_record, from_rusqlite};
use crate::migrations::apply_migrations;

/// SQLite-backed key-value store
///
/// Every collection lives in the `records` table. Blocking rusqlite calls
/// run on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open (creating if needed) and migrate the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut conn = db::open(path)?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Migrated in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        apply_migrations(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(conn) => conn,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn get_sync(&self, store: &str, id: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .lock()
            .query_row(
                "SELECT body FROM records WHERE store = ?1 AND id = ?2",
                params![store, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| from_rusqlite(store, "get", e))?;
        body.map(|b| serde_json::from_str(&b).map_err(|e| corrupt_record(store, id, e)))
            .transpose()
    }

    fn add_sync(&self, store: &str, record: &Value) -> Result<()> {
        let id = record_id(store, "add", record)?;
        let conn = self.lock();
        let exists = conn
            .query_row(
                "SELECT 1 FROM records WHERE store = ?1 AND id = ?2",
                params![store, id],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| from_rusqlite(store, "add", e))?
            .is_some();
        if exists {
            return Err(AwarenessError::storage(
                store,
                "add",
                format!("Key already exists in the object store: {}", id),
            ));
        }
        conn.execute(
            "INSERT INTO records (store, id, body, written_at) VALUES (?1, ?2, ?3, ?4)",
            params![store, id, record.to_string(), now_millis()],
        )
        .map_err(|e| from_rusqlite(store, "add", e))?;
        Ok(())
    }

    fn update_sync(&self, store: &str, record: &Value) -> Result<()> {
        let id = record_id(store, "update", record)?;
        self.lock()
            .execute(
                "INSERT INTO records (store, id, body, written_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (store, id) DO UPDATE SET body = excluded.body,
                     written_at = excluded.written_at",
                params![store, id, record.to_string(), now_millis()],
            )
            .map_err(|e| from_rusqlite(store, "update", e))?;
        Ok(())
    }

    fn remove_sync(&self, store: &str, id: &str) -> Result<()> {
        self.lock()
            .execute(
                "DELETE FROM records WHERE store = ?1 AND id = ?2",
                params![store, id],
            )
            .map_err(|e| from_rusqlite(store, "remove", e))?;
        Ok(())
    }

    fn get_all_keys_sync(&self, store: &str) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT id FROM records WHERE store = ?1 ORDER BY id")
            .map_err(|e| from_rusqlite(store, "get_all_keys", e))?;
        let keys = stmt
            .query_map([store], |row| row.get(0))
            .map_err(|e| from_rusqlite(store, "get_all_keys", e))?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(|e| from_rusqlite(store, "get_all_keys", e))?;
        Ok(keys)
    }

    async fn blocking<T, F>(&self, store: &str, op: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqliteBackend) -> Result<T> + Send + 'static,
    {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || f(backend))
            .await
            .map_err(|e| AwarenessError::storage(store, op, format!("join error: {}", e)))?
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl KvBackend for SqliteBackend {
    async fn get(&self, store: &str, id: &str) -> Result<Option<Value>> {
        let (s, i) = (store.to_string(), id.to_string());
        self.blocking(store, "get", move |b| b.get_sync(&s, &i)).await
    }

    async fn add(&self, store: &str, record: Value) -> Result<()> {
        let s = store.to_string();
        self.blocking(store, "add", move |b| b.add_sync(&s, &record))
            .await
    }

    async fn update(&self, store: &str, record: Value) -> Result<()> {
        let s = store.to_string();
        self.blocking(store, "update", move |b| b.update_sync(&s, &record))
            .await
    }

    async fn remove(&self, store: &str, id: &str) -> Result<()> {
        let (s, i) = (store.to_string(), id.to_string());
        self.blocking(store, "remove", move |b| b.remove_sync(&s, &i))
            .await
    }

    async fn get_all_keys(&self, store: &str) -> Result<Vec<String>> {
        let s = store.to_string();
        self.blocking(store, "get_all_keys", move |b| b.get_all_keys_sync(&s))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_is_upsert() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .update("ProjectNote", json!({"id": "n", "content": "a"}))
            .await
            .unwrap();
        backend
            .update("ProjectNote", json!({"id": "n", "content": "b"}))
            .await
            .unwrap();
        let got = backend.get("ProjectNote", "n").await.unwrap().unwrap();
        assert_eq!(got["content"], "b");
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.add("TimedNote", json!({"id": "t"})).await.unwrap();
        assert!(backend.add("TimedNote", json!({"id": "t"})).await.is_err());
        backend.remove("TimedNote", "t").await.unwrap();
        assert_eq!(backend.get("TimedNote", "t").await.unwrap(), None);
        // removing again is fine
        backend.remove("TimedNote", "t").await.unwrap();
    }
}

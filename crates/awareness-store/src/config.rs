//! Persistent application configuration
//!
//! Settings live in the `_Config` collection as `{"id": key, "value": ...}`
//! records. Reads are cached, concurrent reads of one key share a single
//! backend request, and writes go through the cache to the backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use awareness_core::errors::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::backend::KvBackend;

pub const CONFIG_STORE: &str = "_Config";

pub const KEY_RECENT_PROJECTS: &str = "recent_projects";
pub const KEY_HAS_SEEN_ONBOARDING: &str = "has_seen_onboarding";
pub const KEY_TEXT_SCALING_FACTOR: &str = "text_scaling_factor";
pub const KEY_ENABLE_PINCH_TO_ZOOM: &str = "enable_pinch_to_zoom";

/// Most recently opened projects kept
pub const MAX_RECENT_PROJECTS: usize = 8;

type PendingRead = Shared<BoxFuture<'static, Result<Option<Value>>>>;

pub struct ConfigStore {
    backend: Arc<dyn KvBackend>,
    cache: Mutex<HashMap<String, Value>>,
    pending: Mutex<HashMap<String, PendingRead>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Raw stored value for `key`, `None` if never set
    pub async fn get_raw(&self, key: &str) -> Result<Option<Value>> {
        if let Some(value) = lock(&self.cache).get(key) {
            return Ok(Some(value.clone()));
        }

        let read = {
            let mut pending = lock(&self.pending);
            pending
                .entry(key.to_string())
                .or_insert_with(|| {
                    let backend = self.backend.clone();
                    let key = key.to_string();
                    async move {
                        let record = backend.get(CONFIG_STORE, &key).await?;
                        Ok(record.and_then(|r| r.get("value").cloned()))
                    }
                    .boxed()
                    .shared()
                })
                .clone()
        };

        let result = read.await;
        lock(&self.pending).remove(key);
        if let Ok(Some(value)) = &result {
            lock(&self.cache)
                .entry(key.to_string())
                .or_insert_with(|| value.clone());
        }
        result
    }

    /// Typed value for `key`, or `default` when unset or unreadable
    pub async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(default);
        };
        if raw.is_null() {
            return Ok(default);
        }
        match serde_json::from_value(raw) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "config value has unexpected type, using default");
                Ok(default)
            }
        }
    }

    /// Store `value` under `key`
    pub async fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        lock(&self.cache).insert(key.to_string(), value.clone());
        self.backend
            .update(CONFIG_STORE, json!({ "id": key, "value": value }))
            .await
    }

    pub async fn recent_projects(&self) -> Result<Vec<String>> {
        self.get(KEY_RECENT_PROJECTS, Vec::new()).await
    }

    pub async fn set_recent_projects(&self, ids: &[String]) -> Result<()> {
        self.set(KEY_RECENT_PROJECTS, ids).await
    }

    pub async fn has_seen_onboarding(&self) -> Result<bool> {
        self.get(KEY_HAS_SEEN_ONBOARDING, false).await
    }

    pub async fn set_has_seen_onboarding(&self, seen: bool) -> Result<()> {
        self.set(KEY_HAS_SEEN_ONBOARDING, seen).await
    }

    pub async fn text_scaling_factor(&self) -> Result<f64> {
        self.get(KEY_TEXT_SCALING_FACTOR, 0.0).await
    }

    pub async fn set_text_scaling_factor(&self, factor: f64) -> Result<()> {
        self.set(KEY_TEXT_SCALING_FACTOR, factor).await
    }

    pub async fn enable_pinch_to_zoom(&self) -> Result<bool> {
        self.get(KEY_ENABLE_PINCH_TO_ZOOM, false).await
    }

    pub async fn set_enable_pinch_to_zoom(&self, enabled: bool) -> Result<()> {
        self.set(KEY_ENABLE_PINCH_TO_ZOOM, enabled).await
    }

    pub fn recent(&self) -> RecentProjects<'_> {
        RecentProjects { config: self }
    }
}

/// Most-recently-used list of project ids, newest first
pub struct RecentProjects<'a> {
    config: &'a ConfigStore,
}

impl RecentProjects<'_> {
    pub async fn list(&self) -> Result<Vec<String>> {
        self.config.recent_projects().await
    }

    /// Move `id` to the front, dropping the oldest beyond the limit
    pub async fn push(&self, id: &str) -> Result<()> {
        let mut ids = self.list().await?;
        ids.retain(|existing| existing != id);
        ids.insert(0, id.to_string());
        ids.truncate(MAX_RECENT_PROJECTS);
        self.config.set_recent_projects(&ids).await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut ids = self.list().await?;
        ids.retain(|existing| existing != id);
        self.config.set_recent_projects(&ids).await
    }
}

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use awareness_store::{ConfigStore, KvBackend, SqliteBackend, Store};

/// Store and application config over one SQLite database
pub struct Context {
    pub store: Store,
    pub config: ConfigStore,
}

impl Context {
    pub fn open(db: &Path) -> anyhow::Result<Self> {
        let backend: Arc<dyn KvBackend> = Arc::new(
            SqliteBackend::open(db)
                .with_context(|| format!("opening store at {}", db.display()))?,
        );
        tracing::debug!(db = %db.display(), "store opened");
        Ok(Self {
            store: Store::new(backend.clone()),
            config: ConfigStore::new(backend),
        })
    }
}

use std::time::Instant;

use awareness_core::errors::{AwarenessError, Result};
use awareness_core::generate_id;
use awareness_core::{log_op_end, log_op_error, log_op_start};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};

use super::{EntityHandle, FieldValue, Store};

/// What a save captured from the wrapper before suspending
struct Snapshot {
    id: String,
    first_write: bool,
    record: Map<String, Value>,
    references: Vec<(&'static str, FieldValue)>,
}

enum Begin {
    Skip,
    Proceed(Snapshot),
}

impl Store {
    /// Persist the entity and, first, every non-deleted child
    ///
    /// No-op when the entity is clean or a save of it is already running.
    /// A new entity gets a generated id, registered in the cache before any
    /// child is saved. The entity's own record is written last. On failure
    /// the entity is marked dirty again so a retry repeats the whole save.
    pub async fn save(&self, handle: EntityHandle) -> Result<()> {
        self.save_inner(handle, None).await
    }

    /// Like [`Store::save`], but a new entity takes `id` instead of a
    /// generated one. Ignored for entities that already have an id.
    pub async fn save_with_id(&self, handle: EntityHandle, id: &str) -> Result<()> {
        self.save_inner(handle, Some(id.to_string())).await
    }

    /// Save several roots concurrently
    pub async fn save_all(&self, handles: &[EntityHandle]) -> Result<()> {
        join_all(handles.iter().map(|h| self.save(*h)))
            .await
            .into_iter()
            .collect()
    }

    /// Remove the entity from the cache and the backend
    ///
    /// Idempotent. Children are not removed. The wrapper keeps its id and
    /// values for inspection but rejects further mutation.
    pub async fn remove(&self, handle: EntityHandle) -> Result<()> {
        let target = {
            let mut arena = self.arena();
            let slot = arena.slot_mut(handle);
            if slot.deleted {
                return Ok(());
            }
            slot.deleted = true;
            slot.dirty = false;
            let persisted = slot.persisted;
            let id = slot.id.clone();
            if let Some(id) = &id {
                let key = (handle.kind, id.clone());
                if arena.by_id.get(&key) == Some(&handle.slot) {
                    arena.by_id.remove(&key);
                }
            }
            id.filter(|_| persisted)
        };

        let Some(id) = target else {
            tracing::debug!(entity_kind = handle.kind.name(), "removed unsaved entity");
            return Ok(());
        };

        let start = Instant::now();
        log_op_start!("remove", entity_kind = handle.kind.name(), entity_id = id.as_str());
        match self.backend.remove(handle.kind.store_name(), &id).await {
            Ok(()) => {
                log_op_end!("remove", duration_ms = start.elapsed().as_millis() as u64);
                Ok(())
            }
            Err(err) => {
                log_op_error!("remove", err, duration_ms = start.elapsed().as_millis() as u64);
                Err(err)
            }
        }
    }

    fn begin_save(&self, handle: EntityHandle, explicit_id: Option<String>) -> Result<Begin> {
        let mut arena = self.arena();
        let slot = arena.slot(handle);
        if slot.deleted {
            return Err(slot.deleted_error());
        }
        if !slot.dirty || slot.saving {
            return Ok(Begin::Skip);
        }

        let id = match slot.id.clone() {
            Some(id) => id,
            None => {
                let id = explicit_id.unwrap_or_else(generate_id);
                let key = (handle.kind, id.clone());
                if let Some(existing) = arena.by_id.get(&key) {
                    if *existing != handle.slot {
                        return Err(AwarenessError::AlreadyExists {
                            kind: handle.kind,
                            id,
                        });
                    }
                }
                arena.by_id.insert(key, handle.slot);
                arena.slot_mut(handle).id = Some(id.clone());
                id
            }
        };

        let slot = arena.slot_mut(handle);
        slot.saving = true;
        slot.dirty = false;

        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(id.clone()));
        let mut references = Vec::new();
        for (descriptor, value) in handle.kind.schema().iter().zip(&slot.values) {
            match value {
                FieldValue::Scalar(scalar) => {
                    record.insert(descriptor.field.name().to_string(), scalar.to_json());
                }
                reference => references.push((descriptor.field.name(), reference.clone())),
            }
        }

        Ok(Begin::Proceed(Snapshot {
            id,
            first_write: !slot.persisted,
            record,
            references,
        }))
    }

    fn finish_save(&self, handle: EntityHandle, ok: bool) {
        let mut arena = self.arena();
        let slot = arena.slot_mut(handle);
        slot.saving = false;
        if ok {
            slot.persisted = true;
        } else {
            slot.dirty = true;
        }
    }

    fn save_inner(&self, handle: EntityHandle, explicit_id: Option<String>) -> BoxFuture<'_, Result<()>> {
        async move {
            let snapshot = match self.begin_save(handle, explicit_id)? {
                Begin::Skip => {
                    tracing::trace!(entity_kind = handle.kind.name(), "save skipped");
                    return Ok(());
                }
                Begin::Proceed(snapshot) => snapshot,
            };

            let start = Instant::now();
            log_op_start!(
                "save",
                entity_kind = handle.kind.name(),
                entity_id = snapshot.id.as_str()
            );

            let result = self.write_snapshot(handle, snapshot).await;
            self.finish_save(handle, result.is_ok());

            match result {
                Ok(()) => {
                    log_op_end!("save", duration_ms = start.elapsed().as_millis() as u64);
                    Ok(())
                }
                Err(err) => {
                    log_op_error!("save", err, duration_ms = start.elapsed().as_millis() as u64);
                    Err(err)
                }
            }
        }
        .boxed()
    }

    async fn write_snapshot(&self, handle: EntityHandle, snapshot: Snapshot) -> Result<()> {
        let Snapshot {
            id: _,
            first_write,
            mut record,
            references,
        } = snapshot;

        let mut children: Vec<EntityHandle> = Vec::new();
        {
            let arena = self.arena();
            for (_, value) in &references {
                for child in value.children() {
                    if !arena.slot(child).deleted && !children.contains(&child) {
                        children.push(child);
                    }
                }
            }
        }
        // Every child runs to completion so none is left flagged as saving.
        join_all(children.iter().map(|child| self.save_inner(*child, None)))
            .await
            .into_iter()
            .collect::<Result<Vec<()>>>()?;

        {
            let arena = self.arena();
            for (name, value) in &references {
                let encoded = match value {
                    FieldValue::One(child) => child
                        .and_then(|c| arena.child_id(c))
                        .map_or(Value::Null, Value::String),
                    FieldValue::Many(list) => Value::Array(
                        list.iter()
                            .filter_map(|c| arena.child_id(*c))
                            .map(Value::String)
                            .collect(),
                    ),
                    FieldValue::Scalar(_) => continue,
                };
                record.insert((*name).to_string(), encoded);
            }
        }

        let store = handle.kind.store_name();
        if first_write {
            self.backend.add(store, Value::Object(record)).await
        } else {
            self.backend.update(store, Value::Object(record)).await
        }
    }
}

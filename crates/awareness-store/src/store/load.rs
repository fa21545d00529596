use std::time::Instant;

use awareness_core::errors::{AwarenessError, Result};
use awareness_core::model::{EntityKind, Relation, Scalar};
use awareness_core::{log_op_end, log_op_error, log_op_start};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;

use super::{EntityHandle, FieldValue, Slot, Store};
use crate::latch::Latch;

/// Child ids read from a record, waiting to be resolved into handles
enum PendingRef {
    One(usize, EntityKind, Option<String>),
    Many(usize, EntityKind, Vec<String>),
}

/// An in-flight load registered in the latch map
///
/// Dropping it unfired (the caller abandoned the load) removes the latch,
/// which releases waiters with an error instead of leaving them parked, and
/// detaches any half-resolved wrapper from the cache.
struct PendingLoad<'a> {
    store: &'a Store,
    kind: EntityKind,
    id: String,
    slot: Option<usize>,
    released: bool,
}

impl PendingLoad<'_> {
    fn release(mut self, outcome: super::LoadOutcome) {
        self.released = true;
        self.store.release(self.kind, &self.id, outcome);
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if !self.released {
            let key = (self.kind, self.id.clone());
            let mut arena = self.store.arena();
            arena.loading.remove(&key);
            if self.slot.is_some() && arena.by_id.get(&key) == self.slot.as_ref() {
                arena.by_id.remove(&key);
            }
        }
    }
}

enum Claim {
    Cached(EntityHandle),
    Wait(crate::latch::LatchWaiter<super::LoadOutcome>),
    Load,
}

impl Store {
    /// Load the entity `(kind, id)`
    ///
    /// Returns the cached wrapper when there is one, otherwise fetches the
    /// record and resolves its references before returning. A missing
    /// record is `Ok(None)`. Concurrent calls for the same id share one
    /// backend read and yield the same handle, and none of them returns
    /// before the references of that handle are resolved.
    pub async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<EntityHandle>> {
        self.load(kind, id.to_string(), false).await
    }

    /// Look `id` up in both project collections
    pub async fn get_project(&self, id: &str) -> Result<Option<EntityHandle>> {
        if let Some(project) = self.get(EntityKind::AsyncProject, id).await? {
            return Ok(Some(project));
        }
        self.get(EntityKind::RealtimeProject, id).await
    }

    /// Every id stored for `kind`
    pub async fn get_all(&self, kind: EntityKind) -> Result<Vec<String>> {
        self.backend.get_all_keys(kind.store_name()).await
    }

    /// Decide how to serve a load of `(kind, id)`
    ///
    /// A record stays latched until its references are resolved. Outside
    /// callers wait for that. Nested loads issued while resolving references
    /// take the registered wrapper as is, so a back-reference to an ancestor
    /// terminates.
    fn claim(&self, kind: EntityKind, id: &str, nested: bool) -> Claim {
        let mut arena = self.arena();
        let key = (kind, id.to_string());
        if let Some(latch) = arena.loading.get(&key) {
            return match arena.cached(kind, id) {
                Some(handle) if nested => Claim::Cached(handle),
                _ => Claim::Wait(latch.waiter()),
            };
        }
        if let Some(handle) = arena.cached(kind, id) {
            return Claim::Cached(handle);
        }
        arena.loading.insert(key, Latch::new());
        Claim::Load
    }

    fn release(&self, kind: EntityKind, id: &str, outcome: super::LoadOutcome) {
        let latch = self.arena().loading.remove(&(kind, id.to_string()));
        if let Some(latch) = latch {
            latch.fire(outcome);
        }
    }

    fn load(&self, kind: EntityKind, id: String, nested: bool) -> BoxFuture<'_, Result<Option<EntityHandle>>> {
        async move {
            match self.claim(kind, &id, nested) {
                Claim::Cached(handle) => {
                    tracing::trace!(entity_kind = kind.name(), entity_id = %id, "cache hit");
                    return Ok(Some(handle));
                }
                Claim::Wait(waiter) => {
                    tracing::debug!(entity_kind = kind.name(), entity_id = %id, "waiting on in-flight load");
                    return match waiter.wait().await {
                        Some(Ok(slot)) => Ok(slot.map(|s| self.arena().handle(s))),
                        Some(Err(err)) => Err(err),
                        None => Err(AwarenessError::Internal {
                            message: format!("load of {} {} was abandoned", kind, id),
                        }),
                    };
                }
                Claim::Load => {}
            }
            let mut pending_load = PendingLoad {
                store: self,
                kind,
                id: id.clone(),
                slot: None,
                released: false,
            };

            let start = Instant::now();
            log_op_start!("load", entity_kind = kind.name(), entity_id = id.as_str());

            let record = match self.backend.get(kind.store_name(), &id).await {
                Ok(record) => record,
                Err(err) => {
                    log_op_error!("load", err, duration_ms = start.elapsed().as_millis() as u64);
                    pending_load.release(Err(err.clone()));
                    return Err(err);
                }
            };

            let Some(record) = record else {
                pending_load.release(Ok(None));
                log_op_end!("load", duration_ms = start.elapsed().as_millis() as u64, found = false);
                return Ok(None);
            };

            let (slot, pending) = build_slot(kind, &id, &record);
            let handle = {
                let mut arena = self.arena();
                let handle = arena.push(slot);
                arena.by_id.insert((kind, id.clone()), handle.slot);
                handle
            };
            // Cached before children resolve: back-references find this wrapper.
            pending_load.slot = Some(handle.slot);

            if let Err(err) = self.resolve_references(handle, &id, pending).await {
                // Only nested loads have seen the wrapper; detach it so a
                // retry builds the one wrapper everybody gets.
                {
                    let mut arena = self.arena();
                    if arena.by_id.get(&(kind, id.clone())) == Some(&handle.slot) {
                        arena.by_id.remove(&(kind, id.clone()));
                    }
                }
                log_op_error!("load", err, duration_ms = start.elapsed().as_millis() as u64);
                pending_load.release(Err(err.clone()));
                return Err(err);
            }

            pending_load.release(Ok(Some(handle.slot)));
            log_op_end!("load", duration_ms = start.elapsed().as_millis() as u64, found = true);
            Ok(Some(handle))
        }
        .boxed()
    }

    async fn resolve_references(
        &self,
        handle: EntityHandle,
        id: &str,
        pending: Vec<PendingRef>,
    ) -> Result<()> {
        // Drive every child load to completion, even after a failure.
        let resolved = join_all(pending.into_iter().map(|r| self.resolve_reference(handle, id, r)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let mut arena = self.arena();
        let slot = arena.slot_mut(handle);
        for (index, value) in resolved {
            slot.values[index] = value;
        }
        Ok(())
    }

    async fn resolve_reference(
        &self,
        parent: EntityHandle,
        parent_id: &str,
        reference: PendingRef,
    ) -> Result<(usize, FieldValue)> {
        match reference {
            PendingRef::One(index, _, None) => Ok((index, FieldValue::One(None))),
            PendingRef::One(index, child_kind, Some(child_id)) => {
                let child = self.load(child_kind, child_id.clone(), true).await?;
                if child.is_none() {
                    tracing::warn!(
                        entity_kind = parent.kind.name(),
                        entity_id = parent_id,
                        child_kind = child_kind.name(),
                        child_id = %child_id,
                        "dangling reference"
                    );
                }
                Ok((index, FieldValue::One(child)))
            }
            PendingRef::Many(index, child_kind, child_ids) => {
                let children = join_all(child_ids.iter().map(|cid| self.load(child_kind, cid.clone(), true)))
                    .await
                    .into_iter()
                    .collect::<Result<Vec<_>>>()?;
                let mut handles = Vec::with_capacity(children.len());
                for (child_id, child) in child_ids.iter().zip(children) {
                    match child {
                        Some(c) => handles.push(c),
                        None => tracing::warn!(
                            entity_kind = parent.kind.name(),
                            entity_id = parent_id,
                            child_kind = child_kind.name(),
                            child_id = %child_id,
                            "dropping dangling list member"
                        ),
                    }
                }
                Ok((index, FieldValue::Many(handles)))
            }
        }
    }
}

/// Build a clean wrapper from a stored record
///
/// Scalars that are missing or malformed fall back to the schema default.
fn build_slot(kind: EntityKind, id: &str, record: &Value) -> (Slot, Vec<PendingRef>) {
    let mut slot = Slot::new(kind);
    slot.id = Some(id.to_string());
    slot.dirty = false;
    slot.persisted = true;

    let mut pending = Vec::new();
    for (index, descriptor) in kind.schema().iter().enumerate() {
        let stored = record.get(descriptor.field.name());
        match descriptor.relation {
            Relation::Scalar { ty, default } => {
                let value = stored
                    .and_then(|v| Scalar::from_json(ty, v))
                    .unwrap_or_else(|| {
                        tracing::debug!(
                            entity_kind = kind.name(),
                            entity_id = id,
                            field = descriptor.field.name(),
                            "stored value missing or malformed, using default"
                        );
                        default()
                    });
                slot.values[index] = FieldValue::Scalar(value);
            }
            Relation::One(child_kind) => {
                let child_id = stored.and_then(Value::as_str).map(str::to_string);
                pending.push(PendingRef::One(index, child_kind, child_id));
            }
            Relation::Many(child_kind) => {
                let child_ids = stored
                    .and_then(Value::as_array)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                pending.push(PendingRef::Many(index, child_kind, child_ids));
            }
        }
    }
    (slot, pending)
}

//! The entity graph
//!
//! Every wrapper lives in an arena owned by the [`Store`]. An
//! [`EntityHandle`] is a copyable index into that arena; reference fields
//! hold handles, so cyclic graphs need no shared ownership and handle
//! equality is object identity.
//!
//! At most one wrapper exists per `(kind, id)`. Loads of the same record
//! coalesce on a latch, and a wrapper is registered in the cache before its
//! children resolve, so a child that refers back to an ancestor finds it.
//! The latch only fires once the references are resolved.
//!
//! Slots are never reclaimed. A wrapper whose load failed, or an unsaved
//! wrapper nobody saves, keeps its slot until the store is dropped; it is
//! simply unreachable through the cache.

mod load;
mod save;
mod serialize;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use awareness_core::errors::{AwarenessError, Result};
use awareness_core::model::{EntityKind, Field, FieldDescriptor, Relation, Scalar};
use awareness_core::repair;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::backend::KvBackend;
use crate::latch::Latch;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Reference to an entity wrapper owned by a [`Store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    kind: EntityKind,
    slot: usize,
}

impl EntityHandle {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

/// Value of one field of an entity
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    One(Option<EntityHandle>),
    Many(Vec<EntityHandle>),
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<Option<EntityHandle>> for FieldValue {
    fn from(value: Option<EntityHandle>) -> Self {
        FieldValue::One(value)
    }
}

impl From<EntityHandle> for FieldValue {
    fn from(value: EntityHandle) -> Self {
        FieldValue::One(Some(value))
    }
}

impl From<Vec<EntityHandle>> for FieldValue {
    fn from(value: Vec<EntityHandle>) -> Self {
        FieldValue::Many(value)
    }
}

impl FieldValue {
    fn default_for(descriptor: &FieldDescriptor) -> Self {
        match descriptor.relation {
            Relation::Scalar { default, .. } => FieldValue::Scalar(default()),
            Relation::One(_) => FieldValue::One(None),
            Relation::Many(_) => FieldValue::Many(Vec::new()),
        }
    }

    fn same_value(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Scalar(a), FieldValue::Scalar(b)) => a.same_value(b),
            _ => self == other,
        }
    }

    /// Handles this value refers to, in order
    fn children(&self) -> Vec<EntityHandle> {
        match self {
            FieldValue::Scalar(_) => Vec::new(),
            FieldValue::One(child) => child.iter().copied().collect(),
            FieldValue::Many(children) => children.clone(),
        }
    }
}

/// Notification published whenever a field actually changes
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub entity: EntityHandle,
    pub field: Field,
    pub value: FieldValue,
}

struct Slot {
    kind: EntityKind,
    id: Option<String>,
    values: Vec<FieldValue>,
    dirty: bool,
    saving: bool,
    deleted: bool,
    /// A record for this wrapper exists in the backend
    persisted: bool,
    meta: HashMap<String, Value>,
}

impl Slot {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            id: None,
            values: kind.schema().iter().map(FieldValue::default_for).collect(),
            dirty: true,
            saving: false,
            deleted: false,
            persisted: false,
            meta: HashMap::new(),
        }
    }

    fn deleted_error(&self) -> AwarenessError {
        AwarenessError::Deleted {
            kind: self.kind,
            id: self.id.clone().unwrap_or_else(|| "(unsaved)".to_string()),
        }
    }
}

type LoadOutcome = std::result::Result<Option<usize>, AwarenessError>;

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    by_id: HashMap<(EntityKind, String), usize>,
    loading: HashMap<(EntityKind, String), Latch<LoadOutcome>>,
}

impl Arena {
    fn push(&mut self, slot: Slot) -> EntityHandle {
        let kind = slot.kind;
        self.slots.push(slot);
        EntityHandle {
            kind,
            slot: self.slots.len() - 1,
        }
    }

    fn slot(&self, handle: EntityHandle) -> &Slot {
        &self.slots[handle.slot]
    }

    fn slot_mut(&mut self, handle: EntityHandle) -> &mut Slot {
        &mut self.slots[handle.slot]
    }

    fn handle(&self, slot: usize) -> EntityHandle {
        EntityHandle {
            kind: self.slots[slot].kind,
            slot,
        }
    }

    fn cached(&self, kind: EntityKind, id: &str) -> Option<EntityHandle> {
        self.by_id
            .get(&(kind, id.to_string()))
            .map(|slot| self.handle(*slot))
    }

    /// Id of a child as it should be written into its parent's record
    fn child_id(&self, child: EntityHandle) -> Option<String> {
        let slot = self.slot(child);
        if slot.deleted {
            None
        } else {
            slot.id.clone()
        }
    }
}

/// Schema-aware object graph over a [`KvBackend`]
///
/// Handles are only meaningful for the store that issued them. Wrappers are
/// never freed while the store lives; a removed wrapper stays inspectable,
/// and the arena grows by one slot per wrapper ever created. Drop the store
/// to release them.
pub struct Store {
    backend: Arc<dyn KvBackend>,
    arena: Mutex<Arena>,
    changes: broadcast::Sender<FieldChange>,
}

impl Store {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            backend,
            arena: Mutex::new(Arena::default()),
            changes,
        }
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    // Never held across an await point.
    fn arena(&self) -> MutexGuard<'_, Arena> {
        match self.arena.lock() {
            Ok(arena) => arena,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Create an unsaved, dirty entity with schema defaults
    pub fn new_entity(&self, kind: EntityKind) -> EntityHandle {
        self.arena().push(Slot::new(kind))
    }

    /// Wrapper currently cached for `(kind, id)`, without touching the backend
    ///
    /// A wrapper whose references are still being resolved is not returned.
    pub fn cached(&self, kind: EntityKind, id: &str) -> Option<EntityHandle> {
        let arena = self.arena();
        if arena.loading.contains_key(&(kind, id.to_string())) {
            return None;
        }
        arena.cached(kind, id)
    }

    pub fn id(&self, handle: EntityHandle) -> Option<String> {
        self.arena().slot(handle).id.clone()
    }

    pub fn is_dirty(&self, handle: EntityHandle) -> bool {
        self.arena().slot(handle).dirty
    }

    pub fn is_saving(&self, handle: EntityHandle) -> bool {
        self.arena().slot(handle).saving
    }

    pub fn is_deleted(&self, handle: EntityHandle) -> bool {
        self.arena().slot(handle).deleted
    }

    fn descriptor(kind: EntityKind, field: Field) -> Result<(usize, &'static FieldDescriptor)> {
        kind.descriptor(field)
            .ok_or_else(|| AwarenessError::SchemaMismatch {
                kind,
                field: field.name().to_string(),
                reason: format!("not a field of {}", kind),
            })
    }

    /// Current value of `field`
    pub fn field(&self, handle: EntityHandle, field: Field) -> Result<FieldValue> {
        let (index, _) = Self::descriptor(handle.kind, field)?;
        Ok(self.arena().slot(handle).values[index].clone())
    }

    fn scalar(&self, handle: EntityHandle, field: Field) -> Result<Scalar> {
        match self.field(handle, field)? {
            FieldValue::Scalar(value) => Ok(value),
            _ => Err(mismatch(handle.kind, field, "is a reference field")),
        }
    }

    pub fn text(&self, handle: EntityHandle, field: Field) -> Result<String> {
        match self.scalar(handle, field)? {
            Scalar::Text(s) => Ok(s),
            _ => Err(mismatch(handle.kind, field, "is not text")),
        }
    }

    pub fn number(&self, handle: EntityHandle, field: Field) -> Result<f64> {
        self.scalar(handle, field)?
            .as_number()
            .ok_or_else(|| mismatch(handle.kind, field, "is not a number"))
    }

    pub fn boolean(&self, handle: EntityHandle, field: Field) -> Result<bool> {
        self.scalar(handle, field)?
            .as_bool()
            .ok_or_else(|| mismatch(handle.kind, field, "is not a bool"))
    }

    pub fn date(&self, handle: EntityHandle, field: Field) -> Result<DateTime<Utc>> {
        self.scalar(handle, field)?
            .as_date()
            .ok_or_else(|| mismatch(handle.kind, field, "is not a date"))
    }

    /// JSON-typed field; a null description reads as `Value::Null`
    pub fn json(&self, handle: EntityHandle, field: Field) -> Result<Value> {
        match self.scalar(handle, field)? {
            Scalar::Json(v) => Ok(v),
            Scalar::Null => Ok(Value::Null),
            _ => Err(mismatch(handle.kind, field, "is not json")),
        }
    }

    pub fn one(&self, handle: EntityHandle, field: Field) -> Result<Option<EntityHandle>> {
        match self.field(handle, field)? {
            FieldValue::One(child) => Ok(child),
            _ => Err(mismatch(handle.kind, field, "is not a single reference")),
        }
    }

    pub fn many(&self, handle: EntityHandle, field: Field) -> Result<Vec<EntityHandle>> {
        match self.field(handle, field)? {
            FieldValue::Many(children) => Ok(children),
            _ => Err(mismatch(handle.kind, field, "is not a reference list")),
        }
    }

    /// Assign a field
    ///
    /// # Errors
    ///
    /// `Deleted` for removed entities; `SchemaMismatch` when the field is
    /// not part of the kind or the value has the wrong shape or child kind.
    pub fn set(&self, handle: EntityHandle, field: Field, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        let (index, descriptor) = Self::descriptor(handle.kind, field)?;
        check_shape(handle.kind, descriptor, &value)?;

        {
            let mut arena = self.arena();
            let slot = arena.slot_mut(handle);
            if slot.deleted {
                return Err(slot.deleted_error());
            }
            if slot.values[index].same_value(&value) {
                return Ok(());
            }
            slot.values[index] = value.clone();
            slot.dirty = true;
        }

        // No subscribers is not an error.
        let _ = self.changes.send(FieldChange {
            entity: handle,
            field,
            value,
        });
        Ok(())
    }

    /// Receive a [`FieldChange`] for every effective assignment from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FieldChange> {
        self.changes.subscribe()
    }

    /// In-memory annotation; not persisted and not dirty-tracked
    pub fn get_meta(&self, handle: EntityHandle, key: &str, default: Value) -> Value {
        self.arena()
            .slot(handle)
            .meta
            .get(key)
            .cloned()
            .unwrap_or(default)
    }

    pub fn set_meta(&self, handle: EntityHandle, key: &str, value: Value) {
        self.arena()
            .slot_mut(handle)
            .meta
            .insert(key.to_string(), value);
    }

    /// Close interrupted timing pairs of a realtime session
    ///
    /// Returns whether anything changed. The session is left dirty, not
    /// saved.
    pub fn repair_session(&self, handle: EntityHandle) -> Result<bool> {
        if handle.kind != EntityKind::RealtimeSession {
            return Err(AwarenessError::SchemaMismatch {
                kind: handle.kind,
                field: Field::Data.name().to_string(),
                reason: "only realtime sessions can be repaired".to_string(),
            });
        }
        let data = self.json(handle, Field::Data)?;
        if !repair::check_needs_repair(&data) {
            return Ok(false);
        }
        let duration = self.number(handle, Field::Duration)?;
        let repaired = repair::repair(&data, duration);
        self.set(handle, Field::Data, Scalar::Json(repaired))?;
        tracing::info!(
            entity_kind = handle.kind.name(),
            entity_id = self.id(handle).as_deref().unwrap_or("(unsaved)"),
            "repaired realtime session"
        );
        Ok(true)
    }
}

fn mismatch(kind: EntityKind, field: Field, reason: &str) -> AwarenessError {
    AwarenessError::SchemaMismatch {
        kind,
        field: field.name().to_string(),
        reason: reason.to_string(),
    }
}

fn check_shape(kind: EntityKind, descriptor: &FieldDescriptor, value: &FieldValue) -> Result<()> {
    let field = descriptor.field;
    match (descriptor.relation, value) {
        (Relation::Scalar { ty, .. }, FieldValue::Scalar(v)) => {
            if v.matches(ty) {
                Ok(())
            } else {
                Err(mismatch(kind, field, &format!("expected {}", ty.name())))
            }
        }
        (Relation::One(child_kind), FieldValue::One(child)) => match child {
            Some(c) if c.kind != child_kind => Err(mismatch(
                kind,
                field,
                &format!("expected {}, got {}", child_kind, c.kind),
            )),
            _ => Ok(()),
        },
        (Relation::Many(child_kind), FieldValue::Many(children)) => {
            match children.iter().find(|c| c.kind != child_kind) {
                Some(c) => Err(mismatch(
                    kind,
                    field,
                    &format!("expected {}, got {}", child_kind, c.kind),
                )),
                None => Ok(()),
            }
        }
        (Relation::Scalar { ty, .. }, _) => {
            Err(mismatch(kind, field, &format!("expected {}", ty.name())))
        }
        (Relation::One(_), _) => Err(mismatch(kind, field, "expected a single reference")),
        (Relation::Many(_), _) => Err(mismatch(kind, field, "expected a reference list")),
    }
}

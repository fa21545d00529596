use awareness_core::errors::{AwarenessError, Result};
use awareness_core::PortableDocument;
use serde_json::{Map, Value};

use super::{Arena, EntityHandle, FieldValue, Store};

impl Store {
    /// Fully inlined JSON tree of the entity and everything it references
    ///
    /// Deleted children are left out. The descriptor tables admit no
    /// reference cycle; should one appear it fails with `CycleDetected`.
    pub fn to_serializable(&self, handle: EntityHandle) -> Result<Value> {
        let arena = self.arena();
        let mut path = Vec::new();
        inline(&arena, handle, &mut path)
    }

    /// Portable document for the entity
    pub fn serialize(&self, handle: EntityHandle, pretty: bool) -> Result<String> {
        let data = self.to_serializable(handle)?;
        PortableDocument::new(handle.kind(), data).to_json_string(pretty)
    }
}

fn inline(arena: &Arena, handle: EntityHandle, path: &mut Vec<EntityHandle>) -> Result<Value> {
    let slot = arena.slot(handle);
    if path.contains(&handle) {
        return Err(AwarenessError::CycleDetected {
            kind: handle.kind,
            id: slot.id.clone().unwrap_or_else(|| "(unsaved)".to_string()),
        });
    }
    path.push(handle);

    let mut out = Map::new();
    if let Some(id) = &slot.id {
        out.insert("id".to_string(), Value::String(id.clone()));
    }
    for (descriptor, value) in handle.kind.schema().iter().zip(&slot.values) {
        let encoded = match value {
            FieldValue::Scalar(scalar) => scalar.to_json(),
            FieldValue::One(child) => match child.filter(|c| !arena.slot(*c).deleted) {
                Some(c) => inline(arena, c, path)?,
                None => Value::Null,
            },
            FieldValue::Many(children) => Value::Array(
                children
                    .iter()
                    .filter(|c| !arena.slot(**c).deleted)
                    .map(|c| inline(arena, *c, path))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        out.insert(descriptor.field.name().to_string(), encoded);
    }

    path.pop();
    Ok(Value::Object(out))
}

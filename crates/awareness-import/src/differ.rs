//! Field comparison between an incoming node and a stored entity
//!
//! Both sides are compared in storage encoding: scalars as their JSON
//! encoding, references as ids.

use awareness_core::errors::Result;
use awareness_core::model::scalar::parse_date;
use awareness_core::model::{EntityKind, Field, FieldDescriptor, Relation, Scalar};
use awareness_store::{FieldValue, Store};
use serde_json::{Map, Value};

pub(crate) type Record = Map<String, Value>;

/// Storage-encoded view of a cached entity
pub(crate) fn record_of(store: &Store, handle: awareness_store::EntityHandle) -> Result<Record> {
    let mut record = Record::new();
    for descriptor in handle.kind().schema() {
        let encoded = match store.field(handle, descriptor.field)? {
            FieldValue::Scalar(value) => value.to_json(),
            FieldValue::One(child) => child
                .and_then(|c| store.id(c))
                .map_or(Value::Null, Value::String),
            FieldValue::Many(children) => Value::Array(
                children
                    .into_iter()
                    .filter_map(|c| store.id(c))
                    .map(Value::String)
                    .collect(),
            ),
        };
        record.insert(descriptor.field.name().to_string(), encoded);
    }
    if let Some(id) = store.id(handle) {
        record.insert("id".to_string(), Value::String(id));
    }
    Ok(record)
}

/// The value a scalar field takes when `incoming` is imported over `existing`
///
/// Activities keep only their known keys and inherit a missing description
/// from the stored activity at the same position. Entry data points get an
/// empty note when none is given.
pub(crate) fn incoming_scalar(
    kind: EntityKind,
    field: Field,
    incoming: &Value,
    existing: Option<&Value>,
) -> Value {
    match (kind, field) {
        (EntityKind::DesignModel, Field::Activities) => {
            let stored = existing.and_then(Value::as_array);
            let activities = incoming
                .as_array()
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .enumerate()
                .map(|(i, activity)| {
                    let description = activity
                        .get("description")
                        .and_then(Value::as_str)
                        .or_else(|| {
                            stored
                                .and_then(|s| s.get(i))
                                .and_then(|a| a.get("description"))
                                .and_then(Value::as_str)
                        })
                        .unwrap_or("");
                    serde_json::json!({
                        "code": activity.get("code").cloned().unwrap_or(Value::Null),
                        "color": activity.get("color").cloned().unwrap_or(Value::Null),
                        "description": description,
                        "name": activity.get("name").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect();
            Value::Array(activities)
        }
        (EntityKind::AsyncEntry, Field::Data) => Value::Array(
            incoming
                .as_array()
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .map(|point| {
                    serde_json::json!({
                        "note": point.get("note").and_then(Value::as_str).unwrap_or(""),
                        "value": point.get("value").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect(),
        ),
        _ => incoming.clone(),
    }
}

/// Fields present in `incoming` whose value differs from `existing`
///
/// `wellKnown` is never compared; it is derived from the id on import.
pub(crate) fn differing_properties(
    kind: EntityKind,
    incoming: &Record,
    existing: &Record,
) -> Vec<Field> {
    kind.schema()
        .iter()
        .filter(|d| d.field != Field::WellKnown)
        .filter(|d| {
            incoming
                .get(d.field.name())
                .is_some_and(|value| differs(kind, d, value, existing.get(d.field.name())))
        })
        .map(|d| d.field)
        .collect()
}

fn differs(
    kind: EntityKind,
    descriptor: &FieldDescriptor,
    incoming: &Value,
    existing: Option<&Value>,
) -> bool {
    match descriptor.relation {
        Relation::Scalar { ty, default } => {
            let incoming = incoming_scalar(kind, descriptor.field, incoming, existing);
            let stored = existing
                .and_then(|v| Scalar::from_json(ty, v))
                .unwrap_or_else(default);
            match Scalar::from_json(ty, &incoming) {
                Some(incoming) => !incoming.same_value(&stored),
                None => true,
            }
        }
        Relation::One(_) => child_id(incoming) != existing.and_then(Value::as_str),
        Relation::Many(_) => {
            let incoming: Vec<Option<&str>> = incoming
                .as_array()
                .map(|list| list.iter().map(child_id).collect())
                .unwrap_or_default();
            let stored: Vec<Option<&str>> = existing
                .and_then(Value::as_array)
                .map(|list| list.iter().map(Value::as_str).collect())
                .unwrap_or_default();
            incoming != stored
        }
    }
}

fn child_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

/// Whether the incoming `modified` differs and is earlier than the stored one
pub(crate) fn is_older(incoming: &Record, existing: &Record, differing: &[Field]) -> bool {
    if !differing.contains(&Field::Modified) {
        return false;
    }
    let modified = |record: &Record| {
        record
            .get(Field::Modified.name())
            .and_then(Value::as_str)
            .and_then(parse_date)
    };
    match (modified(incoming), modified(existing)) {
        (Some(incoming), Some(stored)) => incoming < stored,
        _ => false,
    }
}

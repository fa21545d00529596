//! Realtime session repair
//!
//! A session's `data` holds one activity record per activity, each a list of
//! `[start, end]` timing pairs. An interrupted recording leaves `end == -1`.

use serde_json::Value;

use crate::model::Scalar;

const OPEN_END: f64 = -1.0;

fn pairs(record: &Value) -> impl Iterator<Item = &Vec<Value>> {
    record
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
}

fn is_open(pair: &[Value]) -> bool {
    pair.get(1).and_then(Value::as_f64) == Some(OPEN_END)
}

/// Whether any timing pair in `data` was left open
pub fn check_needs_repair(data: &Value) -> bool {
    data.as_array()
        .into_iter()
        .flatten()
        .any(|record| pairs(record).any(|p| is_open(p)))
}

/// Close every open timing pair
///
/// An open pair ends one unit before the next pair starts, or at `duration`
/// when it is the last pair of its record. Anything that is not a timing
/// pair is passed through unchanged.
pub fn repair(data: &Value, duration: f64) -> Value {
    let Some(records) = data.as_array() else {
        return data.clone();
    };
    Value::Array(
        records
            .iter()
            .map(|record| match record.as_array() {
                Some(list) => Value::Array(repair_record(list, duration)),
                None => record.clone(),
            })
            .collect(),
    )
}

fn repair_record(list: &[Value], duration: f64) -> Vec<Value> {
    list.iter()
        .enumerate()
        .map(|(i, entry)| {
            let Some(pair) = entry.as_array().filter(|p| is_open(p)) else {
                return entry.clone();
            };
            let end = match list.get(i + 1) {
                Some(next) => next
                    .as_array()
                    .and_then(|n| n.first())
                    .and_then(Value::as_f64)
                    .map(|start| start - 1.0)
                    .unwrap_or(duration),
                None => duration,
            };
            Value::Array(vec![pair[0].clone(), Scalar::Number(end).to_json()])
        })
        .collect()
}

//! Runtime shape checks for incoming document nodes
//!
//! Each kind has a rule table. Required fields must be present and well
//! formed; optional fields are only checked when present.

use awareness_core::errors::{AwarenessError, Result};
use awareness_core::model::scalar::parse_date;
use awareness_core::model::{EntityKind, Field};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
enum Check {
    Bool,
    Text,
    NonEmptyText,
    Number,
    Date,
    Record,
    Records,
    /// Integer day of week, 0 (Sunday) to 6
    Weekday,
    /// `"day"` or `"week"`
    ReportingPeriod,
    /// `[{ note?: string, value: number }]`
    EntryData,
    /// `[{ code, color: [hex6, hex6], description?, name }]`
    Activities,
    /// `null` or `{ citation?, description, imageURL?, moreInfoURL? }`
    ModelDescription,
    /// `[[[number, number]]]`
    SessionData,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    field: Field,
    check: Check,
    required: bool,
}

const fn req(field: Field, check: Check) -> Rule {
    Rule {
        field,
        check,
        required: true,
    }
}

const fn opt(field: Field, check: Check) -> Rule {
    Rule {
        field,
        check,
        required: false,
    }
}

static ASYNC_PROJECT: [Rule; 10] = [
    opt(Field::Active, Check::Bool),
    opt(Field::Created, Check::Date),
    opt(Field::Description, Check::Text),
    req(Field::DesignModel, Check::Record),
    req(Field::Entries, Check::Records),
    opt(Field::Modified, Check::Date),
    req(Field::Name, Check::NonEmptyText),
    opt(Field::Notes, Check::Records),
    opt(Field::PeriodAlignment, Check::Weekday),
    req(Field::ReportingPeriod, Check::ReportingPeriod),
];

static ASYNC_ENTRY: [Rule; 5] = [
    opt(Field::Created, Check::Date),
    req(Field::Data, Check::EntryData),
    opt(Field::Modified, Check::Date),
    opt(Field::Note, Check::Text),
    req(Field::Period, Check::Date),
];

static DESIGN_MODEL: [Rule; 4] = [
    req(Field::Activities, Check::Activities),
    opt(Field::Description, Check::ModelDescription),
    req(Field::Name, Check::NonEmptyText),
    opt(Field::WellKnown, Check::Bool),
];

static PROJECT_NOTE: [Rule; 2] = [
    req(Field::Content, Check::Text),
    opt(Field::Created, Check::Date),
];

static REALTIME_PROJECT: [Rule; 8] = [
    opt(Field::Active, Check::Bool),
    opt(Field::Created, Check::Date),
    opt(Field::Description, Check::Text),
    req(Field::DesignModel, Check::Record),
    opt(Field::Modified, Check::Date),
    req(Field::Name, Check::NonEmptyText),
    opt(Field::Notes, Check::Records),
    req(Field::Sessions, Check::Records),
];

static REALTIME_SESSION: [Rule; 4] = [
    req(Field::Data, Check::SessionData),
    req(Field::Duration, Check::Number),
    opt(Field::Notes, Check::Records),
    req(Field::Start, Check::Date),
];

static TIMED_NOTE: [Rule; 3] = [
    req(Field::Content, Check::Text),
    opt(Field::Created, Check::Date),
    req(Field::Time, Check::Number),
];

fn rules(kind: EntityKind) -> &'static [Rule] {
    match kind {
        EntityKind::AsyncEntry => &ASYNC_ENTRY,
        EntityKind::AsyncProject => &ASYNC_PROJECT,
        EntityKind::DesignModel => &DESIGN_MODEL,
        EntityKind::ProjectNote => &PROJECT_NOTE,
        EntityKind::RealtimeProject => &REALTIME_PROJECT,
        EntityKind::RealtimeSession => &REALTIME_SESSION,
        EntityKind::TimedNote => &TIMED_NOTE,
    }
}

/// Check `data` against the rules for `kind`
///
/// The first failing field is reported with trace `<trace>|typecheck`.
pub fn check(kind: EntityKind, data: &Map<String, Value>, trace: &str) -> Result<()> {
    for rule in rules(kind) {
        let name = rule.field.name();
        let ok = match data.get(name) {
            Some(value) => passes(rule.check, value),
            None => !rule.required,
        };
        if !ok {
            let reason = if rule.required {
                format!("wrong type or missing property \"{}\"", name)
            } else {
                format!("wrong type for property \"{}\"", name)
            };
            return Err(AwarenessError::validation(
                format!("{}|typecheck", trace),
                reason,
            ));
        }
    }
    Ok(())
}

fn passes(check: Check, value: &Value) -> bool {
    match check {
        Check::Bool => value.is_boolean(),
        Check::Text => value.is_string(),
        Check::NonEmptyText => is_non_empty_text(value),
        Check::Number => is_number(value),
        Check::Date => value.as_str().and_then(parse_date).is_some(),
        Check::Record => value.is_object(),
        Check::Records => all(value, Value::is_object),
        Check::Weekday => value
            .as_f64()
            .is_some_and(|n| n.fract() == 0.0 && (0.0..=6.0).contains(&n)),
        Check::ReportingPeriod => matches!(value.as_str(), Some("day" | "week")),
        Check::EntryData => all(value, |point| {
            point.as_object().is_some_and(|point| {
                point.get("value").is_some_and(is_number)
                    && point.get("note").map_or(true, Value::is_string)
            })
        }),
        Check::Activities => all(value, is_activity),
        Check::ModelDescription => value.is_null() || is_model_description(value),
        Check::SessionData => all(value, |track| {
            all(track, |pair| {
                pair.as_array()
                    .is_some_and(|pair| pair.len() == 2 && pair.iter().all(is_number))
            })
        }),
    }
}

fn all(value: &Value, item: impl Fn(&Value) -> bool) -> bool {
    value.as_array().is_some_and(|items| items.iter().all(item))
}

fn is_number(value: &Value) -> bool {
    value.as_f64().is_some_and(f64::is_finite)
}

fn is_non_empty_text(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}

fn is_hex_color(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.len() == 6 && s.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_activity(value: &Value) -> bool {
    let Some(activity) = value.as_object() else {
        return false;
    };
    activity.get("code").is_some_and(is_non_empty_text)
        && activity.get("name").is_some_and(is_non_empty_text)
        && activity
            .get("color")
            .and_then(Value::as_array)
            .is_some_and(|c| c.len() == 2 && c.iter().all(is_hex_color))
        && activity.get("description").map_or(true, Value::is_string)
}

fn is_model_description(value: &Value) -> bool {
    let Some(description) = value.as_object() else {
        return false;
    };
    let optional_text = |key: &str| description.get(key).map_or(true, Value::is_string);
    description.get("description").is_some_and(Value::is_string)
        && optional_text("citation")
        && optional_text("moreInfoURL")
        && description
            .get("imageURL")
            .map_or(true, |url| url.is_string() || all(url, Value::is_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn reason(result: Result<()>) -> (String, String) {
        match result {
            Err(AwarenessError::Validation { trace, reason }) => (trace, reason),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_timed_note_requires_time() {
        let data = object(json!({"id": "t", "content": "x"}));
        let (trace, reason) = reason(check(EntityKind::TimedNote, &data, "Root(TimedNote)"));
        assert_eq!(trace, "Root(TimedNote)|typecheck");
        assert_eq!(reason, "wrong type or missing property \"time\"");
    }

    #[test]
    fn test_optional_field_reports_wrong_type() {
        let data = object(json!({"content": "x", "created": 5}));
        let (_, reason) = reason(check(EntityKind::ProjectNote, &data, "t"));
        assert_eq!(reason, "wrong type for property \"created\"");
    }

    #[test]
    fn test_period_alignment_must_be_a_weekday() {
        let mut data = object(json!({
            "designModel": {}, "entries": [], "name": "p", "reportingPeriod": "week",
            "periodAlignment": 7
        }));
        assert!(check(EntityKind::AsyncProject, &data, "t").is_err());
        data.insert("periodAlignment".into(), json!(6));
        assert!(check(EntityKind::AsyncProject, &data, "t").is_ok());
        data.insert("reportingPeriod".into(), json!("month"));
        assert!(check(EntityKind::AsyncProject, &data, "t").is_err());
    }

    #[test]
    fn test_activity_colors_are_two_hex_strings() {
        let good = object(json!({
            "name": "m",
            "activities": [{"code": "A", "color": ["ff0000", "00FF00"], "name": "Act"}]
        }));
        assert!(check(EntityKind::DesignModel, &good, "t").is_ok());

        let bad = object(json!({
            "name": "m",
            "activities": [{"code": "A", "color": ["red", "00ff00"], "name": "Act"}]
        }));
        let (_, reason) = reason(check(EntityKind::DesignModel, &bad, "t"));
        assert_eq!(reason, "wrong type or missing property \"activities\"");
    }

    #[test]
    fn test_model_description_accepts_null_and_image_lists() {
        for description in [
            json!(null),
            json!({"description": "d", "imageURL": ["a.png", "b.png"]}),
            json!({"description": "d", "imageURL": "a.png", "citation": "c"}),
        ] {
            let data = object(json!({"name": "m", "activities": [], "description": description}));
            assert!(check(EntityKind::DesignModel, &data, "t").is_ok());
        }
        let data = object(json!({"name": "m", "activities": [], "description": {"citation": "c"}}));
        assert!(check(EntityKind::DesignModel, &data, "t").is_err());
    }

    #[test]
    fn test_session_data_is_tracks_of_pairs() {
        let base = json!({"duration": 10, "start": "2021-01-01T00:00:00.000Z"});
        let mut data = object(base.clone());
        data.insert("data".into(), json!([[[0, 1], [2, 3]], []]));
        assert!(check(EntityKind::RealtimeSession, &data, "t").is_ok());
        data.insert("data".into(), json!([[[0, 1, 2]]]));
        assert!(check(EntityKind::RealtimeSession, &data, "t").is_err());
    }

    #[test]
    fn test_entry_data_notes_are_optional() {
        let data = object(json!({
            "period": "2021-01-04T00:00:00.000Z",
            "data": [{"value": 3}, {"value": 1.5, "note": "late"}]
        }));
        assert!(check(EntityKind::AsyncEntry, &data, "t").is_ok());
    }
}

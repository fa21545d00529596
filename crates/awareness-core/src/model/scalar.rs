use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Storage type of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Number,
    Text,
    /// Instant, stored as an RFC 3339 string with millisecond precision
    Date,
    /// JSON array
    Json,
    /// `null` or any JSON value
    NullableJson,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Number => "number",
            ScalarType::Text => "text",
            ScalarType::Date => "date",
            ScalarType::Json => "json array",
            ScalarType::NullableJson => "nullable json",
        }
    }
}

/// A scalar field value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    Json(Value),
}

impl Scalar {
    /// Current instant truncated to milliseconds, the storage precision
    pub fn now() -> Scalar {
        Scalar::Date(truncate_millis(Utc::now()))
    }

    pub fn empty_text() -> Scalar {
        Scalar::Text(String::new())
    }

    pub fn empty_array() -> Scalar {
        Scalar::Json(Value::Array(Vec::new()))
    }

    /// Whether this value can be stored in a field of type `ty`
    pub fn matches(&self, ty: ScalarType) -> bool {
        match (ty, self) {
            (ScalarType::Bool, Scalar::Bool(_)) => true,
            (ScalarType::Number, Scalar::Number(n)) => n.is_finite(),
            (ScalarType::Text, Scalar::Text(_)) => true,
            (ScalarType::Date, Scalar::Date(_)) => true,
            (ScalarType::Json, Scalar::Json(v)) => v.is_array(),
            (ScalarType::NullableJson, Scalar::Null) => true,
            (ScalarType::NullableJson, Scalar::Json(v)) => !v.is_null(),
            _ => false,
        }
    }

    /// Decode a stored or imported JSON value as a scalar of type `ty`
    ///
    /// Returns `None` when the value has the wrong shape.
    pub fn from_json(ty: ScalarType, value: &Value) -> Option<Scalar> {
        match ty {
            ScalarType::Bool => value.as_bool().map(Scalar::Bool),
            ScalarType::Number => value.as_f64().map(Scalar::Number),
            ScalarType::Text => value.as_str().map(|s| Scalar::Text(s.to_string())),
            ScalarType::Date => value.as_str().and_then(parse_date).map(Scalar::Date),
            ScalarType::Json => value.is_array().then(|| Scalar::Json(value.clone())),
            ScalarType::NullableJson => Some(if value.is_null() {
                Scalar::Null
            } else {
                Scalar::Json(value.clone())
            }),
        }
    }

    /// Storage encoding of the value
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => number_to_json(*n),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Date(d) => Value::String(format_date(d)),
            Scalar::Json(v) => v.clone(),
        }
    }

    /// Equality at storage precision (dates compared to the millisecond)
    pub fn same_value(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Date(a), Scalar::Date(b)) => a.timestamp_millis() == b.timestamp_millis(),
            (Scalar::Json(a), Scalar::Json(b)) => json_equal(a, b),
            _ => self == other,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Scalar::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Scalar::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Format an instant the way it is stored: RFC 3339, milliseconds, `Z`
pub fn format_date(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn truncate_millis(d: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(d.timestamp_millis()).unwrap_or(d)
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Structural JSON equality with numbers compared by value (`50 == 50.0`)
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integral_numbers_encode_as_integers() {
        assert_eq!(Scalar::Number(3.0).to_json(), json!(3));
        assert_eq!(Scalar::Number(1.5).to_json(), json!(1.5));
    }

    #[test]
    fn test_date_encoding_has_millis() {
        let d = parse_date("2021-03-04T05:06:07.089Z").unwrap();
        assert_eq!(
            Scalar::Date(d).to_json(),
            json!("2021-03-04T05:06:07.089Z")
        );
    }

    #[test]
    fn test_from_json_rejects_wrong_shape() {
        assert_eq!(Scalar::from_json(ScalarType::Text, &json!(1)), None);
        assert_eq!(Scalar::from_json(ScalarType::Json, &json!({})), None);
        assert_eq!(Scalar::from_json(ScalarType::Date, &json!("yesterday")), None);
        assert_eq!(
            Scalar::from_json(ScalarType::NullableJson, &Value::Null),
            Some(Scalar::Null)
        );
    }

    #[test]
    fn test_same_value_ignores_sub_millisecond_noise() {
        let a = parse_date("2021-03-04T05:06:07.089Z").unwrap();
        let b = a + chrono::Duration::microseconds(300);
        assert!(Scalar::Date(a).same_value(&Scalar::Date(b)));
        assert!(!Scalar::Number(1.0).same_value(&Scalar::Number(2.0)));
    }

    #[test]
    fn test_same_value_compares_json_numbers_by_value() {
        let integral = Scalar::Json(json!([[[0, 50]], {"value": 2}]));
        let float = Scalar::Json(json!([[[0.0, 50.0]], {"value": 2.0}]));
        assert!(integral.same_value(&float));
        assert!(!integral.same_value(&Scalar::Json(json!([[[0, 51]], {"value": 2}]))));
        assert!(!integral.same_value(&Scalar::Json(json!([[[0, 50]]]))));
    }

    #[test]
    fn test_matches() {
        assert!(Scalar::Null.matches(ScalarType::NullableJson));
        assert!(!Scalar::Null.matches(ScalarType::Text));
        assert!(Scalar::empty_array().matches(ScalarType::Json));
        assert!(!Scalar::Number(f64::NAN).matches(ScalarType::Number));
    }
}

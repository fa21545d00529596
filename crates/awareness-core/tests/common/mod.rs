use awareness_core::model::scalar::parse_date;
use chrono::{DateTime, Utc};

/// Parse an RFC 3339 literal used in a test fixture
#[allow(dead_code)]
pub fn date(s: &str) -> DateTime<Utc> {
    parse_date(s).expect("fixture date must be RFC 3339")
}

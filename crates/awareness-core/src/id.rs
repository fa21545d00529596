//! Locally generated entity identifiers
//!
//! An id is 24 characters from `[0-9a-z]`: 16 random characters followed by
//! the creation time in milliseconds, base-36, padded to 8 characters.

use chrono::{DateTime, Utc};
use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const ID_LEN: usize = 24;
const RANDOM_LEN: usize = 16;
const TIME_LEN: usize = 8;

/// Prefix marking ids of trusted, shipped design models
pub const WELL_KNOWN_PREFIX: &str = "well-known:";

/// Generate a fresh id stamped with the current time
pub fn generate_id() -> String {
    generate_id_at(Utc::now())
}

/// Generate a fresh id stamped with `at`
pub fn generate_id_at(at: DateTime<Utc>) -> String {
    let mut id = String::with_capacity(ID_LEN);
    for b in Uuid::new_v4().as_bytes().iter().take(RANDOM_LEN) {
        id.push(ALPHABET[(*b as usize) % ALPHABET.len()] as char);
    }
    id.push_str(&time_component(at.timestamp_millis().max(0) as u64));
    id
}

/// Whether `id` names a well-known (shipped) entity
pub fn is_well_known(id: &str) -> bool {
    id.starts_with(WELL_KNOWN_PREFIX)
}

fn time_component(mut millis: u64) -> String {
    let mut digits = Vec::new();
    while millis > 0 {
        digits.push(ALPHABET[(millis % 36) as usize]);
        millis /= 36;
    }
    while digits.len() < TIME_LEN {
        digits.push(b'0');
    }
    // least significant digit first; keep the right-most TIME_LEN digits
    digits.truncate(TIME_LEN);
    digits.iter().rev().map(|b| *b as char).collect()
}

/// Decode the timestamp component of a generated id
pub fn id_timestamp_millis(id: &str) -> Option<u64> {
    if id.len() != ID_LEN {
        return None;
    }
    u64::from_str_radix(&id[RANDOM_LEN..], 36).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_component_padding() {
        assert_eq!(time_component(0), "00000000");
        assert_eq!(time_component(35), "0000000z");
        assert_eq!(time_component(36), "00000010");
    }

    #[test]
    fn test_time_component_keeps_rightmost_digits() {
        // 36^8 needs nine digits: "100000000"
        assert_eq!(time_component(36u64.pow(8)), "00000000");
    }

    #[test]
    fn test_well_known_prefix() {
        assert!(is_well_known("well-known:double-diamond"));
        assert!(!is_well_known(&generate_id()));
    }
}

//! Error helpers for awareness-store
//!
//! Every backend failure surfaces as `AwarenessError::Storage` naming the
//! collection and the primitive that failed.

use awareness_core::errors::AwarenessError;

pub use awareness_core::errors::Result;

/// Collection name used for schema bookkeeping errors
const SCHEMA_STORE: &str = "schema_version";

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> AwarenessError {
    AwarenessError::storage(
        SCHEMA_STORE,
        "migration",
        format!("Migration {} failed: {}", migration_id, reason),
    )
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> AwarenessError {
    AwarenessError::storage(
        SCHEMA_STORE,
        "migration_checksum",
        format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ),
    )
}

/// Create a storage error from rusqlite::Error
pub fn from_rusqlite(store: &str, op: &str, err: rusqlite::Error) -> AwarenessError {
    AwarenessError::storage(store, op, err.to_string())
}

/// Create a storage error for a record body that is not valid JSON
pub fn corrupt_record(store: &str, id: &str, err: serde_json::Error) -> AwarenessError {
    AwarenessError::storage(store, "get", format!("record {} is corrupt: {}", id, err))
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> AwarenessError {
    AwarenessError::storage("filesystem", operation, err.to_string())
}

//! Awareness Store - the entity graph over a flat key-value backend
//!
//! Provides:
//! - The `KvBackend` contract with in-memory and SQLite implementations
//! - SQLite schema with the migrations framework
//! - The `Store`: identity-preserving lazy loading, cycle-safe reference
//!   resolution, dirty tracking, cascading saves, soft deletion and export
//! - The persistent application config and recent-projects list

pub mod backend;
pub mod config;
pub mod db;
pub mod errors;
mod latch;
pub mod migrations;
pub mod store;

// Re-export key types
pub use backend::{KvBackend, MemoryBackend, SqliteBackend};
pub use config::{ConfigStore, RecentProjects};
pub use store::{EntityHandle, FieldChange, FieldValue, Store};

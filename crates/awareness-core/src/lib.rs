//! Awareness Core - entity model and shared facilities
//!
//! This crate provides the pieces every other layer builds on:
//! - Entity kinds and their typed field descriptor tables
//! - Scalar values with their storage encoding
//! - Locally generated entity identifiers
//! - The portable `design-awareness` document envelope
//! - Realtime session repair
//! - The error facility (`AwarenessError` / `ExError`) and the
//!   structured logging facility

pub mod document;
pub mod errors;
pub mod id;
pub mod logging_facility;
pub mod model;
pub mod repair;

#[doc(hidden)]
pub use awareness_core_types as core_types;
#[doc(hidden)]
pub use tracing;

// Re-export commonly used types
pub use document::PortableDocument;
pub use errors::{AwarenessError, ExError, ExErrorKind, Result};
pub use id::generate_id;
pub use model::{EntityKind, Field, FieldDescriptor, Relation, Scalar, ScalarType};

//! Entity model: kinds, fields, scalar values and the descriptor tables
//! tying them together.

pub mod field;
pub mod kind;
pub mod scalar;
pub mod schema;

pub use field::Field;
pub use kind::EntityKind;
pub use scalar::{Scalar, ScalarType};
pub use schema::{FieldDescriptor, Relation};

//! Awareness Import - merge portable documents into the live entity graph
//!
//! Every node of an inlined document is validated, compared with the
//! entity already stored under its id, and then created, overwritten,
//! linked or rejected according to the resolved [`EntityImportOptions`].
//! A dry run reports what would happen without writing anything.

mod differ;
pub mod document;
mod importer;
pub mod options;
pub mod result;
pub mod typecheck;

pub use document::{import_document, import_entity, import_value};
pub use options::{EntityImportOptions, ImportOptions, ResolvedOptions};
pub use result::ImportResult;

//! Entry points for importing documents and bare entity nodes

use std::time::Instant;

use awareness_core::document::PortableDocument;
use awareness_core::errors::Result;
use awareness_core::model::EntityKind;
use awareness_core::{log_op_end, log_op_error, log_op_start};
use awareness_core_types::RequestId;
use awareness_store::Store;
use serde_json::Value;

use crate::importer::Importer;
use crate::options::ImportOptions;
use crate::result::ImportResult;

/// Import a `design-awareness` document given as text
///
/// # Errors
///
/// `InvalidDocument` for a malformed envelope, otherwise any error of
/// [`import_entity`].
pub async fn import_document(
    store: &Store,
    text: &str,
    options: &ImportOptions,
) -> Result<ImportResult> {
    let document = PortableDocument::parse(text)?;
    import_entity(store, document.kind, &document.data, options).await
}

/// Import an already parsed `design-awareness` document
///
/// # Errors
///
/// See [`import_document`].
pub async fn import_value(
    store: &Store,
    value: Value,
    options: &ImportOptions,
) -> Result<ImportResult> {
    let document = PortableDocument::from_value(value)?;
    import_entity(store, document.kind, &document.data, options).await
}

/// Import one fully inlined entity node of `kind`
///
/// # Errors
///
/// `Validation` for malformed input, `Conflict` when a project of the other
/// kind holds the id, `PolicyViolation` when an existing entity differs and
/// no option permits replacing it, or any store error.
pub async fn import_entity(
    store: &Store,
    kind: EntityKind,
    data: &Value,
    options: &ImportOptions,
) -> Result<ImportResult> {
    let start = Instant::now();
    let request_id = RequestId::new();
    log_op_start!(
        "import",
        request_id = %request_id,
        entity_kind = kind.name(),
        dry_run = options.dry_run
    );

    let importer = Importer::new(store, options);
    match importer.import(kind, data, format!("Root({})", kind)).await {
        Ok(result) => {
            log_op_end!(
                "import",
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = %request_id,
                entity_kind = kind.name(),
                entity_id = %result.id,
                dry_run = options.dry_run
            );
            Ok(result)
        }
        Err(err) => {
            log_op_error!(
                "import",
                err,
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = %request_id,
                entity_kind = kind.name()
            );
            Err(err)
        }
    }
}

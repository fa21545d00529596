use awareness_core_types::RequestId;
use thiserror::Error;

use crate::model::EntityKind;

/// Result type alias using AwarenessError
pub type Result<T> = std::result::Result<T, AwarenessError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// test assertions and the CLI's exit report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    InvalidDocument,
    SchemaMismatch,
    NotFound,

    // Mutation
    Deleted,
    AlreadyExists,
    CycleDetected,

    // Import policy
    Conflict,
    PolicyDenied,

    // Integration
    Persistence,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidDocument => "ERR_INVALID_DOCUMENT",
            ExErrorKind::SchemaMismatch => "ERR_SCHEMA_MISMATCH",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Deleted => "ERR_DELETED",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::Conflict => "ERR_CONFLICT",
            ExErrorKind::PolicyDenied => "ERR_POLICY_DENIED",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Classification plus optional context, for logging and external reporting.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_kind: Option<EntityKind>,
    entity_id: Option<String>,
    trace: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_kind: None,
            entity_id: None,
            trace: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity kind context
    pub fn with_entity_kind(mut self, kind: EntityKind) -> Self {
        self.entity_kind = Some(kind);
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add the import trace (path of the offending node in the document)
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_kind(&self) -> Option<EntityKind> {
        self.entity_kind
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(kind) = self.entity_kind {
            write!(f, " (kind: {})", kind)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(trace) = &self.trace {
            write!(f, " (trace: {})", trace)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for entity store and import operations
///
/// A `get` for a missing id is never an error; it yields `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AwarenessError {
    /// Import input failed a required-shape check
    #[error("[{trace}] {reason}")]
    Validation { trace: String, reason: String },

    /// An existing entity of an incompatible kind occupies the id
    #[error("[{trace}] {reason}")]
    Conflict { trace: String, reason: String },

    /// Write attempted on a removed entity
    #[error("Attempted to modify a deleted {kind} entity ({id})")]
    Deleted { kind: EntityKind, id: String },

    /// Import would overwrite differing fields without permission
    #[error("[{trace}|create] Entity exists and differs, but overwrite is false")]
    PolicyViolation { trace: String },

    /// Field access or assignment that does not fit the kind's schema
    #[error("Schema mismatch on {kind}.{field}: {reason}")]
    SchemaMismatch {
        kind: EntityKind,
        field: String,
        reason: String,
    },

    /// A reference cycle in a subgraph that must be a tree
    #[error("Cycle detected while serializing {kind} {id}")]
    CycleDetected { kind: EntityKind, id: String },

    /// A second wrapper tried to claim an id that is already cached
    #[error("{kind} entity already exists: {id}")]
    AlreadyExists { kind: EntityKind, id: String },

    /// Backing store transaction failure
    #[error("Storage error in {op} on store '{store}': {message}")]
    Storage {
        store: String,
        op: String,
        message: String,
    },

    /// The portable document envelope is malformed or unsupported
    #[error("Invalid document: {reason}")]
    InvalidDocument { reason: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AwarenessError {
    /// Shorthand for a validation failure at `trace`
    pub fn validation(trace: impl Into<String>, reason: impl Into<String>) -> Self {
        AwarenessError::Validation {
            trace: trace.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a storage failure
    pub fn storage(store: &str, op: &str, message: impl Into<String>) -> Self {
        AwarenessError::Storage {
            store: store.to_string(),
            op: op.to_string(),
            message: message.into(),
        }
    }

    /// The canonical kind of this error
    pub fn kind(&self) -> ExErrorKind {
        ExError::from(self).kind()
    }
}

/// Conversion from AwarenessError to ExError
impl From<&AwarenessError> for ExError {
    fn from(err: &AwarenessError) -> Self {
        match err {
            AwarenessError::Validation { trace, reason } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_trace(trace.clone())
                    .with_message(reason.clone())
            }

            AwarenessError::Conflict { trace, reason } => ExError::new(ExErrorKind::Conflict)
                .with_op("import")
                .with_trace(trace.clone())
                .with_message(reason.clone()),

            AwarenessError::Deleted { kind, id } => ExError::new(ExErrorKind::Deleted)
                .with_entity_kind(*kind)
                .with_entity_id(id.clone())
                .with_message("Entity was deleted"),

            AwarenessError::PolicyViolation { trace } => ExError::new(ExErrorKind::PolicyDenied)
                .with_op("import")
                .with_trace(trace.clone())
                .with_message("Entity exists and differs, but overwrite is false"),

            AwarenessError::SchemaMismatch {
                kind,
                field,
                reason,
            } => ExError::new(ExErrorKind::SchemaMismatch)
                .with_entity_kind(*kind)
                .with_message(format!("{}: {}", field, reason)),

            AwarenessError::CycleDetected { kind, id } => ExError::new(ExErrorKind::CycleDetected)
                .with_op("serialize")
                .with_entity_kind(*kind)
                .with_entity_id(id.clone()),

            AwarenessError::AlreadyExists { kind, id } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_kind(*kind)
                    .with_entity_id(id.clone())
            }

            AwarenessError::Storage { store, op, message } => {
                ExError::new(ExErrorKind::Persistence)
                    .with_op(op.clone())
                    .with_message(format!("{}: {}", store, message))
            }

            AwarenessError::InvalidDocument { reason } => {
                ExError::new(ExErrorKind::InvalidDocument).with_message(reason.clone())
            }

            AwarenessError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message.clone())
            }

            AwarenessError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message.clone())
            }
        }
    }
}

impl From<AwarenessError> for ExError {
    fn from(err: AwarenessError) -> Self {
        ExError::from(&err)
    }
}

/// Conversion from serde_json::Error to AwarenessError
impl From<serde_json::Error> for AwarenessError {
    fn from(err: serde_json::Error) -> Self {
        AwarenessError::Serialization {
            message: err.to_string(),
        }
    }
}

//! Portable `design-awareness` document envelope
//!
//! ```json
//! {"$format":"design-awareness","version":"1.0.0","type":"RealtimeProject",
//!  "data":{...},"meta":{"encoder":"awareness@0.1.0"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AwarenessError, Result};
use crate::model::EntityKind;

pub const FORMAT_NAME: &str = "design-awareness";
pub const FORMAT_VERSION: &str = "1.0.0";
const SUPPORTED_MAJOR: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub encoder: String,
}

impl Default for DocumentMeta {
    fn default() -> Self {
        Self {
            encoder: format!("awareness@{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableDocument {
    #[serde(rename = "$format")]
    pub format: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub data: Value,
    #[serde(default)]
    pub meta: DocumentMeta,
}

impl PortableDocument {
    /// Wrap a fully inlined entity node
    pub fn new(kind: EntityKind, data: Value) -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION.to_string(),
            kind,
            data,
            meta: DocumentMeta::default(),
        }
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let out = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(out)
    }

    /// Parse and validate a document from text
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate the envelope of an already parsed document
    ///
    /// # Errors
    ///
    /// `InvalidDocument` if the format marker is wrong, the major version is
    /// unsupported, or the type is not an entity kind.
    pub fn from_value(value: Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("document is not a JSON object"))?;

        match obj.get("$format").and_then(Value::as_str) {
            Some(FORMAT_NAME) => {}
            Some(other) => return Err(invalid(format!("unknown format \"{}\"", other))),
            None => return Err(invalid("missing $format")),
        }

        let version = obj
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing version"))?;
        let major = version
            .split('.')
            .next()
            .and_then(|m| m.parse::<u64>().ok())
            .ok_or_else(|| invalid(format!("malformed version \"{}\"", version)))?;
        if major != SUPPORTED_MAJOR {
            return Err(invalid(format!("unsupported version {}", version)));
        }

        let kind: EntityKind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing type"))?
            .parse()
            .map_err(invalid)?;

        let data = obj
            .get("data")
            .cloned()
            .ok_or_else(|| invalid("missing data"))?;

        let meta = obj
            .get("meta")
            .cloned()
            .and_then(|m| serde_json::from_value(m).ok())
            .unwrap_or_default();

        Ok(Self {
            format: FORMAT_NAME.to_string(),
            version: version.to_string(),
            kind,
            data,
            meta,
        })
    }
}

fn invalid(reason: impl Into<String>) -> AwarenessError {
    AwarenessError::InvalidDocument {
        reason: reason.into(),
    }
}

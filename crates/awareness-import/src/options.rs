//! Import policy options
//!
//! Options are layered: defaults (all off) <- global <- per kind <- per id.
//! The most specific layer that sets a flag wins.

use std::collections::HashMap;
use std::str::FromStr;

use awareness_core::EntityKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityImportOptions {
    /// Allow importing over an existing entity whose fields differ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,
    /// Always create new entities; incoming ids are ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_new: Option<bool>,
    /// Keep the existing entity untouched and link to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_existing: Option<bool>,
}

impl EntityImportOptions {
    pub fn overwrite() -> Self {
        Self {
            overwrite: Some(true),
            ..Self::default()
        }
    }

    pub fn force_new() -> Self {
        Self {
            force_new: Some(true),
            ..Self::default()
        }
    }

    pub fn use_existing() -> Self {
        Self {
            use_existing: Some(true),
            ..Self::default()
        }
    }

    /// Overlay `over` on top of `self`
    fn layer(self, over: Option<&EntityImportOptions>) -> Self {
        match over {
            Some(over) => Self {
                overwrite: over.overwrite.or(self.overwrite),
                force_new: over.force_new.or(self.force_new),
                use_existing: over.use_existing.or(self.use_existing),
            },
            None => self,
        }
    }
}

impl FromStr for EntityImportOptions {
    type Err = String;

    /// Parse a policy name: `overwrite`, `force-new` or `use-existing`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overwrite" => Ok(Self::overwrite()),
            "force-new" | "forceNew" => Ok(Self::force_new()),
            "use-existing" | "useExisting" => Ok(Self::use_existing()),
            other => Err(format!(
                "unknown import policy \"{}\" (expected overwrite, force-new or use-existing)",
                other
            )),
        }
    }
}

/// Effective flags for one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub overwrite: bool,
    pub force_new: bool,
    pub use_existing: bool,
}

impl ResolvedOptions {
    /// Whether differing fields may be replaced or ignored
    pub fn permits_difference(&self) -> bool {
        self.overwrite || self.force_new || self.use_existing
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Report what would happen without creating or changing anything
    pub dry_run: bool,
    pub global_options: EntityImportOptions,
    pub type_options: HashMap<EntityKind, EntityImportOptions>,
    pub entity_options: HashMap<String, EntityImportOptions>,
}

impl ImportOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn with_global(mut self, options: EntityImportOptions) -> Self {
        self.global_options = options;
        self
    }

    pub fn with_type(mut self, kind: EntityKind, options: EntityImportOptions) -> Self {
        self.type_options.insert(kind, options);
        self
    }

    pub fn with_entity(mut self, id: impl Into<String>, options: EntityImportOptions) -> Self {
        self.entity_options.insert(id.into(), options);
        self
    }

    pub fn resolve(&self, kind: EntityKind, id: &str) -> ResolvedOptions {
        let merged = EntityImportOptions::default()
            .layer(Some(&self.global_options))
            .layer(self.type_options.get(&kind))
            .layer(self.entity_options.get(id));
        ResolvedOptions {
            overwrite: merged.overwrite.unwrap_or(false),
            force_new: merged.force_new.unwrap_or(false),
            use_existing: merged.use_existing.unwrap_or(false),
        }
    }
}

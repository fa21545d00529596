use std::collections::BTreeMap;

use awareness_core::model::{EntityKind, Field};
use awareness_store::EntityHandle;
use serde::Serialize;

/// Outcome of importing one document node, with its children's outcomes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Incoming id of the node
    pub id: String,
    /// Incoming name, empty for kinds without one
    pub name: String,
    /// An entity of the same kind is stored under the id
    pub exists: bool,
    /// The incoming `modified` is earlier than the stored one
    pub is_older: bool,
    /// A project of the other project kind holds the id
    pub has_conflict: bool,
    pub differing_properties: Vec<Field>,
    pub children: BTreeMap<EntityKind, Vec<ImportResult>>,
    /// The created, updated or linked entity; `None` for dry runs
    #[serde(skip)]
    pub entity: Option<EntityHandle>,
}

impl ImportResult {
    pub(crate) fn new(kind: EntityKind, id: &str, name: &str) -> Self {
        Self {
            kind,
            id: id.to_string(),
            name: name.to_string(),
            exists: false,
            is_older: false,
            has_conflict: false,
            differing_properties: Vec::new(),
            children: BTreeMap::new(),
            entity: None,
        }
    }

    /// Whether this node or any descendant differs from what is stored
    pub fn any_differences(&self) -> bool {
        !self.differing_properties.is_empty()
            || self
                .children
                .values()
                .flatten()
                .any(ImportResult::any_differences)
    }

    /// Whether this node or any descendant conflicts with a stored project
    pub fn any_conflicts(&self) -> bool {
        self.has_conflict
            || self
                .children
                .values()
                .flatten()
                .any(ImportResult::any_conflicts)
    }

    /// Results for the children of `kind`, empty when there are none
    pub fn children_of(&self, kind: EntityKind) -> &[ImportResult] {
        self.children.get(&kind).map_or(&[], Vec::as_slice)
    }
}

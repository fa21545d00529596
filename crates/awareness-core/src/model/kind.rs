use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven entity kinds, each persisted in its own collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    AsyncEntry,
    AsyncProject,
    DesignModel,
    ProjectNote,
    RealtimeProject,
    RealtimeSession,
    TimedNote,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::AsyncEntry,
        EntityKind::AsyncProject,
        EntityKind::DesignModel,
        EntityKind::ProjectNote,
        EntityKind::RealtimeProject,
        EntityKind::RealtimeSession,
        EntityKind::TimedNote,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::AsyncEntry => "AsyncEntry",
            EntityKind::AsyncProject => "AsyncProject",
            EntityKind::DesignModel => "DesignModel",
            EntityKind::ProjectNote => "ProjectNote",
            EntityKind::RealtimeProject => "RealtimeProject",
            EntityKind::RealtimeSession => "RealtimeSession",
            EntityKind::TimedNote => "TimedNote",
        }
    }

    /// Name of the backing collection; identical to the kind name
    pub fn store_name(&self) -> &'static str {
        self.name()
    }

    /// Whether this kind belongs to the project family (shared id space)
    pub fn is_project(&self) -> bool {
        matches!(self, EntityKind::AsyncProject | EntityKind::RealtimeProject)
    }

    /// The other member of the project family, if this is a project kind
    pub fn project_counterpart(&self) -> Option<EntityKind> {
        match self {
            EntityKind::AsyncProject => Some(EntityKind::RealtimeProject),
            EntityKind::RealtimeProject => Some(EntityKind::AsyncProject),
            _ => None,
        }
    }

    /// Whether a forced-new import appends " (Copy)" to the name
    pub fn renames_on_copy(&self) -> bool {
        self.is_project()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown entity kind: {}", s))
    }
}

//! Static field descriptor tables, one per entity kind
//!
//! Default construction, loading, saving, serialization and import all walk
//! these tables in order.

use super::field::Field;
use super::kind::EntityKind;
use super::scalar::{Scalar, ScalarType};

/// How a field relates to storage
#[derive(Debug, Clone, Copy)]
pub enum Relation {
    /// Plain value with its default constructor
    Scalar { ty: ScalarType, default: fn() -> Scalar },
    /// Single reference to an entity of the given kind, stored as its id
    One(EntityKind),
    /// Ordered list of references, stored as a list of ids
    Many(EntityKind),
}

impl Relation {
    /// Child kind for reference relations
    pub fn child_kind(&self) -> Option<EntityKind> {
        match self {
            Relation::Scalar { .. } => None,
            Relation::One(kind) | Relation::Many(kind) => Some(*kind),
        }
    }

    pub fn is_reference(&self) -> bool {
        self.child_kind().is_some()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub field: Field,
    pub relation: Relation,
}

impl FieldDescriptor {
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.relation {
            Relation::Scalar { ty, .. } => Some(ty),
            _ => None,
        }
    }
}

fn default_true() -> Scalar {
    Scalar::Bool(true)
}

fn default_false() -> Scalar {
    Scalar::Bool(false)
}

fn default_zero() -> Scalar {
    Scalar::Number(0.0)
}

fn default_day() -> Scalar {
    Scalar::Text("day".to_string())
}

fn default_null() -> Scalar {
    Scalar::Null
}

const fn boolean(field: Field, default: fn() -> Scalar) -> FieldDescriptor {
    FieldDescriptor {
        field,
        relation: Relation::Scalar {
            ty: ScalarType::Bool,
            default,
        },
    }
}

const fn number(field: Field) -> FieldDescriptor {
    FieldDescriptor {
        field,
        relation: Relation::Scalar {
            ty: ScalarType::Number,
            default: default_zero,
        },
    }
}

const fn text(field: Field) -> FieldDescriptor {
    FieldDescriptor {
        field,
        relation: Relation::Scalar {
            ty: ScalarType::Text,
            default: Scalar::empty_text,
        },
    }
}

const fn date(field: Field) -> FieldDescriptor {
    FieldDescriptor {
        field,
        relation: Relation::Scalar {
            ty: ScalarType::Date,
            default: Scalar::now,
        },
    }
}

const fn array(field: Field) -> FieldDescriptor {
    FieldDescriptor {
        field,
        relation: Relation::Scalar {
            ty: ScalarType::Json,
            default: Scalar::empty_array,
        },
    }
}

const fn one(field: Field, kind: EntityKind) -> FieldDescriptor {
    FieldDescriptor {
        field,
        relation: Relation::One(kind),
    }
}

const fn many(field: Field, kind: EntityKind) -> FieldDescriptor {
    FieldDescriptor {
        field,
        relation: Relation::Many(kind),
    }
}

static ASYNC_ENTRY: [FieldDescriptor; 5] = [
    date(Field::Created),
    array(Field::Data),
    date(Field::Modified),
    text(Field::Note),
    date(Field::Period),
];

static ASYNC_PROJECT: [FieldDescriptor; 10] = [
    boolean(Field::Active, default_true),
    date(Field::Created),
    text(Field::Description),
    one(Field::DesignModel, EntityKind::DesignModel),
    many(Field::Entries, EntityKind::AsyncEntry),
    date(Field::Modified),
    text(Field::Name),
    many(Field::Notes, EntityKind::ProjectNote),
    number(Field::PeriodAlignment),
    FieldDescriptor {
        field: Field::ReportingPeriod,
        relation: Relation::Scalar {
            ty: ScalarType::Text,
            default: default_day,
        },
    },
];

static DESIGN_MODEL: [FieldDescriptor; 4] = [
    array(Field::Activities),
    FieldDescriptor {
        field: Field::Description,
        relation: Relation::Scalar {
            ty: ScalarType::NullableJson,
            default: default_null,
        },
    },
    text(Field::Name),
    boolean(Field::WellKnown, default_false),
];

static PROJECT_NOTE: [FieldDescriptor; 2] = [text(Field::Content), date(Field::Created)];

static REALTIME_PROJECT: [FieldDescriptor; 8] = [
    boolean(Field::Active, default_true),
    date(Field::Created),
    text(Field::Description),
    one(Field::DesignModel, EntityKind::DesignModel),
    date(Field::Modified),
    text(Field::Name),
    many(Field::Notes, EntityKind::ProjectNote),
    many(Field::Sessions, EntityKind::RealtimeSession),
];

static REALTIME_SESSION: [FieldDescriptor; 4] = [
    array(Field::Data),
    number(Field::Duration),
    many(Field::Notes, EntityKind::TimedNote),
    date(Field::Start),
];

static TIMED_NOTE: [FieldDescriptor; 3] = [
    text(Field::Content),
    date(Field::Created),
    number(Field::Time),
];

impl EntityKind {
    /// Ordered field descriptors for this kind
    pub fn schema(&self) -> &'static [FieldDescriptor] {
        match self {
            EntityKind::AsyncEntry => &ASYNC_ENTRY,
            EntityKind::AsyncProject => &ASYNC_PROJECT,
            EntityKind::DesignModel => &DESIGN_MODEL,
            EntityKind::ProjectNote => &PROJECT_NOTE,
            EntityKind::RealtimeProject => &REALTIME_PROJECT,
            EntityKind::RealtimeSession => &REALTIME_SESSION,
            EntityKind::TimedNote => &TIMED_NOTE,
        }
    }

    /// Position and descriptor of `field`, if the kind has it
    pub fn descriptor(&self, field: Field) -> Option<(usize, &'static FieldDescriptor)> {
        self.schema()
            .iter()
            .enumerate()
            .find(|(_, d)| d.field == field)
    }

    /// Fields holding dates, in schema order
    pub fn date_fields(&self) -> impl Iterator<Item = Field> {
        self.schema()
            .iter()
            .filter(|d| d.scalar_type() == Some(ScalarType::Date))
            .map(|d| d.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Kinds reachable from `kind` through reference fields
    fn reachable(kind: EntityKind, seen: &mut Vec<EntityKind>) {
        for child in kind.schema().iter().filter_map(|d| d.relation.child_kind()) {
            if !seen.contains(&child) {
                seen.push(child);
                reachable(child, seen);
            }
        }
    }

    #[test]
    fn test_kind_graph_is_acyclic() {
        for kind in EntityKind::ALL {
            let mut seen = Vec::new();
            reachable(kind, &mut seen);
            assert!(!seen.contains(&kind), "{} can reach itself", kind);
        }
    }

    #[test]
    fn test_schema_fields_are_unique_per_kind() {
        for kind in EntityKind::ALL {
            let fields: Vec<Field> = kind.schema().iter().map(|d| d.field).collect();
            let mut sorted = fields.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(fields.len(), sorted.len(), "duplicate field in {}", kind);
        }
    }

    #[test]
    fn test_defaults_match_declared_types() {
        for kind in EntityKind::ALL {
            for d in kind.schema() {
                if let Relation::Scalar { ty, default } = d.relation {
                    assert!(default().matches(ty), "{}.{} default", kind, d.field);
                }
            }
        }
    }

    #[test]
    fn test_reporting_period_defaults_to_day() {
        let (_, d) = EntityKind::AsyncProject
            .descriptor(Field::ReportingPeriod)
            .unwrap();
        match d.relation {
            Relation::Scalar { default, .. } => {
                assert_eq!(default(), Scalar::Text("day".to_string()))
            }
            _ => panic!("reportingPeriod should be scalar"),
        }
    }

    #[test]
    fn test_date_fields() {
        let dates: Vec<Field> = EntityKind::AsyncEntry.date_fields().collect();
        assert_eq!(dates, vec![Field::Created, Field::Modified, Field::Period]);
        assert_eq!(
            EntityKind::RealtimeSession.date_fields().collect::<Vec<_>>(),
            vec![Field::Start]
        );
    }

    #[test]
    fn test_session_notes_are_timed_notes() {
        let (_, d) = EntityKind::RealtimeSession.descriptor(Field::Notes).unwrap();
        assert_eq!(d.relation.child_kind(), Some(EntityKind::TimedNote));
    }
}

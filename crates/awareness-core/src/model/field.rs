use serde::{Deserialize, Serialize};
use std::fmt;

/// Every field name used by any entity kind
///
/// Wire names are camelCase. Which kinds carry which fields is decided by
/// the descriptor tables in [`super::schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Active,
    Activities,
    Content,
    Created,
    Data,
    Description,
    DesignModel,
    Duration,
    Entries,
    Modified,
    Name,
    Note,
    Notes,
    Period,
    PeriodAlignment,
    ReportingPeriod,
    Sessions,
    Start,
    Time,
    WellKnown,
}

impl Field {
    const ALL: [Field; 20] = [
        Field::Active,
        Field::Activities,
        Field::Content,
        Field::Created,
        Field::Data,
        Field::Description,
        Field::DesignModel,
        Field::Duration,
        Field::Entries,
        Field::Modified,
        Field::Name,
        Field::Note,
        Field::Notes,
        Field::Period,
        Field::PeriodAlignment,
        Field::ReportingPeriod,
        Field::Sessions,
        Field::Start,
        Field::Time,
        Field::WellKnown,
    ];

    /// Wire name of the field
    pub fn name(&self) -> &'static str {
        match self {
            Field::Active => "active",
            Field::Activities => "activities",
            Field::Content => "content",
            Field::Created => "created",
            Field::Data => "data",
            Field::Description => "description",
            Field::DesignModel => "designModel",
            Field::Duration => "duration",
            Field::Entries => "entries",
            Field::Modified => "modified",
            Field::Name => "name",
            Field::Note => "note",
            Field::Notes => "notes",
            Field::Period => "period",
            Field::PeriodAlignment => "periodAlignment",
            Field::ReportingPeriod => "reportingPeriod",
            Field::Sessions => "sessions",
            Field::Start => "start",
            Field::Time => "time",
            Field::WellKnown => "wellKnown",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

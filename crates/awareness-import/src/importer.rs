//! Per-node import pass
//!
//! One [`Importer`] handles one document. Sibling nodes are imported
//! concurrently; the set of claimed ids is shared across the whole pass.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use awareness_core::errors::{AwarenessError, Result};
use awareness_core::id::is_well_known;
use awareness_core::model::scalar::parse_date;
use awareness_core::model::{EntityKind, Field, Relation, Scalar};
use awareness_store::{EntityHandle, FieldValue, Store};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;

use crate::differ::{self, Record};
use crate::options::{ImportOptions, ResolvedOptions};
use crate::result::ImportResult;
use crate::typecheck;

const CONFLICT_REASON: &str = "Conflicts with existing project (wrong project type!)";

/// What is already stored under an incoming id
#[derive(Default)]
struct Lookup {
    /// Live wrapper; only resolved outside dry runs
    handle: Option<EntityHandle>,
    record: Option<Record>,
    conflict: bool,
}

/// Imported children of one reference field
struct ChildGroup {
    field: Field,
    relation: Relation,
    present: bool,
    results: Vec<ImportResult>,
}

pub(crate) struct Importer<'a> {
    store: &'a Store,
    options: &'a ImportOptions,
    claimed: Mutex<HashSet<String>>,
}

impl<'a> Importer<'a> {
    pub(crate) fn new(store: &'a Store, options: &'a ImportOptions) -> Self {
        Self {
            store,
            options,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn import(
        &'a self,
        kind: EntityKind,
        data: &'a Value,
        trace: String,
    ) -> BoxFuture<'a, Result<ImportResult>> {
        async move { self.import_node(kind, data, trace).await }.boxed()
    }

    async fn import_node(
        &'a self,
        kind: EntityKind,
        data: &'a Value,
        trace: String,
    ) -> Result<ImportResult> {
        let record = data.as_object().ok_or_else(|| {
            AwarenessError::validation(format!("{}|typecheck", trace), "expected an object")
        })?;
        let id = self.claim(record, &trace)?;
        let options = self.options.resolve(kind, &id);
        check_dates(kind, record, &trace)?;
        typecheck::check(kind, record, &trace)?;

        let name = record.get("name").and_then(Value::as_str).unwrap_or("");
        let mut result = ImportResult::new(kind, &id, name);

        let lookup = if options.force_new {
            Lookup::default()
        } else {
            self.lookup(kind, &id).await?
        };
        result.has_conflict = lookup.conflict;
        if let Some(existing) = &lookup.record {
            result.exists = true;
            result.differing_properties = differ::differing_properties(kind, record, existing);
            result.is_older = differ::is_older(record, existing, &result.differing_properties);
        }

        if self.options.dry_run {
            for group in self.import_children(kind, record, &trace).await? {
                if let Some(child_kind) = group.relation.child_kind() {
                    result.children.insert(child_kind, group.results);
                }
            }
            return Ok(result);
        }

        if result.has_conflict && !options.force_new {
            return Err(AwarenessError::Conflict {
                trace: format!("{}|check-existing", trace),
                reason: CONFLICT_REASON.to_string(),
            });
        }
        if !result.differing_properties.is_empty() && !options.permits_difference() {
            return Err(AwarenessError::PolicyViolation { trace });
        }
        if options.use_existing {
            let handle = lookup.handle.ok_or_else(|| {
                AwarenessError::validation(format!("{}|useExisting", trace), "No existing entity!")
            })?;
            tracing::debug!(entity_kind = kind.name(), entity_id = %id, "linked existing entity");
            result.entity = Some(handle);
            return Ok(result);
        }

        let groups = self.import_children(kind, record, &trace).await?;
        let target = match lookup.handle {
            Some(handle) => handle,
            None => self.store.new_entity(kind),
        };
        self.apply(target, record, &id, options, &groups, &trace)?;
        if options.force_new {
            self.store.save(target).await?;
        } else {
            self.store.save_with_id(target, &id).await?;
        }
        tracing::debug!(
            entity_kind = kind.name(),
            entity_id = %id,
            trace = %trace,
            differing = result.differing_properties.len(),
            "imported node"
        );

        for group in groups {
            if let Some(child_kind) = group.relation.child_kind() {
                result.children.insert(child_kind, group.results);
            }
        }
        result.entity = Some(target);
        Ok(result)
    }

    /// Reserve the node's id for this pass
    fn claim(&self, record: &Record, trace: &str) -> Result<String> {
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AwarenessError::validation(format!("{}|id", trace), "missing id."))?;
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        if !claimed.insert(id.to_string()) {
            return Err(AwarenessError::validation(
                format!("{}|id", trace),
                format!("more than one entity with id {}!", id),
            ));
        }
        Ok(id.to_string())
    }

    /// Find the stored entity for `id`, checking the other project
    /// collection for a conflicting project
    async fn lookup(&self, kind: EntityKind, id: &str) -> Result<Lookup> {
        if let Some((handle, record)) = self.find(kind, id).await? {
            return Ok(Lookup {
                handle,
                record: Some(record),
                conflict: false,
            });
        }
        if let Some(other) = kind.project_counterpart() {
            if self.find(other, id).await?.is_some() {
                return Ok(Lookup {
                    conflict: true,
                    ..Lookup::default()
                });
            }
        }
        Ok(Lookup::default())
    }

    /// Dry runs read the cache or the raw record so no wrapper is created
    async fn find(&self, kind: EntityKind, id: &str) -> Result<Option<(Option<EntityHandle>, Record)>> {
        if self.options.dry_run {
            if let Some(handle) = self.store.cached(kind, id) {
                return Ok(Some((None, differ::record_of(self.store, handle)?)));
            }
            let raw = self.store.backend().get(kind.store_name(), id).await?;
            return Ok(match raw {
                Some(Value::Object(record)) => Some((None, record)),
                _ => None,
            });
        }
        match self.store.get(kind, id).await? {
            Some(handle) => Ok(Some((Some(handle), differ::record_of(self.store, handle)?))),
            None => Ok(None),
        }
    }

    /// Import every child node of `record`, all fields concurrently
    ///
    /// Every child runs to completion before the first error is returned,
    /// so no save is abandoned halfway.
    async fn import_children(
        &'a self,
        kind: EntityKind,
        record: &'a Record,
        trace: &str,
    ) -> Result<Vec<ChildGroup>> {
        let mut groups = Vec::new();
        let mut jobs = Vec::new();
        for descriptor in kind.schema() {
            let child_kind = match descriptor.relation.child_kind() {
                Some(child_kind) => child_kind,
                None => continue,
            };
            let name = descriptor.field.name();
            let value = record.get(name);
            let group = groups.len();
            match (descriptor.relation, value) {
                (Relation::One(_), Some(child)) if !child.is_null() => {
                    jobs.push((group, self.import(child_kind, child, format!("{}:{}", trace, name))));
                }
                (Relation::Many(_), Some(Value::Array(children))) => {
                    for (i, child) in children.iter().enumerate() {
                        jobs.push((
                            group,
                            self.import(child_kind, child, format!("{}:{}[{}]", trace, name, i)),
                        ));
                    }
                }
                _ => {}
            }
            groups.push(ChildGroup {
                field: descriptor.field,
                relation: descriptor.relation,
                present: value.is_some(),
                results: Vec::new(),
            });
        }

        let (owners, futures): (Vec<usize>, Vec<_>) = jobs.into_iter().unzip();
        let outcomes = join_all(futures).await;
        for (group, outcome) in owners.into_iter().zip(outcomes) {
            groups[group].results.push(outcome?);
        }
        Ok(groups)
    }

    /// Write the incoming fields and imported children onto `target`
    fn apply(
        &self,
        target: EntityHandle,
        record: &Record,
        id: &str,
        options: ResolvedOptions,
        groups: &[ChildGroup],
        trace: &str,
    ) -> Result<()> {
        let kind = target.kind();
        for descriptor in kind.schema() {
            let Relation::Scalar { ty, .. } = descriptor.relation else {
                continue;
            };
            let field = descriptor.field;
            if field == Field::WellKnown {
                let well_known = !options.force_new && is_well_known(id);
                self.store.set(target, field, Scalar::Bool(well_known))?;
                continue;
            }
            let Some(incoming) = record.get(field.name()) else {
                continue;
            };
            let existing = match self.store.field(target, field)? {
                FieldValue::Scalar(value) => Some(value.to_json()),
                _ => None,
            };
            let value = differ::incoming_scalar(kind, field, incoming, existing.as_ref());
            let mut scalar = Scalar::from_json(ty, &value).ok_or_else(|| {
                AwarenessError::validation(
                    format!("{}|typecheck", trace),
                    format!("wrong type for property \"{}\"", field.name()),
                )
            })?;
            if field == Field::Name && options.force_new && kind.renames_on_copy() {
                if let Scalar::Text(name) = &scalar {
                    scalar = Scalar::Text(format!("{} (Copy)", name));
                }
            }
            self.store.set(target, field, scalar)?;
        }

        for group in groups.iter().filter(|g| g.present) {
            let handles = group
                .results
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    child.entity.ok_or_else(|| AwarenessError::Internal {
                        message: format!(
                            "[{}:{}[{}]|use] Expected to receive entity from import!",
                            trace,
                            group.field.name(),
                            i
                        ),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            match group.relation {
                Relation::One(_) => self.store.set(target, group.field, handles.first().copied())?,
                Relation::Many(_) => self.store.set(target, group.field, handles)?,
                Relation::Scalar { .. } => {}
            }
        }
        Ok(())
    }
}

/// Every present date field must be an RFC 3339 string
fn check_dates(kind: EntityKind, record: &Record, trace: &str) -> Result<()> {
    for field in kind.date_fields() {
        if let Some(value) = record.get(field.name()) {
            if value.as_str().and_then(parse_date).is_none() {
                return Err(AwarenessError::validation(
                    format!("{}|date", trace),
                    format!("{} couldn't be resolved to a Date {}", field.name(), value),
                ));
            }
        }
    }
    Ok(())
}

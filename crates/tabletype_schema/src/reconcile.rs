//! Type Reconciliation Engine
//!
//! Decides, for each incoming type definition, whether it is **New**, a
//! **Match** for the committed definition, or a **Mismatch**.
//!
//! # Flow
//!
//! 1. A type that is absent, or committed but never instantiated, is New:
//!    the incoming definition and its data fields replace it, including
//!    any type fields the incoming definition no longer lists.
//! 2. Otherwise the incoming rows are built into a shadow definition that
//!    is never registered, and compared with the committed one by display
//!    name. Input type and the four flags must agree; descriptions are
//!    ignored. A column on either side without a partner is a difference.
//! 3. On a column match, type-level data fields are compared. A field that
//!    changes input type, required, applicability, or value is a Mismatch;
//!    description and size changes are silent updates.
//! 4. Fields new to a type with tables are cascaded to every table. A
//!    table that already holds a same-named field with another meaning
//!    raises a [`DuplicateFieldRename`] the caller must confirm.
//!
//! # Batch atomicity
//!
//! [`ReconciliationEngine::plan_batch`] computes every outcome and every
//! rename conflict without touching the registry or the store.
//! [`ReconciliationEngine::apply`] asks for all rename confirmations before
//! its first write, so a declined rename or any Mismatch in the batch
//! leaves everything as it was.

use crate::builder::{BuildError, EditedRow};
use crate::definition::TypeDefinition;
use crate::field::{free_field_name, type_field_owner, FieldDefinition, FieldDifference};
use crate::registry::TypeRegistry;
use crate::store::{FieldStore, StoreError, TypeStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tabletype_ids::{BatchId, TableId};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Suffix for the disposable name a shadow definition is built under.
const SHADOW_SUFFIX: &str = "_TEMP";

/// Errors that stop a reconciliation. A Mismatch is not one of them.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Table type {0} appears more than once in the batch")]
    DuplicateIncomingType(String),

    #[error("Data field {field_name} appears more than once in table type {type_name}")]
    DuplicateIncomingField { type_name: String, field_name: String },

    #[error("Reconciliation aborted: rename of field {field_name} declined for {} table(s)", affected_tables.len())]
    Aborted {
        field_name: String,
        affected_tables: Vec<TableId>,
    },
}

/// A table type as edited or imported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingType {
    pub name: String,
    /// `None` keeps the committed description on a Match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<EditedRow>,
    /// Type-level data fields. Owners are rewritten to the type.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl IncomingType {
    pub fn new(name: impl Into<String>, description: impl Into<String>, columns: Vec<EditedRow>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            columns,
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDefinition>) -> Self {
        self.fields = fields;
        self
    }
}

/// Column flags compared during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFlag {
    Unique,
    Required,
    StructOk,
    PointerOk,
}

impl fmt::Display for ColumnFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnFlag::Unique => write!(f, "unique"),
            ColumnFlag::Required => write!(f, "required"),
            ColumnFlag::StructOk => write!(f, "structure allowed"),
            ColumnFlag::PointerOk => write!(f, "pointer allowed"),
        }
    }
}

/// One structural difference between committed and incoming columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnDifference {
    /// Committed column with no incoming column of the same display name.
    Missing { display_name: String },
    /// Incoming column with no committed column of the same display name.
    Extra { display_name: String },
    InputType {
        display_name: String,
        existing: String,
        incoming: String,
    },
    Flag {
        display_name: String,
        flag: ColumnFlag,
        existing: bool,
        incoming: bool,
    },
}

impl ColumnDifference {
    pub fn display_name(&self) -> &str {
        match self {
            ColumnDifference::Missing { display_name }
            | ColumnDifference::Extra { display_name }
            | ColumnDifference::InputType { display_name, .. }
            | ColumnDifference::Flag { display_name, .. } => display_name,
        }
    }
}

impl fmt::Display for ColumnDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnDifference::Missing { display_name } => {
                write!(f, "column {}: missing from incoming definition", display_name)
            }
            ColumnDifference::Extra { display_name } => {
                write!(f, "column {}: not in committed definition", display_name)
            }
            ColumnDifference::InputType { display_name, existing, incoming } => {
                write!(f, "column {}: input type {} -> {}", display_name, existing, incoming)
            }
            ColumnDifference::Flag { display_name, flag, existing, incoming } => {
                write!(f, "column {}: {} {} -> {}", display_name, flag, existing, incoming)
            }
        }
    }
}

/// Why an incoming type cannot replace the committed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub type_name: String,
    pub columns: Vec<ColumnDifference>,
    pub fields: Vec<FieldDifference>,
}

impl Mismatch {
    pub fn difference_count(&self) -> usize {
        self.columns.len() + self.fields.len()
    }
}

/// Non-structural changes carried by a Match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchChanges {
    pub type_description_changed: bool,
    /// Display names of columns whose description changed.
    pub column_descriptions_changed: Vec<String>,
    /// Type fields new to the type.
    pub fields_added: Vec<String>,
    /// Type fields whose description or size changed.
    pub fields_updated: Vec<String>,
}

impl MatchChanges {
    /// Field additions and updates; zero for an unmodified definition.
    pub fn field_difference_count(&self) -> usize {
        self.fields_added.len() + self.fields_updated.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.type_description_changed
            && self.column_descriptions_changed.is_empty()
            && self.field_difference_count() == 0
    }
}

/// Result of reconciling one incoming type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    New {
        type_name: String,
        /// A committed but uninstantiated type was replaced.
        replaced: bool,
        is_structure: bool,
    },
    Match {
        type_name: String,
        changes: MatchChanges,
    },
    Mismatch(Mismatch),
}

impl ReconciliationOutcome {
    pub fn type_name(&self) -> &str {
        match self {
            ReconciliationOutcome::New { type_name, .. }
            | ReconciliationOutcome::Match { type_name, .. } => type_name,
            ReconciliationOutcome::Mismatch(mismatch) => &mismatch.type_name,
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, ReconciliationOutcome::Mismatch(_))
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationOutcome::New { type_name, replaced: true, .. } => {
                write!(f, "{}: new (replaces uninstantiated type)", type_name)
            }
            ReconciliationOutcome::New { type_name, .. } => write!(f, "{}: new", type_name),
            ReconciliationOutcome::Match { type_name, .. } => write!(f, "{}: match", type_name),
            ReconciliationOutcome::Mismatch(m) => {
                write!(f, "{}: mismatch ({} differences)", m.type_name, m.difference_count())
            }
        }
    }
}

/// What happens to one table when a type field cascades to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CascadeAction {
    /// The table has no field of that name.
    Add { table: TableId, field: FieldDefinition },
    /// The table's own field means the same thing; it becomes inherited.
    Adopt { table: TableId, field: FieldDefinition },
    /// The table's own field means something else; it is renamed first.
    RenameThenAdd {
        table: TableId,
        field: FieldDefinition,
        renamed_to: String,
    },
}

impl CascadeAction {
    pub fn table(&self) -> &TableId {
        match self {
            CascadeAction::Add { table, .. }
            | CascadeAction::Adopt { table, .. }
            | CascadeAction::RenameThenAdd { table, .. } => table,
        }
    }
}

/// A type field collides with differently-defined fields on some tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateFieldRename {
    pub type_name: String,
    pub field_name: String,
    pub affected_tables: Vec<TableId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameDecision {
    Allow,
    Decline,
}

/// How [`DuplicateFieldRename`] conflicts are resolved.
pub enum RenamePolicy<'a> {
    AlwaysAllowRename,
    NeverAllowRename,
    Prompt(Box<dyn FnMut(&DuplicateFieldRename) -> RenameDecision + 'a>),
}

impl RenamePolicy<'_> {
    pub fn decide(&mut self, conflict: &DuplicateFieldRename) -> RenameDecision {
        match self {
            RenamePolicy::AlwaysAllowRename => RenameDecision::Allow,
            RenamePolicy::NeverAllowRename => RenameDecision::Decline,
            RenamePolicy::Prompt(ask) => ask(conflict),
        }
    }
}

impl fmt::Debug for RenamePolicy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenamePolicy::AlwaysAllowRename => write!(f, "AlwaysAllowRename"),
            RenamePolicy::NeverAllowRename => write!(f, "NeverAllowRename"),
            RenamePolicy::Prompt(_) => write!(f, "Prompt(..)"),
        }
    }
}

/// Planned effect of one incoming type.
#[derive(Debug, Clone)]
pub struct TypePlan {
    pub outcome: ReconciliationOutcome,
    /// Definition to commit: the incoming one for New, the committed one
    /// with refreshed descriptions for a Match that changed any.
    pub definition: Option<TypeDefinition>,
    /// Type-level field upserts.
    pub type_fields: Vec<FieldDefinition>,
    pub cascade: Vec<CascadeAction>,
    pub conflicts: Vec<DuplicateFieldRename>,
}

/// Planned effect of a whole batch. Nothing has been written yet.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub batch_id: BatchId,
    pub types: Vec<TypePlan>,
}

impl BatchPlan {
    pub fn outcomes(&self) -> Vec<ReconciliationOutcome> {
        self.types.iter().map(|t| t.outcome.clone()).collect()
    }

    pub fn has_mismatch(&self) -> bool {
        self.types.iter().any(|t| t.outcome.is_mismatch())
    }

    pub fn mismatches(&self) -> Vec<&Mismatch> {
        self.types
            .iter()
            .filter_map(|t| match &t.outcome {
                ReconciliationOutcome::Mismatch(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &DuplicateFieldRename> {
        self.types.iter().flat_map(|t| t.conflicts.iter())
    }
}

/// A table field moved aside to make room for an inherited one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRename {
    pub table: TableId,
    pub from: String,
    pub to: String,
}

/// What a batch did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub outcomes: Vec<ReconciliationOutcome>,
    /// False when a Mismatch kept the batch from being written.
    pub applied: bool,
    /// New types that represent structures; structure-dependent derived
    /// data must be refreshed when this is non-empty.
    pub structure_types_added: Vec<String>,
    pub fields_stored: usize,
    pub renamed_fields: Vec<FieldRename>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    fn unapplied(batch_id: BatchId, outcomes: Vec<ReconciliationOutcome>) -> Self {
        Self {
            batch_id,
            outcomes,
            applied: false,
            structure_types_added: Vec::new(),
            fields_stored: 0,
            renamed_fields: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    pub fn outcome_for(&self, type_name: &str) -> Option<&ReconciliationOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.type_name().eq_ignore_ascii_case(type_name))
    }

    pub fn first_mismatch(&self) -> Option<&Mismatch> {
        self.outcomes.iter().find_map(|o| match o {
            ReconciliationOutcome::Mismatch(m) => Some(m),
            _ => None,
        })
    }
}

/// Compare committed columns against a shadow built from incoming rows.
pub fn compare_columns(existing: &TypeDefinition, shadow: &TypeDefinition) -> Vec<ColumnDifference> {
    let mut differences = Vec::new();

    for column in existing.visible_columns() {
        let Some(candidate) = shadow
            .visible_columns()
            .iter()
            .find(|c| c.display_name == column.display_name)
        else {
            differences.push(ColumnDifference::Missing {
                display_name: column.display_name.clone(),
            });
            continue;
        };

        if !column.input_type.is_named(candidate.input_type.name()) {
            differences.push(ColumnDifference::InputType {
                display_name: column.display_name.clone(),
                existing: column.input_type.name().to_string(),
                incoming: candidate.input_type.name().to_string(),
            });
        }

        for (flag, before, after) in [
            (ColumnFlag::Unique, column.unique, candidate.unique),
            (ColumnFlag::Required, column.required, candidate.required),
            (ColumnFlag::StructOk, column.struct_ok, candidate.struct_ok),
            (ColumnFlag::PointerOk, column.pointer_ok, candidate.pointer_ok),
        ] {
            if before != after {
                differences.push(ColumnDifference::Flag {
                    display_name: column.display_name.clone(),
                    flag,
                    existing: before,
                    incoming: after,
                });
            }
        }
    }

    for candidate in shadow.visible_columns() {
        let known = existing
            .visible_columns()
            .iter()
            .any(|c| c.display_name == candidate.display_name);
        if !known {
            differences.push(ColumnDifference::Extra {
                display_name: candidate.display_name.clone(),
            });
        }
    }

    differences
}

/// Reconciles incoming type definitions against a registry and its store.
pub struct ReconciliationEngine<'a, S> {
    registry: &'a mut TypeRegistry,
    store: &'a mut S,
}

impl<'a, S: TypeStore + FieldStore> ReconciliationEngine<'a, S> {
    pub fn new(registry: &'a mut TypeRegistry, store: &'a mut S) -> Self {
        Self { registry, store }
    }

    /// Reconcile a single type and commit it unless it mismatched.
    pub fn reconcile(
        &mut self,
        incoming: &IncomingType,
        policy: &mut RenamePolicy<'_>,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let type_plan = self.plan_type(incoming)?;
        let outcome = type_plan.outcome.clone();
        let plan = BatchPlan {
            batch_id: BatchId::new(),
            types: vec![type_plan],
        };
        self.apply(plan, policy)?;
        Ok(outcome)
    }

    /// Plan and, when nothing mismatched, apply a batch.
    pub fn reconcile_batch(
        &mut self,
        batch: &[IncomingType],
        policy: &mut RenamePolicy<'_>,
    ) -> Result<BatchReport, ReconcileError> {
        let plan = self.plan_batch(batch)?;
        self.apply(plan, policy)
    }

    /// Decide every outcome in the batch without writing anything.
    pub fn plan_batch(&self, batch: &[IncomingType]) -> Result<BatchPlan, ReconcileError> {
        let batch_id = BatchId::new();
        let span = info_span!("plan_batch", batch_id = %batch_id, types = batch.len());
        let _guard = span.enter();

        let mut seen = HashSet::new();
        for incoming in batch {
            if !seen.insert(incoming.name.trim().to_lowercase()) {
                return Err(ReconcileError::DuplicateIncomingType(incoming.name.clone()));
            }
        }

        let types = batch
            .iter()
            .map(|incoming| self.plan_type(incoming))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BatchPlan { batch_id, types })
    }

    /// Decide the outcome for one incoming type without writing anything.
    pub fn plan_type(&self, incoming: &IncomingType) -> Result<TypePlan, ReconcileError> {
        let name = incoming.name.trim();

        let mut seen = HashSet::new();
        for field in &incoming.fields {
            if !seen.insert(field.field_name.trim().to_lowercase()) {
                return Err(ReconcileError::DuplicateIncomingField {
                    type_name: name.to_string(),
                    field_name: field.field_name.clone(),
                });
            }
        }

        let incoming_fields: Vec<FieldDefinition> = incoming
            .fields
            .iter()
            .map(|f| f.owned_by_type(name))
            .collect();

        let existing = self.registry.get(name);
        let instances = match existing {
            Some(def) => self.store.count_tables_of_type(def.name())?,
            None => 0,
        };

        let existing = match existing {
            Some(def) if instances > 0 => def,
            _ => {
                let def = self.registry.build_from_edited_rows(
                    name,
                    incoming.description.as_deref().unwrap_or(""),
                    &incoming.columns,
                )?;
                let outcome = ReconciliationOutcome::New {
                    type_name: def.name().to_string(),
                    replaced: existing.is_some(),
                    is_structure: def.is_structure(),
                };
                info!(type_name = def.name(), replaced = existing.is_some(), "table type is new");
                return Ok(TypePlan {
                    outcome,
                    definition: Some(def),
                    type_fields: incoming_fields,
                    cascade: Vec::new(),
                    conflicts: Vec::new(),
                });
            }
        };

        let incoming_description = incoming
            .description
            .as_deref()
            .unwrap_or_else(|| existing.description());
        let shadow = self.registry.build_from_edited_rows(
            &format!("{}{}", name, SHADOW_SUFFIX),
            incoming_description,
            &incoming.columns,
        )?;
        let column_differences = compare_columns(existing, &shadow);

        let committed_fields = self.store.fields_for_owner(&type_field_owner(existing.name()))?;
        let mut field_differences = Vec::new();
        let mut added = Vec::new();
        let mut updated = Vec::new();
        for field in &incoming_fields {
            match committed_fields.iter().find(|f| f.field_name == field.field_name) {
                None => added.push(field.owned_by_type(existing.name())),
                Some(current) => {
                    let differences = current.differences(field);
                    if !differences.is_empty() {
                        field_differences.extend(differences);
                    } else if current.is_cosmetic_change(field) {
                        updated.push(field.owned_by_type(existing.name()));
                    }
                }
            }
        }

        if !column_differences.is_empty() || !field_differences.is_empty() {
            warn!(
                type_name = existing.name(),
                columns = column_differences.len(),
                fields = field_differences.len(),
                "table type mismatch"
            );
            return Ok(TypePlan {
                outcome: ReconciliationOutcome::Mismatch(Mismatch {
                    type_name: existing.name().to_string(),
                    columns: column_differences,
                    fields: field_differences,
                }),
                definition: None,
                type_fields: Vec::new(),
                cascade: Vec::new(),
                conflicts: Vec::new(),
            });
        }

        let type_description_changed = existing.description() != incoming_description;
        let column_descriptions_changed: Vec<String> = shadow
            .visible_columns()
            .iter()
            .filter(|c| {
                existing
                    .visible_columns()
                    .iter()
                    .any(|e| e.display_name == c.display_name && e.description != c.description)
            })
            .map(|c| c.display_name.clone())
            .collect();

        let definition = if type_description_changed || !column_descriptions_changed.is_empty() {
            Some(existing.with_descriptions(
                incoming_description,
                shadow
                    .visible_columns()
                    .iter()
                    .map(|c| (c.display_name.as_str(), c.description.as_str())),
            ))
        } else {
            None
        };

        let (cascade, conflicts) = self.plan_cascade(existing.name(), &added)?;

        let changes = MatchChanges {
            type_description_changed,
            column_descriptions_changed,
            fields_added: added.iter().map(|f| f.field_name.clone()).collect(),
            fields_updated: updated.iter().map(|f| f.field_name.clone()).collect(),
        };
        info!(
            type_name = existing.name(),
            fields_added = changes.fields_added.len(),
            fields_updated = changes.fields_updated.len(),
            cascade = cascade.len(),
            "table type matches"
        );

        let mut type_fields = added;
        type_fields.extend(updated);
        Ok(TypePlan {
            outcome: ReconciliationOutcome::Match {
                type_name: existing.name().to_string(),
                changes,
            },
            definition,
            type_fields,
            cascade,
            conflicts,
        })
    }

    fn plan_cascade(
        &self,
        type_name: &str,
        added: &[FieldDefinition],
    ) -> Result<(Vec<CascadeAction>, Vec<DuplicateFieldRename>), ReconcileError> {
        if added.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let tables = self.store.list_tables_of_type(type_name)?;
        let mut actions = Vec::new();
        let mut conflicting: BTreeMap<String, Vec<TableId>> = BTreeMap::new();

        for table in &tables {
            let local = self.store.fields_for_owner(table.as_str())?;
            for field in added {
                if !field.applicability.applies_to(table) {
                    debug!(table = %table, field = %field.field_name, "field does not apply to table");
                    continue;
                }
                let inherited = field.inherited_by(table);
                match local.iter().find(|f| f.field_name == field.field_name) {
                    None => actions.push(CascadeAction::Add {
                        table: table.clone(),
                        field: inherited,
                    }),
                    Some(current) if current.same_meaning(field) => actions.push(CascadeAction::Adopt {
                        table: table.clone(),
                        field: inherited,
                    }),
                    Some(_) => {
                        let taken = local
                            .iter()
                            .map(|f| f.field_name.as_str())
                            .chain(added.iter().map(|f| f.field_name.as_str()));
                        let renamed_to = free_field_name(&field.field_name, taken);
                        conflicting
                            .entry(field.field_name.clone())
                            .or_default()
                            .push(table.clone());
                        actions.push(CascadeAction::RenameThenAdd {
                            table: table.clone(),
                            field: inherited,
                            renamed_to,
                        });
                    }
                }
            }
        }

        let conflicts = conflicting
            .into_iter()
            .map(|(field_name, affected_tables)| DuplicateFieldRename {
                type_name: type_name.to_string(),
                field_name,
                affected_tables,
            })
            .collect();
        Ok((actions, conflicts))
    }

    /// Commit a plan. A plan holding any Mismatch is reported unapplied;
    /// a declined rename aborts before the first write.
    pub fn apply(
        &mut self,
        plan: BatchPlan,
        policy: &mut RenamePolicy<'_>,
    ) -> Result<BatchReport, ReconcileError> {
        let span = info_span!("apply_batch", batch_id = %plan.batch_id);
        let _guard = span.enter();

        if plan.has_mismatch() {
            for mismatch in plan.mismatches() {
                warn!(type_name = %mismatch.type_name, differences = mismatch.difference_count(), "batch not applied");
            }
            let outcomes = plan.outcomes();
            return Ok(BatchReport::unapplied(plan.batch_id, outcomes));
        }

        for conflict in plan.conflicts() {
            match policy.decide(conflict) {
                RenameDecision::Allow => {
                    info!(field = %conflict.field_name, tables = conflict.affected_tables.len(), "field rename allowed");
                }
                RenameDecision::Decline => {
                    warn!(field = %conflict.field_name, "field rename declined; batch aborted");
                    return Err(ReconcileError::Aborted {
                        field_name: conflict.field_name.clone(),
                        affected_tables: conflict.affected_tables.clone(),
                    });
                }
            }
        }

        let outcomes = plan.outcomes();
        let mut structure_types_added = Vec::new();
        let mut fields_stored = 0;
        let mut renamed_fields = Vec::new();

        for type_plan in plan.types {
            let is_new = matches!(type_plan.outcome, ReconciliationOutcome::New { .. });
            if let Some(def) = type_plan.definition {
                self.store.replace_type_rows(def.name(), &def.to_storage_rows())?;
                if is_new {
                    let removed = self.store.delete_fields_for_owner(&type_field_owner(def.name()))?;
                    if removed > 0 {
                        debug!(type_name = def.name(), removed, "dropped fields of replaced table type");
                    }
                }
                if is_new && def.is_structure() {
                    structure_types_added.push(def.name().to_string());
                }
                self.registry.replace(def);
            }

            if !type_plan.type_fields.is_empty() {
                self.store.upsert_fields(&type_plan.type_fields)?;
                fields_stored += type_plan.type_fields.len();
            }

            for action in type_plan.cascade {
                match action {
                    CascadeAction::Add { field, .. } | CascadeAction::Adopt { field, .. } => {
                        self.store.upsert_fields(std::slice::from_ref(&field))?;
                    }
                    CascadeAction::RenameThenAdd { table, field, renamed_to } => {
                        self.store.rename_field(table.as_str(), &field.field_name, &renamed_to)?;
                        self.store.upsert_fields(std::slice::from_ref(&field))?;
                        renamed_fields.push(FieldRename {
                            table,
                            from: field.field_name,
                            to: renamed_to,
                        });
                    }
                }
                fields_stored += 1;
            }
        }

        info!(
            types = outcomes.len(),
            fields_stored,
            structures_added = structure_types_added.len(),
            "batch applied"
        );
        Ok(BatchReport {
            batch_id: plan.batch_id,
            outcomes,
            applied: true,
            structure_types_added,
            fields_stored,
            renamed_fields,
            finished_at: Utc::now(),
        })
    }
}

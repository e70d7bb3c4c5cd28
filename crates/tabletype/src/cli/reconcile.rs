//! Reconcile command - import table types against the committed catalog
//!
//! Without `--apply` the batch is only planned. With it, every rename
//! conflict is confirmed first and the snapshot is written once at the end.

use crate::cli::catalog::Catalog;
use crate::cli::config::{CatalogConfig, RenamePolicyMode};
use crate::cli::error::HelpfulError;
use crate::cli::output::{outcome_label, print_json, print_table, print_table_colored};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tabletype_schema::{
    BatchPlan, DuplicateFieldRename, IncomingType, ReconciliationOutcome, RenameDecision, RenamePolicy,
};
use tracing::info;

#[derive(Debug)]
pub struct ReconcileArgs {
    pub file: PathBuf,
    pub apply: bool,
    /// Overrides the configured policy.
    pub rename_policy: Option<RenamePolicyMode>,
    pub json: bool,
}

/// An import file holds one type or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Batch(Vec<IncomingType>),
    Single(IncomingType),
}

#[derive(Debug, Serialize)]
struct PlanOutput<'a> {
    batch_id: String,
    applied: bool,
    outcomes: Vec<ReconciliationOutcome>,
    conflicts: Vec<&'a DuplicateFieldRename>,
}

/// Read an import file into a batch.
pub fn read_import(path: &Path) -> anyhow::Result<Vec<IncomingType>> {
    if !path.exists() {
        return Err(HelpfulError::file_not_found(path).into());
    }
    let content = std::fs::read_to_string(path)?;
    let parsed: ImportFile = serde_json::from_str(&content)
        .map_err(|e| HelpfulError::import_parse_error(path, &e.to_string()))?;
    Ok(match parsed {
        ImportFile::Batch(types) => types,
        ImportFile::Single(incoming) => vec![incoming],
    })
}

pub fn run(catalog: &mut Catalog, config: &CatalogConfig, args: ReconcileArgs) -> anyhow::Result<()> {
    let batch = read_import(&args.file)?;
    let plan = catalog
        .engine()
        .plan_batch(&batch)
        .map_err(|e| HelpfulError::reconcile_failed(&e))?;

    if !args.apply || plan.has_mismatch() {
        if args.json {
            print_json(&PlanOutput {
                batch_id: plan.batch_id.to_string(),
                applied: false,
                outcomes: plan.outcomes(),
                conflicts: plan.conflicts().collect(),
            })?;
        } else {
            print_plan(&plan);
        }
        if let Some(mismatch) = plan.mismatches().first() {
            return Err(HelpfulError::mismatch(mismatch).into());
        }
        if !args.json {
            println!("Dry run: re-run with --apply to commit.");
        }
        return Ok(());
    }

    let mode = args.rename_policy.unwrap_or(config.rename_policy);
    let mut policy = mode
        .fixed_policy()
        .unwrap_or_else(|| RenamePolicy::Prompt(Box::new(prompt_rename)));

    let report = catalog
        .engine()
        .apply(plan, &mut policy)
        .map_err(|e| HelpfulError::reconcile_failed(&e))?;
    catalog.save()?;
    info!(batch_id = %report.batch_id, types = report.outcomes.len(), "import applied");

    if args.json {
        return print_json(&report);
    }

    print_outcomes(&report.outcomes);
    for rename in &report.renamed_fields {
        println!("Renamed field {} of {} to {}", rename.from, rename.table, rename.to);
    }
    if !report.structure_types_added.is_empty() {
        println!("New structure types: {}", report.structure_types_added.join(", "));
    }
    println!("Applied {} table type(s), {} field(s) stored.", report.outcomes.len(), report.fields_stored);
    Ok(())
}

fn print_plan(plan: &BatchPlan) {
    print_outcomes(&plan.outcomes());

    let conflicts: Vec<&DuplicateFieldRename> = plan.conflicts().collect();
    if !conflicts.is_empty() {
        println!();
        let rows = conflicts
            .iter()
            .map(|c| {
                vec![
                    c.type_name.clone(),
                    c.field_name.clone(),
                    c.affected_tables
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                ]
            })
            .collect();
        print_table(&["Type", "Field needing rename", "Tables"], rows);
    }
}

fn print_outcomes(outcomes: &[ReconciliationOutcome]) {
    let rows = outcomes
        .iter()
        .map(|outcome| {
            let (label, color) = outcome_label(outcome);
            vec![
                (outcome.type_name().to_string(), None),
                (label.to_string(), Some(color)),
                (outcome_details(outcome), None),
            ]
        })
        .collect();
    print_table_colored(&["Type", "Outcome", "Details"], rows);
}

fn outcome_details(outcome: &ReconciliationOutcome) -> String {
    match outcome {
        ReconciliationOutcome::New { is_structure, .. } => {
            if *is_structure {
                "structure".to_string()
            } else {
                String::new()
            }
        }
        ReconciliationOutcome::Match { changes, .. } => {
            let mut parts = Vec::new();
            if changes.type_description_changed {
                parts.push("type description".to_string());
            }
            if !changes.column_descriptions_changed.is_empty() {
                parts.push(format!("{} column description(s)", changes.column_descriptions_changed.len()));
            }
            if !changes.fields_added.is_empty() {
                parts.push(format!("fields added: {}", changes.fields_added.join(", ")));
            }
            if !changes.fields_updated.is_empty() {
                parts.push(format!("fields updated: {}", changes.fields_updated.join(", ")));
            }
            if parts.is_empty() {
                "unchanged".to_string()
            } else {
                parts.join("; ")
            }
        }
        ReconciliationOutcome::Mismatch(mismatch) => mismatch
            .columns
            .iter()
            .map(|d| d.to_string())
            .chain(mismatch.fields.iter().map(|d| d.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// Ask on the terminal whether a conflicting field may be renamed.
fn prompt_rename(conflict: &DuplicateFieldRename) -> RenameDecision {
    let tables: Vec<&str> = conflict.affected_tables.iter().map(|t| t.as_str()).collect();
    eprint!(
        "Field {} of type {} conflicts with a field of the same name in {}. Rename the existing field? [y/N] ",
        conflict.field_name,
        conflict.type_name,
        tables.join(", ")
    );
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") => RenameDecision::Allow,
        _ => RenameDecision::Decline,
    }
}

//! Add-argument command - append a command argument column group
//!
//! The extended definition goes through reconciliation like any other
//! edit, so a command type that already has tables is refused.

use crate::cli::catalog::Catalog;
use crate::cli::error::HelpfulError;
use crate::cli::output::print_json;
use tabletype_schema::builder::edited_rows_of;
use tabletype_schema::command_args::{with_command_argument_columns, next_argument_index};
use tabletype_schema::{IncomingType, ReconciliationOutcome, RenamePolicy};

#[derive(Debug)]
pub struct AddArgumentArgs {
    pub type_name: String,
    pub json: bool,
}

pub fn run(catalog: &mut Catalog, args: AddArgumentArgs) -> anyhow::Result<()> {
    let def = catalog.require_type(&args.type_name)?;
    if !def.is_command() {
        return Err(HelpfulError::new(format!("{} is not a command table type", def.name()))
            .with_context("Argument columns can only be added to command types")
            .with_suggestion("TRY: tabletype types   # the Kind column shows command types")
            .into());
    }

    let index = next_argument_index(def);
    let extended = with_command_argument_columns(def, index, &catalog.registry)?;
    let incoming = IncomingType::new(extended.name(), extended.description(), edited_rows_of(&extended));

    let outcome = catalog
        .engine()
        .reconcile(&incoming, &mut RenamePolicy::NeverAllowRename)
        .map_err(|e| HelpfulError::reconcile_failed(&e))?;
    if let ReconciliationOutcome::Mismatch(mismatch) = &outcome {
        return Err(HelpfulError::mismatch(mismatch).into());
    }
    catalog.save()?;

    if args.json {
        return print_json(&outcome);
    }
    println!("Added argument {} columns to {}", index, incoming.name);
    Ok(())
}

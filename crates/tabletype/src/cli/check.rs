//! Check command - validate and normalize a value for a column

use crate::cli::catalog::Catalog;
use crate::cli::error::HelpfulError;
use crate::cli::output::print_json;
use serde::Serialize;

#[derive(Debug)]
pub struct CheckArgs {
    pub type_name: String,
    pub column: String,
    pub value: String,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CheckOutput<'a> {
    column: &'a str,
    input_type: &'a str,
    value: &'a str,
    valid: bool,
    normalized: Option<String>,
}

pub fn run(catalog: &Catalog, args: CheckArgs) -> anyhow::Result<()> {
    let def = catalog.require_type(&args.type_name)?;
    let column = def
        .column_by_display_name(&args.column)
        .ok_or_else(|| HelpfulError::unknown_column(def.name(), &args.column))?;

    let input_types = catalog.registry.input_types();
    let valid = column.accepts(&args.value);
    let normalized = valid.then(|| input_types.normalize(&column.input_type, &args.value));

    if args.json {
        return print_json(&CheckOutput {
            column: &column.display_name,
            input_type: column.input_type.name(),
            value: &args.value,
            valid,
            normalized,
        });
    }

    match normalized {
        Some(normalized) => {
            println!("valid ({}): {}", column.input_type.name(), normalized);
            Ok(())
        }
        None => {
            let mut error = HelpfulError::new(format!(
                "'{}' is not a valid {} value",
                args.value,
                column.input_type.name()
            ))
            .with_context(column.input_type.description().to_string());
            if args.value.is_empty() && column.required {
                error = error.with_context(format!("{} is required", column.display_name));
            }
            if let Some(items) = column.input_type.items() {
                error = error.with_suggestion(format!("TRY: one of {}", items.join(", ")));
            }
            Err(error.into())
        }
    }
}

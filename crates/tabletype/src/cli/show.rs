//! Show command - columns, argument groups, and data fields of one type

use crate::cli::catalog::Catalog;
use crate::cli::output::{flag, print_json, print_table, truncate};
use serde::Serialize;
use tabletype_schema::command_args::{associated_command_argument_columns, ArgumentColumns};
use tabletype_schema::field::type_field_owner;
use tabletype_schema::{FieldDefinition, FieldStore, StorageRow, TypeStore};

#[derive(Debug)]
pub struct ShowArgs {
    pub type_name: String,
    /// Include the hidden key and index columns.
    pub all: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    name: String,
    description: String,
    structure: bool,
    command: bool,
    tables: usize,
    columns: Vec<StorageRow>,
    arguments: Vec<ArgumentColumns>,
    fields: Vec<FieldDefinition>,
}

pub fn run(catalog: &Catalog, args: ShowArgs) -> anyhow::Result<()> {
    let def = catalog.require_type(&args.type_name)?;
    let skip = if args.all { 0 } else { def.columns().len() - def.visible_column_count() };
    let output = ShowOutput {
        name: def.name().to_string(),
        description: def.description().to_string(),
        structure: def.is_structure(),
        command: def.is_command(),
        tables: catalog.store.count_tables_of_type(def.name())?,
        columns: def.to_storage_rows().into_iter().skip(skip).collect(),
        arguments: associated_command_argument_columns(def),
        fields: catalog.store.fields_for_owner(&type_field_owner(def.name()))?,
    };

    if args.json {
        return print_json(&output);
    }

    let kind = if output.structure {
        "structure"
    } else if output.command {
        "command"
    } else {
        "generic"
    };
    println!("{} ({}, {} tables)", output.name, kind, output.tables);
    if !output.description.is_empty() {
        println!("{}", output.description);
    }
    println!();

    let rows = output
        .columns
        .iter()
        .map(|c| {
            vec![
                c.ordinal.to_string(),
                c.display_name.clone(),
                c.storage_name.clone(),
                c.input_type.clone(),
                flag(c.unique),
                flag(c.required),
                flag(c.struct_ok),
                flag(c.pointer_ok),
                truncate(&c.description, 40),
            ]
        })
        .collect();
    print_table(
        &["#", "Column", "Storage", "Input type", "Unique", "Req", "Struct", "Ptr", "Description"],
        rows,
    );

    if !output.arguments.is_empty() {
        println!();
        let name_of = |ordinal: Option<u32>| {
            ordinal
                .and_then(|o| def.column(o))
                .map(|c| c.display_name.clone())
                .unwrap_or_default()
        };
        let rows = output
            .arguments
            .iter()
            .map(|a| {
                vec![
                    name_of(Some(a.name)),
                    name_of(a.data_type),
                    name_of(a.enumeration),
                    name_of(a.minimum),
                    name_of(a.maximum),
                    a.other.len().to_string(),
                ]
            })
            .collect();
        print_table(&["Argument", "Data type", "Enumeration", "Minimum", "Maximum", "Other"], rows);
    }

    if !output.fields.is_empty() {
        println!();
        let rows = output
            .fields
            .iter()
            .map(|f| {
                vec![
                    f.field_name.clone(),
                    f.input_type.clone(),
                    flag(f.required),
                    f.applicability.to_string(),
                    f.value.clone(),
                ]
            })
            .collect();
        print_table(&["Field", "Input type", "Req", "Applies to", "Value"], rows);
    }

    Ok(())
}

//! Types command - list table types and their kinds

use crate::cli::catalog::Catalog;
use crate::cli::output::{print_json, print_table, truncate};
use serde::Serialize;
use tabletype_schema::TypeStore;

#[derive(Debug)]
pub struct TypesArgs {
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct TypeSummary {
    name: String,
    kind: &'static str,
    columns: usize,
    tables: usize,
    description: String,
}

pub fn run(catalog: &Catalog, args: TypesArgs) -> anyhow::Result<()> {
    let mut summaries = Vec::new();
    for def in catalog.registry.iter() {
        let kind = if def.is_structure() {
            "structure"
        } else if def.is_command() {
            "command"
        } else {
            "generic"
        };
        summaries.push(TypeSummary {
            name: def.name().to_string(),
            kind,
            columns: def.visible_column_count(),
            tables: catalog.store.count_tables_of_type(def.name())?,
            description: def.description().to_string(),
        });
    }

    if args.json {
        return print_json(&summaries);
    }

    let rows = summaries
        .into_iter()
        .map(|s| {
            vec![
                s.name,
                s.kind.to_string(),
                s.columns.to_string(),
                s.tables.to_string(),
                truncate(&s.description, 60),
            ]
        })
        .collect();
    print_table(&["Name", "Kind", "Columns", "Tables", "Description"], rows);
    Ok(())
}

//! Add-table command - record a table stored against a type

use crate::cli::catalog::Catalog;
use crate::cli::error::HelpfulError;
use tabletype_ids::TableId;
use tabletype_schema::TypeStore;

#[derive(Debug)]
pub struct AddTableArgs {
    pub table: String,
    pub type_name: String,
}

pub fn run(catalog: &mut Catalog, args: AddTableArgs) -> anyhow::Result<()> {
    let type_name = catalog.require_type(&args.type_name)?.name().to_string();
    let table = TableId::parse(&args.table).map_err(|e| {
        HelpfulError::new(format!("Invalid table name: '{}'", args.table))
            .with_context(e.to_string())
            .with_suggestion("TRY: Child tables are written parent,child.variable")
    })?;

    let existing = catalog.store.list_tables_of_type(&type_name)?;
    if catalog.store.tables.iter().any(|t| t.table == table) {
        return Err(HelpfulError::new(format!("Table already exists: {}", table)).into());
    }

    catalog.store.add_table(table.clone(), &type_name);
    catalog.save()?;
    println!("{} added as {} table #{}", table, type_name, existing.len() + 1);
    Ok(())
}

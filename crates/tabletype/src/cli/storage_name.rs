//! Storage-name command - show how a display name is stored

use crate::cli::catalog::Catalog;
use crate::cli::output::print_json;
use serde::Serialize;

#[derive(Debug)]
pub struct StorageNameArgs {
    pub display_name: String,
    pub input_type: String,
    /// Name the column as part of a structure type.
    pub structure: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StorageNameOutput<'a> {
    display_name: &'a str,
    input_type: &'a str,
    structure: bool,
    storage_name: String,
    reserved: bool,
}

pub fn run(catalog: &Catalog, args: StorageNameArgs) -> anyhow::Result<()> {
    let input_type = catalog.registry.input_types().require(&args.input_type)?;
    let translator = catalog.registry.translator();
    let storage_name = translator.to_storage_name(&args.display_name, &input_type, args.structure);
    let reserved = storage_name.starts_with('"');

    if args.json {
        return print_json(&StorageNameOutput {
            display_name: &args.display_name,
            input_type: input_type.name(),
            structure: args.structure,
            storage_name,
            reserved,
        });
    }

    println!("{}", storage_name);
    if reserved {
        println!("(quoted: reserved word)");
    }
    Ok(())
}

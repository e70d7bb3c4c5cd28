//! Table type catalog CLI
//!
//! Inspect table types, validate values against column input types, and
//! reconcile imported type definitions against a committed catalog.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tabletype_logging::{init_logging, LogConfig};

mod cli;

use cli::catalog::Catalog;
use cli::config::{CatalogConfig, RenamePolicyMode};

#[derive(Parser, Debug)]
#[command(name = "tabletype", about = "Table type catalog tools")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Configuration file (default: ~/.tabletype/tabletype.toml)
    #[arg(long, global = true, env = "TABLETYPE_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog snapshot, overriding the configured one
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List table types with their kind and table count
    Types {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the columns, argument groups, and data fields of a type
    Show {
        /// Table type name (case-insensitive)
        type_name: String,

        /// Include the hidden key and index columns
        #[arg(short, long)]
        all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate and normalize a value for a column
    Check {
        /// Table type name
        type_name: String,

        /// Value to check
        value: String,

        /// Column display name
        column: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile an import file (one type or an array) against the catalog
    Reconcile {
        /// JSON import file
        file: PathBuf,

        /// Commit the batch; without this only the plan is shown
        #[arg(long)]
        apply: bool,

        /// How to confirm renames of conflicting table fields
        #[arg(long, value_parser = parse_rename_policy)]
        rename_policy: Option<RenamePolicyMode>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the storage name a column display name translates to
    StorageName {
        /// Column display name
        display_name: String,

        /// Input type of the column
        #[arg(short = 't', long, default_value = "Text")]
        input_type: String,

        /// Name the column as part of a structure type
        #[arg(short, long)]
        structure: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append a set of argument columns to a command type
    AddArgument {
        /// Command table type name
        type_name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a table stored against a type
    AddTable {
        /// Table name (parent,child.variable for child tables)
        table: String,

        /// Table type name
        #[arg(short = 't', long = "type")]
        type_name: String,
    },
}

fn parse_rename_policy(value: &str) -> Result<RenamePolicyMode, String> {
    match value.to_lowercase().as_str() {
        "prompt" => Ok(RenamePolicyMode::Prompt),
        "allow" => Ok(RenamePolicyMode::Allow),
        "decline" => Ok(RenamePolicyMode::Decline),
        other => Err(format!("unknown rename policy '{}': use prompt, allow, or decline", other)),
    }
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Types { json }
        | Commands::Show { json, .. }
        | Commands::Check { json, .. }
        | Commands::Reconcile { json, .. }
        | Commands::StorageName { json, .. }
        | Commands::AddArgument { json, .. } => *json,
        Commands::AddTable { .. } => false,
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config = CatalogConfig::load_or_default(cli.config.as_deref())?;
    let snapshot = cli.snapshot.clone().unwrap_or_else(|| config.snapshot_path.clone());
    let mut catalog = Catalog::open(&snapshot, &config)?;

    match cli.command {
        Commands::Types { json } => cli::types::run(&catalog, cli::types::TypesArgs { json }),
        Commands::Show { type_name, all, json } => {
            cli::show::run(&catalog, cli::show::ShowArgs { type_name, all, json })
        }
        Commands::Check {
            type_name,
            value,
            column,
            json,
        } => cli::check::run(
            &catalog,
            cli::check::CheckArgs {
                type_name,
                column,
                value,
                json,
            },
        ),
        Commands::Reconcile {
            file,
            apply,
            rename_policy,
            json,
        } => cli::reconcile::run(
            &mut catalog,
            &config,
            cli::reconcile::ReconcileArgs {
                file,
                apply,
                rename_policy,
                json,
            },
        ),
        Commands::StorageName {
            display_name,
            input_type,
            structure,
            json,
        } => cli::storage_name::run(
            &catalog,
            cli::storage_name::StorageNameArgs {
                display_name,
                input_type,
                structure,
                json,
            },
        ),
        Commands::AddArgument { type_name, json } => {
            cli::argument::run(&mut catalog, cli::argument::AddArgumentArgs { type_name, json })
        }
        Commands::AddTable { table, type_name } => {
            cli::table::run(&mut catalog, cli::table::AddTableArgs { table, type_name })
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    if let Err(err) = init_logging(LogConfig {
        app_name: "tabletype",
        verbose: cli.verbose,
        quiet_console: json_mode,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else if let Some(helpful) = err.downcast_ref::<cli::error::HelpfulError>() {
                eprint!("{}", helpful);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reconcile() {
        let cli = Cli::try_parse_from([
            "tabletype",
            "reconcile",
            "import.json",
            "--apply",
            "--rename-policy",
            "Allow",
            "--json",
        ])
        .unwrap();
        assert!(command_wants_json(&cli.command));
        match cli.command {
            Commands::Reconcile { apply, rename_policy, .. } => {
                assert!(apply);
                assert_eq!(rename_policy, Some(RenamePolicyMode::Allow));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["tabletype", "reconcile", "x.json", "--rename-policy", "maybe"]).is_err());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tabletype", "types", "-v", "--snapshot", "/tmp/c.json"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.snapshot, Some(PathBuf::from("/tmp/c.json")));
        assert!(!command_wants_json(&cli.command));
    }
}

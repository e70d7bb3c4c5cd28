//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;
use tabletype_schema::{Mismatch, ReconcileError};

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Table type is not in the catalog
    pub fn unknown_type(name: &str, known: &[String]) -> Self {
        Self::new(format!("Table type not found: {}", name))
            .with_context(format!("Known types: {}", known.join(", ")))
            .with_suggestion("TRY: tabletype types   # list table types")
    }

    /// Column is not part of the type
    pub fn unknown_column(type_name: &str, column: &str) -> Self {
        Self::new(format!("Column not found: {}", column))
            .with_context(format!("Table type {} has no column with that display name", type_name))
            .with_suggestion(format!("TRY: tabletype show \"{}\"   # list its columns", type_name))
    }

    /// Import file does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                "TRY: Check for typos in the path".to_string(),
            ])
    }

    /// Import file is not valid JSON for a table type batch
    pub fn import_parse_error(path: &Path, details: &str) -> Self {
        Self::new(format!("Import parse error: {}", details))
            .with_context(format!("Failed to parse import file: {}", path.display()))
            .with_suggestions([
                "TRY: The file holds one table type object or an array of them".to_string(),
                "TRY: Each type needs `name` and `columns` (display_name, input_type)".to_string(),
            ])
    }

    /// Snapshot is unreadable or corrupt
    pub fn corrupt_snapshot(path: &Path, details: &str) -> Self {
        Self::new(format!("Catalog snapshot is unusable: {}", details))
            .with_context(format!("Snapshot: {}", path.display()))
            .with_suggestions([
                "TRY: Restore the snapshot from a backup".to_string(),
                format!("TRY: Move it aside to start a fresh catalog: mv {} {}.bak", path.display(), path.display()),
            ])
    }

    /// Import mismatched a committed type
    pub fn mismatch(mismatch: &Mismatch) -> Self {
        let mut error = Self::new(format!(
            "Table type {} does not match its committed definition",
            mismatch.type_name
        ))
        .with_context("Tables exist for this type, so only descriptions and new data fields may change");
        for difference in &mismatch.columns {
            error = error.with_suggestion(format!("  {}", difference));
        }
        for difference in &mismatch.fields {
            error = error.with_suggestion(format!("  {}", difference));
        }
        error.with_suggestion("TRY: Revert the listed changes, or create a new table type")
    }

    /// Reconciliation stopped before writing
    pub fn reconcile_failed(err: &ReconcileError) -> Self {
        match err {
            ReconcileError::Aborted { field_name, affected_tables } => {
                Self::new(format!("Import aborted: rename of field {} declined", field_name))
                    .with_context(format!(
                        "Tables holding a conflicting {}: {}",
                        field_name,
                        affected_tables
                            .iter()
                            .map(|t| t.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                    .with_suggestions([
                        "TRY: Rename the field in the import".to_string(),
                        "TRY: Set rename_policy = \"allow\" in tabletype.toml".to_string(),
                    ])
            }
            ReconcileError::DuplicateIncomingField { type_name, field_name } => {
                Self::new(format!("Import lists data field {} twice", field_name))
                    .with_context(format!("Table type {} (field names ignore case)", type_name))
                    .with_suggestion("TRY: Keep one definition of the field in the import")
            }
            other => Self::new(format!("Reconciliation failed: {}", other))
                .with_suggestion("TRY: Re-run with -v for details"),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print an error as a JSON object on stdout.
pub fn print_json_error(err: &anyhow::Error) {
    let payload = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "error": helpful.message,
            "context": helpful.context,
            "suggestions": helpful.suggestions,
        }),
        None => serde_json::json!({ "error": format!("{:#}", err) }),
    };
    println!("{}", payload);
}

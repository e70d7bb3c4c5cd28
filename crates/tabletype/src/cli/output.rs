//! Output formatting utilities for CLI commands

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use tabletype_schema::ReconciliationOutcome;

/// Print a table with headers
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

/// Print a table with custom column colors
pub fn print_table_colored(headers: &[&str], rows: Vec<Vec<(String, Option<Color>)>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|(text, color)| {
                let cell = Cell::new(text);
                if let Some(c) = color {
                    cell.fg(c)
                } else {
                    cell
                }
            })
            .collect();
        table.add_row(cells);
    }

    println!("{}", table);
}

/// Pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Check mark for set flags, blank otherwise
pub fn flag(set: bool) -> String {
    if set {
        "✓".to_string()
    } else {
        String::new()
    }
}

/// Label and color for a reconciliation outcome
pub fn outcome_label(outcome: &ReconciliationOutcome) -> (&'static str, Color) {
    match outcome {
        ReconciliationOutcome::New { replaced: true, .. } => ("NEW (replaces)", Color::Green),
        ReconciliationOutcome::New { .. } => ("NEW", Color::Green),
        ReconciliationOutcome::Match { .. } => ("MATCH", Color::Cyan),
        ReconciliationOutcome::Mismatch(_) => ("MISMATCH", Color::Red),
    }
}

/// Truncate text to `max` characters with an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletype_schema::MatchChanges;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long description", 7), "a long…");
    }

    #[test]
    fn test_outcome_labels() {
        let matched = ReconciliationOutcome::Match {
            type_name: "Sensor".to_string(),
            changes: MatchChanges::default(),
        };
        assert_eq!(outcome_label(&matched).0, "MATCH");
        assert_eq!(flag(true), "✓");
        assert!(flag(false).is_empty());
    }
}

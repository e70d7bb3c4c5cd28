//! Column and type definitions.
//!
//! A [`TypeDefinition`] is an ordered list of columns whose first two
//! entries are always the hidden primary key and row index. Definitions
//! are immutable once built; edits produce a new definition.

use crate::builder::StorageRow;
use crate::classify;
use crate::defaults::{SemanticKind, HIDDEN_COLUMN_COUNT};
use crate::input_type::{InputTypeFormat, InputTypeRef};
use crate::naming::strip_quotes;
use std::collections::HashSet;

/// One column of a table type.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    /// Position among all columns, hidden ones included.
    pub ordinal: u32,
    pub storage_name: String,
    pub display_name: String,
    pub description: String,
    pub input_type: InputTypeRef,
    /// Each row's value must be unique within the table.
    pub unique: bool,
    /// A value must be supplied.
    pub required: bool,
    /// Applies to structure-typed rows.
    pub struct_ok: bool,
    /// Applies to pointer-typed rows.
    pub pointer_ok: bool,
}

impl ColumnDefinition {
    pub fn is_hidden(&self) -> bool {
        (self.ordinal as usize) < HIDDEN_COLUMN_COUNT
    }

    pub fn input_type_name(&self) -> &str {
        self.input_type.name()
    }

    pub fn has_input_type(&self, name: &str) -> bool {
        self.input_type.is_named(name)
    }

    /// True when the value is acceptable for this column, counting the
    /// required flag.
    pub fn accepts(&self, raw: &str) -> bool {
        if raw.is_empty() {
            return !self.required;
        }
        self.input_type.is_valid(raw)
    }

    fn to_storage_row(&self, type_name: &str) -> StorageRow {
        StorageRow {
            type_name: type_name.to_string(),
            ordinal: self.ordinal,
            storage_name: self.storage_name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            input_type: self.input_type.name().to_string(),
            unique: self.unique,
            required: self.required,
            struct_ok: self.struct_ok,
            pointer_ok: self.pointer_ok,
        }
    }
}

/// A named, ordered set of columns plus its cached classification.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    name: String,
    columns: Vec<ColumnDefinition>,
    kinds: HashSet<SemanticKind>,
}

impl TypeDefinition {
    /// Callers guarantee contiguous ordinals and the two hidden columns.
    pub(crate) fn from_columns(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        let kinds = classify::classify_columns(&columns);
        Self {
            name: name.into(),
            columns,
            kinds,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type description, held on the primary key column.
    pub fn description(&self) -> &str {
        self.columns
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("")
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Raw template matches. A type may match both kinds; use
    /// [`is_command`](Self::is_command) for the structure-wins rule.
    pub fn kinds(&self) -> &HashSet<SemanticKind> {
        &self.kinds
    }

    pub fn is_structure(&self) -> bool {
        classify::is_structure(self)
    }

    pub fn is_command(&self) -> bool {
        classify::is_command(self)
    }

    /// Columns after the primary key and row index.
    pub fn visible_columns(&self) -> &[ColumnDefinition] {
        self.columns.get(HIDDEN_COLUMN_COUNT..).unwrap_or(&[])
    }

    pub fn visible_column_count(&self) -> usize {
        self.visible_columns().len()
    }

    pub fn storage_column_count(&self) -> usize {
        self.columns.len()
    }

    /// Visible-column index for an ordinal; hidden columns have none.
    pub fn visible_index(&self, ordinal: u32) -> Option<usize> {
        let index = (ordinal as usize).checked_sub(HIDDEN_COLUMN_COUNT)?;
        (index < self.visible_column_count()).then_some(index)
    }

    pub fn column(&self, ordinal: u32) -> Option<&ColumnDefinition> {
        self.columns.get(ordinal as usize)
    }

    /// First column of the input type, in ordinal order.
    pub fn column_by_input_type(&self, input_type: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.has_input_type(input_type))
    }

    pub fn columns_by_input_type(&self, input_type: &str) -> Vec<&ColumnDefinition> {
        self.columns
            .iter()
            .filter(|c| c.has_input_type(input_type))
            .collect()
    }

    pub fn columns_by_input_format(&self, format: InputTypeFormat) -> Vec<&ColumnDefinition> {
        self.columns
            .iter()
            .filter(|c| c.input_type.format() == format)
            .collect()
    }

    /// Case-insensitive display name lookup.
    pub fn column_by_display_name(&self, display_name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.display_name.eq_ignore_ascii_case(display_name))
    }

    /// Storage name lookup; quoting is ignored on both sides.
    pub fn column_by_storage_name(&self, storage_name: &str) -> Option<&ColumnDefinition> {
        let wanted = strip_quotes(storage_name);
        self.columns
            .iter()
            .find(|c| strip_quotes(&c.storage_name).eq_ignore_ascii_case(wanted))
    }

    pub fn display_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.display_name.as_str()).collect()
    }

    /// `"0:1:2:..."`, one entry per column.
    pub fn default_column_order(&self) -> String {
        (0..self.columns.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Committed-catalog rows for this type, in ordinal order.
    pub fn to_storage_rows(&self) -> Vec<StorageRow> {
        self.columns
            .iter()
            .map(|c| c.to_storage_row(&self.name))
            .collect()
    }

    /// The same columns under another name.
    pub fn renamed(&self, name: impl Into<String>) -> TypeDefinition {
        Self {
            name: name.into(),
            columns: self.columns.clone(),
            kinds: self.kinds.clone(),
        }
    }

    /// A copy whose descriptions are replaced: the type description, and
    /// each column's whose display name appears in `column_descriptions`.
    pub fn with_descriptions<'a>(
        &self,
        type_description: &str,
        column_descriptions: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> TypeDefinition {
        let mut columns = self.columns.clone();
        if let Some(key) = columns.first_mut() {
            key.description = type_description.to_string();
        }
        for (display_name, description) in column_descriptions {
            if let Some(column) = columns
                .iter_mut()
                .skip(HIDDEN_COLUMN_COUNT)
                .find(|c| c.display_name == display_name)
            {
                column.description = description.to_string();
            }
        }
        Self {
            name: self.name.clone(),
            columns,
            kinds: self.kinds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::build_type_from_edited_rows;
    use crate::defaults::{default_type_rows, SemanticKind};
    use crate::input_type::{builtin, InputTypeFormat, InputTypeRegistry};
    use crate::naming::{NameTranslator, ReservedWords};

    fn structure() -> crate::TypeDefinition {
        let registry = InputTypeRegistry::with_defaults().unwrap();
        let translator = NameTranslator::new(ReservedWords::new(["units"]));
        build_type_from_edited_rows(
            "Structure",
            "Telemetry structure",
            &default_type_rows(SemanticKind::Structure),
            &registry,
            &translator,
        )
        .unwrap()
    }

    #[test]
    fn test_description_lives_on_primary_key() {
        let def = structure();
        assert_eq!(def.description(), "Telemetry structure");
        assert_eq!(def.columns()[0].display_name, "_Key_");
    }

    #[test]
    fn test_column_counts() {
        let def = structure();
        assert_eq!(def.storage_column_count(), 10);
        assert_eq!(def.visible_column_count(), 8);
        assert_eq!(def.visible_index(0), None);
        assert_eq!(def.visible_index(2), Some(0));
        assert_eq!(def.visible_index(9), Some(7));
        assert_eq!(def.visible_index(10), None);
    }

    #[test]
    fn test_lookup_by_input_type_and_format() {
        let def = structure();
        let variable = def.column_by_input_type("variable NAME").unwrap();
        assert_eq!(variable.display_name, "Variable Name");
        assert_eq!(variable.ordinal, 2);

        let text_columns = def.columns_by_input_format(InputTypeFormat::Text);
        let names: Vec<&str> = text_columns.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["Variable Name", "Description", "Units"]);

        assert!(def.column_by_input_type(builtin::COMMAND_CODE).is_none());
    }

    #[test]
    fn test_lookup_by_names() {
        let def = structure();
        assert_eq!(def.column_by_display_name("data type").unwrap().storage_name, "data_type");
        assert_eq!(def.column_by_storage_name("units").unwrap().display_name, "Units");
        assert_eq!(def.column_by_storage_name("\"units\"").unwrap().display_name, "Units");
        assert_eq!(def.column_by_storage_name("UNITS").unwrap().storage_name, "\"units\"");
    }

    #[test]
    fn test_storage_rows_and_order() {
        let def = structure();
        let rows = def.to_storage_rows();
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().enumerate().all(|(i, r)| r.ordinal as usize == i));
        assert!(rows.iter().all(|r| r.type_name == "Structure"));
        assert_eq!(rows[1].storage_name, "_index_");
        assert_eq!(def.default_column_order(), "0:1:2:3:4:5:6:7:8:9");
    }

    #[test]
    fn test_with_descriptions_keeps_layout() {
        let def = structure();
        let updated = def.with_descriptions("New text", [("Units", "Engineering units")]);
        assert_eq!(updated.description(), "New text");
        assert_eq!(updated.column_by_display_name("Units").unwrap().description, "Engineering units");
        assert_eq!(updated.display_names(), def.display_names());
        assert!(updated.is_structure());
    }

    #[test]
    fn test_column_accepts_respects_required() {
        let def = structure();
        let variable = def.column_by_input_type(builtin::VARIABLE_NAME).unwrap();
        assert!(variable.required);
        assert!(!variable.accepts(""));
        assert!(variable.accepts("temp"));
        assert!(!variable.accepts("9temp"));

        let units = def.column_by_display_name("Units").unwrap();
        assert!(units.accepts(""));
    }

    #[test]
    fn test_renamed_keeps_columns() {
        let def = structure();
        let copy = def.renamed("Structure2");
        assert_eq!(copy.name(), "Structure2");
        assert_eq!(copy.storage_column_count(), def.storage_column_count());
        assert_eq!(copy.kinds(), def.kinds());
    }
}

//! Type Definition Builder
//!
//! Two ways in:
//!
//! - **From storage**: committed catalog rows already carry storage names.
//! - **From edits or imports**: rows carry only display names. The hidden
//!   columns are prepended, the rows become a [`PendingTypeDefinition`], and
//!   [`PendingTypeDefinition::finalize`] assigns storage names once the
//!   structure decision is known. Classification depends on which input
//!   types are present, and naming depends on classification, so the two
//!   steps cannot be merged.

use crate::classify::provisional_structure_kind;
use crate::defaults::{hidden_columns, HIDDEN_COLUMN_COUNT};
use crate::definition::{ColumnDefinition, TypeDefinition};
use crate::input_type::{InputTypeRef, InputTypeRegistry};
use crate::naming::{structural_storage_name, NameTranslator};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Errors raised while building a definition.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Table type name is empty")]
    EmptyTypeName,

    #[error("Unknown input type '{input_type}' in table type {type_name}")]
    UnknownInputType { type_name: String, input_type: String },

    #[error("Table type {type_name}: expected ordinal {expected}, found {found}")]
    NonContiguousOrdinals {
        type_name: String,
        expected: u32,
        found: u32,
    },

    #[error("Table type {0} is missing its primary key or row index column")]
    MissingHiddenColumns(String),

    #[error("Table type {type_name} has more than one column named '{display_name}'")]
    DuplicateColumnName {
        type_name: String,
        display_name: String,
    },

    #[error("Table type {type_name} has a column with an empty name at position {position}")]
    EmptyColumnName { type_name: String, position: usize },

    #[error("Table type {type_name}: column '{display_name}' maps to storage name '{storage_name}', which another column already uses")]
    DuplicateStorageName {
        type_name: String,
        display_name: String,
        storage_name: String,
    },
}

/// One committed catalog row, keyed by `(type_name, ordinal)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRow {
    pub type_name: String,
    pub ordinal: u32,
    pub storage_name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub input_type: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub struct_ok: bool,
    #[serde(default)]
    pub pointer_ok: bool,
}

/// A visible column as entered in an editor or read from an import file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedRow {
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub input_type: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub struct_ok: bool,
    #[serde(default)]
    pub pointer_ok: bool,
}

impl EditedRow {
    /// A row with no description and every flag cleared.
    pub fn new(display_name: impl Into<String>, input_type: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            input_type: input_type.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_flags(mut self, unique: bool, required: bool, struct_ok: bool, pointer_ok: bool) -> Self {
        self.unique = unique;
        self.required = required;
        self.struct_ok = struct_ok;
        self.pointer_ok = pointer_ok;
        self
    }
}

/// A column before its storage name is known.
#[derive(Debug, Clone)]
pub struct PendingColumn {
    pub ordinal: u32,
    pub display_name: String,
    pub description: String,
    pub input_type: InputTypeRef,
    pub unique: bool,
    pub required: bool,
    pub struct_ok: bool,
    pub pointer_ok: bool,
}

/// First-pass result: every column resolved except storage names.
#[derive(Debug, Clone)]
pub struct PendingTypeDefinition {
    name: String,
    columns: Vec<PendingColumn>,
}

impl PendingTypeDefinition {
    /// Resolve input types and lay out columns, hidden ones first.
    pub fn from_edited_rows(
        type_name: &str,
        description: &str,
        rows: &[EditedRow],
        registry: &InputTypeRegistry,
    ) -> Result<Self, BuildError> {
        let type_name = type_name.trim();
        if type_name.is_empty() {
            return Err(BuildError::EmptyTypeName);
        }

        let resolve = |input_type: &str| {
            registry
                .lookup_by_name(input_type)
                .ok_or_else(|| BuildError::UnknownInputType {
                    type_name: type_name.to_string(),
                    input_type: input_type.to_string(),
                })
        };

        let mut columns = Vec::with_capacity(HIDDEN_COLUMN_COUNT + rows.len());
        for (ordinal, template) in hidden_columns().into_iter().enumerate() {
            let description = if ordinal == 0 { description } else { template.description };
            columns.push(PendingColumn {
                ordinal: ordinal as u32,
                display_name: template.name.to_string(),
                description: description.to_string(),
                input_type: resolve(template.input_type)?,
                unique: template.unique,
                required: template.required,
                struct_ok: template.struct_ok,
                pointer_ok: template.pointer_ok,
            });
        }

        let mut seen: HashSet<String> = columns
            .iter()
            .map(|c| c.display_name.to_lowercase())
            .collect();
        for (position, row) in rows.iter().enumerate() {
            if row.display_name.trim().is_empty() {
                return Err(BuildError::EmptyColumnName {
                    type_name: type_name.to_string(),
                    position,
                });
            }
            if !seen.insert(row.display_name.to_lowercase()) {
                return Err(BuildError::DuplicateColumnName {
                    type_name: type_name.to_string(),
                    display_name: row.display_name.clone(),
                });
            }
            columns.push(PendingColumn {
                ordinal: columns.len() as u32,
                display_name: row.display_name.clone(),
                description: row.description.clone(),
                input_type: resolve(&row.input_type)?,
                unique: row.unique,
                required: row.required,
                struct_ok: row.struct_ok,
                pointer_ok: row.pointer_ok,
            });
        }

        Ok(Self {
            name: type_name.to_string(),
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[PendingColumn] {
        &self.columns
    }

    /// True when the columns already hold every structure-protected input type.
    pub fn provisional_structure_kind(&self) -> bool {
        provisional_structure_kind(self.columns.iter().map(|c| c.input_type.name()))
    }

    /// Second pass: assign storage names under the given structure decision.
    ///
    /// Storage names must be unique within the type, except that columns
    /// sharing a structural role in a structure collapse onto its fixed name.
    pub fn finalize(
        self,
        is_structure: bool,
        translator: &NameTranslator,
    ) -> Result<TypeDefinition, BuildError> {
        // storage name -> taken by a structural-role column
        let mut taken: HashMap<String, bool> = HashMap::new();
        let mut columns = Vec::with_capacity(self.columns.len());
        for c in self.columns {
            let storage_name =
                translator.to_storage_name(&c.display_name, &c.input_type, is_structure);
            let structural = is_structure && structural_storage_name(c.input_type.name()).is_some();
            match taken.get(&storage_name) {
                Some(&other_structural) if !(structural && other_structural) => {
                    return Err(BuildError::DuplicateStorageName {
                        type_name: self.name,
                        display_name: c.display_name,
                        storage_name,
                    });
                }
                Some(_) => {}
                None => {
                    taken.insert(storage_name.clone(), structural);
                }
            }
            columns.push(ColumnDefinition {
                ordinal: c.ordinal,
                storage_name,
                display_name: c.display_name,
                description: c.description,
                input_type: c.input_type,
                unique: c.unique,
                required: c.required,
                struct_ok: c.struct_ok,
                pointer_ok: c.pointer_ok,
            });
        }
        Ok(TypeDefinition::from_columns(self.name, columns))
    }
}

/// Build a definition from committed catalog rows for one type.
///
/// Rows may arrive in any order; they are sorted by ordinal and must then
/// be contiguous from zero and start with the two hidden columns. An
/// unknown input type here means the catalog is corrupt.
pub fn build_type_from_storage_rows(
    type_name: &str,
    rows: &[StorageRow],
    registry: &InputTypeRegistry,
) -> Result<TypeDefinition, BuildError> {
    if type_name.trim().is_empty() {
        return Err(BuildError::EmptyTypeName);
    }

    let mut ordered: Vec<&StorageRow> = rows.iter().collect();
    ordered.sort_by_key(|r| r.ordinal);

    let mut columns = Vec::with_capacity(ordered.len());
    for (expected, row) in ordered.into_iter().enumerate() {
        if row.ordinal != expected as u32 {
            return Err(BuildError::NonContiguousOrdinals {
                type_name: type_name.to_string(),
                expected: expected as u32,
                found: row.ordinal,
            });
        }
        let input_type =
            registry
                .lookup_by_name(&row.input_type)
                .ok_or_else(|| BuildError::UnknownInputType {
                    type_name: type_name.to_string(),
                    input_type: row.input_type.clone(),
                })?;
        columns.push(ColumnDefinition {
            ordinal: row.ordinal,
            storage_name: row.storage_name.clone(),
            display_name: row.display_name.clone(),
            description: row.description.clone(),
            input_type,
            unique: row.unique,
            required: row.required,
            struct_ok: row.struct_ok,
            pointer_ok: row.pointer_ok,
        });
    }

    let hidden_present = columns.len() >= HIDDEN_COLUMN_COUNT
        && hidden_columns()
            .iter()
            .zip(&columns)
            .all(|(template, column)| template.name.eq_ignore_ascii_case(&column.display_name));
    if !hidden_present {
        return Err(BuildError::MissingHiddenColumns(type_name.to_string()));
    }

    debug!(type_name, columns = columns.len(), "built table type from storage rows");
    Ok(TypeDefinition::from_columns(type_name, columns))
}

/// Build a definition from edited or imported rows: prepend the hidden
/// columns, then name columns under the provisional structure decision.
pub fn build_type_from_edited_rows(
    type_name: &str,
    description: &str,
    rows: &[EditedRow],
    registry: &InputTypeRegistry,
    translator: &NameTranslator,
) -> Result<TypeDefinition, BuildError> {
    let pending = PendingTypeDefinition::from_edited_rows(type_name, description, rows, registry)?;
    let is_structure = pending.provisional_structure_kind();
    debug!(type_name, rows = rows.len(), is_structure, "built table type from edited rows");
    pending.finalize(is_structure, translator)
}

/// Visible columns of a definition as edited rows, for rebuilding.
pub fn edited_rows_of(def: &TypeDefinition) -> Vec<EditedRow> {
    def.visible_columns()
        .iter()
        .map(|c| EditedRow {
            display_name: c.display_name.clone(),
            description: c.description.clone(),
            input_type: c.input_type.name().to_string(),
            unique: c.unique,
            required: c.required,
            struct_ok: c.struct_ok,
            pointer_ok: c.pointer_ok,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{default_type_rows, SemanticKind};
    use crate::input_type::builtin;
    use crate::naming::ReservedWords;

    fn registry() -> InputTypeRegistry {
        InputTypeRegistry::with_defaults().unwrap()
    }

    fn structure_rows() -> Vec<EditedRow> {
        default_type_rows(SemanticKind::Structure)
    }

    #[test]
    fn test_hidden_columns_with_zero_rows() {
        let def = build_type_from_edited_rows("Empty", "Nothing", &[], &registry(), &NameTranslator::default())
            .unwrap();
        assert_eq!(def.storage_column_count(), 2);
        assert_eq!(def.columns()[0].display_name, "_Key_");
        assert_eq!(def.columns()[0].storage_name, "_key_");
        assert_eq!(def.columns()[1].display_name, "_Index_");
        assert_eq!(def.columns()[1].storage_name, "_index_");
        assert_eq!(def.description(), "Nothing");
    }

    #[test]
    fn test_hidden_columns_lead_regardless_of_rows() {
        let registry = registry();
        let translator = NameTranslator::default();
        let mut rows = structure_rows();
        for count in [1, 3, rows.len()] {
            let def = build_type_from_edited_rows("T", "", &rows[..count], &registry, &translator).unwrap();
            assert_eq!(def.columns()[0].display_name, "_Key_");
            assert_eq!(def.columns()[1].display_name, "_Index_");
            assert_eq!(def.storage_column_count(), count + 2);
        }
        rows.reverse();
        let def = build_type_from_edited_rows("T", "", &rows, &registry, &translator).unwrap();
        assert_eq!(def.columns()[0].display_name, "_Key_");
        assert_eq!(def.columns()[2].display_name, "Rate");
        let ordinals: Vec<u32> = def.columns().iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_structure_naming_applies_only_to_structures() {
        let registry = registry();
        let translator = NameTranslator::default();

        let mut rows = structure_rows();
        rows[0].display_name = "Signal".to_string();
        let def = build_type_from_edited_rows("Telemetry", "", &rows, &registry, &translator).unwrap();
        assert!(def.is_structure());
        assert_eq!(def.column_by_display_name("Signal").unwrap().storage_name, "variable_name");

        // without a rate column the same rows are not a structure
        rows.retain(|r| r.input_type != builtin::RATE);
        let def = build_type_from_edited_rows("Telemetry", "", &rows, &registry, &translator).unwrap();
        assert!(!def.is_structure());
        assert_eq!(def.column_by_display_name("Signal").unwrap().storage_name, "signal");
    }

    #[test]
    fn test_two_structural_columns_share_storage_name() {
        let registry = registry();
        let mut rows = structure_rows();
        rows.push(EditedRow::new("Alias", builtin::VARIABLE_NAME));
        let def = build_type_from_edited_rows("Twin", "", &rows, &registry, &NameTranslator::default()).unwrap();
        let names: Vec<&str> = def
            .columns_by_input_type(builtin::VARIABLE_NAME)
            .iter()
            .map(|c| c.storage_name.as_str())
            .collect();
        assert_eq!(names, vec!["variable_name", "variable_name"]);
    }

    #[test]
    fn test_pending_then_finalize() {
        let registry = registry();
        let pending =
            PendingTypeDefinition::from_edited_rows("Probe", "", &structure_rows(), &registry).unwrap();
        assert!(pending.provisional_structure_kind());
        assert_eq!(pending.columns().len(), 10);

        let translator = NameTranslator::new(ReservedWords::new(["rate"]));
        let forced = pending.clone().finalize(false, &translator).unwrap();
        assert_eq!(forced.column_by_display_name("Data Type").unwrap().storage_name, "data_type");
        assert_eq!(forced.column_by_display_name("Variable Name").unwrap().storage_name, "variable_name");
        assert_eq!(forced.column_by_display_name("Rate").unwrap().storage_name, "\"rate\"");

        let mut rows = structure_rows();
        rows[0].display_name = "Sig".to_string();
        let pending = PendingTypeDefinition::from_edited_rows("Probe", "", &rows, &registry).unwrap();
        let as_generic = pending.finalize(false, &translator).unwrap();
        assert_eq!(as_generic.column_by_display_name("Sig").unwrap().storage_name, "sig");
    }

    #[test]
    fn test_unknown_input_type_in_edited_rows() {
        let rows = vec![EditedRow::new("Odd", "Quaternion")];
        let err = build_type_from_edited_rows("T", "", &rows, &registry(), &NameTranslator::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownInputType { input_type, .. } if input_type == "Quaternion"));
    }

    #[test]
    fn test_duplicate_display_names_rejected() {
        let rows = vec![
            EditedRow::new("Name", builtin::TEXT),
            EditedRow::new("NAME", builtin::INTEGER),
        ];
        let err = build_type_from_edited_rows("T", "", &rows, &registry(), &NameTranslator::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateColumnName { .. }));

        let hidden_clash = vec![EditedRow::new("_key_", builtin::TEXT)];
        assert!(build_type_from_edited_rows("T", "", &hidden_clash, &registry(), &NameTranslator::default()).is_err());
    }

    #[test]
    fn test_empty_column_name_rejected() {
        let rows = vec![
            EditedRow::new("Gain", builtin::FLOAT),
            EditedRow::new("  ", builtin::TEXT),
        ];
        let err = build_type_from_edited_rows("T", "", &rows, &registry(), &NameTranslator::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::EmptyColumnName { position: 1, .. }));
    }

    #[test]
    fn test_colliding_storage_names_rejected() {
        let rows = vec![
            EditedRow::new("Gain (dB)", builtin::FLOAT),
            EditedRow::new("gain__dB_", builtin::FLOAT),
        ];
        let err = build_type_from_edited_rows("T", "", &rows, &registry(), &NameTranslator::default())
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::DuplicateStorageName { display_name, storage_name, .. }
                if display_name == "gain__dB_" && storage_name == "gain__db_"
        ));

        let rows = vec![EditedRow::new("A B", builtin::TEXT), EditedRow::new("A_B", builtin::TEXT)];
        assert!(build_type_from_edited_rows("T", "", &rows, &registry(), &NameTranslator::default()).is_err());

        // a plain column may not take a structural role's fixed name
        let mut rows = structure_rows();
        rows.push(EditedRow::new("Data-Type", builtin::TEXT));
        let err = build_type_from_edited_rows("S", "", &rows, &registry(), &NameTranslator::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateStorageName { storage_name, .. } if storage_name == "data_type"));
    }

    #[test]
    fn test_empty_type_name_rejected() {
        let err = build_type_from_edited_rows("  ", "", &[], &registry(), &NameTranslator::default()).unwrap_err();
        assert!(matches!(err, BuildError::EmptyTypeName));
    }

    #[test]
    fn test_storage_round_trip_preserves_definition() {
        let registry = registry();
        let translator = NameTranslator::default();
        let def = build_type_from_edited_rows("Structure", "Telemetry", &structure_rows(), &registry, &translator)
            .unwrap();

        let mut rows = def.to_storage_rows();
        rows.reverse();
        let rebuilt = build_type_from_storage_rows("Structure", &rows, &registry).unwrap();
        assert_eq!(rebuilt.to_storage_rows(), def.to_storage_rows());
        assert!(rebuilt.is_structure());
        assert_eq!(rebuilt.description(), "Telemetry");
    }

    #[test]
    fn test_storage_rows_with_gap_rejected() {
        let registry = registry();
        let def = build_type_from_edited_rows("T", "", &structure_rows(), &registry, &NameTranslator::default())
            .unwrap();
        let mut rows = def.to_storage_rows();
        rows.remove(4);
        let err = build_type_from_storage_rows("T", &rows, &registry).unwrap_err();
        assert!(matches!(
            err,
            BuildError::NonContiguousOrdinals { expected: 4, found: 5, .. }
        ));
    }

    #[test]
    fn test_storage_rows_without_hidden_columns_rejected() {
        let registry = registry();
        let rows = vec![StorageRow {
            type_name: "T".to_string(),
            ordinal: 0,
            storage_name: "name".to_string(),
            display_name: "Name".to_string(),
            description: String::new(),
            input_type: builtin::TEXT.to_string(),
            unique: false,
            required: false,
            struct_ok: false,
            pointer_ok: false,
        }];
        let err = build_type_from_storage_rows("T", &rows, &registry).unwrap_err();
        assert!(matches!(err, BuildError::MissingHiddenColumns(_)));
    }

    #[test]
    fn test_storage_rows_with_unknown_input_type() {
        let registry = registry();
        let def = build_type_from_edited_rows("T", "", &[], &registry, &NameTranslator::default()).unwrap();
        let mut rows = def.to_storage_rows();
        rows[1].input_type = "Retired type".to_string();
        let err = build_type_from_storage_rows("T", &rows, &registry).unwrap_err();
        assert!(err.to_string().contains("Retired type"));
    }

    #[test]
    fn test_edited_rows_of_round_trip() {
        let registry = registry();
        let translator = NameTranslator::default();
        let rows = structure_rows();
        let def = build_type_from_edited_rows("S", "", &rows, &registry, &translator).unwrap();
        assert_eq!(edited_rows_of(&def), rows);
    }
}

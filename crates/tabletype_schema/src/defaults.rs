//! Default Schema Catalog
//!
//! Compiled-in column templates for the two intrinsic table types plus the
//! two hidden columns every type carries. Protected entries form the
//! classification template: a type represents a kind when it holds a column
//! of every protected input type owned by that kind.

use crate::builder::EditedRow;
use crate::input_type::{builtin, InputTypeRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the intrinsic structure type.
pub const STRUCTURE_TYPE: &str = "Structure";

/// Name of the intrinsic command type.
pub const COMMAND_TYPE: &str = "Command";

/// Ordinal of the primary key column.
pub const PRIMARY_KEY_ORDINAL: u32 = 0;

/// Ordinal of the row index column.
pub const ROW_INDEX_ORDINAL: u32 = 1;

/// Number of hidden columns at the head of every type.
pub const HIDDEN_COLUMN_COUNT: usize = 2;

/// Which kind of table type a catalog entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwningKind {
    /// Present in every table type.
    Common,
    Structure,
    Command,
}

/// Classification tags a type definition can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticKind {
    Structure,
    Command,
}

impl SemanticKind {
    pub fn owning_kind(&self) -> OwningKind {
        match self {
            SemanticKind::Structure => OwningKind::Structure,
            SemanticKind::Command => OwningKind::Command,
        }
    }
}

impl fmt::Display for SemanticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticKind::Structure => write!(f, "structure"),
            SemanticKind::Command => write!(f, "command"),
        }
    }
}

/// One compiled-in column template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultColumn {
    pub owning_kind: OwningKind,
    pub name: &'static str,
    pub description: &'static str,
    pub input_type: &'static str,
    /// Required for the owning kind's classification; cannot be removed
    /// from the intrinsic type.
    pub protected: bool,
    pub unique: bool,
    pub required: bool,
    pub struct_ok: bool,
    pub pointer_ok: bool,
    /// Only one column of this input type may appear in a type.
    pub input_type_unique: bool,
}

const fn column(
    owning_kind: OwningKind,
    name: &'static str,
    description: &'static str,
    input_type: &'static str,
    flags: [bool; 6],
) -> DefaultColumn {
    DefaultColumn {
        owning_kind,
        name,
        description,
        input_type,
        protected: flags[0],
        unique: flags[1],
        required: flags[2],
        struct_ok: flags[3],
        pointer_ok: flags[4],
        input_type_unique: flags[5],
    }
}

use OwningKind::{Command as Cmd, Common, Structure as Struct};

const T: bool = true;
const F: bool = false;

/// The catalog. Flag order: protected, unique, required, struct_ok,
/// pointer_ok, input_type_unique.
pub const DEFAULT_COLUMNS: &[DefaultColumn] = &[
    column(Common, "_Key_", "Primary key", builtin::INT_POSITIVE, [T, T, T, F, F, F]),
    column(Common, "_Index_", "Row index", builtin::INT_POSITIVE, [T, T, T, F, F, F]),
    column(Struct, "Variable Name", "Parameter name", builtin::VARIABLE_NAME, [T, T, T, T, T, T]),
    column(Struct, "Description", "Parameter description", builtin::TEXT, [F, F, F, T, T, F]),
    column(Struct, "Units", "Parameter units", builtin::TEXT, [F, F, F, T, T, F]),
    column(Struct, "Data Type", "Parameter data type", builtin::PRIM_AND_STRUCT, [T, F, T, T, T, T]),
    column(Struct, "Array Size", "Parameter array size", builtin::ARRAY_INDEX, [T, F, F, T, T, T]),
    column(Struct, "Bit Length", "Parameter number of bits (bit values only)", builtin::BIT_LENGTH, [T, F, F, F, F, T]),
    column(Struct, "Enumeration", "Enumerated parameters", builtin::ENUMERATION, [T, F, F, F, F, F]),
    column(Struct, "Rate", "Downlink data rate, samples/second", builtin::RATE, [T, F, F, F, T, F]),
    column(Cmd, "Command Name", "Command name", builtin::COMMAND_NAME, [T, T, T, F, T, T]),
    column(Cmd, "Command Code", "Command code", builtin::COMMAND_CODE, [T, T, T, F, T, T]),
    column(Cmd, "Description", "Command description", builtin::TEXT, [F, F, F, F, T, F]),
    column(Cmd, "Arg 1 Name", "Command argument 1 name", builtin::ARGUMENT_NAME, [T, F, F, F, T, F]),
    column(Cmd, "Arg 1 Description", "Command argument 1 description", builtin::TEXT, [F, F, F, F, T, F]),
    column(Cmd, "Arg 1 Units", "Command argument 1 units", builtin::TEXT, [F, F, F, F, T, F]),
    column(Cmd, "Arg 1 Data Type", "Command argument 1 data type", builtin::PRIMITIVE, [T, F, F, F, T, F]),
    column(Cmd, "Arg 1 Enumeration", "Command argument 1 enumeration", builtin::ENUMERATION, [T, F, F, F, F, F]),
    column(Cmd, "Arg 1 Minimum", "Command argument 1 minimum value", builtin::MINIMUM, [T, F, F, F, F, F]),
    column(Cmd, "Arg 1 Maximum", "Command argument 1 maximum value", builtin::MAXIMUM, [T, F, F, F, F, F]),
];

/// The primary key and row index templates, in ordinal order.
pub fn hidden_columns() -> [&'static DefaultColumn; HIDDEN_COLUMN_COUNT] {
    [&DEFAULT_COLUMNS[0], &DEFAULT_COLUMNS[1]]
}

/// Catalog entries owned by `kind`, in catalog order.
pub fn default_columns_for(kind: OwningKind) -> impl Iterator<Item = &'static DefaultColumn> {
    DEFAULT_COLUMNS.iter().filter(move |c| c.owning_kind == kind)
}

/// Input types a definition must hold to represent `kind`.
pub fn protected_input_types(kind: SemanticKind) -> impl Iterator<Item = &'static str> {
    default_columns_for(kind.owning_kind())
        .filter(|c| c.protected)
        .map(|c| c.input_type)
}

/// Number of protected columns a kind's template carries.
pub fn protected_column_count(kind: SemanticKind) -> usize {
    protected_input_types(kind).count()
}

/// True when only one column of `input_type` may appear in a type of `kind`.
pub fn is_input_type_unique(kind: SemanticKind, input_type: &str) -> bool {
    default_columns_for(kind.owning_kind())
        .any(|c| c.input_type_unique && c.input_type.eq_ignore_ascii_case(input_type))
}

/// Refuse to start when the catalog names an input type the registry lacks.
pub fn verify_catalog(registry: &InputTypeRegistry) -> Result<(), RegistryError> {
    for entry in DEFAULT_COLUMNS {
        registry.require(entry.input_type)?;
    }
    Ok(())
}

/// Visible rows for a fresh intrinsic type of `kind`, ready for the builder.
pub fn default_type_rows(kind: SemanticKind) -> Vec<EditedRow> {
    default_columns_for(kind.owning_kind())
        .map(|c| EditedRow {
            display_name: c.name.to_string(),
            description: c.description.to_string(),
            input_type: c.input_type.to_string(),
            unique: c.unique,
            required: c.required,
            struct_ok: c.struct_ok,
            pointer_ok: c.pointer_ok,
        })
        .collect()
}

/// Description stored on a fresh intrinsic type.
pub fn default_type_description(kind: SemanticKind) -> &'static str {
    match kind {
        SemanticKind::Structure => "Structure table type",
        SemanticKind::Command => "Command table type",
    }
}

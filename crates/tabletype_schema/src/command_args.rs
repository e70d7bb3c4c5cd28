//! Command argument column groups.
//!
//! A command type describes its arguments with runs of columns, each run
//! opened by an `Argument name` column. Columns up to the next argument
//! name are assigned to that argument by input type.

use crate::builder::{edited_rows_of, BuildError, EditedRow};
use crate::definition::TypeDefinition;
use crate::input_type::builtin;
use crate::registry::TypeRegistry;
use serde::{Deserialize, Serialize};

/// Ordinals of the columns describing one command argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentColumns {
    pub name: u32,
    pub data_type: Option<u32>,
    pub array_size: Option<u32>,
    pub bit_length: Option<u32>,
    pub enumeration: Option<u32>,
    pub minimum: Option<u32>,
    pub maximum: Option<u32>,
    pub description: Option<u32>,
    pub units: Option<u32>,
    /// Columns of no recognized role.
    pub other: Vec<u32>,
}

impl ArgumentColumns {
    fn opened_by(name: u32) -> Self {
        Self {
            name,
            data_type: None,
            array_size: None,
            bit_length: None,
            enumeration: None,
            minimum: None,
            maximum: None,
            description: None,
            units: None,
            other: Vec::new(),
        }
    }
}

/// Display name suffix, description suffix, input type.
const ARGUMENT_COLUMNS: [(&str, &str, &str); 9] = [
    ("Name", "name", builtin::ARGUMENT_NAME),
    ("Description", "description", builtin::DESCRIPTION),
    ("Units", "units", builtin::UNITS),
    ("Data Type", "data type", builtin::PRIMITIVE),
    ("Array Size", "array size", builtin::ARRAY_INDEX),
    ("Bit Length", "bit length", builtin::BIT_LENGTH),
    ("Enumeration", "enumeration", builtin::ENUMERATION),
    ("Minimum", "minimum value", builtin::MINIMUM),
    ("Maximum", "maximum value", builtin::MAXIMUM),
];

/// Group a type's columns by command argument, in column order.
pub fn associated_command_argument_columns(def: &TypeDefinition) -> Vec<ArgumentColumns> {
    let mut groups = Vec::new();
    let mut current: Option<ArgumentColumns> = None;

    for column in def.columns() {
        if column.has_input_type(builtin::ARGUMENT_NAME) {
            if let Some(done) = current.take() {
                groups.push(done);
            }
            current = Some(ArgumentColumns::opened_by(column.ordinal));
            continue;
        }

        let Some(group) = current.as_mut() else {
            continue;
        };
        if column.has_input_type(builtin::COMMAND_NAME) || column.has_input_type(builtin::COMMAND_CODE) {
            continue;
        }

        let ordinal = Some(column.ordinal);
        match column.input_type_name() {
            t if t.eq_ignore_ascii_case(builtin::PRIMITIVE)
                || t.eq_ignore_ascii_case(builtin::PRIM_AND_STRUCT) =>
            {
                group.data_type = ordinal
            }
            t if t.eq_ignore_ascii_case(builtin::ARRAY_INDEX) => group.array_size = ordinal,
            t if t.eq_ignore_ascii_case(builtin::BIT_LENGTH) => group.bit_length = ordinal,
            t if t.eq_ignore_ascii_case(builtin::ENUMERATION) => group.enumeration = ordinal,
            t if t.eq_ignore_ascii_case(builtin::MINIMUM) => group.minimum = ordinal,
            t if t.eq_ignore_ascii_case(builtin::MAXIMUM) => group.maximum = ordinal,
            t if t.eq_ignore_ascii_case(builtin::DESCRIPTION) => group.description = ordinal,
            t if t.eq_ignore_ascii_case(builtin::UNITS) => group.units = ordinal,
            _ => group.other.push(column.ordinal),
        }
    }

    groups.extend(current);
    groups
}

/// `def` with a full set of `Arg <index> ...` columns appended.
pub fn with_command_argument_columns(
    def: &TypeDefinition,
    index: usize,
    registry: &TypeRegistry,
) -> Result<TypeDefinition, BuildError> {
    let mut rows = edited_rows_of(def);
    rows.extend(ARGUMENT_COLUMNS.iter().map(|(suffix, what, input_type)| {
        EditedRow::new(format!("Arg {} {}", index, suffix), *input_type)
            .with_description(format!("Command argument {} {}", index, what))
            .with_flags(false, false, false, true)
    }));
    registry.build_from_edited_rows(def.name(), def.description(), &rows)
}

/// One past the number of argument groups `def` already has.
pub fn next_argument_index(def: &TypeDefinition) -> usize {
    associated_command_argument_columns(def).len() + 1
}

//! Classification of column sets against the protected-column templates.
//!
//! Only input types take part: display and storage names are free for
//! users to change, so they never decide what a type represents.

use crate::defaults::{protected_input_types, SemanticKind};
use crate::definition::{ColumnDefinition, TypeDefinition};
use std::collections::HashSet;
use tracing::debug;

const KINDS: [SemanticKind; 2] = [SemanticKind::Structure, SemanticKind::Command];

/// True when `input_types` holds every protected input type of `kind`.
pub fn satisfies_template<'a, I>(input_types: I, kind: SemanticKind) -> bool
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    protected_input_types(kind).all(|required| {
        input_types
            .clone()
            .into_iter()
            .any(|present| present.eq_ignore_ascii_case(required))
    })
}

/// Every kind whose template the columns satisfy.
pub fn classify_columns(columns: &[ColumnDefinition]) -> HashSet<SemanticKind> {
    let input_types: Vec<&str> = columns.iter().map(|c| c.input_type.name()).collect();
    let kinds: HashSet<SemanticKind> = KINDS
        .into_iter()
        .filter(|&kind| satisfies_template(input_types.iter().copied(), kind))
        .collect();
    debug!(columns = columns.len(), ?kinds, "classified column set");
    kinds
}

/// Cached classification of a definition.
pub fn classify(def: &TypeDefinition) -> &HashSet<SemanticKind> {
    def.kinds()
}

pub fn represents(def: &TypeDefinition, kind: SemanticKind) -> bool {
    def.kinds().contains(&kind)
}

pub fn is_structure(def: &TypeDefinition) -> bool {
    represents(def, SemanticKind::Structure)
}

/// Command template matched and not a structure; structures win.
pub fn is_command(def: &TypeDefinition) -> bool {
    represents(def, SemanticKind::Command) && !is_structure(def)
}

/// Structure test over input type names, before storage names exist.
pub fn provisional_structure_kind<'a, I>(input_types: I) -> bool
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    satisfies_template(input_types, SemanticKind::Structure)
}

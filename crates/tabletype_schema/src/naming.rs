//! Display name to storage name translation.
//!
//! Storage names are lowercase `[a-z0-9_]` identifiers. In a structure type
//! the four structural roles always map to fixed names, whatever the user
//! calls the column, so every structure table shares them. Identifiers that
//! collide with a storage-engine reserved word are double-quoted.

use crate::input_type::{builtin, InputType};
use std::collections::HashSet;

/// Fixed storage names for the structural roles.
pub const VARIABLE_NAME_COLUMN: &str = "variable_name";
pub const ARRAY_SIZE_COLUMN: &str = "array_size";
pub const BIT_LENGTH_COLUMN: &str = "bit_length";
pub const DATA_TYPE_COLUMN: &str = "data_type";

/// Fallback reserved words used when no storage connection supplies a set.
const DEFAULT_RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
    "case", "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false",
    "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "initially",
    "intersect", "into", "lateral", "leading", "limit", "localtime", "localtimestamp", "not",
    "null", "offset", "on", "only", "or", "order", "placing", "primary", "references",
    "returning", "select", "session_user", "some", "symmetric", "table", "then", "to",
    "trailing", "true", "union", "unique", "user", "using", "variadic", "when", "where",
    "window", "with",
];

/// Reserved words reported by the storage layer, matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedWords {
    words: HashSet<String>,
}

impl ReservedWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// A common SQL reserved word set.
    pub fn sql_defaults() -> Self {
        Self::new(DEFAULT_RESERVED_WORDS.iter().copied())
    }

    /// Add words to the set.
    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.words.extend(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Fixed storage name for a structural role, if `input_type_name` is one.
pub fn structural_storage_name(input_type_name: &str) -> Option<&'static str> {
    [
        (builtin::VARIABLE_NAME, VARIABLE_NAME_COLUMN),
        (builtin::ARRAY_INDEX, ARRAY_SIZE_COLUMN),
        (builtin::BIT_LENGTH, BIT_LENGTH_COLUMN),
        (builtin::PRIM_AND_STRUCT, DATA_TYPE_COLUMN),
    ]
    .into_iter()
    .find(|(role, _)| role.eq_ignore_ascii_case(input_type_name))
    .map(|(_, storage)| storage)
}

/// Lowercase `name` and replace everything outside `[a-z0-9_]` with `_`.
pub fn slug_storage_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Remove one pair of surrounding double quotes, if present.
pub fn strip_quotes(name: &str) -> &str {
    name.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(name)
}

/// Converts user-facing column names into storage identifiers.
#[derive(Debug, Clone, Default)]
pub struct NameTranslator {
    reserved: ReservedWords,
}

impl NameTranslator {
    pub fn new(reserved: ReservedWords) -> Self {
        Self { reserved }
    }

    pub fn reserved_words(&self) -> &ReservedWords {
        &self.reserved
    }

    /// Storage name for a column. Pure given the reserved word set.
    pub fn to_storage_name(
        &self,
        display_name: &str,
        input_type: &InputType,
        is_structure_kind: bool,
    ) -> String {
        let base = match structural_storage_name(input_type.name()) {
            Some(fixed) if is_structure_kind => fixed.to_string(),
            _ => slug_storage_name(display_name),
        };
        self.quote_if_reserved(&base)
    }

    /// Wrap `name` in double quotes iff it is a reserved word. Existing
    /// quotes are stripped first, so repeated application is stable.
    pub fn quote_if_reserved(&self, name: &str) -> String {
        let bare = strip_quotes(name);
        if self.reserved.contains(bare) {
            format!("\"{}\"", bare)
        } else {
            bare.to_string()
        }
    }
}

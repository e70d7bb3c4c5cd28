//! Input Type Registry
//!
//! An input type is a named validator for the text a user may enter in a
//! column: a whole-string pattern, a format tag used to group related types
//! (every MINIMUM-like column, every hexadecimal column, ...), and a
//! normalizer that re-renders accepted values into canonical text.
//!
//! The registry is built once at startup, shared through `Arc`, and never
//! mutated afterwards. Lookups are case-insensitive.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Names of the built-in input types.
pub mod builtin {
    pub const ALPHANUMERIC: &str = "Alphanumeric";
    pub const ALPHANUMERIC_MULTI: &str = "Alphanumeric (multi)";
    pub const ARGUMENT_NAME: &str = "Argument name";
    pub const ARRAY_INDEX: &str = "Array index";
    pub const BIT_LENGTH: &str = "Bit length";
    pub const BOOLEAN: &str = "Boolean";
    pub const COMMAND_NAME: &str = "Command name";
    pub const COMMAND_CODE: &str = "Command code";
    pub const DESCRIPTION: &str = "Description";
    pub const ENUMERATION: &str = "Enumeration";
    pub const INTEGER: &str = "Integer";
    pub const INT_POSITIVE: &str = "Positive integer";
    pub const INT_GREATER_THAN_ONE: &str = "Integer > 1";
    pub const INT_NON_NEGATIVE: &str = "Non-negative integer";
    pub const INT_NEGATIVE: &str = "Negative integer";
    pub const FLOAT: &str = "Floating point";
    pub const FLOAT_POSITIVE: &str = "Positive float";
    pub const FLOAT_NON_NEGATIVE: &str = "Non-negative float";
    pub const FLOAT_NEGATIVE: &str = "Negative float";
    pub const HEXADECIMAL: &str = "Hexadecimal";
    pub const MINIMUM: &str = "Minimum";
    pub const MAXIMUM: &str = "Maximum";
    pub const PRIMITIVE: &str = "Primitive";
    pub const PRIM_AND_STRUCT: &str = "Primitive & Structure";
    pub const RATE: &str = "Rate";
    pub const TEXT: &str = "Text";
    pub const UNITS: &str = "Units";
    pub const VARIABLE_NAME: &str = "Variable name";
    pub const BREAK: &str = "Break";
    pub const SEPARATOR: &str = "Separator";
}

const ALNUM_RE: &str = r"[a-zA-Z_][a-zA-Z0-9_]*";
const BOOL_RE: &str = r"(?i:true|false)|0|1";
const INT_RE: &str = r"[+-]?\s*\d*";
const FLOAT_RE: &str = r"[+-]?\s*0*(?:\.0*)?\d+\d*(?:\.\d*)?";
const HEX_RE: &str = r"(?:0x|0X)?[a-fA-F0-9]*";
const ANY_RE: &str = ".*";

/// Errors raised while building or querying the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate input type: {0}")]
    DuplicateInputType(String),

    #[error("Unknown input type: {0}")]
    UnknownInputType(String),

    #[error("Invalid pattern for input type {name}: {reason}")]
    InvalidPattern { name: String, reason: String },
}

/// Format tag shared by input types that hold the same kind of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTypeFormat {
    Text,
    Integer,
    Float,
    Hexadecimal,
    Boolean,
    Array,
    DataType,
    Enumeration,
    Minimum,
    Maximum,
    Rate,
    PageFormat,
}

impl InputTypeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputTypeFormat::Text => "text",
            InputTypeFormat::Integer => "integer",
            InputTypeFormat::Float => "float",
            InputTypeFormat::Hexadecimal => "hexadecimal",
            InputTypeFormat::Boolean => "boolean",
            InputTypeFormat::Array => "array",
            InputTypeFormat::DataType => "data_type",
            InputTypeFormat::Enumeration => "enumeration",
            InputTypeFormat::Minimum => "minimum",
            InputTypeFormat::Maximum => "maximum",
            InputTypeFormat::Rate => "rate",
            InputTypeFormat::PageFormat => "page_format",
        }
    }

    /// Normalizer applied to values of this format.
    pub fn default_normalizer(&self) -> Normalizer {
        match self {
            InputTypeFormat::Integer => normalize_integer,
            InputTypeFormat::Float => normalize_float,
            InputTypeFormat::Hexadecimal => normalize_hexadecimal,
            InputTypeFormat::Boolean => normalize_boolean,
            InputTypeFormat::Array => normalize_array,
            _ => normalize_unchanged,
        }
    }
}

impl fmt::Display for InputTypeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Re-renders an accepted value into canonical text.
pub type Normalizer = fn(&str) -> String;

/// Shared handle to a registered input type.
pub type InputTypeRef = Arc<InputType>;

/// A named validator/normalizer for column values.
#[derive(Debug)]
pub struct InputType {
    name: String,
    description: String,
    pattern_source: String,
    pattern: Regex,
    format: InputTypeFormat,
    normalizer: Normalizer,
    /// Selection items for user-defined selection types.
    items: Option<Vec<String>>,
}

impl InputType {
    fn compile(
        name: &str,
        description: &str,
        pattern: &str,
        format: InputTypeFormat,
        normalizer: Normalizer,
    ) -> Result<Self, RegistryError> {
        let anchored = format!("^(?:{})$", pattern);
        let compiled = Regex::new(&anchored).map_err(|e| RegistryError::InvalidPattern {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            pattern_source: pattern.to_string(),
            pattern: compiled,
            format,
            normalizer,
            items: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The unanchored pattern as registered.
    pub fn pattern(&self) -> &str {
        &self.pattern_source
    }

    pub fn format(&self) -> InputTypeFormat {
        self.format
    }

    pub fn items(&self) -> Option<&[String]> {
        self.items.as_deref()
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_format_compatible(&self, other: &InputType) -> bool {
        self.format == other.format
    }

    /// Whole-string match. The empty string always passes; whether a value
    /// may be empty is governed by the column's required flag.
    pub fn is_valid(&self, raw: &str) -> bool {
        raw.is_empty() || self.pattern.is_match(raw)
    }

    pub fn normalize(&self, raw: &str) -> String {
        (self.normalizer)(raw)
    }
}

impl PartialEq for InputType {
    fn eq(&self, other: &Self) -> bool {
        self.is_named(&other.name)
    }
}

impl Eq for InputType {}

/// Catalog of input types keyed case-insensitively by name.
#[derive(Debug, Default)]
pub struct InputTypeRegistry {
    types: Vec<InputTypeRef>,
    by_name: HashMap<String, usize>,
}

impl InputTypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in input type.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (name, pattern, format, description) in builtin_input_types() {
            registry.register(name, description, &pattern, format, format.default_normalizer())?;
        }
        Ok(registry)
    }

    /// Register an input type. Fails when the name collides case-insensitively
    /// or the pattern does not compile.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        pattern: &str,
        format: InputTypeFormat,
        normalizer: Normalizer,
    ) -> Result<InputTypeRef, RegistryError> {
        let key = name.to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(RegistryError::DuplicateInputType(name.to_string()));
        }

        let input_type = Arc::new(InputType::compile(name, description, pattern, format, normalizer)?);
        self.by_name.insert(key, self.types.len());
        self.types.push(Arc::clone(&input_type));
        Ok(input_type)
    }

    /// Register a user-defined selection type whose only valid values are `items`.
    pub fn register_selection(
        &mut self,
        name: &str,
        description: &str,
        items: &[String],
    ) -> Result<InputTypeRef, RegistryError> {
        let pattern = items
            .iter()
            .map(|item| regex::escape(item))
            .collect::<Vec<_>>()
            .join("|");

        let key = name.to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(RegistryError::DuplicateInputType(name.to_string()));
        }

        let mut input_type = InputType::compile(
            name,
            description,
            &pattern,
            InputTypeFormat::Text,
            normalize_unchanged,
        )?;
        input_type.items = Some(items.to_vec());

        let input_type = Arc::new(input_type);
        self.by_name.insert(key, self.types.len());
        self.types.push(Arc::clone(&input_type));
        Ok(input_type)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<InputTypeRef> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&index| Arc::clone(&self.types[index]))
    }

    /// Like [`lookup_by_name`](Self::lookup_by_name), but an absent name is an error.
    pub fn require(&self, name: &str) -> Result<InputTypeRef, RegistryError> {
        self.lookup_by_name(name)
            .ok_or_else(|| RegistryError::UnknownInputType(name.to_string()))
    }

    pub fn validate(&self, input_type: &InputType, raw: &str) -> bool {
        input_type.is_valid(raw)
    }

    pub fn normalize(&self, input_type: &InputType, raw: &str) -> String {
        input_type.normalize(raw)
    }

    /// Sorted type names, page-format types excluded. Data type and
    /// enumeration types are only listed when `include_special` is set.
    pub fn names(&self, include_special: bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .types
            .iter()
            .filter(|t| t.format != InputTypeFormat::PageFormat)
            .filter(|t| {
                include_special
                    || !matches!(
                        t.format,
                        InputTypeFormat::DataType | InputTypeFormat::Enumeration
                    )
            })
            .map(|t| t.name.clone())
            .collect();
        names.sort_by_key(|name| name.to_lowercase());
        names
    }

    pub fn by_format(&self, format: InputTypeFormat) -> Vec<InputTypeRef> {
        self.types
            .iter()
            .filter(|t| t.format == format)
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputTypeRef> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn builtin_input_types() -> Vec<(&'static str, String, InputTypeFormat, &'static str)> {
    use builtin::*;
    use InputTypeFormat as F;

    let number_or_flag = format!("(?:{})|(?:{})|(?:{})|(?:{})", BOOL_RE, INT_RE, FLOAT_RE, HEX_RE);

    vec![
        (ALPHANUMERIC, ALNUM_RE.into(), F::Text, "Alphabetic, numeric, and underscore characters; first character is not numeric"),
        (ALPHANUMERIC_MULTI, format!(r"(?:{}\s*)+", ALNUM_RE), F::Text, "One or more alphanumeric values separated by whitespace"),
        (ARGUMENT_NAME, ALNUM_RE.into(), F::Text, "Command argument name"),
        (ARRAY_INDEX, r"\s*\+?\s*0*(?:[2-9]|[1-9]\d+)(?:\s*,\s*\+?\s*0*(?:[2-9]|[1-9]\d+))*".into(), F::Array, "Array size; one or more integers > 1 separated by commas"),
        (BIT_LENGTH, r"\+?\s*0*[1-9]\d*".into(), F::Integer, "Bit length; integer > 0"),
        (BOOLEAN, BOOL_RE.into(), F::Boolean, "Boolean value; true, false, 0, or 1"),
        (COMMAND_NAME, ALNUM_RE.into(), F::Text, "Command name"),
        (COMMAND_CODE, HEX_RE.into(), F::Hexadecimal, "Command code; hexadecimal value"),
        (DESCRIPTION, ANY_RE.into(), F::Text, "Description text"),
        (ENUMERATION, ANY_RE.into(), F::Enumeration, "Enumeration; value | name pairs separated by commas"),
        (INTEGER, INT_RE.into(), F::Integer, "Integer value"),
        (INT_POSITIVE, r"\+?\s*0*[1-9]\d*".into(), F::Integer, "Integer value > 0"),
        (INT_GREATER_THAN_ONE, r"\+?\s*0*(?:[2-9]|[1-9]\d+)".into(), F::Integer, "Integer value > 1"),
        (INT_NON_NEGATIVE, r"\+?\s*\d+".into(), F::Integer, "Integer value >= 0"),
        (INT_NEGATIVE, r"-\s*0*\d+".into(), F::Integer, "Integer value < 0"),
        (FLOAT, FLOAT_RE.into(), F::Float, "Floating point value"),
        (FLOAT_POSITIVE, r"\+?\s*0*\.?0*[1-9]+\d*(?:\.\d*)?".into(), F::Float, "Floating point value > 0.0"),
        (FLOAT_NON_NEGATIVE, r"\+?\s*0*(?:\.0*)?\d+\d*(?:\.\d*)?".into(), F::Float, "Floating point value >= 0.0"),
        (FLOAT_NEGATIVE, r"-\s*0*(?:\.0*)?\d+\d*(?:\.\d*)?".into(), F::Float, "Floating point value < 0.0"),
        (HEXADECIMAL, HEX_RE.into(), F::Hexadecimal, "Hexadecimal value; optional 0x prefix"),
        (MINIMUM, number_or_flag.clone(), F::Minimum, "Minimum value; boolean, integer, float, or hexadecimal"),
        (MAXIMUM, number_or_flag, F::Maximum, "Maximum value; boolean, integer, float, or hexadecimal"),
        (PRIMITIVE, ANY_RE.into(), F::DataType, "Primitive data type"),
        (PRIM_AND_STRUCT, ANY_RE.into(), F::DataType, "Primitive data type or structure table name"),
        (RATE, r"\+?\s*(?:0*1/)?(?:\d*|\d*\.|\d*\.\d+)".into(), F::Rate, "Data rate; samples per second, or 1/n"),
        (TEXT, ANY_RE.into(), F::Text, "Text, including alphabetic, numeric, and special characters"),
        (UNITS, ANY_RE.into(), F::Text, "Units text"),
        (VARIABLE_NAME, ALNUM_RE.into(), F::Text, "Variable name"),
        (BREAK, String::new(), F::PageFormat, "Line break"),
        (SEPARATOR, String::new(), F::PageFormat, "Line separator"),
    ]
}

/// Identity normalizer.
pub fn normalize_unchanged(raw: &str) -> String {
    raw.to_string()
}

fn compact_number(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.strip_prefix('+') {
        Some(rest) => rest.to_string(),
        None => compact,
    }
}

/// Parse-then-format; `"+ 007"` becomes `"7"`.
pub fn normalize_integer(raw: &str) -> String {
    match compact_number(raw).parse::<i64>() {
        Ok(value) => value.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Parse-then-format; integral values keep one fractional digit (`"3"` becomes `"3.0"`).
pub fn normalize_float(raw: &str) -> String {
    match compact_number(raw).parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{:.1}", value)
            } else {
                value.to_string()
            }
        }
        _ => raw.to_string(),
    }
}

/// Lowercase `0x`-prefixed hex. Leading zeros typed by the user are kept as
/// padding; a zero value absorbs one of them.
pub fn normalize_hexadecimal(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return raw.to_string();
    }

    let value = match u64::from_str_radix(digits, 16) {
        Ok(value) => value,
        Err(_) => return raw.to_string(),
    };

    let mut padding = digits.chars().take_while(|&c| c == '0').count();
    if value == 0 {
        padding -= 1;
    }
    format!("0x{}{:x}", "0".repeat(padding), value)
}

pub fn normalize_boolean(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// `"2 ,3"` becomes `"2, 3"`.
pub fn normalize_array(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact.replace(',', ", ")
}

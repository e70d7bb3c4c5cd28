//! Data fields: named metadata attached to a table type or a table.
//!
//! Type-level fields are owned by `"Type:" + type_name` and are inherited
//! by every table of that type. The core compares and forwards fields; it
//! does not interpret their values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabletype_ids::TableId;

/// Owner prefix for fields that belong to a table type.
pub const TYPE_FIELD_PREFIX: &str = "Type:";

/// Default display size of a field, in characters.
pub const DEFAULT_FIELD_SIZE: u32 = 10;

/// Owner name for a type's fields.
pub fn type_field_owner(type_name: &str) -> String {
    format!("{}{}", TYPE_FIELD_PREFIX, type_name)
}

/// Type name if `owner` is a type owner.
pub fn owner_type_name(owner: &str) -> Option<&str> {
    owner.strip_prefix(TYPE_FIELD_PREFIX)
}

/// Which tables of a type a field applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    #[default]
    AllTables,
    RootsOnly,
    ChildrenOnly,
}

impl Applicability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Applicability::AllTables => "All tables",
            Applicability::RootsOnly => "Roots only",
            Applicability::ChildrenOnly => "Children only",
        }
    }

    pub fn applies_to(&self, table: &TableId) -> bool {
        match self {
            Applicability::AllTables => true,
            Applicability::RootsOnly => table.is_root(),
            Applicability::ChildrenOnly => !table.is_root(),
        }
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Applicability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "all tables" | "all" => Ok(Applicability::AllTables),
            "roots only" | "roots" => Ok(Applicability::RootsOnly),
            "children only" | "children" => Ok(Applicability::ChildrenOnly),
            other => Err(format!("Unknown applicability: {}", other)),
        }
    }
}

/// One data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// `"Type:<name>"` for type fields, else the table name.
    #[serde(default)]
    pub owner_name: String,
    pub field_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_field_size")]
    pub size: u32,
    pub input_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub applicability: Applicability,
    #[serde(default)]
    pub value: String,
    /// Copied from the owning type rather than defined on the table.
    #[serde(default)]
    pub inherited: bool,
}

fn default_field_size() -> u32 {
    DEFAULT_FIELD_SIZE
}

/// What separates two same-named fields. Description and size never count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "attribute", rename_all = "snake_case")]
pub enum FieldDifference {
    InputType {
        field_name: String,
        existing: String,
        incoming: String,
    },
    Required {
        field_name: String,
        existing: bool,
        incoming: bool,
    },
    Applicability {
        field_name: String,
        existing: Applicability,
        incoming: Applicability,
    },
    Value {
        field_name: String,
        existing: String,
        incoming: String,
    },
}

impl FieldDifference {
    pub fn field_name(&self) -> &str {
        match self {
            FieldDifference::InputType { field_name, .. }
            | FieldDifference::Required { field_name, .. }
            | FieldDifference::Applicability { field_name, .. }
            | FieldDifference::Value { field_name, .. } => field_name,
        }
    }
}

impl fmt::Display for FieldDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDifference::InputType { field_name, existing, incoming } => {
                write!(f, "field {}: input type {} -> {}", field_name, existing, incoming)
            }
            FieldDifference::Required { field_name, existing, incoming } => {
                write!(f, "field {}: required {} -> {}", field_name, existing, incoming)
            }
            FieldDifference::Applicability { field_name, existing, incoming } => {
                write!(f, "field {}: applicability {} -> {}", field_name, existing, incoming)
            }
            FieldDifference::Value { field_name, existing, incoming } => {
                write!(f, "field {}: value '{}' -> '{}'", field_name, existing, incoming)
            }
        }
    }
}

impl FieldDefinition {
    pub fn new(
        owner_name: impl Into<String>,
        field_name: impl Into<String>,
        input_type: impl Into<String>,
    ) -> Self {
        Self {
            owner_name: owner_name.into(),
            field_name: field_name.into(),
            description: String::new(),
            size: DEFAULT_FIELD_SIZE,
            input_type: input_type.into(),
            required: false,
            applicability: Applicability::AllTables,
            value: String::new(),
            inherited: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn is_type_field(&self) -> bool {
        owner_type_name(&self.owner_name).is_some()
    }

    /// Differences that change the field's meaning.
    pub fn differences(&self, incoming: &FieldDefinition) -> Vec<FieldDifference> {
        let mut differences = Vec::new();
        let field_name = || self.field_name.clone();

        if !self.input_type.eq_ignore_ascii_case(&incoming.input_type) {
            differences.push(FieldDifference::InputType {
                field_name: field_name(),
                existing: self.input_type.clone(),
                incoming: incoming.input_type.clone(),
            });
        }
        if self.required != incoming.required {
            differences.push(FieldDifference::Required {
                field_name: field_name(),
                existing: self.required,
                incoming: incoming.required,
            });
        }
        if self.applicability != incoming.applicability {
            differences.push(FieldDifference::Applicability {
                field_name: field_name(),
                existing: self.applicability,
                incoming: incoming.applicability,
            });
        }
        if self.value != incoming.value {
            differences.push(FieldDifference::Value {
                field_name: field_name(),
                existing: self.value.clone(),
                incoming: incoming.value.clone(),
            });
        }
        differences
    }

    pub fn same_meaning(&self, other: &FieldDefinition) -> bool {
        self.differences(other).is_empty()
    }

    /// Only description or size differ.
    pub fn is_cosmetic_change(&self, incoming: &FieldDefinition) -> bool {
        self.same_meaning(incoming)
            && (self.description != incoming.description || self.size != incoming.size)
    }

    /// This field as inherited by `table`.
    pub fn inherited_by(&self, table: &TableId) -> FieldDefinition {
        FieldDefinition {
            owner_name: table.as_str().to_string(),
            inherited: true,
            ..self.clone()
        }
    }

    /// This field re-owned by a type.
    pub fn owned_by_type(&self, type_name: &str) -> FieldDefinition {
        FieldDefinition {
            owner_name: type_field_owner(type_name),
            inherited: false,
            ..self.clone()
        }
    }
}

/// First `"<name>_<n>"` (n from 1) not among `taken`.
pub fn free_field_name<'a>(name: &str, taken: impl IntoIterator<Item = &'a str> + Clone) -> String {
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", name, n);
        if !taken.clone().into_iter().any(|t| t == candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> FieldDefinition {
        FieldDefinition::new(type_field_owner("Sensor"), "Subsystem", "Text")
            .with_description("Owning subsystem")
            .with_value("ADCS")
    }

    #[test]
    fn test_type_owner_prefix() {
        assert_eq!(type_field_owner("Sensor"), "Type:Sensor");
        assert_eq!(owner_type_name("Type:Sensor"), Some("Sensor"));
        assert_eq!(owner_type_name("sensor_a"), None);
        assert!(field().is_type_field());
    }

    #[test]
    fn test_cosmetic_changes_keep_meaning() {
        let existing = field();
        let incoming = field().with_description("Subsystem that owns the table").with_size(40);
        assert!(existing.same_meaning(&incoming));
        assert!(existing.is_cosmetic_change(&incoming));
        assert!(!existing.is_cosmetic_change(&existing.clone()));
    }

    #[test]
    fn test_semantic_differences_reported() {
        let existing = field();
        let incoming = field()
            .with_required(true)
            .with_value("EPS")
            .with_applicability(Applicability::RootsOnly);
        let differences = existing.differences(&incoming);
        assert_eq!(differences.len(), 3);
        assert!(differences.iter().all(|d| d.field_name() == "Subsystem"));
        assert!(matches!(differences[0], FieldDifference::Required { incoming: true, .. }));

        let mut retyped = field();
        retyped.input_type = "Integer".to_string();
        assert!(matches!(
            existing.differences(&retyped).as_slice(),
            [FieldDifference::InputType { .. }]
        ));

        let mut recased = field();
        recased.input_type = "TEXT".to_string();
        assert!(existing.same_meaning(&recased));
    }

    #[test]
    fn test_applicability() {
        let root = TableId::parse("sensor_a").unwrap();
        let child = TableId::parse("sensor_a,thermal.t1").unwrap();
        assert!(Applicability::AllTables.applies_to(&child));
        assert!(Applicability::RootsOnly.applies_to(&root));
        assert!(!Applicability::RootsOnly.applies_to(&child));
        assert!(Applicability::ChildrenOnly.applies_to(&child));
        assert_eq!("Roots only".parse::<Applicability>().unwrap(), Applicability::RootsOnly);
        assert_eq!("children_only".parse::<Applicability>().unwrap(), Applicability::ChildrenOnly);
        assert!("sometimes".parse::<Applicability>().is_err());
    }

    #[test]
    fn test_inheritance_copies() {
        let table = TableId::parse("sensor_a").unwrap();
        let inherited = field().inherited_by(&table);
        assert_eq!(inherited.owner_name, "sensor_a");
        assert!(inherited.inherited);
        assert_eq!(inherited.value, "ADCS");

        let retyped = inherited.owned_by_type("Sensor");
        assert_eq!(retyped.owner_name, "Type:Sensor");
        assert!(!retyped.inherited);
    }

    #[test]
    fn test_free_field_name() {
        assert_eq!(free_field_name("Mode", ["Mode"].iter().copied()), "Mode_1");
        assert_eq!(
            free_field_name("Mode", ["Mode", "Mode_1", "Mode_2"].iter().copied()),
            "Mode_3"
        );
    }

    #[test]
    fn test_field_json_defaults() {
        let parsed: FieldDefinition =
            serde_json::from_str(r#"{"field_name": "Mode", "input_type": "Text"}"#).unwrap();
        assert_eq!(parsed.size, DEFAULT_FIELD_SIZE);
        assert_eq!(parsed.applicability, Applicability::AllTables);
        assert!(parsed.owner_name.is_empty());
    }
}

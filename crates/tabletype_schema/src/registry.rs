//! The set of committed table type definitions.
//!
//! Keyed case-insensitively by type name. Reads are free; mutation is left
//! to the reconciliation engine and to explicit load/rename/delete calls,
//! which the caller serializes.

use crate::builder::{build_type_from_edited_rows, build_type_from_storage_rows, BuildError, EditedRow, StorageRow};
use crate::defaults::{
    default_type_description, default_type_rows, SemanticKind, COMMAND_TYPE, STRUCTURE_TYPE,
};
use crate::definition::TypeDefinition;
use crate::input_type::{builtin, InputTypeRegistry};
use crate::naming::NameTranslator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors from registry maintenance.
#[derive(Debug, Error)]
pub enum TypeRegistryError {
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Table type already exists: {0}")]
    DuplicateType(String),

    #[error("Table type not found: {0}")]
    UnknownType(String),

    #[error("Catalog rows name table type {first} as both '{first}' and '{second}'")]
    ConflictingTypeNames { first: String, second: String },
}

/// Name and description of one type, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInformation {
    pub name: String,
    pub description: String,
}

/// In-memory registry of committed table types.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    input_types: Arc<InputTypeRegistry>,
    translator: NameTranslator,
    types: BTreeMap<String, TypeDefinition>,
}

impl TypeRegistry {
    pub fn new(input_types: Arc<InputTypeRegistry>, translator: NameTranslator) -> Self {
        Self {
            input_types,
            translator,
            types: BTreeMap::new(),
        }
    }

    /// Build every type found in committed catalog rows. Type names that
    /// differ only in letter case are a corrupt catalog.
    pub fn load(
        input_types: Arc<InputTypeRegistry>,
        translator: NameTranslator,
        rows: &[StorageRow],
    ) -> Result<Self, TypeRegistryError> {
        let mut grouped: BTreeMap<String, (&str, Vec<StorageRow>)> = BTreeMap::new();
        for row in rows {
            let (type_name, type_rows) = grouped
                .entry(row.type_name.to_lowercase())
                .or_insert_with(|| (row.type_name.as_str(), Vec::new()));
            if *type_name != row.type_name {
                return Err(TypeRegistryError::ConflictingTypeNames {
                    first: type_name.to_string(),
                    second: row.type_name.clone(),
                });
            }
            type_rows.push(row.clone());
        }

        let mut registry = Self::new(input_types, translator);
        for (type_name, type_rows) in grouped.into_values() {
            let def = build_type_from_storage_rows(type_name, &type_rows, &registry.input_types)?;
            registry.replace(def);
        }
        info!(types = registry.len(), "loaded table types");
        Ok(registry)
    }

    /// Add the intrinsic Structure and Command types when absent.
    pub fn ensure_default_types(&mut self) -> Result<Vec<String>, TypeRegistryError> {
        let mut created = Vec::new();
        for (name, kind) in [
            (STRUCTURE_TYPE, SemanticKind::Structure),
            (COMMAND_TYPE, SemanticKind::Command),
        ] {
            if self.contains(name) {
                continue;
            }
            let def = self.build_from_edited_rows(
                name,
                default_type_description(kind),
                &default_type_rows(kind),
            )?;
            self.replace(def);
            created.push(name.to_string());
        }
        Ok(created)
    }

    pub fn input_types(&self) -> &Arc<InputTypeRegistry> {
        &self.input_types
    }

    pub fn translator(&self) -> &NameTranslator {
        &self.translator
    }

    /// Build (but do not register) a definition from edited rows.
    pub fn build_from_edited_rows(
        &self,
        type_name: &str,
        description: &str,
        rows: &[EditedRow],
    ) -> Result<TypeDefinition, BuildError> {
        build_type_from_edited_rows(type_name, description, rows, &self.input_types, &self.translator)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(&name.to_lowercase())
    }

    /// Insert `def`, returning any same-named definition it displaced.
    pub fn replace(&mut self, def: TypeDefinition) -> Option<TypeDefinition> {
        self.types.insert(def.name().to_lowercase(), def)
    }

    pub fn remove(&mut self, name: &str) -> Option<TypeDefinition> {
        self.types.remove(&name.to_lowercase())
    }

    /// Rename a type. Changing only the letter case of a name is allowed.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<(), TypeRegistryError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(BuildError::EmptyTypeName.into());
        }
        if !old_name.eq_ignore_ascii_case(new_name) && self.contains(new_name) {
            return Err(TypeRegistryError::DuplicateType(new_name.to_string()));
        }
        let def = self
            .remove(old_name)
            .ok_or_else(|| TypeRegistryError::UnknownType(old_name.to_string()))?;
        self.replace(def.renamed(new_name));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Type names, sorted case-insensitively.
    pub fn type_names(&self) -> Vec<String> {
        self.iter().map(|d| d.name().to_string()).collect()
    }

    pub fn structure_type_names(&self) -> Vec<String> {
        self.iter()
            .filter(|d| d.is_structure())
            .map(|d| d.name().to_string())
            .collect()
    }

    pub fn command_type_names(&self) -> Vec<String> {
        self.iter()
            .filter(|d| d.is_command())
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Names of enumeration columns across all structure types, deduplicated
    /// and sorted. Storage names are unquoted.
    pub fn structure_enumeration_column_names(&self, use_storage_names: bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .iter()
            .filter(|d| d.is_structure())
            .flat_map(|d| d.columns_by_input_type(builtin::ENUMERATION))
            .map(|c| {
                if use_storage_names {
                    crate::naming::strip_quotes(&c.storage_name).to_string()
                } else {
                    c.display_name.clone()
                }
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn type_information(&self) -> Vec<TypeInformation> {
        self.iter()
            .map(|d| TypeInformation {
                name: d.name().to_string(),
                description: d.description().to_string(),
            })
            .collect()
    }

    pub fn default_column_order(&self, name: &str) -> Option<String> {
        self.get(name).map(|d| d.default_column_order())
    }

    /// Every committed row, grouped by type in registry order.
    pub fn to_storage_rows(&self) -> Vec<StorageRow> {
        self.iter().flat_map(|d| d.to_storage_rows()).collect()
    }
}

//! Storage collaborator interface.
//!
//! The core never talks to a database directly. [`TypeStore`] covers the
//! committed type catalog and the tables stored against each type;
//! [`FieldStore`] covers data fields. [`MemoryStore`] implements both and
//! doubles as the serialized snapshot format.

use crate::builder::StorageRow;
use crate::field::FieldDefinition;
use crate::naming::ReservedWords;
use serde::{Deserialize, Serialize};
use tabletype_ids::TableId;
use thiserror::Error;

/// Errors surfaced by a storage collaborator. Passed through unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Committed type catalog plus table instances.
pub trait TypeStore {
    /// Identifiers the storage engine reserves.
    fn reserved_words(&self) -> Result<ReservedWords>;

    /// Every committed type row.
    fn committed_type_rows(&self) -> Result<Vec<StorageRow>>;

    fn count_tables_of_type(&self, type_name: &str) -> Result<usize>;

    fn list_tables_of_type(&self, type_name: &str) -> Result<Vec<TableId>>;

    /// Replace all rows of `type_name` in one step.
    fn replace_type_rows(&mut self, type_name: &str, rows: &[StorageRow]) -> Result<()>;
}

/// Data field metadata. Owner names compare case-insensitively, like type
/// names; field names compare exactly.
pub trait FieldStore {
    fn fields_for_owner(&self, owner_name: &str) -> Result<Vec<FieldDefinition>>;

    /// Insert or overwrite each field, keyed by `(owner_name, field_name)`.
    fn upsert_fields(&mut self, fields: &[FieldDefinition]) -> Result<()>;

    fn rename_field(&mut self, owner_name: &str, from: &str, to: &str) -> Result<()>;

    /// Remove every field of `owner_name`; returns how many were removed.
    fn delete_fields_for_owner(&mut self, owner_name: &str) -> Result<usize>;
}

/// A table stored against a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInstance {
    pub table: TableId,
    pub type_name: String,
}

/// In-memory store; also the on-disk snapshot layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pub reserved_words: Vec<String>,
    #[serde(default)]
    pub type_rows: Vec<StorageRow>,
    #[serde(default)]
    pub tables: Vec<TableInstance>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Makes every call fail with [`StoreError::Unavailable`].
    #[serde(skip)]
    offline: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reserved_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_words = words.into_iter().map(Into::into).collect();
        self
    }

    /// Record a table stored against `type_name`.
    pub fn add_table(&mut self, table: TableId, type_name: &str) {
        self.tables.push(TableInstance {
            table,
            type_name: type_name.to_string(),
        });
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn rows_for_type(&self, type_name: &str) -> Vec<&StorageRow> {
        self.type_rows
            .iter()
            .filter(|r| r.type_name.eq_ignore_ascii_case(type_name))
            .collect()
    }

    fn online(&self) -> Result<()> {
        if self.offline {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl TypeStore for MemoryStore {
    fn reserved_words(&self) -> Result<ReservedWords> {
        self.online()?;
        Ok(ReservedWords::new(&self.reserved_words))
    }

    fn committed_type_rows(&self) -> Result<Vec<StorageRow>> {
        self.online()?;
        Ok(self.type_rows.clone())
    }

    fn count_tables_of_type(&self, type_name: &str) -> Result<usize> {
        Ok(self.list_tables_of_type(type_name)?.len())
    }

    fn list_tables_of_type(&self, type_name: &str) -> Result<Vec<TableId>> {
        self.online()?;
        Ok(self
            .tables
            .iter()
            .filter(|t| t.type_name.eq_ignore_ascii_case(type_name))
            .map(|t| t.table.clone())
            .collect())
    }

    fn replace_type_rows(&mut self, type_name: &str, rows: &[StorageRow]) -> Result<()> {
        self.online()?;
        self.type_rows
            .retain(|r| !r.type_name.eq_ignore_ascii_case(type_name));
        self.type_rows.extend_from_slice(rows);
        Ok(())
    }
}

impl FieldStore for MemoryStore {
    fn fields_for_owner(&self, owner_name: &str) -> Result<Vec<FieldDefinition>> {
        self.online()?;
        Ok(self
            .fields
            .iter()
            .filter(|f| f.owner_name.eq_ignore_ascii_case(owner_name))
            .cloned()
            .collect())
    }

    fn upsert_fields(&mut self, fields: &[FieldDefinition]) -> Result<()> {
        self.online()?;
        for field in fields {
            match self
                .fields
                .iter_mut()
                .find(|f| {
                    f.owner_name.eq_ignore_ascii_case(&field.owner_name)
                        && f.field_name == field.field_name
                })
            {
                Some(existing) => *existing = field.clone(),
                None => self.fields.push(field.clone()),
            }
        }
        Ok(())
    }

    fn rename_field(&mut self, owner_name: &str, from: &str, to: &str) -> Result<()> {
        self.online()?;
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.owner_name.eq_ignore_ascii_case(owner_name) && f.field_name == from)
            .ok_or_else(|| StoreError::NotFound(format!("field {} of {}", from, owner_name)))?;
        field.field_name = to.to_string();
        Ok(())
    }

    fn delete_fields_for_owner(&mut self, owner_name: &str) -> Result<usize> {
        self.online()?;
        let before = self.fields.len();
        self.fields
            .retain(|f| !f.owner_name.eq_ignore_ascii_case(owner_name));
        Ok(before - self.fields.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(type_name: &str, ordinal: u32) -> StorageRow {
        StorageRow {
            type_name: type_name.to_string(),
            ordinal,
            storage_name: format!("c{}", ordinal),
            display_name: format!("C{}", ordinal),
            description: String::new(),
            input_type: "Text".to_string(),
            unique: false,
            required: false,
            struct_ok: false,
            pointer_ok: false,
        }
    }

    #[test]
    fn test_replace_type_rows_is_per_type() {
        let mut store = MemoryStore::new();
        store.replace_type_rows("A", &[row("A", 0), row("A", 1)]).unwrap();
        store.replace_type_rows("B", &[row("B", 0)]).unwrap();
        store.replace_type_rows("a", &[row("A", 0)]).unwrap();
        assert_eq!(store.rows_for_type("A").len(), 1);
        assert_eq!(store.rows_for_type("B").len(), 1);
    }

    #[test]
    fn test_tables_of_type() {
        let mut store = MemoryStore::new();
        store.add_table(TableId::parse("t1").unwrap(), "Sensor");
        store.add_table(TableId::parse("t2").unwrap(), "sensor");
        store.add_table(TableId::parse("c1").unwrap(), "Command");
        assert_eq!(store.count_tables_of_type("SENSOR").unwrap(), 2);
        assert_eq!(store.count_tables_of_type("Missing").unwrap(), 0);
    }

    #[test]
    fn test_field_upsert_and_rename() {
        let mut store = MemoryStore::new();
        let field = FieldDefinition::new("t1", "Mode", "Text");
        store.upsert_fields(&[field.clone()]).unwrap();
        store.upsert_fields(&[field.clone().with_value("safe")]).unwrap();
        let fields = store.fields_for_owner("t1").unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, "safe");

        store.rename_field("t1", "Mode", "Mode_1").unwrap();
        assert_eq!(store.fields_for_owner("t1").unwrap()[0].field_name, "Mode_1");
        assert!(matches!(
            store.rename_field("t1", "Mode", "Other"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_field_owners_ignore_case() {
        let mut store = MemoryStore::new();
        store
            .upsert_fields(&[
                FieldDefinition::new("Type:Sensor", "Mode", "Text"),
                FieldDefinition::new("Type:Sensor", "Gain", "Float"),
                FieldDefinition::new("t1", "Mode", "Text"),
            ])
            .unwrap();
        store
            .upsert_fields(&[FieldDefinition::new("TYPE:SENSOR", "Mode", "Text").with_value("safe")])
            .unwrap();
        assert_eq!(store.fields_for_owner("type:sensor").unwrap().len(), 2);

        assert_eq!(store.delete_fields_for_owner("Type:SENSOR").unwrap(), 2);
        assert!(store.fields_for_owner("Type:Sensor").unwrap().is_empty());
        assert_eq!(store.fields.len(), 1);
        assert_eq!(store.delete_fields_for_owner("Type:Sensor").unwrap(), 0);
    }

    #[test]
    fn test_offline_store_fails() {
        let mut store = MemoryStore::new().with_reserved_words(["order"]);
        assert!(store.reserved_words().unwrap().contains("ORDER"));
        store.set_offline(true);
        assert!(matches!(store.committed_type_rows(), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.upsert_fields(&[]), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut store = MemoryStore::new().with_reserved_words(["user"]);
        store.add_table(TableId::parse("t1").unwrap(), "Sensor");
        store.replace_type_rows("Sensor", &[row("Sensor", 0)]).unwrap();
        let json = serde_json::to_string(&store).unwrap();
        let restored: MemoryStore = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.tables, store.tables);
        assert_eq!(restored.type_rows, store.type_rows);

        let empty: MemoryStore = serde_json::from_str("{}").unwrap();
        assert!(empty.type_rows.is_empty());
    }
}

//! Catalog snapshot handling
//!
//! The CLI keeps the committed catalog in a JSON [`MemoryStore`] snapshot.
//! Opening a snapshot rebuilds the type registry from its rows and adds the
//! intrinsic Structure and Command types when they are missing.

use crate::cli::config::CatalogConfig;
use crate::cli::error::HelpfulError;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabletype_schema::defaults::verify_catalog;
use tabletype_schema::{
    InputTypeRegistry, MemoryStore, NameTranslator, ReconciliationEngine, ReservedWords,
    TypeDefinition, TypeRegistry, TypeStore,
};
use tracing::{debug, info};

/// An open catalog snapshot.
pub struct Catalog {
    pub path: PathBuf,
    pub store: MemoryStore,
    pub registry: TypeRegistry,
}

impl Catalog {
    /// Open `path`, starting an empty catalog when it does not exist yet.
    pub fn open(path: &Path, config: &CatalogConfig) -> anyhow::Result<Self> {
        let mut store = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| HelpfulError::corrupt_snapshot(path, &e.to_string()))?;
            serde_json::from_str::<MemoryStore>(&content)
                .map_err(|e| HelpfulError::corrupt_snapshot(path, &e.to_string()))?
        } else {
            info!(path = %path.display(), "no snapshot yet; starting an empty catalog");
            MemoryStore::new()
        };

        let input_types = InputTypeRegistry::with_defaults().context("Failed to build input type registry")?;
        verify_catalog(&input_types).context("Default catalog references an unknown input type")?;

        let mut reserved = store.reserved_words()?;
        if reserved.is_empty() {
            reserved = ReservedWords::sql_defaults();
        }
        reserved.extend(&config.extra_reserved_words);

        let rows = store.committed_type_rows()?;
        let mut registry = TypeRegistry::load(Arc::new(input_types), NameTranslator::new(reserved), &rows)
            .map_err(|e| HelpfulError::corrupt_snapshot(path, &e.to_string()))?;

        for name in registry.ensure_default_types()? {
            if let Some(def) = registry.get(&name) {
                store.replace_type_rows(def.name(), &def.to_storage_rows())?;
                debug!(type_name = %name, "added intrinsic table type");
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            store,
            registry,
        })
    }

    /// Write the snapshot, replacing the file in one rename.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let content = serde_json::to_string_pretty(&self.store)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, content)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        std::fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        info!(path = %self.path.display(), types = self.registry.len(), "saved catalog snapshot");
        Ok(())
    }

    pub fn engine(&mut self) -> ReconciliationEngine<'_, MemoryStore> {
        ReconciliationEngine::new(&mut self.registry, &mut self.store)
    }

    pub fn require_type(&self, name: &str) -> anyhow::Result<&TypeDefinition> {
        self.registry
            .get(name)
            .ok_or_else(|| HelpfulError::unknown_type(name, &self.registry.type_names()).into())
    }
}

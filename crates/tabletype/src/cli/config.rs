//! Configuration for the tabletype CLI
//!
//! Read from `<home>/tabletype.toml` unless `--config` names another file.
//! Every key is optional; command-line flags override the file.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tabletype_logging::tabletype_home;
use tabletype_schema::RenamePolicy;

pub const CONFIG_FILE_NAME: &str = "tabletype.toml";

/// How duplicate field renames are confirmed when applying an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenamePolicyMode {
    /// Ask on the terminal for each conflicting field.
    #[default]
    Prompt,
    Allow,
    Decline,
}

impl RenamePolicyMode {
    /// Non-interactive policies; `Prompt` is built by the caller.
    pub fn fixed_policy(&self) -> Option<RenamePolicy<'static>> {
        match self {
            RenamePolicyMode::Allow => Some(RenamePolicy::AlwaysAllowRename),
            RenamePolicyMode::Decline => Some(RenamePolicy::NeverAllowRename),
            RenamePolicyMode::Prompt => None,
        }
    }
}

/// CLI configuration file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON catalog snapshot the commands read and write
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    #[serde(default)]
    pub rename_policy: RenamePolicyMode,

    /// Added to the snapshot's reserved words when naming columns
    #[serde(default)]
    pub extra_reserved_words: Vec<String>,
}

fn default_snapshot_path() -> PathBuf {
    tabletype_home().join("catalog.json")
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            rename_policy: RenamePolicyMode::default(),
            extra_reserved_words: Vec::new(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CatalogConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load `path`, or the default location; a missing default file yields
    /// the defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }
}

/// Get config path: ~/.tabletype/tabletype.toml
pub fn default_config_path() -> PathBuf {
    tabletype_home().join(CONFIG_FILE_NAME)
}

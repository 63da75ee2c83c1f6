use crate::archive::ArchiveLimits;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted record database.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArchiveConfig {
    pub max_entries: usize,
    pub max_entry_bytes: u64,
    pub max_total_bytes: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        let limits = ArchiveLimits::default();
        Self {
            max_entries: limits.max_entries,
            max_entry_bytes: limits.max_entry_bytes,
            max_total_bytes: limits.max_total_bytes,
        }
    }
}

impl Config {
    /// Loads `config.toml` from `path`, falling back to defaults when the
    /// file does not exist. A file that exists but does not parse is a
    /// configuration error, not a silent default.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("invalid config file: {e}")))
    }

    pub fn archive_limits(&self) -> ArchiveLimits {
        ArchiveLimits {
            max_entries: self.archive.max_entries,
            max_entry_bytes: self.archive.max_entry_bytes,
            max_total_bytes: self.archive.max_total_bytes,
        }
    }
}

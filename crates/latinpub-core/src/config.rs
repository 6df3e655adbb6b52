//! Configuration for latinpub
//!
//! Covers where records live and how the batch job runs. Matching policy
//! (field weights, match threshold, blocking key shape) is fixed in code.
//!
//! ```toml
//! [storage]
//! database = "db/latin_publications.db"
//!
//! [ingest]
//! metadata_dir = "metadata"
//!
//! [pipeline]
//! parallel = true
//!
//! [logging]
//! filter = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatinPubConfig {
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Record store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("db/latin_publications.db"),
        }
    }
}

/// Harvested metadata location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory of JSON metadata documents
    pub metadata_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            metadata_dir: PathBuf::from("metadata"),
        }
    }
}

/// Batch pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Normalize and score partitions on the rayon thread pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl LatinPubConfig {
    /// Parse configuration from TOML text; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if given, else from the default location if it
    /// exists, else fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config dir>/latinpub/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("latinpub").join("config.toml"))
    }
}

//! Error types for latinpub-core
//!
//! The deduplication pipeline itself never fails: unparseable input degrades
//! to null fields. Errors only arise at the edges, when reading harvested
//! metadata, loading configuration, or talking to the record store.

use thiserror::Error;

/// Result type alias for latinpub operations
pub type Result<T> = std::result::Result<T, LatinPubError>;

/// Main error type for latinpub operations
#[derive(Error, Debug)]
pub enum LatinPubError {
    /// Persistence-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Metadata ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Persistence-specific errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
}

/// Errors reading harvested metadata documents
#[derive(Error, Debug)]
pub enum IngestError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Document is not valid JSON
    #[error("JSON parse error: {0}")]
    Parse(String),

    /// Document parsed but is not a JSON object
    #[error("Metadata document is not an object: {0}")]
    NotAnObject(String),
}

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for LatinPubError {
    fn from(err: rusqlite::Error) -> Self {
        LatinPubError::Persistence(PersistenceError::Database(err.to_string()))
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

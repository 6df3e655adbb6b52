//! latinpub-core: Deduplication core for harvested Latin publication metadata
//!
//! Harvested bibliographic records are noisy: titles vary in spelling and
//! punctuation, author names come in either order, dates are free text.
//! This crate decides which records describe the same underlying work and
//! gives each duplicate cluster one canonical representative.
//!
//! - **Normalization**: canonical title, creator and year forms
//! - **Partitioning**: blocking by five-year bucket and title prefix
//! - **Similarity**: weighted title/creator/year scoring
//! - **Clustering**: union-find over matches, minimum id as canonical
//! - **Persistence**: SQLite record store (feature `sqlite`)
//! - **Ingest**: reader for harvested JSON metadata documents
//!
//! # Pipeline
//!
//! ```text
//! raw records → normalized → partitioned → scored pairs → clusters → annotated records
//! ```

pub mod config;
pub mod deduplication;
pub mod error;
pub mod ingest;
#[cfg(feature = "sqlite")]
pub mod persistence;
pub mod record;
pub mod store;

pub use config::{IngestConfig, LatinPubConfig, LoggingConfig, PipelineConfig, StorageConfig};
pub use deduplication::{
    deduplicate_store, Cluster, DeduplicationReport, Deduplicator, MatchEdge, PartitionIndex,
    PartitionKey, SimilarityScore,
};
pub use error::{ConfigError, IngestError, LatinPubError, PersistenceError, Result};
pub use ingest::IngestBatch;
#[cfg(feature = "sqlite")]
pub use persistence::{SqliteStore, StoreStats};
pub use record::{ClusterState, NormalizedFields, RawMetadata, RawRecord, Record, RecordId};
pub use store::{MemoryStore, RecordStore};

/// Returns the version of latinpub-core
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

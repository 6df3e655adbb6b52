//! Persistence layer for publication records
//!
//! Provides SQLite-backed storage implementing [`RecordStore`](crate::store::RecordStore).

mod repository;
mod schema;

pub use repository::{SqliteStore, StoreStats};
pub use schema::{Schema, SCHEMA_VERSION};

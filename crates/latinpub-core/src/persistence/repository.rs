//! SQLite-backed record store

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::schema::{Schema, SCHEMA_VERSION};
use crate::deduplication::normalize_fields;
use crate::error::{PersistenceError, Result};
use crate::record::{NormalizedFields, RawMetadata, RawRecord, Record, RecordId};
use crate::store::RecordStore;

const INSERT_RECORD: &str = r#"
    INSERT OR IGNORE INTO publications
    (ia_identifier, title, title_normalized, creator, creator_normalized, date_string, year,
     publisher, language, collection, subject, source, raw_metadata)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#;

const RECORD_COLUMNS: &str = "id, ia_identifier, title, title_normalized, creator, creator_normalized, date_string, year, publisher, language, collection, subject, source, raw_metadata";

/// Aggregate counts over the stored record set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_records: i64,
    /// Records without a recognizable year
    pub undated_records: i64,
    /// Distinct canonical ids referenced by duplicates
    pub clusters: i64,
    /// Records with a non-null canonical id
    pub duplicate_records: i64,
    /// Records with a null canonical id
    pub unique_works: i64,
}

/// SQLite store for publication records
pub struct SqliteStore {
    conn: rusqlite::Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(PersistenceError::from)?;
        }
        let conn = rusqlite::Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )?;
        let current_version = self.get_schema_version()?.unwrap_or(0);

        if current_version == 0 {
            // Fresh database, create all tables
            self.conn.execute_batch(Schema::create_tables())?;
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    self.conn.execute_batch(migration)?;
                }
            }
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version > SCHEMA_VERSION {
            return Err(PersistenceError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                actual: current_version,
            }
            .into());
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Result<Option<u32>> {
        let result = self.conn.query_row(
            "SELECT version FROM schema_version ORDER BY rowid DESC LIMIT 1",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(Some(version)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
        Ok(())
    }

    // ==================== Ingestion ====================

    /// Insert a raw record, normalizing it on the way in
    ///
    /// Returns `None` when a record with the same source identifier is
    /// already stored.
    pub fn insert_raw(&self, raw: &RawRecord) -> Result<Option<RecordId>> {
        let normalized = normalize_fields(raw);

        let inserted = self.conn.execute(
            INSERT_RECORD,
            rusqlite::params![
                raw.identifier,
                raw.title,
                normalized.title,
                raw.creator,
                normalized.creator,
                raw.date_string,
                normalized.year,
                raw.publisher,
                raw.language,
                raw.collection,
                raw.subject,
                raw.source,
                raw.raw_metadata.to_json_string(),
            ],
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    /// Insert many raw records in one transaction; returns how many were new
    pub fn insert_batch(&mut self, records: &[RawRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(INSERT_RECORD)?;
            for raw in records {
                let normalized = normalize_fields(raw);
                inserted += stmt.execute(rusqlite::params![
                    raw.identifier,
                    raw.title,
                    normalized.title,
                    raw.creator,
                    normalized.creator,
                    raw.date_string,
                    normalized.year,
                    raw.publisher,
                    raw.language,
                    raw.collection,
                    raw.subject,
                    raw.source,
                    raw.raw_metadata.to_json_string(),
                ])?;
            }
        }
        tx.commit()?;

        info!(
            inserted,
            skipped = records.len() - inserted,
            "Inserted harvested records"
        );
        Ok(inserted)
    }

    // ==================== Queries ====================

    /// Get a record by id
    pub fn get(&self, id: RecordId) -> Result<Option<Record>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM publications WHERE id = ?1", RECORD_COLUMNS),
            [id],
            Self::row_to_record,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(PersistenceError::from(e).into()),
        }
    }

    /// Stored canonical id of a record (`None` if absent or not a duplicate)
    pub fn stored_canonical_id(&self, id: RecordId) -> Result<Option<RecordId>> {
        let result = self.conn.query_row(
            "SELECT canonical_id FROM publications WHERE id = ?1",
            [id],
            |row| row.get::<_, Option<RecordId>>(0),
        );

        match result {
            Ok(canonical) => Ok(canonical),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Aggregate counts over all stored records
    pub fn stats(&self) -> Result<StoreStats> {
        let stats = self.conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(year IS NULL), 0),
                COUNT(DISTINCT canonical_id),
                COALESCE(SUM(canonical_id IS NOT NULL), 0),
                COALESCE(SUM(canonical_id IS NULL), 0)
            FROM publications
            "#,
            [],
            |row| {
                Ok(StoreStats {
                    total_records: row.get(0)?,
                    undated_records: row.get(1)?,
                    clusters: row.get(2)?,
                    duplicate_records: row.get(3)?,
                    unique_works: row.get(4)?,
                })
            },
        )?;
        Ok(stats)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
        let metadata_json: Option<String> = row.get(13)?;
        let raw_metadata = match metadata_json {
            Some(json) => serde_json::from_str::<RawMetadata>(&json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    13,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            None => RawMetadata::default(),
        };

        let raw = RawRecord {
            identifier: row.get(1)?,
            title: row.get(2)?,
            creator: row.get(4)?,
            date_string: row.get(6)?,
            publisher: row.get(8)?,
            language: row.get(9)?,
            collection: row.get(10)?,
            subject: row.get(11)?,
            source: row.get(12)?,
            raw_metadata,
        };
        let normalized = NormalizedFields {
            title: row.get(3)?,
            creator: row.get(5)?,
            year: row.get(7)?,
        };

        Ok(Record::restore(row.get(0)?, raw, normalized))
    }
}

impl RecordStore for SqliteStore {
    fn load_records(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM publications ORDER BY id",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(records = records.len(), "Loaded records");
        Ok(records)
    }

    fn save_annotations(&mut self, records: &[Record]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("UPDATE publications SET canonical_id = NULL", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE publications
                SET title_normalized = ?1, creator_normalized = ?2, year = ?3, canonical_id = ?4
                WHERE id = ?5
                "#,
            )?;
            for record in records {
                stmt.execute(rusqlite::params![
                    record.title_normalized(),
                    record.creator_normalized(),
                    record.year(),
                    record.canonical_id(),
                    record.id,
                ])?;
            }
        }
        tx.commit()?;

        info!(records = records.len(), "Saved deduplication annotations");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deduplication::{deduplicate_store, Deduplicator};

    fn raw(identifier: &str, title: &str, date: &str) -> RawRecord {
        RawRecord::new()
            .with_identifier(identifier)
            .with_title(title)
            .with_date(date)
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store
            .insert_raw(&raw("anima1650", "Disputatio de Anima", "1650"))
            .unwrap()
            .unwrap();

        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.raw.identifier.as_deref(), Some("anima1650"));
        assert_eq!(record.title_normalized(), Some("disputatio anima"));
        assert_eq!(record.year(), Some(1650));
        assert!(store.get(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_identifier_skipped() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store
            .insert_raw(&raw("same", "Opera", "1600"))
            .unwrap()
            .is_some());
        assert!(store
            .insert_raw(&raw("same", "Opera", "1600"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_insert_batch_counts_new_records() {
        let mut store = SqliteStore::in_memory().unwrap();
        let batch = vec![
            raw("a", "Opera Omnia", "1600"),
            raw("b", "Opera Omnia", "1601"),
            raw("a", "Opera Omnia", "1600"),
        ];
        assert_eq!(store.insert_batch(&batch).unwrap(), 2);
        assert_eq!(store.load_records().unwrap().len(), 2);
    }

    #[test]
    fn test_raw_metadata_preserved() {
        let store = SqliteStore::in_memory().unwrap();
        let mut record = raw("meta", "Opera", "1600");
        record.raw_metadata = RawMetadata::new(serde_json::Map::from_iter([(
            "mediatype".to_string(),
            serde_json::json!("texts"),
        )]));
        let id = store.insert_raw(&record).unwrap().unwrap();

        let loaded = store.get(id).unwrap().unwrap();
        assert_eq!(loaded.raw.raw_metadata, record.raw_metadata);
    }

    #[test]
    fn test_deduplicate_and_stats() {
        let mut store = SqliteStore::in_memory().unwrap();
        store
            .insert_batch(&[
                raw("a", "Disputatio de Anima", "1650"),
                raw("b", "DISPVTATIO DE ANIMA", "1651"),
                raw("c", "Tractatus de Chemia", "1650"),
                raw("d", "Liber Primus", "s.d."),
            ])
            .unwrap();

        deduplicate_store(&mut store, &Deduplicator::sequential()).unwrap();

        assert_eq!(store.stored_canonical_id(1).unwrap(), None);
        assert_eq!(store.stored_canonical_id(2).unwrap(), Some(1));
        assert_eq!(store.stored_canonical_id(3).unwrap(), None);
        assert_eq!(store.stored_canonical_id(4).unwrap(), None);

        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                total_records: 4,
                undated_records: 1,
                clusters: 1,
                duplicate_records: 1,
                unique_works: 3,
            }
        );
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("latin_publications.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_raw(&raw("x", "Opera", "1600")).unwrap();
        }

        // Reopening keeps data and does not re-run schema creation
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.stats().unwrap().total_records, 1);
    }
}

//! SQLite schema for publication storage

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Harvested publications with derived deduplication fields
CREATE TABLE IF NOT EXISTS publications (
    id INTEGER PRIMARY KEY,
    ia_identifier TEXT UNIQUE,
    title TEXT,
    title_normalized TEXT,
    creator TEXT,
    creator_normalized TEXT,
    date_string TEXT,
    year INTEGER,
    publisher TEXT,
    language TEXT,
    collection TEXT,
    subject TEXT,
    source TEXT,
    raw_metadata TEXT,
    canonical_id INTEGER,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_publications_year ON publications(year);
CREATE INDEX IF NOT EXISTS idx_publications_creator ON publications(creator_normalized);
CREATE INDEX IF NOT EXISTS idx_publications_canonical ON publications(canonical_id);
CREATE INDEX IF NOT EXISTS idx_publications_title ON publications(title_normalized);
"#
    }

    /// Get migration SQL from one version to the next
    pub fn migration(from: u32, to: u32) -> Option<&'static str> {
        match (from, to) {
            // No migrations yet
            _ => None,
        }
    }
}

//! Reader for harvested metadata documents
//!
//! Harvested items arrive as one JSON document per file, in the shape the
//! Internet Archive metadata API returns: either a flat object of fields or
//! the same object nested under a `metadata` key. Field values may be
//! strings, numbers, or lists of either.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::record::{RawMetadata, RawRecord};

/// Outcome of reading a metadata directory
#[derive(Debug, Default)]
pub struct IngestBatch {
    /// Parsed records, in file-name order
    pub records: Vec<RawRecord>,
    /// Files that could not be read or parsed
    pub failed: Vec<(PathBuf, IngestError)>,
}

/// Build a raw record from a parsed metadata document
///
/// `fallback_identifier` is used when the document has no `identifier`.
pub fn parse_metadata(
    document: Value,
    fallback_identifier: Option<&str>,
) -> Result<RawRecord, IngestError> {
    let mut object = match document {
        Value::Object(object) => object,
        other => return Err(IngestError::NotAnObject(type_name(&other).to_string())),
    };

    let metadata = match object.remove("metadata") {
        Some(Value::Object(nested)) => nested,
        Some(other) => {
            object.insert("metadata".to_string(), other);
            object
        }
        None => object,
    };

    Ok(RawRecord {
        identifier: get_field(&metadata, "identifier")
            .or_else(|| fallback_identifier.map(str::to_string)),
        title: get_field(&metadata, "title"),
        creator: get_field(&metadata, "creator"),
        date_string: get_field(&metadata, "date"),
        publisher: get_field(&metadata, "publisher"),
        language: get_field(&metadata, "language"),
        collection: get_field(&metadata, "collection"),
        subject: get_field(&metadata, "subject"),
        source: get_field(&metadata, "source"),
        raw_metadata: RawMetadata::new(metadata),
    })
}

/// Parse metadata from JSON text
pub fn parse_metadata_str(
    content: &str,
    fallback_identifier: Option<&str>,
) -> Result<RawRecord, IngestError> {
    let document: Value = serde_json::from_str(content)?;
    parse_metadata(document, fallback_identifier)
}

/// Read one metadata file; the file stem is the fallback identifier
pub fn read_metadata_file(path: impl AsRef<Path>) -> Result<RawRecord, IngestError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let stem = path.file_stem().and_then(|s| s.to_str());
    parse_metadata_str(&content, stem)
}

/// Read every `*.json` file in `dir`
///
/// Files are processed in name order so id assignment is stable across
/// runs. Unreadable files are collected in [`IngestBatch::failed`] rather
/// than aborting the batch.
pub fn read_metadata_dir(dir: impl AsRef<Path>) -> Result<IngestBatch, IngestError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut batch = IngestBatch::default();
    for path in paths {
        match read_metadata_file(&path) {
            Ok(record) => batch.records.push(record),
            Err(err) => {
                warn!("Skipping {:?}: {}", path, err);
                batch.failed.push((path, err));
            }
        }
    }

    debug!(
        parsed = batch.records.len(),
        failed = batch.failed.len(),
        "Read metadata directory"
    );

    Ok(batch)
}

/// Extract a field as text: lists are joined with "; ", empties are absent
fn get_field(metadata: &Map<String, Value>, field: &str) -> Option<String> {
    let text = match metadata.get(field)? {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        other => scalar_text(other)?,
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

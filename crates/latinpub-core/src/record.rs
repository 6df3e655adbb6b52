//! Bibliographic record model
//!
//! A [`Record`] is one harvested entry. Its raw free-text fields are kept
//! verbatim; the comparable forms produced by the normalizer are computed
//! once and never overwritten, and the cluster assignment is written only by
//! the cluster resolver.

use serde::{Deserialize, Serialize};

use crate::deduplication::normalize_fields;

/// Numeric record identifier, assigned monotonically at ingestion
pub type RecordId = i64;

/// Original harvested payload, kept for provenance only
///
/// The deduplication core never looks inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMetadata(serde_json::Map<String, serde_json::Value>);

impl RawMetadata {
    pub fn new(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }

    pub fn into_map(self) -> serde_json::Map<String, serde_json::Value> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize to a compact JSON object string
    pub fn to_json_string(&self) -> String {
        serde_json::Value::Object(self.0.clone()).to_string()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for RawMetadata {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// Record payload as supplied by ingestion, before an id is assigned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Source identifier (e.g. the Internet Archive item id)
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub date_string: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub collection: Option<String>,
    pub subject: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub raw_metadata: RawMetadata,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_date(mut self, date_string: impl Into<String>) -> Self {
        self.date_string = Some(date_string.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

/// Comparable forms derived from the raw fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFields {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub year: Option<i32>,
}

/// Cluster assignment of a single record
///
/// Every record starts `Unassigned` and moves to `Canonical` or `Member`
/// exactly once per resolver pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterState {
    #[default]
    Unassigned,
    /// Singleton, or minimum-id representative of its cluster
    Canonical,
    /// Non-minimum member pointing at its cluster's canonical id
    Member(RecordId),
}

/// One bibliographic entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub raw: RawRecord,
    normalized: Option<NormalizedFields>,
    cluster: ClusterState,
}

impl Record {
    /// Create a freshly ingested record: not normalized, unassigned
    pub fn new(id: RecordId, raw: RawRecord) -> Self {
        Self {
            id,
            raw,
            normalized: None,
            cluster: ClusterState::Unassigned,
        }
    }

    /// Rebuild a record whose normalized fields were computed earlier
    ///
    /// Any previously stored cluster assignment is not carried over; a
    /// resolver pass always recomputes clusters from scratch.
    pub fn restore(id: RecordId, raw: RawRecord, normalized: NormalizedFields) -> Self {
        Self {
            id,
            raw,
            normalized: Some(normalized),
            cluster: ClusterState::Unassigned,
        }
    }

    /// Compute normalized fields if not already present and return them
    pub fn normalize(&mut self) -> &NormalizedFields {
        self.normalized
            .get_or_insert_with(|| normalize_fields(&self.raw))
    }

    pub fn normalized(&self) -> Option<&NormalizedFields> {
        self.normalized.as_ref()
    }

    pub fn title_normalized(&self) -> Option<&str> {
        self.normalized.as_ref().and_then(|n| n.title.as_deref())
    }

    pub fn creator_normalized(&self) -> Option<&str> {
        self.normalized.as_ref().and_then(|n| n.creator.as_deref())
    }

    pub fn year(&self) -> Option<i32> {
        self.normalized.as_ref().and_then(|n| n.year)
    }

    pub fn cluster_state(&self) -> ClusterState {
        self.cluster
    }

    /// Id of the canonical record this one duplicates, if any
    ///
    /// `None` for singletons and for the canonical representative itself.
    pub fn canonical_id(&self) -> Option<RecordId> {
        match self.cluster {
            ClusterState::Member(canonical) => Some(canonical),
            _ => None,
        }
    }

    pub(crate) fn reset_cluster(&mut self) {
        self.cluster = ClusterState::Unassigned;
    }

    pub(crate) fn assign_cluster(&mut self, state: ClusterState) {
        debug_assert_eq!(
            self.cluster,
            ClusterState::Unassigned,
            "record {} assigned twice in one pass",
            self.id
        );
        self.cluster = state;
    }
}

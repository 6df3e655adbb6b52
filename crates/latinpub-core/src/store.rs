//! Record storage interface
//!
//! The deduplication core reads a full record set up front and writes the
//! derived annotations back once at the end. Anything that can do both is a
//! [`RecordStore`].

use crate::error::Result;
use crate::record::{ClusterState, RawRecord, Record, RecordId};

/// Storage collaborator for the deduplication pipeline
pub trait RecordStore {
    /// Read every record, ordered by id
    fn load_records(&self) -> Result<Vec<Record>>;

    /// Persist normalized fields and canonical ids for `records`
    fn save_annotations(&mut self, records: &[Record]) -> Result<()>;
}

/// In-memory record store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Vec<Record>,
    next_id: RecordId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw record, assigning the next id
    pub fn insert(&mut self, raw: RawRecord) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(Record::new(id, raw));
        id
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn load_records(&self) -> Result<Vec<Record>> {
        // Stored cluster state is not carried into a new pass
        Ok(self
            .records
            .iter()
            .map(|record| match record.normalized() {
                Some(fields) => Record::restore(record.id, record.raw.clone(), fields.clone()),
                None => Record::new(record.id, record.raw.clone()),
            })
            .collect())
    }

    fn save_annotations(&mut self, records: &[Record]) -> Result<()> {
        for updated in records {
            if let Some(stored) = self.records.iter_mut().find(|r| r.id == updated.id) {
                let mut annotated = match updated.normalized() {
                    Some(fields) => Record::restore(updated.id, stored.raw.clone(), fields.clone()),
                    None => Record::new(updated.id, stored.raw.clone()),
                };
                if updated.cluster_state() != ClusterState::Unassigned {
                    annotated.assign_cluster(updated.cluster_state());
                }
                *stored = annotated;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deduplication::{deduplicate_store, Deduplicator};

    #[test]
    fn test_insert_assigns_monotonic_ids() {
        let mut store = MemoryStore::new();
        let a = store.insert(RawRecord::new().with_title("Opera"));
        let b = store.insert(RawRecord::new().with_title("Opera"));
        assert_eq!((a, b), (1, 2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_deduplicate_store_persists_annotations() {
        let mut store = MemoryStore::new();
        store.insert(
            RawRecord::new()
                .with_title("Disputatio de Anima")
                .with_date("1650"),
        );
        store.insert(
            RawRecord::new()
                .with_title("DISPVTATIO DE ANIMA")
                .with_date("1651"),
        );

        let report = deduplicate_store(&mut store, &Deduplicator::sequential()).unwrap();
        assert_eq!(report.clusters, 1);

        let second = store.get(2).unwrap();
        assert_eq!(second.canonical_id(), Some(1));
        assert_eq!(second.title_normalized(), Some("disputatio anima"));
        assert_eq!(second.year(), Some(1651));
    }

    #[test]
    fn test_load_resets_cluster_state() {
        let mut store = MemoryStore::new();
        store.insert(RawRecord::new().with_title("Opera Omnia").with_date("1600"));
        store.insert(RawRecord::new().with_title("Opera Omnia").with_date("1600"));
        deduplicate_store(&mut store, &Deduplicator::sequential()).unwrap();

        let loaded = store.load_records().unwrap();
        assert!(loaded
            .iter()
            .all(|r| r.cluster_state() == ClusterState::Unassigned));
        assert!(loaded.iter().all(|r| r.normalized().is_some()));
    }
}

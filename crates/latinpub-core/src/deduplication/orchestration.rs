//! Deduplication pipeline orchestration
//!
//! Runs the four stages over a fixed record set:
//! normalize, partition, score within partitions, resolve clusters.
//! Normalization and scoring are parallel across records and partitions;
//! cluster resolution is a single pass over the merged match edges.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clustering::{apply_clusters, resolve_clusters, MatchEdge};
use super::partition::{pairs, PartitionIndex};
use super::similarity::score;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::record::{NormalizedFields, Record, RecordId};
use crate::store::RecordStore;

/// Summary of one deduplication pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeduplicationReport {
    pub total_records: usize,
    /// Records left out of partitioning because their year is unknown
    pub excluded_records: usize,
    pub partitions: usize,
    /// Partitions with two or more records
    pub comparable_partitions: usize,
    pub comparisons: usize,
    pub matches: usize,
    pub clusters: usize,
    /// Records belonging to some cluster, canonical ones included
    pub records_in_clusters: usize,
    /// Records pointing at a canonical record
    pub duplicates_marked: usize,
    /// Records that are singletons or canonical representatives
    pub unique_works: usize,
}

/// Batch deduplication over a full record set
#[derive(Debug, Clone)]
pub struct Deduplicator {
    parallel: bool,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every stage on the calling thread
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            parallel: config.parallel,
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Normalize, partition, score and cluster `records` in place
    ///
    /// Cluster state from any earlier pass is discarded and recomputed, so
    /// running twice over the same records gives the same assignment.
    pub fn run(&self, records: &mut [Record]) -> DeduplicationReport {
        info!(records = records.len(), parallel = self.parallel, "Starting deduplication");

        self.normalize(records);

        let index = PartitionIndex::build(records);
        debug!(
            partitions = index.len(),
            excluded = index.excluded().len(),
            "Built partition index"
        );

        let edges = self.find_matches(records, &index);
        let clusters = resolve_clusters(&edges);
        apply_clusters(records, &clusters);

        let records_in_clusters: usize = clusters.iter().map(|c| c.len()).sum();
        let duplicates_marked = records_in_clusters - clusters.len();
        let report = DeduplicationReport {
            total_records: records.len(),
            excluded_records: index.excluded().len(),
            partitions: index.len(),
            comparable_partitions: index.comparable_partitions(),
            comparisons: index.candidate_pair_count(),
            matches: edges.len(),
            clusters: clusters.len(),
            records_in_clusters,
            duplicates_marked,
            unique_works: records.len() - duplicates_marked,
        };

        info!(
            clusters = report.clusters,
            duplicates = report.duplicates_marked,
            unique_works = report.unique_works,
            "Deduplication complete"
        );

        report
    }

    /// Populate normalized fields on every record that lacks them
    pub fn normalize(&self, records: &mut [Record]) {
        if self.parallel {
            records.par_iter_mut().for_each(|record| {
                record.normalize();
            });
        } else {
            records.iter_mut().for_each(|record| {
                record.normalize();
            });
        }
    }

    /// Score all candidate pairs and keep those at or above the threshold
    ///
    /// Edges come back sorted by endpoint ids.
    pub fn find_matches(&self, records: &[Record], index: &PartitionIndex) -> Vec<MatchEdge> {
        let fields: HashMap<RecordId, &NormalizedFields> = records
            .iter()
            .filter_map(|record| record.normalized().map(|n| (record.id, n)))
            .collect();

        let partitions: Vec<&[RecordId]> = index
            .partitions()
            .map(|(_, ids)| ids)
            .filter(|ids| ids.len() > 1)
            .collect();

        let mut edges: Vec<MatchEdge> = if self.parallel {
            partitions
                .par_iter()
                .flat_map_iter(|ids| score_partition(ids, &fields))
                .collect()
        } else {
            partitions
                .iter()
                .flat_map(|ids| score_partition(ids, &fields))
                .collect()
        };

        edges.sort_by(|x, y| (x.a, x.b).cmp(&(y.a, y.b)));
        edges.dedup_by(|x, y| (x.a, x.b) == (y.a, y.b));
        edges
    }
}

fn score_partition(
    ids: &[RecordId],
    fields: &HashMap<RecordId, &NormalizedFields>,
) -> Vec<MatchEdge> {
    pairs(ids)
        .filter_map(|(a, b)| {
            let result = score(fields.get(&a)?, fields.get(&b)?);
            result
                .is_match()
                .then(|| MatchEdge::new(a, b, result.composite))
        })
        .collect()
}

/// Load every record from `store`, deduplicate, and write annotations back
///
/// All reads happen before and all writes after the compute phase.
pub fn deduplicate_store<S>(store: &mut S, deduplicator: &Deduplicator) -> Result<DeduplicationReport>
where
    S: RecordStore + ?Sized,
{
    let mut records = store.load_records()?;
    let report = deduplicator.run(&mut records);
    store.save_annotations(&records)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ClusterState, RawRecord};

    fn record(id: RecordId, title: &str, creator: Option<&str>, date: Option<&str>) -> Record {
        let mut raw = RawRecord::new().with_title(title);
        raw.creator = creator.map(str::to_string);
        raw.date_string = date.map(str::to_string);
        Record::new(id, raw)
    }

    #[test]
    fn test_run_empty() {
        let report = Deduplicator::new().run(&mut []);
        assert_eq!(report, DeduplicationReport::default());
    }

    #[test]
    fn test_run_marks_duplicates() {
        let mut records = vec![
            record(1, "Disputatio de Anima", None, Some("1650")),
            record(2, "DISPVTATIO DE ANIMA", None, Some("1651")),
            record(3, "Tractatus de Chemia", None, Some("1650")),
        ];
        let report = Deduplicator::sequential().run(&mut records);

        assert_eq!(records[0].cluster_state(), ClusterState::Canonical);
        assert_eq!(records[1].canonical_id(), Some(1));
        assert_eq!(records[2].canonical_id(), None);
        assert_eq!(report.clusters, 1);
        assert_eq!(report.duplicates_marked, 1);
        assert_eq!(report.unique_works, 2);
        assert_eq!(report.matches, 1);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let build = || {
            vec![
                record(1, "Opera Omnia", Some("Kepler, Johannes"), Some("1600")),
                record(2, "Opera omnia", Some("Johannes Kepler"), Some("1601")),
                record(3, "Harmonices Mundi", Some("Kepler, Johannes"), Some("1619")),
                record(4, "Harmonices mundi libri V", Some("Kepler, Johannes"), Some("ca. 1619")),
                record(5, "Astronomia Nova", None, None),
            ]
        };
        let mut sequential = build();
        let mut parallel = build();
        let report_a = Deduplicator::sequential().run(&mut sequential);
        let report_b = Deduplicator::new().run(&mut parallel);

        assert_eq!(report_a, report_b);
        for (a, b) in sequential.iter().zip(&parallel) {
            assert_eq!(a.cluster_state(), b.cluster_state());
        }
        assert_eq!(report_a.excluded_records, 1);
    }

    #[test]
    fn test_find_matches_only_within_partitions() {
        let mut records = vec![
            record(1, "Disputatio de Anima", None, Some("1649")),
            record(2, "Disputatio de Anima", None, Some("1650")),
        ];
        let deduplicator = Deduplicator::sequential();
        deduplicator.normalize(&mut records);
        let index = PartitionIndex::build(&records);

        assert!(deduplicator.find_matches(&records, &index).is_empty());
    }
}

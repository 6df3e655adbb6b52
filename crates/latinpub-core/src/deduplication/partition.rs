//! Blocking index: groups records into candidate-duplicate partitions
//!
//! Only records sharing a partition key are ever compared. Records without a
//! year cannot be blocked and are excluded from deduplication entirely.
//! Duplicates whose keys differ (for example 1549 and 1550, which fall in
//! neighbouring five-year buckets) are not found.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::normalization::normalize_fields;
use crate::record::{NormalizedFields, Record, RecordId};

/// Width of a year bucket
pub const YEAR_BUCKET_WIDTH: i32 = 5;

/// Number of leading normalized title tokens in a key
pub const TITLE_PREFIX_TOKENS: usize = 3;

/// Composite blocking key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    /// Year rounded down to a multiple of [`YEAR_BUCKET_WIDTH`]
    pub year_bucket: i32,
    /// First [`TITLE_PREFIX_TOKENS`] title tokens, space-joined (empty if no title)
    pub title_prefix: String,
}

impl PartitionKey {
    /// Key for a normalized record, `None` when the year is unknown
    pub fn for_fields(fields: &NormalizedFields) -> Option<Self> {
        let year = fields.year?;
        Some(Self {
            year_bucket: year_bucket(year),
            title_prefix: title_prefix(fields.title.as_deref()),
        })
    }
}

pub fn year_bucket(year: i32) -> i32 {
    year.div_euclid(YEAR_BUCKET_WIDTH) * YEAR_BUCKET_WIDTH
}

pub fn title_prefix(title: Option<&str>) -> String {
    title
        .map(|t| {
            t.split_whitespace()
                .take(TITLE_PREFIX_TOKENS)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Record ids grouped by partition key
#[derive(Debug, Clone, Default)]
pub struct PartitionIndex {
    partitions: BTreeMap<PartitionKey, Vec<RecordId>>,
    excluded: Vec<RecordId>,
}

impl PartitionIndex {
    /// Build the index over a record set
    ///
    /// Records not yet normalized are normalized on the fly for keying; the
    /// records themselves are not modified.
    pub fn build(records: &[Record]) -> Self {
        let mut index = Self::default();

        for record in records {
            let fields = match record.normalized() {
                Some(fields) => Cow::Borrowed(fields),
                None => Cow::Owned(normalize_fields(&record.raw)),
            };
            match PartitionKey::for_fields(&fields) {
                Some(key) => index.partitions.entry(key).or_default().push(record.id),
                None => index.excluded.push(record.id),
            }
        }

        for ids in index.partitions.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        index.excluded.sort_unstable();
        index.excluded.dedup();

        index
    }

    /// All partitions in key order, member ids ascending
    pub fn partitions(&self) -> impl Iterator<Item = (&PartitionKey, &[RecordId])> {
        self.partitions
            .iter()
            .map(|(key, ids)| (key, ids.as_slice()))
    }

    pub fn get(&self, key: &PartitionKey) -> Option<&[RecordId]> {
        self.partitions.get(key).map(Vec::as_slice)
    }

    /// Ids of records left out because their year is unknown
    pub fn excluded(&self) -> &[RecordId] {
        &self.excluded
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Partitions holding at least two records
    pub fn comparable_partitions(&self) -> usize {
        self.partitions.values().filter(|ids| ids.len() > 1).count()
    }

    /// Number of pairwise comparisons the index implies
    pub fn candidate_pair_count(&self) -> usize {
        self.partitions
            .values()
            .map(|ids| ids.len() * ids.len().saturating_sub(1) / 2)
            .sum()
    }

    /// Every unordered pair of ids sharing a partition, smaller id first
    pub fn candidate_pairs(&self) -> impl Iterator<Item = (RecordId, RecordId)> + '_ {
        self.partitions.values().flat_map(|ids| pairs(ids))
    }
}

/// Unordered pairs within one partition's ascending id list
pub(crate) fn pairs(ids: &[RecordId]) -> impl Iterator<Item = (RecordId, RecordId)> + '_ {
    ids.iter()
        .enumerate()
        .flat_map(move |(i, &a)| ids[i + 1..].iter().map(move |&b| (a, b)))
}

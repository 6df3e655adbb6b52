//! Deduplication algorithms for harvested publication records
//!
//! This module provides normalization, blocking, similarity scoring and
//! cluster resolution to identify records describing the same work.

mod clustering;
mod normalization;
mod orchestration;
mod partition;
mod similarity;

pub use clustering::{apply_clusters, resolve_clusters, Cluster, MatchEdge};
pub use normalization::{extract_year, normalize_creator, normalize_fields, normalize_title};
pub use orchestration::{deduplicate_store, DeduplicationReport, Deduplicator};
pub use partition::{
    title_prefix, year_bucket, PartitionIndex, PartitionKey, TITLE_PREFIX_TOKENS,
    YEAR_BUCKET_WIDTH,
};
pub use similarity::{
    score, token_set_similarity, year_proximity, SimilarityScore, CREATOR_WEIGHT,
    MATCH_THRESHOLD, TITLE_WEIGHT, YEAR_TOLERANCE, YEAR_WEIGHT,
};

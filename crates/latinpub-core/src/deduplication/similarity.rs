//! Similarity scoring for deduplication
//!
//! Scores are on a 0-100 scale. The weights and the match threshold are fixed
//! so that repeated runs over the same records produce the same clusters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use crate::record::NormalizedFields;

pub const TITLE_WEIGHT: f64 = 0.6;
pub const CREATOR_WEIGHT: f64 = 0.3;
pub const YEAR_WEIGHT: f64 = 0.1;

/// Minimum composite score for two records to be considered the same work
pub const MATCH_THRESHOLD: f64 = 85.0;

/// Maximum year difference that still counts as proximate
pub const YEAR_TOLERANCE: i32 = 2;

/// Result of comparing two records
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub title: f64,
    pub creator: f64,
    pub year: f64,
    /// Weighted composite (0.0 to 100.0)
    pub composite: f64,
}

impl SimilarityScore {
    pub fn is_match(&self) -> bool {
        self.composite >= MATCH_THRESHOLD
    }
}

/// Score two normalized records
///
/// The title and year weights always count toward the composite. The creator
/// weight only counts when both sides carry a creator, so records lacking
/// creator data are judged on title and year alone. A missing title scores 0
/// at full weight.
pub fn score(a: &NormalizedFields, b: &NormalizedFields) -> SimilarityScore {
    let title = field_similarity(a.title.as_deref(), b.title.as_deref());
    let creator = field_similarity(a.creator.as_deref(), b.creator.as_deref());
    let year = year_proximity(a.year, b.year);

    let mut weighted = TITLE_WEIGHT * title + YEAR_WEIGHT * year;
    let mut weights = TITLE_WEIGHT + YEAR_WEIGHT;
    if a.creator.is_some() && b.creator.is_some() {
        weighted += CREATOR_WEIGHT * creator;
        weights += CREATOR_WEIGHT;
    }

    SimilarityScore {
        title,
        creator,
        year,
        composite: (weighted / weights).clamp(0.0, 100.0),
    }
}

fn field_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => token_set_similarity(a, b),
        _ => 0.0,
    }
}

/// 100 when both years are known and at most [`YEAR_TOLERANCE`] apart, else 0
pub fn year_proximity(a: Option<i32>, b: Option<i32>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if (a - b).abs() <= YEAR_TOLERANCE => 100.0,
        _ => 0.0,
    }
}

/// Order-independent token set similarity (0.0 to 100.0)
///
/// Tokens shared by both strings are compared against each side's remainder;
/// the best of the pairwise ratios wins. Reaches 100 exactly when one token
/// set contains the other.
pub fn token_set_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let shared = join(tokens_a.intersection(&tokens_b));
    let only_a = join(tokens_a.difference(&tokens_b));
    let only_b = join(tokens_b.difference(&tokens_a));

    if !shared.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }
    if shared.is_empty() {
        return ratio(&only_a, &only_b);
    }

    let combined_a = format!("{} {}", shared, only_a);
    let combined_b = format!("{} {}", shared, only_b);

    ratio(&shared, &combined_a)
        .max(ratio(&shared, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn join<'a>(tokens: impl Iterator<Item = &'a &'a str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}

fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b) * 100.0
}

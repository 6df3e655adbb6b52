//! Text normalization for deduplication comparison
//!
//! Every function here is total: input that cannot be normalized yields
//! `None`, never an error.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::record::{NormalizedFields, RawRecord};

/// Latin function words and generic bibliographic nouns ignored in titles
const LATIN_STOPWORDS: &[&str] = &[
    "de", "in", "ad", "et", "cum", "liber", "opus", "pro", "per", "ex", "quae", "qui", "quod",
    "vel", "sive", "seu", "atque", "ac", "aut", "item", "idem", "hic", "haec", "hoc", "ab", "a",
    "e", "ut", "ne", "nec", "non", "si", "qua", "quo", "quam", "dum", "tum", "iam", "super",
    "sub", "ante", "post", "inter", "contra", "circa", "ergo",
];

/// Significant title tokens kept after stopword removal
const MAX_TITLE_TOKENS: usize = 10;

lazy_static! {
    static ref STOPWORDS: HashSet<String> =
        LATIN_STOPWORDS.iter().map(|w| fold_latin(w)).collect();

    // "1543"
    static ref BARE_YEAR: Regex = Regex::new(r"^(\d{4})$").unwrap();

    // "1543-1545", "1543 – 1545", "1543/1544"
    static ref YEAR_RANGE: Regex = Regex::new(r"^(\d{4})\s*[-–/]\s*\d{4}$").unwrap();

    // "ca. 1543", "[1543]", "1543?", "c1543": a 4-digit run not part of a longer number
    static ref QUALIFIED_YEAR: Regex = Regex::new(r"(?:^|\D)(\d{4})(?:\D|$)").unwrap();

    // "15--", "[15--?]", "15xx"
    static ref CENTURY_PLACEHOLDER: Regex =
        Regex::new(r"(?:^|\D)(\d{2})[-_xX?u]{2}(?:\D|$)").unwrap();
}

/// Compute all normalized fields of a raw record
pub fn normalize_fields(raw: &RawRecord) -> NormalizedFields {
    NormalizedFields {
        title: raw.title.as_deref().and_then(normalize_title),
        creator: raw.creator.as_deref().and_then(normalize_creator),
        year: raw.date_string.as_deref().and_then(extract_year),
    }
}

/// Normalize a title for comparison
///
/// - Converts to lowercase and strips diacritics
/// - Splits on whitespace and punctuation
/// - Folds Latin orthographic variants (v→u, j→i)
/// - Drops stopwords and single-character tokens
/// - Keeps the first ten significant tokens
pub fn normalize_title(title: &str) -> Option<String> {
    let cleaned = strip_diacritics(&title.to_lowercase());

    let tokens: Vec<String> = tokenize(&cleaned)
        .map(fold_latin)
        .filter(|token| token.chars().count() > 1 && !STOPWORDS.contains(token))
        .take(MAX_TITLE_TOKENS)
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Normalize a creator name for comparison
///
/// "Family, Given" is reordered to "given family". Purely numeric tokens
/// (life dates such as "1571-1630") are dropped.
pub fn normalize_creator(creator: &str) -> Option<String> {
    let reordered = match creator.split_once(',') {
        Some((family, given)) => format!("{} {}", given.trim(), family.trim()),
        None => creator.to_string(),
    };

    let cleaned = strip_diacritics(&reordered.to_lowercase());
    let tokens: Vec<&str> = tokenize(&cleaned)
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Extract a publication year from a free-text date
///
/// Rules are tried in order and the first match wins:
/// 1. bare year: "1543"
/// 2. range: "1543-1545" gives the first year
/// 3. qualified: "ca. 1543", "[1543]", "1543?"
/// 4. century placeholder: "15--" gives the mid-century year 1550
pub fn extract_year(date_string: &str) -> Option<i32> {
    let date = date_string.trim();

    if let Some(caps) = BARE_YEAR.captures(date) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = YEAR_RANGE.captures(date) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = QUALIFIED_YEAR.captures(date) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = CENTURY_PLACEHOLDER.captures(date) {
        let century: i32 = caps[1].parse().ok()?;
        return Some(century * 100 + 50);
    }

    None
}

/// Decompose and drop combining marks: "é" -> "e", "ſ" -> "s"
fn strip_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Split on anything that is not a letter or digit
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
}

/// Fold u/v and i/j, which early printers used interchangeably
fn fold_latin(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            'v' => 'u',
            'j' => 'i',
            other => other,
        })
        .collect()
}

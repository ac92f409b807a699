//! Type voting for text columns.

use crate::types::ColumnType;
use crate::utils::{parse_boolean_string, parse_numeric_string};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;

/// Share of sampled values that must parse for a type to win the vote.
pub(crate) const TYPE_VOTE_THRESHOLD: f64 = 0.8;

// Cheap prefilter before handing values to chrono
static DATE_PATTERNS: Lazy<Vec<regex::Regex>> = Lazy::new(|| {
    vec![
        regex::Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
        regex::Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("Invalid regex: MM/DD/YYYY"),
        regex::Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2})?").expect("Invalid regex: datetime"),
    ]
});

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a text cell as a date or datetime.
///
/// Accepts ISO dates, ISO datetimes (with or without offset), `YYYY/MM/DD`
/// and `MM/DD/YYYY`. Offsets are normalized to UTC.
pub(crate) fn parse_datetime_string(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if !DATE_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Pick the quality type of a text column by voting over its non-missing values.
///
/// Numbers are tried first, then dates, then a two-value boolean vocabulary.
/// Anything else, including an empty sample, is categorical.
pub(crate) fn vote_text_type(values: &[&str]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Categorical;
    }
    let total = values.len() as f64;

    let numeric = values
        .iter()
        .filter(|v| parse_numeric_string(v).is_some())
        .count();
    if numeric as f64 / total >= TYPE_VOTE_THRESHOLD {
        return ColumnType::Numeric;
    }

    let datetime = values
        .iter()
        .filter(|v| parse_datetime_string(v).is_some())
        .count();
    if datetime as f64 / total >= TYPE_VOTE_THRESHOLD {
        return ColumnType::Datetime;
    }

    if looks_boolean(values) {
        return ColumnType::Boolean;
    }

    ColumnType::Categorical
}

/// At most two distinct spellings, all from the boolean vocabulary.
fn looks_boolean(values: &[&str]) -> bool {
    let mut distinct: HashSet<String> = HashSet::new();
    for value in values {
        if parse_boolean_string(value).is_none() {
            return false;
        }
        distinct.insert(value.trim().to_ascii_lowercase());
        if distinct.len() > 2 {
            return false;
        }
    }
    true
}

/// Deterministically choose up to `size` positions out of `len`, in ascending order.
pub(crate) fn sample_positions(len: usize, size: usize) -> Vec<usize> {
    if len <= size {
        return (0..len).collect();
    }
    let mut rng = StdRng::seed_from_u64(42);
    let mut positions = rand::seq::index::sample(&mut rng, len, size).into_vec();
    positions.sort_unstable();
    positions
}

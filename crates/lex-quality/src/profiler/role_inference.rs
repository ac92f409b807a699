//! Identifier detection for column profiling.
//!
//! Identifier-like columns (keys, codes, emails) are expected to be almost
//! all distinct, so the analyzers must not report their cardinality.

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum distinct ratio for a column to be considered an identifier.
pub(crate) const MIN_IDENTIFIER_UNIQUE_RATIO: f64 = 0.8;

/// Share of sampled values that must match an identifier pattern.
const PATTERN_MATCH_RATIO: f64 = 0.8;

const ID_KEYWORDS: [&str; 12] = [
    "id", "uuid", "guid", "key", "code", "identifier", "email", "sku", "serial", "ref",
    "account", "ssn",
];

// ID pattern regexes - compiled once at startup
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^[A-Za-z]*\d[A-Za-z0-9]{4,}$").expect("Invalid regex: alphanumeric ID"),
        Regex::new(r"^\d{5,}$").expect("Invalid regex: numeric ID"),
        Regex::new(r"^[A-Z]{2,}[-_]?\d+$").expect("Invalid regex: code pattern"),
        Regex::new(r"^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}$")
            .expect("Invalid regex: UUID"),
        Regex::new(r"^[\w\.+-]+@[\w\.-]+\.\w+$").expect("Invalid regex: email"),
    ]
});

/// Split a column name into lowercase words (`customerId` -> `customer`, `id`).
fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in name.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn name_suggests_identifier(name: &str) -> bool {
    name_tokens(name)
        .iter()
        .any(|token| ID_KEYWORDS.contains(&token.as_str()))
}

/// Decide whether a column is identifier-like.
///
/// The column must be mostly distinct, and either its name carries an
/// identifier keyword or most sampled values match an identifier pattern.
pub(crate) fn is_identifier_like(
    col_name: &str,
    sample_values: &[String],
    unique_count: usize,
    present_count: usize,
) -> bool {
    if present_count == 0 {
        return false;
    }
    let unique_ratio = unique_count as f64 / present_count as f64;
    if unique_ratio < MIN_IDENTIFIER_UNIQUE_RATIO {
        return false;
    }

    if name_suggests_identifier(col_name) {
        return true;
    }

    if sample_values.is_empty() {
        return false;
    }
    let matches = sample_values
        .iter()
        .filter(|v| {
            let trimmed = v.trim();
            ID_PATTERNS.iter().any(|re| re.is_match(trimmed))
        })
        .count();
    matches as f64 / sample_values.len() as f64 >= PATTERN_MATCH_RATIO
}

//! Shared utilities for the quality analyzers.
//!
//! Missing-marker detection, numeric/boolean parsing of text cells and
//! storage dtype helpers used by the profiler and the analyzers.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date or datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Check if a DataType is stored as text.
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

/// Short, stable name of a storage dtype for reports.
pub fn dtype_name(dtype: &DataType) -> String {
    match dtype {
        DataType::String => "String".to_string(),
        DataType::Categorical(_, _) => "Categorical".to_string(),
        DataType::Datetime(_, _) => "Datetime".to_string(),
        other => format!("{other:?}"),
    }
}

// =============================================================================
// Missing Value Markers
// =============================================================================

/// Text placeholders treated as missing, compared case-insensitively after trimming.
pub const MISSING_MARKERS: [&str; 8] = ["na", "n/a", "null", "none", "nan", "#n/a", "missing", "-"];

/// Check if a text cell represents a missing value.
///
/// Empty and whitespace-only strings count as missing.
///
/// ```rust,ignore
/// assert!(is_missing_marker("  N/A "));
/// assert!(is_missing_marker(""));
/// assert!(!is_missing_marker("0"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Clean a string for numeric parsing by removing formatting characters.
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Try to parse a string as a finite f64.
///
/// Handles currency symbols, percentages and thousands separators.
/// `inf` and `nan` spellings are rejected.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Boolean Detection Utilities
// =============================================================================

/// Common boolean true representations.
pub const BOOLEAN_TRUE_VALUES: [&str; 6] = ["true", "yes", "t", "y", "on", "1"];

/// Common boolean false representations.
pub const BOOLEAN_FALSE_VALUES: [&str; 6] = ["false", "no", "f", "n", "off", "0"];

/// Parse a text cell from the boolean vocabulary.
pub fn parse_boolean_string(s: &str) -> Option<bool> {
    let lower = s.trim().to_ascii_lowercase();
    if BOOLEAN_TRUE_VALUES.iter().any(|&v| v == lower) {
        Some(true)
    } else if BOOLEAN_FALSE_VALUES.iter().any(|&v| v == lower) {
        Some(false)
    } else {
        None
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Render a ratio as a percentage with one decimal, e.g. `0.125` -> `12.5%`.
pub fn format_pct(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Round to `decimals` places; keeps reported floats stable in JSON.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// =============================================================================
// Tests
// =============================================================================

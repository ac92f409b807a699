//! Exact and partial duplicate detection.
//!
//! Rows are fingerprinted with a deterministic 64-bit hash of every typed
//! cell. Fingerprints are grouped by row-range shards (rayon fold/reduce)
//! and each group is re-checked cell by cell, so a hash collision can never
//! merge two different rows.

use crate::config::QualityConfig;
use crate::error::{QualityError, Result};
use crate::profiler::TypedColumn;
use crate::types::{ColumnType, Finding, FindingKind, Severity};
use crate::utils::format_pct;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use tracing::debug;

/// A set of identical rows, by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub rows: Vec<usize>,
}

impl DuplicateGroup {
    pub fn size(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSummary {
    pub exact_duplicates: usize,
    pub partial_duplicates: usize,
    /// `exact_duplicates / row_count * 100`.
    pub duplicate_percentage: f64,
    /// Columns used for partial duplicate matching.
    pub subset_columns: Vec<String>,
    pub exact_group_count: usize,
    /// Largest exact groups, capped at `max_reported_duplicate_groups`.
    pub groups: Vec<DuplicateGroup>,
}

impl DuplicateSummary {
    pub fn empty() -> Self {
        Self {
            exact_duplicates: 0,
            partial_duplicates: 0,
            duplicate_percentage: 0.0,
            subset_columns: Vec::new(),
            exact_group_count: 0,
            groups: Vec::new(),
        }
    }
}

fn duplicate_severity(percentage: f64) -> Severity {
    if percentage > 10.0 {
        Severity::High
    } else if percentage > 1.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Minimum numeric columns for the default partial-duplicate subset.
///
/// Repeats of a single numeric value are ordinary, not near-duplicate rows.
const MIN_DEFAULT_SUBSET_COLUMNS: usize = 2;

/// Resolve the partial-duplicate subset to column positions.
///
/// Defaults to every numeric column, or to no columns when there are fewer
/// than two. Unknown names are an error.
pub fn resolve_subset(columns: &[TypedColumn], config: &QualityConfig) -> Result<Vec<usize>> {
    match &config.duplicate_subset_columns {
        Some(names) => names
            .iter()
            .map(|name| {
                columns
                    .iter()
                    .position(|c| c.name() == name)
                    .ok_or_else(|| QualityError::ColumnNotFound(name.clone()))
            })
            .collect(),
        None => {
            let numeric: Vec<usize> = columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.inferred_type() == ColumnType::Numeric)
                .map(|(i, _)| i)
                .collect();
            if numeric.len() < MIN_DEFAULT_SUBSET_COLUMNS {
                Ok(Vec::new())
            } else {
                Ok(numeric)
            }
        }
    }
}

/// Run exact and partial duplicate detection.
pub fn analyze_duplicates(
    columns: &[TypedColumn],
    config: &QualityConfig,
) -> Result<(DuplicateSummary, Vec<Finding>)> {
    let subset = resolve_subset(columns, config)?;
    let row_count = columns.first().map_or(0, TypedColumn::len);
    if row_count == 0 {
        return Ok((DuplicateSummary::empty(), Vec::new()));
    }

    let all_columns: Vec<usize> = (0..columns.len()).collect();
    let all_rows: Vec<usize> = (0..row_count).collect();
    let exact_groups = group_rows(columns, &all_columns, &all_rows);
    let exact_duplicates: usize = exact_groups.iter().map(|g| g.size() - 1).sum();

    // Only the first occurrence of each exact group takes part in partial matching
    let first_occurrences: Vec<usize> = {
        let mut repeated = vec![false; row_count];
        for group in &exact_groups {
            for &row in &group.rows[1..] {
                repeated[row] = true;
            }
        }
        all_rows.iter().copied().filter(|&r| !repeated[r]).collect()
    };
    let partial_duplicates: usize = if subset.is_empty() {
        0
    } else {
        group_rows(columns, &subset, &first_occurrences)
            .iter()
            .map(|g| g.size() - 1)
            .sum()
    };

    let duplicate_percentage = exact_duplicates as f64 / row_count as f64 * 100.0;
    debug!(
        "Duplicates: {} exact in {} groups, {} partial",
        exact_duplicates,
        exact_groups.len(),
        partial_duplicates
    );

    let mut findings = Vec::new();
    if exact_duplicates + partial_duplicates > 0 {
        findings.push(Finding::new(
            FindingKind::Duplicate {
                exact_duplicates,
                partial_duplicates,
                duplicate_percentage,
            },
            Vec::new(),
            duplicate_severity(duplicate_percentage),
            duplicate_percentage,
            format!(
                "{} exact duplicate rows ({}) and {} partial duplicates",
                exact_duplicates,
                format_pct(duplicate_percentage / 100.0),
                partial_duplicates
            ),
        ));
    }

    let exact_group_count = exact_groups.len();
    let mut groups = exact_groups;
    groups.sort_by(|a, b| b.size().cmp(&a.size()).then(a.rows[0].cmp(&b.rows[0])));
    groups.truncate(config.max_reported_duplicate_groups);

    let summary = DuplicateSummary {
        exact_duplicates,
        partial_duplicates,
        duplicate_percentage,
        subset_columns: subset.iter().map(|&i| columns[i].name().to_string()).collect(),
        exact_group_count,
        groups,
    };
    Ok((summary, findings))
}

fn fingerprint(columns: &[TypedColumn], subset: &[usize], row: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    for &col in subset {
        columns[col].hash_cell(row, &mut hasher);
    }
    hasher.finish()
}

fn rows_equal(columns: &[TypedColumn], subset: &[usize], a: usize, b: usize) -> bool {
    subset.iter().all(|&col| columns[col].cells_equal(a, b))
}

/// Group `rows` by their cells in `subset`, returning only groups with more
/// than one row, ordered by first row.
fn group_rows(columns: &[TypedColumn], subset: &[usize], rows: &[usize]) -> Vec<DuplicateGroup> {
    let buckets: HashMap<u64, Vec<usize>> = rows
        .par_iter()
        .fold(HashMap::new, |mut acc: HashMap<u64, Vec<usize>>, &row| {
            acc.entry(fingerprint(columns, subset, row))
                .or_default()
                .push(row);
            acc
        })
        .reduce(HashMap::new, |mut left, right| {
            for (hash, mut rows) in right {
                left.entry(hash).or_default().append(&mut rows);
            }
            left
        });

    let mut groups: Vec<DuplicateGroup> = Vec::new();
    for (_, mut bucket) in buckets {
        if bucket.len() < 2 {
            continue;
        }
        bucket.sort_unstable();
        // Split hash collisions
        let mut verified: Vec<Vec<usize>> = Vec::new();
        for row in bucket {
            match verified
                .iter_mut()
                .find(|g| rows_equal(columns, subset, g[0], row))
            {
                Some(group) => group.push(row),
                None => verified.push(vec![row]),
            }
        }
        groups.extend(
            verified
                .into_iter()
                .filter(|g| g.len() > 1)
                .map(|rows| DuplicateGroup { rows }),
        );
    }
    groups.sort_by_key(|g| g.rows[0]);
    groups
}

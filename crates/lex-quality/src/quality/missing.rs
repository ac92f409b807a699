//! Missing-value analysis: per-column ratios, jointly-missing column pairs
//! and a heuristic MCAR/MNAR split.
//!
//! The MCAR/MNAR scores are a heuristic over correlations, not a
//! statistical test. A column counts as *dependent* when its missingness
//! correlates with another column's missingness, or with another numeric
//! column's observed values (point-biserial correlation).

use crate::config::QualityConfig;
use crate::profiler::TypedColumn;
use crate::profiler::statistics::pearson;
use crate::types::{Finding, FindingKind, Severity};
use crate::utils::{format_pct, round_to};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fewer rows than this and no correlation is attempted.
pub const MIN_CORRELATION_ROWS: usize = 10;

/// Correlations at or above this magnitude are reported as High.
const STRONG_CORRELATION: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing_count: usize,
    pub missing_ratio: f64,
}

/// A pair of columns whose missingness is correlated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCorrelation {
    pub first: String,
    pub second: String,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValueSummary {
    pub total_missing_cells: usize,
    pub missing_cell_ratio: f64,
    pub columns_with_missing: usize,
    pub rows_with_missing: usize,
    pub columns: Vec<ColumnMissing>,
    pub correlated_pairs: Vec<MissingCorrelation>,
    pub mcar_score: f64,
    pub mnar_score: f64,
    /// `false` when no correlation could be computed and the scores are the neutral default.
    pub pattern_evaluated: bool,
}

impl MissingValueSummary {
    /// Summary for a dataset with no rows.
    pub fn empty(neutral_score: f64) -> Self {
        Self {
            total_missing_cells: 0,
            missing_cell_ratio: 0.0,
            columns_with_missing: 0,
            rows_with_missing: 0,
            columns: Vec::new(),
            correlated_pairs: Vec::new(),
            mcar_score: neutral_score,
            mnar_score: neutral_score,
            pattern_evaluated: false,
        }
    }
}

fn missing_severity(ratio: f64) -> Severity {
    if ratio > 0.30 {
        Severity::Critical
    } else if ratio > 0.10 {
        Severity::High
    } else if ratio > 0.02 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Run the missing-value analysis over profiled columns.
pub fn analyze_missing(
    columns: &[TypedColumn],
    config: &QualityConfig,
) -> (MissingValueSummary, Vec<Finding>) {
    let row_count = columns.first().map_or(0, TypedColumn::len);
    if row_count == 0 {
        return (
            MissingValueSummary::empty(config.missingness_neutral_score),
            Vec::new(),
        );
    }

    let mut findings = Vec::new();
    let mut per_column = Vec::with_capacity(columns.len());
    for column in columns {
        let profile = &column.profile;
        let ratio = profile.missing_ratio();
        per_column.push(ColumnMissing {
            column: profile.name.clone(),
            missing_count: profile.missing_count,
            missing_ratio: ratio,
        });
        if profile.missing_count > 0 {
            findings.push(Finding::new(
                FindingKind::MissingValue {
                    missing_count: profile.missing_count,
                    missing_ratio: ratio,
                },
                vec![profile.name.clone()],
                missing_severity(ratio),
                ratio,
                format!(
                    "Column '{}' has {} missing values ({})",
                    profile.name,
                    profile.missing_count,
                    format_pct(ratio)
                ),
            ));
        }
    }

    let total_missing_cells: usize = columns.iter().map(|c| c.profile.missing_count).sum();
    let total_cells = row_count * columns.len();
    let rows_with_missing = (0..row_count)
        .filter(|&row| columns.iter().any(|c| c.missing[row]))
        .count();
    let columns_with_missing = columns
        .iter()
        .filter(|c| c.profile.missing_count > 0)
        .count();

    let pattern = MissingPattern::evaluate(columns, config);
    for pair in &pattern.correlated_pairs {
        let severity = if pair.coefficient.abs() >= STRONG_CORRELATION {
            Severity::High
        } else {
            Severity::Medium
        };
        findings.push(Finding::new(
            FindingKind::CorrelatedMissing {
                coefficient: pair.coefficient,
            },
            vec![pair.first.clone(), pair.second.clone()],
            severity,
            pair.coefficient,
            format!(
                "Missing values in '{}' and '{}' occur together (r = {:.2})",
                pair.first, pair.second, pair.coefficient
            ),
        ));
    }

    let (mcar_score, mnar_score) = if pattern.evaluated && columns_with_missing > 0 {
        let mnar = pattern.dependent_columns as f64 / columns_with_missing as f64;
        (round_to(1.0 - mnar, 4), round_to(mnar, 4))
    } else {
        (
            config.missingness_neutral_score,
            config.missingness_neutral_score,
        )
    };

    debug!(
        "Missing analysis: {} cells missing, {} correlated pairs, mnar={:.2}",
        total_missing_cells,
        pattern.correlated_pairs.len(),
        mnar_score
    );

    let summary = MissingValueSummary {
        total_missing_cells,
        missing_cell_ratio: total_missing_cells as f64 / total_cells as f64,
        columns_with_missing,
        rows_with_missing,
        columns: per_column,
        correlated_pairs: pattern.correlated_pairs,
        mcar_score,
        mnar_score,
        pattern_evaluated: pattern.evaluated,
    };
    (summary, findings)
}

/// Result of the pairwise correlation pass.
struct MissingPattern {
    correlated_pairs: Vec<MissingCorrelation>,
    dependent_columns: usize,
    evaluated: bool,
}

impl MissingPattern {
    fn evaluate(columns: &[TypedColumn], config: &QualityConfig) -> Self {
        let row_count = columns.first().map_or(0, TypedColumn::len);
        let threshold = config.missing_correlation_threshold;
        let not_evaluated = Self {
            correlated_pairs: Vec::new(),
            dependent_columns: 0,
            evaluated: false,
        };
        if row_count < MIN_CORRELATION_ROWS || columns.len() < 2 {
            return not_evaluated;
        }

        // Columns whose missingness actually varies
        let candidates: Vec<usize> = (0..columns.len())
            .filter(|&i| {
                let missing = columns[i].profile.missing_count;
                missing > 0 && missing < row_count
            })
            .collect();
        if candidates.is_empty() {
            return not_evaluated;
        }

        let indicators: Vec<Vec<f64>> = columns
            .iter()
            .map(|c| c.missing.iter().map(|&m| if m { 1.0 } else { 0.0 }).collect())
            .collect();
        let indicators = &indicators;

        let pairs: Vec<(usize, usize)> = candidates
            .iter()
            .enumerate()
            .flat_map(|(pos, &i)| candidates[pos + 1..].iter().map(move |&j| (i, j)))
            .collect();
        let pair_results: Vec<(usize, usize, Option<f64>)> = pairs
            .par_iter()
            .map(|&(i, j)| (i, j, pearson(&indicators[i], &indicators[j])))
            .collect();

        // Missingness of one column against observed values of another
        let value_results: Vec<(usize, Option<f64>)> = candidates
            .par_iter()
            .flat_map_iter(|&i| {
                columns
                    .iter()
                    .enumerate()
                    .filter(move |&(j, _)| j != i)
                    .map(move |(_, other)| (i, point_biserial(&indicators[i], other)))
            })
            .collect();

        let mut evaluated = false;
        let mut dependent = vec![false; columns.len()];
        let mut correlated_pairs = Vec::new();

        for (i, j, r) in pair_results {
            let Some(r) = r else { continue };
            evaluated = true;
            if r.abs() > threshold {
                dependent[i] = true;
                dependent[j] = true;
                correlated_pairs.push(MissingCorrelation {
                    first: columns[i].name().to_string(),
                    second: columns[j].name().to_string(),
                    coefficient: round_to(r, 4),
                });
            }
        }
        for (i, r) in value_results {
            let Some(r) = r else { continue };
            evaluated = true;
            if r.abs() > threshold {
                dependent[i] = true;
            }
        }

        Self {
            correlated_pairs,
            dependent_columns: dependent.iter().filter(|d| **d).count(),
            evaluated,
        }
    }
}

/// Correlation between a missing indicator and a numeric column's observed
/// values, over rows where the numeric column is present.
fn point_biserial(indicator: &[f64], other: &TypedColumn) -> Option<f64> {
    let observed = other.numeric_values();
    if observed.len() < MIN_CORRELATION_ROWS {
        return None;
    }
    let (flags, values): (Vec<f64>, Vec<f64>) = observed
        .iter()
        .map(|&(row, value)| (indicator[row], value))
        .unzip();
    pearson(&flags, &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::profile_dataset;
    use polars::prelude::*;

    fn run(df: &DataFrame) -> (MissingValueSummary, Vec<Finding>) {
        let config = QualityConfig::default();
        let columns = profile_dataset(df, &config).unwrap();
        analyze_missing(&columns, &config)
    }

    #[test]
    fn test_missing_severity_tiers() {
        assert_eq!(missing_severity(0.5), Severity::Critical);
        assert_eq!(missing_severity(0.2), Severity::High);
        assert_eq!(missing_severity(0.05), Severity::Medium);
        assert_eq!(missing_severity(0.01), Severity::Low);
    }

    #[test]
    fn test_per_column_findings() {
        let df = df! {
            "a" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "b" => [Some("x"), Some("y"), Some("z"), Some("w")],
        }
        .unwrap();

        let (summary, findings) = run(&df);
        assert_eq!(summary.total_missing_cells, 1);
        assert_eq!(summary.columns_with_missing, 1);
        assert_eq!(summary.rows_with_missing, 1);
        assert!((summary.missing_cell_ratio - 0.125).abs() < 1e-12);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].columns, vec!["a".to_string()]);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn test_single_column_uses_neutral_scores() {
        let df = df! {
            "only" => [Some(1.0), None, Some(3.0)],
        }
        .unwrap();

        let (summary, _) = run(&df);
        assert!(!summary.pattern_evaluated);
        assert_eq!(summary.mcar_score, 0.5);
        assert_eq!(summary.mnar_score, 0.5);
    }

    #[test]
    fn test_jointly_missing_columns_are_flagged() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut status = Vec::new();
        for i in 0..20 {
            let sentinel = i % 4 == 0;
            status.push(if sentinel { "closed" } else { "open" });
            a.push(if sentinel { None } else { Some(i as f64) });
            b.push(if sentinel { None } else { Some((i * 2) as f64) });
        }
        let df = df! {
            "a" => a,
            "b" => b,
            "status" => status,
        }
        .unwrap();

        let (summary, findings) = run(&df);
        assert_eq!(summary.correlated_pairs.len(), 1);
        let pair = &summary.correlated_pairs[0];
        assert_eq!((pair.first.as_str(), pair.second.as_str()), ("a", "b"));
        assert_eq!(pair.coefficient, 1.0);
        assert!(summary.pattern_evaluated);
        assert_eq!(summary.mnar_score, 1.0);
        assert_eq!(summary.mcar_score, 0.0);

        let correlated: Vec<_> = findings
            .iter()
            .filter(|f| matches!(f.kind, FindingKind::CorrelatedMissing { .. }))
            .collect();
        assert_eq!(correlated.len(), 1);
        assert_eq!(correlated[0].severity, Severity::High);
    }

    #[test]
    fn test_zero_rows() {
        let df = df! {
            "a" => Vec::<f64>::new(),
        }
        .unwrap();

        let (summary, findings) = run(&df);
        assert!(findings.is_empty());
        assert_eq!(summary.missing_cell_ratio, 0.0);
    }
}

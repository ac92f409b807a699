//! Consensus outlier detection for numeric columns.
//!
//! Three detectors vote on every value:
//! - IQR fences: `[Q1 - m*IQR, Q3 + m*IQR]`
//! - Z-score: `|x - mean| / std > t` (sample std)
//! - Modified z-score: `|0.6745 * (x - median) / MAD| > t2`
//!
//! A value is a consensus outlier when at least `min(k, detectors_ran)`
//! detectors flag it. Z-score is skipped when `std == 0` and the modified
//! z-score when `MAD == 0`; either skip caps the column's confidence at
//! Medium.

use crate::config::QualityConfig;
use crate::profiler::TypedColumn;
use crate::profiler::statistics::{
    mean, median_absolute_deviation, median_sorted, quantile_sorted, sample_std, sorted,
};
use crate::types::{Confidence, Finding, FindingKind, Severity};
use crate::utils::format_pct;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Consistency constant relating MAD to the standard deviation of a normal.
const MAD_SCALE: f64 = 0.6745;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    Iqr,
    ZScore,
    ModifiedZScore,
}

/// Values flagged by each detector. `None` when the detector was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCounts {
    pub iqr: Option<usize>,
    pub zscore: Option<usize>,
    pub modified_zscore: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierValue {
    pub row: usize,
    pub value: f64,
    pub votes: usize,
    pub methods: Vec<OutlierMethod>,
    pub confidence: Confidence,
}

/// Outlier analysis of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOutliers {
    pub column: String,
    pub values_checked: usize,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub per_method_counts: MethodCounts,
    pub consensus_outliers: Vec<OutlierValue>,
    /// Values flagged by fewer detectors than the quorum.
    pub single_method_flags: Vec<OutlierValue>,
    /// Best confidence among consensus outliers.
    pub confidence: Option<Confidence>,
    /// Whether a skipped detector capped confidence at Medium.
    pub capped: bool,
}

impl ColumnOutliers {
    pub fn outlier_ratio(&self) -> f64 {
        if self.values_checked == 0 {
            0.0
        } else {
            self.consensus_outliers.len() as f64 / self.values_checked as f64
        }
    }
}

fn outlier_severity(ratio: f64) -> Severity {
    if ratio > 0.05 {
        Severity::High
    } else if ratio > 0.02 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Run consensus detection over every numeric column, in parallel.
pub fn analyze_outliers(
    columns: &[TypedColumn],
    config: &QualityConfig,
) -> (Vec<ColumnOutliers>, Vec<Finding>) {
    let results: Vec<ColumnOutliers> = columns
        .par_iter()
        .filter_map(|column| detect_column_outliers(column, config))
        .collect();

    let findings = results
        .iter()
        .filter(|r| !r.consensus_outliers.is_empty())
        .map(|r| {
            let ratio = r.outlier_ratio();
            Finding::new(
                FindingKind::Outlier {
                    consensus_count: r.consensus_outliers.len(),
                    single_method_count: r.single_method_flags.len(),
                    outlier_ratio: ratio,
                    confidence: r.confidence.unwrap_or(Confidence::Medium),
                },
                vec![r.column.clone()],
                outlier_severity(ratio),
                ratio,
                format!(
                    "Column '{}' has {} consensus outliers ({}) outside [{:.2}, {:.2}]",
                    r.column,
                    r.consensus_outliers.len(),
                    format_pct(ratio),
                    r.lower_fence,
                    r.upper_fence
                ),
            )
        })
        .collect();

    (results, findings)
}

/// Run the three detectors on one column. Returns `None` for non-numeric
/// columns and columns with fewer than `min_outlier_samples` values.
pub fn detect_column_outliers(
    column: &TypedColumn,
    config: &QualityConfig,
) -> Option<ColumnOutliers> {
    let observed = column.numeric_values();
    if observed.is_empty() {
        return None;
    }
    if observed.len() < config.min_outlier_samples {
        debug!(
            "Skipping outliers for '{}': {} values < {}",
            column.name(),
            observed.len(),
            config.min_outlier_samples
        );
        return None;
    }

    let values: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
    let ordered = sorted(&values);

    // IQR always runs
    let q1 = quantile_sorted(&ordered, 0.25)?;
    let q3 = quantile_sorted(&ordered, 0.75)?;
    let iqr = q3 - q1;
    let lower_fence = q1 - config.iqr_multiplier * iqr;
    let upper_fence = q3 + config.iqr_multiplier * iqr;
    let iqr_flags: Vec<bool> = values
        .iter()
        .map(|&x| x < lower_fence || x > upper_fence)
        .collect();

    let zscore_flags: Option<Vec<bool>> = match (mean(&values), sample_std(&values)) {
        (Some(mu), Some(std)) if std > 0.0 => Some(
            values
                .iter()
                .map(|&x| (x - mu).abs() / std > config.zscore_threshold)
                .collect(),
        ),
        _ => None,
    };

    let median = median_sorted(&ordered)?;
    let modified_flags: Option<Vec<bool>> = match median_absolute_deviation(&values, median) {
        Some(mad) if mad > 0.0 => Some(
            values
                .iter()
                .map(|&x| (MAD_SCALE * (x - median) / mad).abs() > config.mad_threshold)
                .collect(),
        ),
        _ => None,
    };

    let capped = zscore_flags.is_none() || modified_flags.is_none();
    if capped {
        debug!(
            "Column '{}': zero spread, outlier confidence capped at medium",
            column.name()
        );
    }

    let detectors: Vec<(OutlierMethod, &[bool])> = [
        (OutlierMethod::Iqr, Some(iqr_flags.as_slice())),
        (OutlierMethod::ZScore, zscore_flags.as_deref()),
        (OutlierMethod::ModifiedZScore, modified_flags.as_deref()),
    ]
    .into_iter()
    .filter_map(|(method, flags)| flags.map(|f| (method, f)))
    .collect();
    let ran = detectors.len();
    let quorum = config.outlier_consensus_k.min(ran);

    let mut consensus_outliers = Vec::new();
    let mut single_method_flags = Vec::new();
    for (pos, &(row, value)) in observed.iter().enumerate() {
        let methods: Vec<OutlierMethod> = detectors
            .iter()
            .filter(|(_, flags)| flags[pos])
            .map(|(method, _)| *method)
            .collect();
        let votes = methods.len();
        if votes == 0 {
            continue;
        }
        if votes >= quorum {
            let confidence = if votes == ran && !capped {
                Confidence::High
            } else {
                Confidence::Medium
            };
            consensus_outliers.push(OutlierValue {
                row,
                value,
                votes,
                methods,
                confidence,
            });
        } else {
            single_method_flags.push(OutlierValue {
                row,
                value,
                votes,
                methods,
                confidence: Confidence::Low,
            });
        }
    }

    let count = |flags: &Option<Vec<bool>>| flags.as_ref().map(|f| f.iter().filter(|x| **x).count());
    let per_method_counts = MethodCounts {
        iqr: Some(iqr_flags.iter().filter(|x| **x).count()),
        zscore: count(&zscore_flags),
        modified_zscore: count(&modified_flags),
    };
    let confidence = consensus_outliers.iter().map(|o| o.confidence).max();

    Some(ColumnOutliers {
        column: column.name().to_string(),
        values_checked: values.len(),
        lower_fence,
        upper_fence,
        per_method_counts,
        consensus_outliers,
        single_method_flags,
        confidence,
        capped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::profile_dataset;
    use polars::prelude::*;

    fn detect(values: &[f64], config: &QualityConfig) -> Option<ColumnOutliers> {
        let df = df! { "x" => values }.unwrap();
        let columns = profile_dataset(&df, config).unwrap();
        detect_column_outliers(&columns[0], config)
    }

    #[test]
    fn test_two_of_three_detectors_agree() {
        let result = detect(&[1.0, 2.0, 3.0, 4.0, 100.0], &QualityConfig::default()).unwrap();

        assert_eq!(result.lower_fence, -1.0);
        assert_eq!(result.upper_fence, 7.0);
        assert_eq!(
            result.per_method_counts,
            MethodCounts {
                iqr: Some(1),
                zscore: Some(0),
                modified_zscore: Some(1),
            }
        );
        assert_eq!(result.consensus_outliers.len(), 1);
        let outlier = &result.consensus_outliers[0];
        assert_eq!(outlier.row, 4);
        assert_eq!(outlier.value, 100.0);
        assert_eq!(outlier.votes, 2);
        assert_eq!(
            outlier.methods,
            vec![OutlierMethod::Iqr, OutlierMethod::ModifiedZScore]
        );
        assert_eq!(outlier.confidence, Confidence::Medium);
        assert!(!result.capped);
    }

    #[test]
    fn test_unanimous_outlier_is_high_confidence() {
        let mut values: Vec<f64> = (0..30).map(|i| 10.0 + (i % 5) as f64).collect();
        values.push(500.0);
        let result = detect(&values, &QualityConfig::default()).unwrap();

        assert_eq!(result.consensus_outliers.len(), 1);
        assert_eq!(result.consensus_outliers[0].value, 500.0);
        assert_eq!(result.consensus_outliers[0].votes, 3);
        assert_eq!(result.consensus_outliers[0].confidence, Confidence::High);
        assert_eq!(result.confidence, Some(Confidence::High));
    }

    #[test]
    fn test_single_detector_flag_is_not_consensus() {
        // MAD is zero, z-score does not flag 6, only IQR does
        let result = detect(&[5.0, 5.0, 5.0, 5.0, 6.0], &QualityConfig::default()).unwrap();

        assert!(result.capped);
        assert_eq!(result.per_method_counts.modified_zscore, None);
        assert!(result.consensus_outliers.is_empty());
        assert_eq!(result.single_method_flags.len(), 1);
        assert_eq!(result.single_method_flags[0].confidence, Confidence::Low);
    }

    #[test]
    fn test_constant_column_skips_spread_detectors() {
        let result = detect(&[7.0; 10], &QualityConfig::default()).unwrap();

        assert!(result.capped);
        assert_eq!(result.per_method_counts.zscore, None);
        assert_eq!(result.per_method_counts.modified_zscore, None);
        assert_eq!(result.per_method_counts.iqr, Some(0));
        assert!(result.consensus_outliers.is_empty());
        assert_eq!(result.confidence, None);
    }

    #[test]
    fn test_too_few_values_are_skipped() {
        assert!(detect(&[1.0, 2.0, 100.0], &QualityConfig::default()).is_none());
    }

    #[test]
    fn test_k_one_accepts_single_votes() {
        let config = QualityConfig::builder().outlier_consensus_k(1).build().unwrap();
        let result = detect(&[1.0, 2.0, 3.0, 4.0, 100.0], &config).unwrap();
        assert_eq!(result.consensus_outliers.len(), 1);
        assert!(result.single_method_flags.is_empty());
    }

    #[test]
    fn test_outlier_severity_tiers() {
        assert_eq!(outlier_severity(0.2), Severity::High);
        assert_eq!(outlier_severity(0.03), Severity::Medium);
        assert_eq!(outlier_severity(0.01), Severity::Low);
    }
}

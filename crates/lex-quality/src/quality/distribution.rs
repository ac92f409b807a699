//! Entropy, cardinality and numeric shape of each column.

use crate::config::QualityConfig;
use crate::profiler::statistics::{Moments, mean, sample_std, shannon_entropy};
use crate::profiler::{TypedColumn, ValueKey};
use crate::quality::normality::{NormalityTest, dagostino_pearson};
use crate::types::{ColumnType, Finding, FindingKind, Severity};
use crate::utils::{format_pct, round_to};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropyClass {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityBucket {
    UltraHigh,
    VeryHigh,
    High,
    Moderate,
    Low,
}

impl CardinalityBucket {
    /// Bucket a distinct ratio against descending boundaries
    /// `[ultra_high, very_high, high, moderate]`.
    pub fn classify(ratio: f64, boundaries: &[f64; 4]) -> Self {
        if ratio > boundaries[0] {
            Self::UltraHigh
        } else if ratio > boundaries[1] {
            Self::VeryHigh
        } else if ratio > boundaries[2] {
            Self::High
        } else if ratio > boundaries[3] {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkewClass {
    Symmetric,
    ModeratelySkewed,
    HighlySkewed,
}

impl SkewClass {
    pub fn from_skewness(g1: f64) -> Self {
        if g1.abs() > 1.0 {
            Self::HighlySkewed
        } else if g1.abs() > 0.5 {
            Self::ModeratelySkewed
        } else {
            Self::Symmetric
        }
    }
}

/// Summary statistics of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericShape {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    pub skew_class: SkewClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDistribution {
    pub column: String,
    pub inferred_type: ColumnType,
    pub entropy: f64,
    /// Entropy divided by `log2(unique_count)`, in [0, 1]; 0 for a single value.
    pub normalized_entropy: f64,
    pub entropy_class: EntropyClass,
    /// Whether distinct values beyond `max_distinct_values` were approximated.
    pub entropy_truncated: bool,
    pub unique_count: usize,
    pub cardinality_ratio: f64,
    pub cardinality_bucket: CardinalityBucket,
    /// Most over least frequent value count, for categorical and boolean
    /// columns with at least two values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imbalance_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericShape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normality: Option<NormalityTest>,
}

/// Analyze every column with at least one value, in parallel.
pub fn analyze_distributions(
    columns: &[TypedColumn],
    config: &QualityConfig,
) -> (Vec<ColumnDistribution>, Vec<Finding>) {
    let results: Vec<(ColumnDistribution, Vec<Finding>)> = columns
        .par_iter()
        .filter_map(|column| analyze_column(column, config))
        .collect();

    let mut distributions = Vec::with_capacity(results.len());
    let mut findings = Vec::new();
    for (distribution, column_findings) in results {
        distributions.push(distribution);
        findings.extend(column_findings);
    }
    (distributions, findings)
}

fn analyze_column(
    column: &TypedColumn,
    config: &QualityConfig,
) -> Option<(ColumnDistribution, Vec<Finding>)> {
    let profile = &column.profile;
    let frequencies = value_frequencies(column, config.max_distinct_values)?;
    let (entropy, truncated) = (frequencies.entropy, frequencies.truncated);
    if truncated {
        warn!(
            "Column '{}' exceeds {} distinct values; entropy is approximate",
            profile.name, config.max_distinct_values
        );
    }

    let normalized_entropy = if profile.unique_count > 1 {
        (entropy / (profile.unique_count as f64).log2()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let entropy_class = if normalized_entropy < config.entropy_low {
        EntropyClass::Low
    } else if normalized_entropy > config.entropy_high {
        EntropyClass::High
    } else {
        EntropyClass::Moderate
    };

    let cardinality_ratio = if profile.row_count == 0 {
        0.0
    } else {
        profile.unique_count as f64 / profile.row_count as f64
    };
    let cardinality_bucket = CardinalityBucket::classify(cardinality_ratio, &config.cardinality_buckets);

    let observed: Vec<f64> = column.numeric_values().into_iter().map(|(_, v)| v).collect();
    let numeric = numeric_shape(&observed);
    let normality = if observed.len() >= config.min_normality_samples {
        dagostino_pearson(&observed)
    } else {
        None
    };

    let mut findings = Vec::new();
    let name = profile.name.clone();

    let categorical_like = matches!(
        profile.inferred_type,
        ColumnType::Categorical | ColumnType::Boolean
    );
    let imbalance_ratio = (categorical_like && frequencies.distinct > 1)
        .then(|| frequencies.most_frequent as f64 / frequencies.least_frequent as f64);
    if categorical_like && entropy_class == EntropyClass::Low {
        let severity = if profile.unique_count <= 1 || normalized_entropy < config.entropy_low / 2.0 {
            Severity::Medium
        } else {
            Severity::Low
        };
        findings.push(Finding::new(
            FindingKind::LowEntropy {
                normalized_entropy,
                unique_count: profile.unique_count,
            },
            vec![name.clone()],
            severity,
            normalized_entropy,
            format!(
                "Column '{}' is dominated by few values (normalized entropy {:.2})",
                name, normalized_entropy
            ),
        ));
    }

    if profile.inferred_type == ColumnType::Categorical && !profile.identifier_like {
        let severity = match cardinality_bucket {
            CardinalityBucket::UltraHigh => Some(Severity::High),
            CardinalityBucket::VeryHigh => Some(Severity::Medium),
            _ => None,
        };
        if let Some(severity) = severity {
            findings.push(Finding::new(
                FindingKind::HighCardinality {
                    cardinality_ratio,
                    bucket: cardinality_bucket,
                },
                vec![name.clone()],
                severity,
                cardinality_ratio,
                format!(
                    "Column '{}' has {} distinct values ({} of rows)",
                    name,
                    profile.unique_count,
                    format_pct(cardinality_ratio)
                ),
            ));
        }
    }

    if let Some(ratio) = imbalance_ratio
        && ratio > config.imbalance_ratio
    {
        let severity = if ratio > config.severe_imbalance_ratio {
            Severity::High
        } else {
            Severity::Medium
        };
        findings.push(Finding::new(
            FindingKind::ClassImbalance {
                imbalance_ratio: ratio,
                majority_count: frequencies.most_frequent,
                minority_count: frequencies.least_frequent,
            },
            vec![name.clone()],
            severity,
            ratio,
            format!(
                "Column '{}' is imbalanced: its most common value occurs {:.1}x as often as its rarest",
                name, ratio
            ),
        ));
    }

    if let Some(test) = &normality
        && test.p_value < config.normality_alpha
    {
        findings.push(Finding::new(
            FindingKind::NonNormal {
                statistic: test.statistic,
                p_value: test.p_value,
            },
            vec![name.clone()],
            Severity::Low,
            test.p_value,
            format!(
                "Column '{}' is not normally distributed (p = {:.4})",
                name, test.p_value
            ),
        ));
    }

    debug!(
        "Distribution '{}': H_norm={:.3} ({:?}), cardinality {:?}",
        name, normalized_entropy, entropy_class, cardinality_bucket
    );

    let distribution = ColumnDistribution {
        column: name,
        inferred_type: profile.inferred_type,
        entropy: round_to(entropy, 6),
        normalized_entropy: round_to(normalized_entropy, 6),
        entropy_class,
        entropy_truncated: truncated,
        unique_count: profile.unique_count,
        cardinality_ratio,
        cardinality_bucket,
        imbalance_ratio: imbalance_ratio.map(|r| round_to(r, 6)),
        numeric,
        normality,
    };
    Some((distribution, findings))
}

/// Frequency table summary of a column's typed values.
struct ValueFrequencies {
    /// Shannon entropy in bits.
    entropy: f64,
    truncated: bool,
    distinct: usize,
    most_frequent: usize,
    least_frequent: usize,
}

/// Tabulate the column's typed values.
///
/// At most `max_distinct` values are tabulated; values first seen after the
/// table is full count as singletons. Returns `None` when the column has no
/// conforming values.
fn value_frequencies(column: &TypedColumn, max_distinct: usize) -> Option<ValueFrequencies> {
    let mut table: HashMap<ValueKey<'_>, usize> = HashMap::new();
    let mut overflow = 0usize;
    for row in 0..column.len() {
        let Some(key) = column.key(row) else { continue };
        if let Some(count) = table.get_mut(&key) {
            *count += 1;
        } else if table.len() < max_distinct {
            table.insert(key, 1);
        } else {
            overflow += 1;
        }
    }
    if table.is_empty() {
        return None;
    }

    let mut counts: Vec<usize> = table.into_values().collect();
    counts.extend(std::iter::repeat_n(1, overflow));
    let most_frequent = counts.iter().copied().max()?;
    let least_frequent = counts.iter().copied().min()?;
    Some(ValueFrequencies {
        distinct: counts.len(),
        most_frequent,
        least_frequent,
        truncated: overflow > 0,
        entropy: shannon_entropy(&mut counts),
    })
}

fn numeric_shape(values: &[f64]) -> Option<NumericShape> {
    let moments = Moments::from_values(values)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let skewness = moments.skewness();
    Some(NumericShape {
        mean: mean(values)?,
        std: sample_std(values).unwrap_or(0.0),
        min,
        max,
        skewness,
        excess_kurtosis: moments.excess_kurtosis(),
        skew_class: SkewClass::from_skewness(skewness),
    })
}

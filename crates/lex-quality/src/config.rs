//! Configuration types for the quality engine.
//!
//! A [`QualityConfig`] is an immutable value built once per invocation,
//! either from [`QualityConfig::default()`], the fluent
//! [`QualityConfig::builder()`], or deserialized from JSON sent by an API
//! layer. [`QualityConfig::validate`] runs before any analysis.

use crate::types::QualityDimension;
use serde::{Deserialize, Serialize};

/// One step of a tiered deduction: metrics strictly above `above` lose
/// `deduction` points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub above: f64,
    pub deduction: f64,
}

impl Tier {
    pub const fn new(above: f64, deduction: f64) -> Self {
        Self { above, deduction }
    }
}

/// Deduction tables for each scored dimension.
///
/// Each list is ordered by threshold, highest first; the first tier whose
/// threshold is exceeded applies. These are empirical defaults meant to be
/// tuned, not derived constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionTiers {
    /// Keyed on the dataset-wide missing-cell ratio (0.0 - 1.0).
    pub completeness: Vec<Tier>,
    /// Keyed on the exact-duplicate percentage (0 - 100).
    pub uniqueness: Vec<Tier>,
    /// Keyed on the consensus-outlier ratio over numeric cells (0.0 - 1.0).
    pub validity: Vec<Tier>,
    /// Keyed on the share of columns with entropy/cardinality/type anomalies.
    pub consistency: Vec<Tier>,
    /// Keyed on dataset age in days.
    pub timeliness_days: Vec<Tier>,
    /// Validity points lost per type-mismatch finding.
    pub type_mismatch_penalty: f64,
    /// Maximum validity points lost to type mismatches.
    pub type_mismatch_cap: f64,
}

impl Default for DeductionTiers {
    fn default() -> Self {
        Self {
            completeness: vec![
                Tier::new(0.5, 50.0),
                Tier::new(0.3, 40.0),
                Tier::new(0.2, 30.0),
                Tier::new(0.1, 20.0),
                Tier::new(0.05, 10.0),
                Tier::new(0.0, 5.0),
            ],
            uniqueness: vec![
                Tier::new(10.0, 10.0),
                Tier::new(5.0, 7.0),
                Tier::new(1.0, 5.0),
                Tier::new(0.0, 2.0),
            ],
            validity: vec![
                Tier::new(0.05, 12.0),
                Tier::new(0.02, 8.0),
                Tier::new(0.0, 4.0),
            ],
            consistency: vec![
                Tier::new(0.3, 10.0),
                Tier::new(0.1, 6.0),
                Tier::new(0.0, 3.0),
            ],
            timeliness_days: vec![
                Tier::new(365.0, 40.0),
                Tier::new(90.0, 25.0),
                Tier::new(30.0, 10.0),
                Tier::new(7.0, 5.0),
            ],
            type_mismatch_penalty: 3.0,
            type_mismatch_cap: 8.0,
        }
    }
}

/// Relative weight of each sub-score in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub completeness: f64,
    pub consistency: f64,
    pub validity: f64,
    pub uniqueness: f64,
    pub timeliness: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            completeness: 1.0,
            consistency: 1.0,
            validity: 1.0,
            uniqueness: 1.0,
            timeliness: 1.0,
        }
    }
}

impl DimensionWeights {
    pub fn get(&self, dimension: QualityDimension) -> f64 {
        match dimension {
            QualityDimension::Completeness => self.completeness,
            QualityDimension::Consistency => self.consistency,
            QualityDimension::Validity => self.validity,
            QualityDimension::Uniqueness => self.uniqueness,
            QualityDimension::Timeliness => self.timeliness,
        }
    }

    pub fn total(&self) -> f64 {
        QualityDimension::ALL.iter().map(|d| self.get(*d)).sum()
    }
}

/// Configuration for a single analysis.
///
/// # Example
///
/// ```rust,ignore
/// use lex_quality::config::QualityConfig;
///
/// let config = QualityConfig::builder()
///     .outlier_consensus_k(3)
///     .iqr_multiplier(3.0)
///     .duplicate_subset_columns(vec!["amount".into(), "quantity".into()])
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Number of detectors that must agree before a value is an outlier.
    /// Default: 2
    pub outlier_consensus_k: usize,

    /// IQR fence multiplier. Default: 1.5
    pub iqr_multiplier: f64,

    /// Z-score threshold. Default: 3.0
    pub zscore_threshold: f64,

    /// Modified z-score (MAD) threshold. Default: 3.5
    pub mad_threshold: f64,

    /// Numeric columns with fewer values are not checked for outliers.
    /// Default: 5
    pub min_outlier_samples: usize,

    /// Normalized entropy below this is "low". Default: 0.3
    pub entropy_low: f64,

    /// Normalized entropy above this is "high". Default: 0.8
    pub entropy_high: f64,

    /// Maximum distinct values enumerated per column for entropy.
    /// Default: 10_000
    pub max_distinct_values: usize,

    /// Cardinality bucket boundaries, highest first:
    /// ultra-high, very-high, high, moderate. Default: [0.9, 0.7, 0.5, 0.2]
    pub cardinality_buckets: [f64; 4],

    /// Overall scores below this get a top-level STOP recommendation.
    /// Default: 30
    pub critical_score_threshold: u32,

    /// Overall scores below this (but not below the critical threshold)
    /// get a "comprehensive cleaning needed" recommendation. Default: 60
    pub warning_score_threshold: u32,

    /// Most/least frequent category ratio above which a column is
    /// imbalanced. Default: 10.0
    pub imbalance_ratio: f64,

    /// Imbalance ratio above which the finding is High. Default: 100.0
    pub severe_imbalance_ratio: f64,

    /// Datasets with fewer rows get a small-sample advisory. Default: 50
    pub small_dataset_rows: usize,

    /// Datasets with more rows get a sampling advisory. Default: 1_000_000
    pub large_dataset_rows: usize,

    /// Columns used for partial-duplicate detection.
    /// If None, all numeric columns are used. Default: None
    pub duplicate_subset_columns: Option<Vec<String>>,

    /// Maximum number of duplicate groups listed in the report. Default: 20
    pub max_reported_duplicate_groups: usize,

    /// Missingness correlation above this flags a column pair. Default: 0.5
    pub missing_correlation_threshold: f64,

    /// MCAR/MNAR score used when no correlation can be evaluated.
    /// Default: 0.5
    pub missingness_neutral_score: f64,

    /// Significance level of the normality test. Default: 0.05
    pub normality_alpha: f64,

    /// Minimum values required to run the normality test. Default: 30
    pub min_normality_samples: usize,

    /// Values sampled per text column for type inference. Default: 1000
    pub type_inference_sample_size: usize,

    /// Weights of the five sub-scores. Default: equal
    pub subscore_weights: DimensionWeights,

    /// Deduction tables of the scorer.
    pub deduction_tiers: DeductionTiers,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            outlier_consensus_k: 2,
            iqr_multiplier: 1.5,
            zscore_threshold: 3.0,
            mad_threshold: 3.5,
            min_outlier_samples: 5,
            entropy_low: 0.3,
            entropy_high: 0.8,
            max_distinct_values: 10_000,
            cardinality_buckets: [0.9, 0.7, 0.5, 0.2],
            critical_score_threshold: 30,
            warning_score_threshold: 60,
            imbalance_ratio: 10.0,
            severe_imbalance_ratio: 100.0,
            small_dataset_rows: 50,
            large_dataset_rows: 1_000_000,
            duplicate_subset_columns: None,
            max_reported_duplicate_groups: 20,
            missing_correlation_threshold: 0.5,
            missingness_neutral_score: 0.5,
            normality_alpha: 0.05,
            min_normality_samples: 30,
            type_inference_sample_size: 1000,
            subscore_weights: DimensionWeights::default(),
            deduction_tiers: DeductionTiers::default(),
        }
    }
}

impl QualityConfig {
    /// Create a new configuration builder.
    pub fn builder() -> QualityConfigBuilder {
        QualityConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(1..=3).contains(&self.outlier_consensus_k) {
            return Err(ConfigValidationError::InvalidConsensusK(
                self.outlier_consensus_k,
            ));
        }

        for (field, value) in [
            ("iqr_multiplier", self.iqr_multiplier),
            ("zscore_threshold", self.zscore_threshold),
            ("mad_threshold", self.mad_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigValidationError::InvalidMultiplier {
                    field: field.to_string(),
                    value,
                });
            }
        }

        for (field, value) in [
            ("entropy_low", self.entropy_low),
            ("entropy_high", self.entropy_high),
            (
                "missing_correlation_threshold",
                self.missing_correlation_threshold,
            ),
            ("missingness_neutral_score", self.missingness_neutral_score),
        ] {
            check_unit_interval(field, value)?;
        }

        if self.entropy_low >= self.entropy_high {
            return Err(ConfigValidationError::EntropyBoundsOutOfOrder {
                low: self.entropy_low,
                high: self.entropy_high,
            });
        }

        if !(self.normality_alpha > 0.0 && self.normality_alpha < 1.0) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "normality_alpha".to_string(),
                value: self.normality_alpha,
            });
        }

        let buckets = self.cardinality_buckets;
        let in_range = buckets.iter().all(|b| b.is_finite() && *b > 0.0 && *b < 1.0);
        let descending = buckets.windows(2).all(|w| w[0] > w[1]);
        if !in_range || !descending {
            return Err(ConfigValidationError::InvalidCardinalityBuckets(buckets));
        }

        for (field, value) in [
            ("critical_score_threshold", self.critical_score_threshold),
            ("warning_score_threshold", self.warning_score_threshold),
        ] {
            if value > 100 {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value: value as f64,
                });
            }
        }

        if !self.imbalance_ratio.is_finite() || self.imbalance_ratio <= 1.0 {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "imbalance_ratio".to_string(),
                value: self.imbalance_ratio,
            });
        }
        if !self.severe_imbalance_ratio.is_finite()
            || self.severe_imbalance_ratio <= self.imbalance_ratio
        {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "severe_imbalance_ratio".to_string(),
                value: self.severe_imbalance_ratio,
            });
        }

        if self.large_dataset_rows <= self.small_dataset_rows {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "large_dataset_rows".to_string(),
                value: self.large_dataset_rows as f64,
            });
        }

        for (field, value) in [
            ("min_outlier_samples", self.min_outlier_samples),
            ("max_distinct_values", self.max_distinct_values),
            ("type_inference_sample_size", self.type_inference_sample_size),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCount(field.to_string()));
            }
        }

        // The kurtosis part of the normality test needs at least 20 values.
        if self.min_normality_samples < 20 {
            return Err(ConfigValidationError::InvalidNormalitySamples(
                self.min_normality_samples,
            ));
        }

        if let Some(columns) = &self.duplicate_subset_columns
            && columns.is_empty()
        {
            return Err(ConfigValidationError::EmptyDuplicateSubset);
        }

        self.validate_weights()?;
        self.validate_tiers()?;

        Ok(())
    }

    fn validate_weights(&self) -> Result<(), ConfigValidationError> {
        let weights = &self.subscore_weights;
        for dimension in QualityDimension::ALL {
            let value = weights.get(dimension);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigValidationError::InvalidWeight { dimension, value });
            }
        }
        if weights.total() <= 0.0 {
            return Err(ConfigValidationError::ZeroWeightSum);
        }
        Ok(())
    }

    fn validate_tiers(&self) -> Result<(), ConfigValidationError> {
        let tiers = &self.deduction_tiers;
        for (field, list) in [
            ("completeness", &tiers.completeness),
            ("uniqueness", &tiers.uniqueness),
            ("validity", &tiers.validity),
            ("consistency", &tiers.consistency),
            ("timeliness_days", &tiers.timeliness_days),
        ] {
            let valid_values = list.iter().all(|t| {
                t.above.is_finite()
                    && t.above >= 0.0
                    && t.deduction.is_finite()
                    && (0.0..=100.0).contains(&t.deduction)
            });
            // Higher thresholds must never deduct less than lower ones.
            let monotone = list
                .windows(2)
                .all(|w| w[0].above > w[1].above && w[0].deduction >= w[1].deduction);
            if !valid_values || !monotone {
                return Err(ConfigValidationError::InvalidTiers(field.to_string()));
            }
        }

        for (field, value) in [
            ("type_mismatch_penalty", tiers.type_mismatch_penalty),
            ("type_mismatch_cap", tiers.type_mismatch_cap),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ConfigValidationError::InvalidTiers(field.to_string()));
            }
        }
        Ok(())
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigValidationError::InvalidThreshold {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid consensus k: {0} (must be between 1 and 3)")]
    InvalidConsensusK(usize),

    #[error("Invalid value for '{field}': {value} (must be a positive finite number)")]
    InvalidMultiplier { field: String, value: f64 },

    #[error("Invalid threshold for '{field}': {value}")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Entropy bounds out of order: low {low} must be below high {high}")]
    EntropyBoundsOutOfOrder { low: f64, high: f64 },

    #[error("Invalid cardinality buckets {0:?} (must be strictly descending within (0, 1))")]
    InvalidCardinalityBuckets([f64; 4]),

    #[error("'{0}' must be at least 1")]
    ZeroCount(String),

    #[error("Invalid min_normality_samples: {0} (must be at least 20)")]
    InvalidNormalitySamples(usize),

    #[error("duplicate_subset_columns must name at least one column")]
    EmptyDuplicateSubset,

    #[error("Invalid weight for {dimension:?}: {value} (must be finite and non-negative)")]
    InvalidWeight {
        dimension: QualityDimension,
        value: f64,
    },

    #[error("Sub-score weights must not sum to zero")]
    ZeroWeightSum,

    #[error("Invalid deduction tiers for '{0}'")]
    InvalidTiers(String),
}

/// Builder for [`QualityConfig`] with fluent API.
///
/// Unset options keep their [`QualityConfig::default()`] values.
#[derive(Debug, Default)]
pub struct QualityConfigBuilder {
    config: QualityConfig,
}

impl QualityConfigBuilder {
    /// Set how many detectors must agree on an outlier (1 - 3).
    pub fn outlier_consensus_k(mut self, k: usize) -> Self {
        self.config.outlier_consensus_k = k;
        self
    }

    /// Set the IQR fence multiplier.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.config.iqr_multiplier = multiplier;
        self
    }

    /// Set the z-score threshold.
    pub fn zscore_threshold(mut self, threshold: f64) -> Self {
        self.config.zscore_threshold = threshold;
        self
    }

    /// Set the modified z-score threshold.
    pub fn mad_threshold(mut self, threshold: f64) -> Self {
        self.config.mad_threshold = threshold;
        self
    }

    /// Set the minimum number of values for outlier detection.
    pub fn min_outlier_samples(mut self, samples: usize) -> Self {
        self.config.min_outlier_samples = samples;
        self
    }

    /// Set the low/high normalized entropy bounds.
    pub fn entropy_bounds(mut self, low: f64, high: f64) -> Self {
        self.config.entropy_low = low;
        self.config.entropy_high = high;
        self
    }

    /// Cap the number of distinct values enumerated per column.
    pub fn max_distinct_values(mut self, max: usize) -> Self {
        self.config.max_distinct_values = max;
        self
    }

    /// Set the cardinality bucket boundaries (highest first).
    pub fn cardinality_buckets(mut self, buckets: [f64; 4]) -> Self {
        self.config.cardinality_buckets = buckets;
        self
    }

    /// Set the score below which a STOP recommendation is emitted.
    pub fn critical_score_threshold(mut self, threshold: u32) -> Self {
        self.config.critical_score_threshold = threshold;
        self
    }

    /// Set the score below which a cleaning warning is emitted.
    pub fn warning_score_threshold(mut self, threshold: u32) -> Self {
        self.config.warning_score_threshold = threshold;
        self
    }

    /// Set the category frequency ratios for Medium and High imbalance.
    pub fn imbalance_ratios(mut self, medium: f64, high: f64) -> Self {
        self.config.imbalance_ratio = medium;
        self.config.severe_imbalance_ratio = high;
        self
    }

    /// Set the row counts below and above which size advisories are emitted.
    pub fn dataset_size_bounds(mut self, small: usize, large: usize) -> Self {
        self.config.small_dataset_rows = small;
        self.config.large_dataset_rows = large;
        self
    }

    /// Restrict partial-duplicate detection to the given columns.
    pub fn duplicate_subset_columns(mut self, columns: Vec<String>) -> Self {
        self.config.duplicate_subset_columns = Some(columns);
        self
    }

    /// Set how many duplicate groups are listed in the report.
    pub fn max_reported_duplicate_groups(mut self, max: usize) -> Self {
        self.config.max_reported_duplicate_groups = max;
        self
    }

    /// Set the missingness correlation threshold.
    pub fn missing_correlation_threshold(mut self, threshold: f64) -> Self {
        self.config.missing_correlation_threshold = threshold;
        self
    }

    /// Set the MCAR/MNAR score used when nothing can be measured.
    pub fn missingness_neutral_score(mut self, score: f64) -> Self {
        self.config.missingness_neutral_score = score;
        self
    }

    /// Set the normality test significance level.
    pub fn normality_alpha(mut self, alpha: f64) -> Self {
        self.config.normality_alpha = alpha;
        self
    }

    /// Set the minimum number of values for the normality test.
    pub fn min_normality_samples(mut self, samples: usize) -> Self {
        self.config.min_normality_samples = samples;
        self
    }

    /// Set the per-column sample size for type inference.
    pub fn type_inference_sample_size(mut self, size: usize) -> Self {
        self.config.type_inference_sample_size = size;
        self
    }

    /// Set the weight of a single sub-score.
    pub fn subscore_weight(mut self, dimension: QualityDimension, weight: f64) -> Self {
        let weights = &mut self.config.subscore_weights;
        match dimension {
            QualityDimension::Completeness => weights.completeness = weight,
            QualityDimension::Consistency => weights.consistency = weight,
            QualityDimension::Validity => weights.validity = weight,
            QualityDimension::Uniqueness => weights.uniqueness = weight,
            QualityDimension::Timeliness => weights.timeliness = weight,
        }
        self
    }

    /// Replace the scorer's deduction tables.
    pub fn deduction_tiers(mut self, tiers: DeductionTiers) -> Self {
        self.config.deduction_tiers = tiers;
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `QualityConfig` or an error if validation fails.
    pub fn build(self) -> Result<QualityConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

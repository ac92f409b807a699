use crate::quality::{
    CardinalityBucket, ColumnDistribution, ColumnOutliers, DuplicateSummary, MissingValueSummary,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quality type inferred for a column by the profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Datetime,
    Boolean,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
        }
    }
}

/// Per-column profile produced once by the profiler and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Storage dtype as reported by polars.
    pub storage_dtype: String,
    /// Whether the storage dtype holds text (`String` or `Categorical`).
    pub text_storage: bool,
    pub inferred_type: ColumnType,
    pub row_count: usize,
    pub missing_count: usize,
    /// Distinct non-missing values.
    pub unique_count: usize,
    /// Share of non-missing values that parse as `inferred_type` (0.0 - 1.0).
    pub conforming_ratio: f64,
    /// Whether the column looks like a row identifier (keys, codes, emails).
    pub identifier_like: bool,
}

impl ColumnProfile {
    pub fn present_count(&self) -> usize {
        self.row_count - self.missing_count
    }

    pub fn missing_ratio(&self) -> f64 {
        if self.row_count == 0 {
            0.0
        } else {
            self.missing_count as f64 / self.row_count as f64
        }
    }

    /// Whether the column was stored as text but holds another type.
    pub fn stored_as_text(&self) -> bool {
        self.text_storage && self.inferred_type != ColumnType::Categorical
    }
}

/// Severity of a finding, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Agreement level of the outlier detectors for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// The five dimensions composing the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    Completeness,
    Consistency,
    Validity,
    Uniqueness,
    Timeliness,
}

impl QualityDimension {
    pub const ALL: [QualityDimension; 5] = [
        Self::Completeness,
        Self::Consistency,
        Self::Validity,
        Self::Uniqueness,
        Self::Timeliness,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Completeness => "Completeness",
            Self::Consistency => "Consistency",
            Self::Validity => "Validity",
            Self::Uniqueness => "Uniqueness",
            Self::Timeliness => "Timeliness",
        }
    }
}

/// Kind of type problem reported by a `TypeMismatch` finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum TypeIssue {
    /// The dataset has no rows.
    EmptyDataset,
    /// Text storage holding values of another type.
    StoredAsText { suggested: ColumnType },
    /// Some non-missing values do not parse as the inferred type.
    MixedValues { conforming_ratio: f64 },
}

/// Closed set of finding kinds, each carrying its own metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    MissingValue {
        missing_count: usize,
        missing_ratio: f64,
    },
    CorrelatedMissing {
        coefficient: f64,
    },
    Duplicate {
        exact_duplicates: usize,
        partial_duplicates: usize,
        duplicate_percentage: f64,
    },
    Outlier {
        consensus_count: usize,
        single_method_count: usize,
        outlier_ratio: f64,
        confidence: Confidence,
    },
    LowEntropy {
        normalized_entropy: f64,
        unique_count: usize,
    },
    HighCardinality {
        cardinality_ratio: f64,
        bucket: CardinalityBucket,
    },
    ClassImbalance {
        imbalance_ratio: f64,
        majority_count: usize,
        minority_count: usize,
    },
    NonNormal {
        statistic: f64,
        p_value: f64,
    },
    TypeMismatch {
        #[serde(flatten)]
        issue: TypeIssue,
    },
}

impl FindingKind {
    /// Dimension whose sub-score this kind affects. `NonNormal` is advisory.
    pub fn dimension(&self) -> Option<QualityDimension> {
        match self {
            Self::MissingValue { .. } | Self::CorrelatedMissing { .. } => {
                Some(QualityDimension::Completeness)
            }
            Self::Duplicate { .. } => Some(QualityDimension::Uniqueness),
            Self::Outlier { .. } | Self::TypeMismatch { .. } => Some(QualityDimension::Validity),
            Self::LowEntropy { .. }
            | Self::HighCardinality { .. }
            | Self::ClassImbalance { .. } => {
                Some(QualityDimension::Consistency)
            }
            Self::NonNormal { .. } => None,
        }
    }
}

/// A single data-quality defect. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(flatten)]
    pub kind: FindingKind,
    pub columns: Vec<String>,
    pub severity: Severity,
    /// Headline metric of the finding (ratio, coefficient, p-value, ...).
    pub metric_value: f64,
    pub description: String,
}

impl Finding {
    pub fn new(
        kind: FindingKind,
        columns: Vec<String>,
        severity: Severity,
        metric_value: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            columns,
            severity,
            metric_value,
            description: description.into(),
        }
    }
}

/// Priority of a recommendation, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl From<Severity> for Priority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => Priority::Low,
            Severity::Medium => Priority::Medium,
            Severity::High => Priority::High,
            Severity::Critical => Priority::Critical,
        }
    }
}

/// A prioritized remediation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub issue: String,
    pub priority: Priority,
    pub action: String,
    /// Expected overall-score gain (points) once the issue is fixed.
    pub estimated_impact: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<QualityDimension>,
    pub columns: Vec<String>,
}

/// One value per quality dimension, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub completeness: f64,
    pub consistency: f64,
    pub validity: f64,
    pub uniqueness: f64,
    pub timeliness: f64,
}

impl SubScores {
    pub fn uniform(value: f64) -> Self {
        Self {
            completeness: value,
            consistency: value,
            validity: value,
            uniqueness: value,
            timeliness: value,
        }
    }

    pub fn get(&self, dimension: QualityDimension) -> f64 {
        match dimension {
            QualityDimension::Completeness => self.completeness,
            QualityDimension::Consistency => self.consistency,
            QualityDimension::Validity => self.validity,
            QualityDimension::Uniqueness => self.uniqueness,
            QualityDimension::Timeliness => self.timeliness,
        }
    }
}

/// Freshness facts supplied by the caller. The engine never reads the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessMetadata {
    /// When the dataset was last updated at its source.
    pub last_updated: DateTime<Utc>,
    /// Reference instant the age is measured against.
    pub as_of: DateTime<Utc>,
}

impl FreshnessMetadata {
    pub fn new(last_updated: DateTime<Utc>, as_of: DateTime<Utc>) -> Self {
        Self {
            last_updated,
            as_of,
        }
    }

    /// Age in days; a `last_updated` after `as_of` counts as fresh.
    pub fn age_days(&self) -> f64 {
        let seconds = (self.as_of - self.last_updated).num_seconds();
        (seconds as f64 / 86_400.0).max(0.0)
    }
}

/// Structured analyzer outputs backing the findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub shape: (usize, usize),
    pub column_profiles: Vec<ColumnProfile>,
    pub missing: MissingValueSummary,
    pub duplicates: DuplicateSummary,
    pub outliers: Vec<ColumnOutliers>,
    pub distributions: Vec<ColumnDistribution>,
    /// Points deducted from each sub-score.
    pub deductions: SubScores,
    /// Dataset age, only when freshness metadata was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_age_days: Option<f64>,
}

/// Final output of one analysis. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub overall_score: f64,
    pub sub_scores: SubScores,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    pub details: AnalysisDetails,
}

impl QualityReport {
    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

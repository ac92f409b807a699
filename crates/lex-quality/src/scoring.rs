//! Tiered deduction scoring.
//!
//! Every sub-score starts at 100 and loses the deduction of the first tier
//! its metric exceeds. The metrics are derived from the findings alone, so
//! removing a finding and re-scoring gives the counterfactual score used
//! for recommendation impact.

use crate::config::{QualityConfig, Tier};
use crate::types::{Finding, FindingKind, QualityDimension, SubScores, TypeIssue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dataset facts the scorer needs besides the findings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringContext {
    pub row_count: usize,
    pub column_count: usize,
    /// Non-missing conforming numeric values checked for outliers.
    pub numeric_cells: usize,
    pub numeric_columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_age_days: Option<f64>,
}

/// Metrics keyed by the deduction tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetrics {
    pub missing_cell_ratio: f64,
    pub duplicate_percentage: f64,
    pub outlier_ratio: f64,
    pub type_mismatches: usize,
    pub anomalous_column_ratio: f64,
    pub dataset_age_days: Option<f64>,
}

impl ScoreMetrics {
    /// Derive the metrics from a set of findings.
    ///
    /// `CorrelatedMissing` deducts nothing: the cells of both columns are
    /// already counted by their `MissingValue` findings, so resolving the
    /// correlation alone has an estimated impact of 0.
    pub fn from_findings<'a>(
        findings: impl IntoIterator<Item = &'a Finding>,
        context: &ScoringContext,
    ) -> Self {
        let mut missing_cells = 0usize;
        let mut duplicate_percentage = 0.0;
        let mut outliers = 0usize;
        let mut type_mismatches = 0usize;
        let mut anomalous: BTreeSet<&str> = BTreeSet::new();

        for finding in findings {
            match &finding.kind {
                FindingKind::MissingValue { missing_count, .. } => missing_cells += missing_count,
                FindingKind::Duplicate {
                    duplicate_percentage: pct,
                    ..
                } => duplicate_percentage = f64::max(duplicate_percentage, *pct),
                FindingKind::Outlier {
                    consensus_count, ..
                } => outliers += consensus_count,
                FindingKind::TypeMismatch { issue } => {
                    type_mismatches += 1;
                    if matches!(issue, TypeIssue::MixedValues { .. }) {
                        anomalous.extend(finding.columns.iter().map(String::as_str));
                    }
                }
                FindingKind::LowEntropy { .. }
                | FindingKind::HighCardinality { .. }
                | FindingKind::ClassImbalance { .. } => {
                    anomalous.extend(finding.columns.iter().map(String::as_str));
                }
                FindingKind::CorrelatedMissing { .. } | FindingKind::NonNormal { .. } => {}
            }
        }

        let total_cells = context.row_count * context.column_count;
        Self {
            missing_cell_ratio: ratio(missing_cells, total_cells),
            duplicate_percentage,
            outlier_ratio: ratio(outliers, context.numeric_cells),
            type_mismatches,
            anomalous_column_ratio: ratio(anomalous.len(), context.column_count),
            dataset_age_days: context.dataset_age_days,
        }
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Deduction of the first tier whose threshold `metric` exceeds.
pub fn tier_deduction(tiers: &[Tier], metric: f64) -> f64 {
    tiers
        .iter()
        .find(|tier| metric > tier.above)
        .map_or(0.0, |tier| tier.deduction)
}

/// Sub-scores, their deductions and the weighted overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub overall: f64,
    pub sub_scores: SubScores,
    pub deductions: SubScores,
}

impl Scorecard {
    /// Scorecard of an empty dataset: everything is zero.
    pub fn empty() -> Self {
        Self {
            overall: 0.0,
            sub_scores: SubScores::uniform(0.0),
            deductions: SubScores::uniform(100.0),
        }
    }
}

/// Computes scores from findings.
#[derive(Debug, Clone, Copy)]
pub struct QualityScorer<'a> {
    config: &'a QualityConfig,
    context: ScoringContext,
}

impl<'a> QualityScorer<'a> {
    pub fn new(config: &'a QualityConfig, context: ScoringContext) -> Self {
        Self { config, context }
    }

    pub fn context(&self) -> &ScoringContext {
        &self.context
    }

    pub fn score(&self, findings: &[Finding]) -> Scorecard {
        self.score_metrics(&ScoreMetrics::from_findings(findings, &self.context))
    }

    /// Score as if the finding at `excluded` had been fixed.
    pub fn score_without(&self, findings: &[Finding], excluded: usize) -> Scorecard {
        let remaining = findings
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != excluded)
            .map(|(_, f)| f);
        self.score_metrics(&ScoreMetrics::from_findings(remaining, &self.context))
    }

    pub fn score_metrics(&self, metrics: &ScoreMetrics) -> Scorecard {
        let tiers = &self.config.deduction_tiers;

        let type_penalty = (metrics.type_mismatches as f64 * tiers.type_mismatch_penalty)
            .min(tiers.type_mismatch_cap);
        let deductions = SubScores {
            completeness: tier_deduction(&tiers.completeness, metrics.missing_cell_ratio),
            consistency: tier_deduction(&tiers.consistency, metrics.anomalous_column_ratio),
            validity: tier_deduction(&tiers.validity, metrics.outlier_ratio) + type_penalty,
            uniqueness: tier_deduction(&tiers.uniqueness, metrics.duplicate_percentage),
            timeliness: metrics
                .dataset_age_days
                .map_or(0.0, |age| tier_deduction(&tiers.timeliness_days, age)),
        };
        let sub = |d: f64| (100.0 - d).clamp(0.0, 100.0);
        let sub_scores = SubScores {
            completeness: sub(deductions.completeness),
            consistency: sub(deductions.consistency),
            validity: sub(deductions.validity),
            uniqueness: sub(deductions.uniqueness),
            timeliness: sub(deductions.timeliness),
        };

        let weights = &self.config.subscore_weights;
        let total_weight = weights.total();
        let overall = if total_weight > 0.0 {
            QualityDimension::ALL
                .iter()
                .map(|d| weights.get(*d) * sub_scores.get(*d))
                .sum::<f64>()
                / total_weight
        } else {
            0.0
        };

        Scorecard {
            overall: overall.clamp(0.0, 100.0),
            sub_scores,
            deductions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn context() -> ScoringContext {
        ScoringContext {
            row_count: 100,
            column_count: 4,
            numeric_cells: 200,
            numeric_columns: 2,
            dataset_age_days: None,
        }
    }

    fn missing(column: &str, count: usize) -> Finding {
        Finding::new(
            FindingKind::MissingValue {
                missing_count: count,
                missing_ratio: count as f64 / 100.0,
            },
            vec![column.to_string()],
            Severity::Medium,
            count as f64 / 100.0,
            "missing",
        )
    }

    fn duplicates(pct: f64) -> Finding {
        Finding::new(
            FindingKind::Duplicate {
                exact_duplicates: pct as usize,
                partial_duplicates: 0,
                duplicate_percentage: pct,
            },
            Vec::new(),
            Severity::Medium,
            pct,
            "duplicates",
        )
    }

    #[test]
    fn test_tier_deduction() {
        let tiers = crate::config::DeductionTiers::default();
        assert_eq!(tier_deduction(&tiers.completeness, 0.6), 50.0);
        assert_eq!(tier_deduction(&tiers.completeness, 0.5), 40.0);
        assert_eq!(tier_deduction(&tiers.completeness, 0.01), 5.0);
        assert_eq!(tier_deduction(&tiers.completeness, 0.0), 0.0);
        assert_eq!(tier_deduction(&tiers.uniqueness, 50.0), 10.0);
    }

    #[test]
    fn test_clean_dataset_scores_100() {
        let config = QualityConfig::default();
        let scorecard = QualityScorer::new(&config, context()).score(&[]);
        assert_eq!(scorecard.overall, 100.0);
        assert_eq!(scorecard.sub_scores, SubScores::uniform(100.0));
    }

    #[test]
    fn test_missing_cells_reduce_completeness() {
        let config = QualityConfig::default();
        // 80 of 400 cells: ratio 0.2 -> tier "> 0.1"
        let findings = vec![missing("a", 50), missing("b", 30)];
        let scorecard = QualityScorer::new(&config, context()).score(&findings);

        assert_eq!(scorecard.sub_scores.completeness, 80.0);
        assert_eq!(scorecard.deductions.completeness, 20.0);
        assert_eq!(scorecard.overall, 96.0);
    }

    #[test]
    fn test_type_mismatch_penalty_is_capped() {
        let config = QualityConfig::default();
        let mismatch = |c: &str| {
            Finding::new(
                FindingKind::TypeMismatch {
                    issue: TypeIssue::StoredAsText {
                        suggested: crate::types::ColumnType::Numeric,
                    },
                },
                vec![c.to_string()],
                Severity::Medium,
                1.0,
                "text",
            )
        };
        let findings = vec![mismatch("a"), mismatch("b"), mismatch("c")];
        let scorecard = QualityScorer::new(&config, context()).score(&findings);
        assert_eq!(scorecard.sub_scores.validity, 92.0);
    }

    #[test]
    fn test_correlated_missing_adds_no_deduction() {
        let config = QualityConfig::default();
        let correlated = Finding::new(
            FindingKind::CorrelatedMissing { coefficient: 0.95 },
            vec!["a".to_string(), "b".to_string()],
            Severity::High,
            0.95,
            "correlated",
        );
        let findings = vec![missing("a", 30), missing("b", 30), correlated];
        let scorer = QualityScorer::new(&config, context());

        let all = scorer.score(&findings);
        assert_eq!(all, scorer.score(&findings[..2]));
        assert_eq!(scorer.score_without(&findings, 2).overall, all.overall);
    }

    #[test]
    fn test_imbalanced_column_lowers_consistency() {
        let config = QualityConfig::default();
        let imbalance = Finding::new(
            FindingKind::ClassImbalance {
                imbalance_ratio: 40.0,
                majority_count: 80,
                minority_count: 2,
            },
            vec!["status".to_string()],
            Severity::Medium,
            40.0,
            "imbalanced",
        );
        // 1 of 4 columns anomalous -> tier "> 0.1"
        let scorecard = QualityScorer::new(&config, context()).score(&[imbalance]);
        assert_eq!(scorecard.sub_scores.consistency, 94.0);
    }

    #[test]
    fn test_timeliness_only_with_age() {
        let config = QualityConfig::default();
        let mut ctx = context();
        ctx.dataset_age_days = Some(400.0);
        let scorecard = QualityScorer::new(&config, ctx).score(&[]);
        assert_eq!(scorecard.sub_scores.timeliness, 60.0);
    }

    #[test]
    fn test_counterfactual_removes_one_finding() {
        let config = QualityConfig::default();
        let findings = vec![missing("a", 50), duplicates(20.0)];
        let scorer = QualityScorer::new(&config, context());

        let all = scorer.score(&findings);
        let without_duplicates = scorer.score_without(&findings, 1);
        assert_eq!(all.sub_scores.uniqueness, 90.0);
        assert_eq!(without_duplicates.sub_scores.uniqueness, 100.0);
        assert!((without_duplicates.overall - all.overall - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_change_overall() {
        let config = QualityConfig::builder()
            .subscore_weight(QualityDimension::Completeness, 4.0)
            .build()
            .unwrap();
        let findings = vec![missing("a", 400)];
        let scorecard = QualityScorer::new(&config, context()).score(&findings);
        // completeness 50 with weight 4 of 8
        assert_eq!(scorecard.sub_scores.completeness, 50.0);
        assert_eq!(scorecard.overall, 75.0);
    }

    #[test]
    fn test_more_findings_never_raise_scores() {
        let config = QualityConfig::default();
        let scorer = QualityScorer::new(&config, context());
        let mut findings = Vec::new();
        let mut previous = scorer.score(&findings).overall;
        for pct in [0.5, 2.0, 6.0, 12.0] {
            findings.push(duplicates(pct));
            findings.push(missing("a", 10));
            let current = scorer.score(&findings).overall;
            assert!(current <= previous);
            previous = current;
        }
    }
}

//! Turns findings into a prioritized list of remediation actions.
//!
//! Besides one recommendation per finding of Medium severity or more, the
//! list carries dataset-level advisories (sample size, a single numeric
//! column) and, for low overall scores, a leading cleaning warning.

use crate::config::QualityConfig;
use crate::scoring::{QualityScorer, Scorecard, ScoringContext};
use crate::types::{Finding, FindingKind, Priority, Recommendation, Severity, TypeIssue};
use crate::utils::{format_pct, round_to};
use tracing::debug;

/// Text of the top-level recommendation for datasets below the critical score.
pub const STOP_MESSAGE: &str = "STOP: dataset requires major cleaning before analysis.";

/// Text of the top-level recommendation for datasets below the warning score.
pub const CLEANING_MESSAGE: &str =
    "Dataset has significant quality issues: comprehensive cleaning needed.";

/// Build recommendations, estimating each impact by re-scoring without the
/// finding it addresses.
pub fn generate_recommendations(
    findings: &[Finding],
    scorer: &QualityScorer<'_>,
    scorecard: &Scorecard,
    config: &QualityConfig,
) -> Vec<Recommendation> {
    build_recommendations(
        findings,
        scorecard.overall,
        scorer.context(),
        config,
        |index| scorer.score_without(findings, index).overall - scorecard.overall,
    )
}

/// Core of [`generate_recommendations`] with a pluggable impact estimate
/// (overall-score points gained when the finding at an index is resolved).
pub fn build_recommendations(
    findings: &[Finding],
    overall_score: f64,
    context: &ScoringContext,
    config: &QualityConfig,
    impact_of: impl Fn(usize) -> f64,
) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = findings
        .iter()
        .enumerate()
        .filter(|(_, finding)| finding.severity >= Severity::Medium)
        .map(|(index, finding)| Recommendation {
            issue: finding.description.clone(),
            priority: Priority::from(finding.severity),
            action: action_for(finding),
            estimated_impact: round_to(impact_of(index).max(0.0), 2),
            dimension: finding.kind.dimension(),
            columns: finding.columns.clone(),
        })
        .collect();
    recommendations.extend(dataset_advisories(context, config));

    // Stable: ties keep finding order.
    recommendations.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.estimated_impact.total_cmp(&a.estimated_impact))
    });

    let headline = if overall_score < config.critical_score_threshold as f64 {
        debug!(
            "Overall score {:.1} below critical threshold {}",
            overall_score, config.critical_score_threshold
        );
        Some(STOP_MESSAGE)
    } else if overall_score < config.warning_score_threshold as f64 {
        debug!(
            "Overall score {:.1} below warning threshold {}",
            overall_score, config.warning_score_threshold
        );
        Some(CLEANING_MESSAGE)
    } else {
        None
    };
    if let Some(action) = headline {
        recommendations.insert(
            0,
            Recommendation {
                issue: format!("Overall quality score is {:.1}/100", overall_score),
                priority: Priority::Critical,
                action: action.to_string(),
                estimated_impact: round_to(100.0 - overall_score, 2),
                dimension: None,
                columns: Vec::new(),
            },
        );
    }

    recommendations
}

fn advisory(issue: String, priority: Priority, action: String) -> Recommendation {
    Recommendation {
        issue,
        priority,
        action,
        estimated_impact: 0.0,
        dimension: None,
        columns: Vec::new(),
    }
}

/// Advisories about the dataset as a whole. Empty datasets get none.
fn dataset_advisories(context: &ScoringContext, config: &QualityConfig) -> Vec<Recommendation> {
    let rows = context.row_count;
    let mut advisories = Vec::new();
    if rows == 0 {
        return advisories;
    }

    if rows < config.small_dataset_rows {
        advisories.push(advisory(
            format!("Very small dataset (n={})", rows),
            Priority::High,
            "Results may not be statistically significant; collect more data or use conservative methods"
                .to_string(),
        ));
    } else if rows > config.large_dataset_rows {
        advisories.push(advisory(
            format!("Large dataset ({} rows)", rows),
            Priority::Medium,
            "Consider stratified sampling for exploratory analysis".to_string(),
        ));
    }

    if context.numeric_columns == 1 {
        advisories.push(advisory(
            "Only 1 numeric column".to_string(),
            Priority::Medium,
            "Analysis capability is limited; engineer new numeric features from domain knowledge"
                .to_string(),
        ));
    }
    advisories
}

fn quoted(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("'{}'", c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Action template for a finding.
fn action_for(finding: &Finding) -> String {
    let columns = quoted(&finding.columns);
    match &finding.kind {
        FindingKind::MissingValue { missing_ratio, .. } if *missing_ratio > 0.5 => format!(
            "Drop column {} or recover its source data ({} missing)",
            columns,
            format_pct(*missing_ratio)
        ),
        FindingKind::MissingValue { missing_ratio, .. } => format!(
            "Impute missing values in {} ({} missing): median for numeric, mode for categorical",
            columns,
            format_pct(*missing_ratio)
        ),
        FindingKind::CorrelatedMissing { .. } => format!(
            "Investigate why {} go missing together; impute them jointly or add a missingness indicator",
            columns
        ),
        FindingKind::Duplicate {
            exact_duplicates,
            partial_duplicates,
            ..
        } => {
            let mut action = format!("Remove {} exact duplicate rows", exact_duplicates);
            if *partial_duplicates > 0 {
                action.push_str(&format!(
                    " and review {} rows that repeat on the key columns",
                    partial_duplicates
                ));
            }
            action
        }
        FindingKind::Outlier {
            consensus_count, ..
        } => format!(
            "Review {} consensus outliers in {}; correct entry errors, then cap or transform the rest",
            consensus_count, columns
        ),
        FindingKind::LowEntropy { .. } => format!(
            "Column {} carries little information; drop it or merge its rare categories",
            columns
        ),
        FindingKind::HighCardinality { .. } => format!(
            "Group rare categories of {} or use a hashing or frequency encoding",
            columns
        ),
        FindingKind::ClassImbalance {
            imbalance_ratio, ..
        } => format!(
            "Rebalance {} (resample or weight classes); the most common value is {:.1}x the rarest",
            columns, imbalance_ratio
        ),
        FindingKind::NonNormal { .. } => format!(
            "Apply a log or power transform to {} before using methods that assume normality",
            columns
        ),
        FindingKind::TypeMismatch { issue } => match issue {
            TypeIssue::EmptyDataset => "Provide a dataset with at least one row".to_string(),
            TypeIssue::StoredAsText { suggested } => {
                format!("Convert {} to {}", columns, suggested.as_str())
            }
            TypeIssue::MixedValues { conforming_ratio } => format!(
                "Fix or null the {} of values in {} that do not match the column type",
                format_pct(1.0 - conforming_ratio),
                columns
            ),
        },
    }
}

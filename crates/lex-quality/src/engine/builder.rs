//! The quality engine and its builder.

use crate::config::QualityConfig;
use crate::engine::progress::{
    AnalysisStage, CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::error::{QualityError, Result};
use crate::profiler::{self, TypedColumn};
use crate::quality::{
    ColumnMissing, DuplicateSummary, MissingValueSummary, analyze_distributions,
    analyze_duplicates, analyze_missing, analyze_outliers,
};
use crate::recommendations::{build_recommendations, generate_recommendations};
use crate::scoring::{QualityScorer, Scorecard, ScoringContext};
use crate::types::{
    AnalysisDetails, ColumnType, Finding, FindingKind, FreshnessMetadata, QualityReport, Severity,
    TypeIssue,
};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs the full analysis over a borrowed DataFrame.
///
/// The engine holds only configuration; every call to
/// [`analyze`](Self::analyze) starts from scratch, so one engine can serve
/// many datasets and threads.
///
/// # Example
///
/// ```rust,ignore
/// use lex_quality::{CancellationToken, QualityConfig, QualityEngine};
///
/// let token = CancellationToken::new();
/// let report = QualityEngine::builder()
///     .config(QualityConfig::builder().outlier_consensus_k(3).build()?)
///     .cancellation_token(token.clone())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .analyze(&df)?;
///
/// println!("Overall score: {:.1}", report.overall_score);
/// ```
pub struct QualityEngine {
    config: QualityConfig,
    freshness: Option<FreshnessMetadata>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

static_assertions::assert_impl_all!(QualityEngine: Send, Sync);

impl QualityEngine {
    /// Create a new engine builder.
    pub fn builder() -> QualityEngineBuilder {
        QualityEngineBuilder::default()
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Analyze `df` and build its quality report.
    ///
    /// # Errors
    ///
    /// - [`QualityError::Cancelled`] if the token was cancelled.
    /// - [`QualityError::UnsupportedColumnType`] for columns such as lists
    ///   or structs.
    /// - [`QualityError::ColumnNotFound`] for unknown duplicate-subset columns.
    ///
    /// A dataset without rows is not an error: it yields a zero score and a
    /// single empty-dataset finding.
    pub fn analyze(&self, df: &DataFrame) -> Result<QualityReport> {
        match self.analyze_internal(df) {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Analysis complete: score {:.1}",
                    report.overall_score
                )));
                Ok(report)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Quality analysis error: {}", e);
                Err(e)
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(QualityError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn begin_stage(&self, stage: AnalysisStage, message: &str) -> Result<()> {
        self.check_cancelled()?;
        info!("{}", message);
        self.report_progress(ProgressUpdate::new(stage, 0.0, message));
        Ok(())
    }

    fn end_stage(&self, stage: AnalysisStage) {
        self.report_progress(ProgressUpdate::new(
            stage,
            1.0,
            format!("{} done", stage.display_name()),
        ));
    }

    fn analyze_internal(&self, df: &DataFrame) -> Result<QualityReport> {
        let start_time = Instant::now();
        let config = &self.config;

        self.begin_stage(AnalysisStage::Validation, "Validating input...")?;
        config.validate()?;
        self.validate_input(df)?;
        self.end_stage(AnalysisStage::Validation);

        if df.height() == 0 || df.width() == 0 {
            info!("Dataset has no rows; returning empty report");
            return Ok(self.empty_report(df));
        }

        self.begin_stage(
            AnalysisStage::Profiling,
            &format!("Profiling {} columns...", df.width()),
        )?;
        let columns = profiler::profile_dataset(df, config)?;
        let mut findings = profiler::type_findings(&columns);
        self.end_stage(AnalysisStage::Profiling);

        self.begin_stage(AnalysisStage::MissingValues, "Analyzing missing values...")?;
        let (missing, missing_findings) = analyze_missing(&columns, config);
        findings.extend(missing_findings);
        self.end_stage(AnalysisStage::MissingValues);

        self.begin_stage(AnalysisStage::Duplicates, "Detecting duplicate rows...")?;
        let (duplicates, duplicate_findings) = analyze_duplicates(&columns, config)?;
        findings.extend(duplicate_findings);
        self.end_stage(AnalysisStage::Duplicates);

        self.begin_stage(AnalysisStage::Outliers, "Detecting outliers...")?;
        let (outliers, outlier_findings) = analyze_outliers(&columns, config);
        findings.extend(outlier_findings);
        self.end_stage(AnalysisStage::Outliers);

        self.begin_stage(AnalysisStage::Distributions, "Analyzing distributions...")?;
        let (distributions, distribution_findings) = analyze_distributions(&columns, config);
        findings.extend(distribution_findings);
        self.end_stage(AnalysisStage::Distributions);

        self.begin_stage(AnalysisStage::Scoring, "Scoring...")?;
        let dataset_age_days = self.freshness.map(|f| f.age_days());
        let context = ScoringContext {
            row_count: df.height(),
            column_count: df.width(),
            numeric_cells: numeric_cell_count(&columns),
            numeric_columns: columns
                .iter()
                .filter(|c| c.inferred_type() == ColumnType::Numeric)
                .count(),
            dataset_age_days,
        };
        let scorer = QualityScorer::new(config, context);
        let scorecard = scorer.score(&findings);
        debug!(
            "Sub-scores: completeness {:.1}, consistency {:.1}, validity {:.1}, uniqueness {:.1}, timeliness {:.1}",
            scorecard.sub_scores.completeness,
            scorecard.sub_scores.consistency,
            scorecard.sub_scores.validity,
            scorecard.sub_scores.uniqueness,
            scorecard.sub_scores.timeliness
        );
        self.end_stage(AnalysisStage::Scoring);

        self.begin_stage(AnalysisStage::Recommendations, "Building recommendations...")?;
        let recommendations = generate_recommendations(&findings, &scorer, &scorecard, config);
        self.end_stage(AnalysisStage::Recommendations);

        info!(
            "Quality analysis finished in {:.2?}: score {:.1}, {} findings, {} recommendations",
            start_time.elapsed(),
            scorecard.overall,
            findings.len(),
            recommendations.len()
        );

        Ok(QualityReport {
            overall_score: scorecard.overall,
            sub_scores: scorecard.sub_scores,
            findings,
            recommendations,
            details: AnalysisDetails {
                shape: (df.height(), df.width()),
                column_profiles: columns.into_iter().map(|c| c.profile).collect(),
                missing,
                duplicates,
                outliers,
                distributions,
                deductions: scorecard.deductions,
                dataset_age_days,
            },
        })
    }

    /// Reject unsupported column types and unknown duplicate-subset columns.
    fn validate_input(&self, df: &DataFrame) -> Result<()> {
        profiler::validate_column_types(df)?;
        if let Some(subset) = &self.config.duplicate_subset_columns {
            for name in subset {
                if df.column(name).is_err() {
                    return Err(QualityError::ColumnNotFound(name.clone()));
                }
            }
        }
        Ok(())
    }

    fn empty_report(&self, df: &DataFrame) -> QualityReport {
        let findings = vec![Finding::new(
            FindingKind::TypeMismatch {
                issue: TypeIssue::EmptyDataset,
            },
            Vec::new(),
            Severity::Critical,
            0.0,
            "Dataset is empty: there are no rows to analyze",
        )];
        let scorecard = Scorecard::empty();
        let dataset_age_days = self.freshness.map(|f| f.age_days());
        let context = ScoringContext {
            row_count: df.height(),
            column_count: df.width(),
            numeric_cells: 0,
            numeric_columns: 0,
            dataset_age_days,
        };
        let recommendations =
            build_recommendations(&findings, scorecard.overall, &context, &self.config, |_| 0.0);

        // Every column is reported, with nothing missing.
        let missing = MissingValueSummary {
            columns: df
                .get_column_names()
                .into_iter()
                .map(|name| ColumnMissing {
                    column: name.to_string(),
                    missing_count: 0,
                    missing_ratio: 0.0,
                })
                .collect(),
            ..MissingValueSummary::empty(self.config.missingness_neutral_score)
        };

        QualityReport {
            overall_score: scorecard.overall,
            sub_scores: scorecard.sub_scores,
            findings,
            recommendations,
            details: AnalysisDetails {
                shape: (df.height(), df.width()),
                column_profiles: Vec::new(),
                missing,
                duplicates: DuplicateSummary::empty(),
                outliers: Vec::new(),
                distributions: Vec::new(),
                deductions: scorecard.deductions,
                dataset_age_days,
            },
        }
    }
}

/// Present, conforming values across numeric columns.
fn numeric_cell_count(columns: &[TypedColumn]) -> usize {
    columns
        .iter()
        .filter(|c| c.inferred_type() == ColumnType::Numeric)
        .map(|c| c.profile.present_count() - c.non_conforming.len())
        .sum()
}

/// Builder for [`QualityEngine`].
#[derive(Default)]
pub struct QualityEngineBuilder {
    config: Option<QualityConfig>,
    freshness: Option<FreshnessMetadata>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(QualityEngineBuilder: Send);

impl QualityEngineBuilder {
    /// Set the analysis configuration.
    pub fn config(mut self, config: QualityConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Supply freshness metadata. Without it timeliness scores 100.
    pub fn freshness(mut self, freshness: FreshnessMetadata) -> Self {
        self.freshness = Some(freshness);
        self
    }

    /// Set a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// ```rust,ignore
    /// let engine = QualityEngine::builder()
    ///     .on_progress(|update| println!("{:?}: {}", update.stage, update.message))
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token checked between stages.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the engine.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<QualityEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(QualityEngine {
            config,
            freshness: self.freshness,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn sample_df() -> DataFrame {
        df![
            "id" => [1i64, 2, 3, 4, 5, 6],
            "amount" => [10.0, 12.5, 11.0, 10.5, 250.0, 11.5],
            "city" => ["Cairo", "Giza", "Cairo", "Alex", "Giza", "Cairo"],
        ]
        .unwrap()
    }

    #[test]
    fn test_builder_default() {
        let engine = QualityEngine::builder().build().unwrap();
        assert_eq!(engine.config(), &QualityConfig::default());
        assert!(engine.freshness.is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = QualityConfig::default();
        config.iqr_multiplier = -1.0;
        let result = QualityEngine::builder().config(config).build();
        assert!(matches!(result, Err(QualityError::InvalidConfig(_))));
    }

    #[test]
    fn test_progress_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();
        let engine = QualityEngine::builder()
            .on_progress(move |update| {
                let mut seen = stages_clone.lock().unwrap();
                if seen.last() != Some(&update.stage) {
                    seen.push(update.stage);
                }
            })
            .build()
            .unwrap();

        engine.analyze(&sample_df()).unwrap();

        let seen = stages.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                AnalysisStage::Validation,
                AnalysisStage::Profiling,
                AnalysisStage::MissingValues,
                AnalysisStage::Duplicates,
                AnalysisStage::Outliers,
                AnalysisStage::Distributions,
                AnalysisStage::Scoring,
                AnalysisStage::Recommendations,
                AnalysisStage::Complete,
            ]
        );
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();
        let engine = QualityEngine::builder()
            .cancellation_token(token)
            .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        let err = engine.analyze(&sample_df()).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(*stages.lock().unwrap(), vec![AnalysisStage::Cancelled]);
    }

    #[test]
    fn test_unknown_subset_column() {
        let config = QualityConfig::builder()
            .duplicate_subset_columns(vec!["nope".to_string()])
            .build()
            .unwrap();
        let engine = QualityEngine::builder().config(config).build().unwrap();
        let err = engine.analyze(&sample_df()).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_details_cover_every_column() {
        let report = QualityEngine::builder()
            .build()
            .unwrap()
            .analyze(&sample_df())
            .unwrap();
        assert_eq!(report.details.shape, (6, 3));
        assert_eq!(report.details.column_profiles.len(), 3);
        assert_eq!(report.details.distributions.len(), 3);
        assert!(report.details.dataset_age_days.is_none());
        assert_eq!(report.sub_scores.timeliness, 100.0);
    }

    #[test]
    fn test_numeric_cell_count_ignores_text() {
        let columns = profiler::profile_dataset(&sample_df(), &QualityConfig::default()).unwrap();
        assert_eq!(numeric_cell_count(&columns), 12);
    }
}

//! Data-Quality Analysis Engine
//!
//! Inspects a Polars `DataFrame` and reports how trustworthy it is, without
//! modifying it.
//!
//! # Overview
//!
//! - **Profiling**: quality type per column (numeric, categorical, datetime,
//!   boolean), inferred from storage type or by voting over text values
//! - **Missing values**: per-column ratios, correlated missingness and a
//!   heuristic MCAR/MNAR split
//! - **Duplicates**: exact duplicate rows and partial duplicates over a
//!   column subset
//! - **Outliers**: IQR, z-score and modified z-score combined by consensus
//! - **Distributions**: entropy, cardinality buckets, skewness and the
//!   D'Agostino-Pearson normality test
//! - **Scoring**: five sub-scores (completeness, consistency, validity,
//!   uniqueness, timeliness) and a weighted overall score
//! - **Recommendations**: prioritized actions with estimated score impact
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_quality::{QualityConfig, analyze};
//! use polars::prelude::*;
//!
//! let df = df![
//!     "amount" => [1.0, 2.0, 3.0, 4.0, 100.0],
//!     "city" => ["Cairo", "Giza", "Cairo", "Alex", "Giza"],
//! ]?;
//!
//! let report = analyze(&df, &QualityConfig::default())?;
//! println!("Overall: {:.1}", report.overall_score);
//! for finding in &report.findings {
//!     println!("[{:?}] {}", finding.severity, finding.description);
//! }
//! ```
//!
//! # Progress and cancellation
//!
//! ```rust,ignore
//! use lex_quality::{CancellationToken, QualityEngine};
//!
//! let token = CancellationToken::new();
//! let result = QualityEngine::builder()
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| println!("[{:?}] {}", update.stage, update.message))
//!     .build()?
//!     .analyze(&df);
//!
//! match result {
//!     Ok(report) => println!("{}", report.to_json()?),
//!     Err(QualityError::Cancelled) => println!("Cancelled"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod profiler;
pub mod quality;
pub mod recommendations;
pub mod scoring;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, DeductionTiers, DimensionWeights, QualityConfig, QualityConfigBuilder,
    Tier,
};
pub use engine::{
    AnalysisStage, CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
    QualityEngine, QualityEngineBuilder, analyze,
};
pub use error::{QualityError, Result as QualityResult, ResultExt};
pub use scoring::{QualityScorer, Scorecard, ScoringContext};
pub use types::{
    AnalysisDetails, ColumnProfile, ColumnType, Confidence, Finding, FindingKind,
    FreshnessMetadata, Priority, QualityDimension, QualityReport, Recommendation, Severity,
    SubScores, TypeIssue,
};

static_assertions::assert_impl_all!(QualityConfig: Send, Sync);
static_assertions::assert_impl_all!(QualityReport: Send, Sync);

//! Analysis orchestration.
//!
//! Runs the profiler, the four analyzers, the scorer and the recommendation
//! generator in order, with progress reporting and cancellation between
//! stages.

mod builder;
pub mod progress;

pub use builder::{QualityEngine, QualityEngineBuilder};
pub use progress::{
    AnalysisStage, CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};

use crate::config::QualityConfig;
use crate::error::Result;
use crate::types::QualityReport;
use polars::prelude::DataFrame;

/// Analyze `df` with `config`, without progress reporting or cancellation.
pub fn analyze(df: &DataFrame, config: &QualityConfig) -> Result<QualityReport> {
    QualityEngine::builder()
        .config(config.clone())
        .build()?
        .analyze(df)
}

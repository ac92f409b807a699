//! Progress reporting and cancellation for a quality analysis.
//!
//! An analysis emits one [`ProgressUpdate`] at the start and end of every
//! stage and checks its [`CancellationToken`] between stages.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_quality::{CancellationToken, QualityEngine};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! // In another thread
//! std::thread::spawn(move || token_clone.cancel());
//!
//! let result = QualityEngine::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .analyze(&df);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of an analysis, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Validating configuration and input
    Validation,
    /// Inferring column types and parsing values
    Profiling,
    MissingValues,
    Duplicates,
    Outliers,
    Distributions,
    Scoring,
    Recommendations,
    /// Analysis completed successfully
    Complete,
    /// Analysis was cancelled by the caller
    Cancelled,
    /// Analysis failed with an error
    Failed,
}

impl AnalysisStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Validation => "Validating Input",
            Self::Profiling => "Profiling Columns",
            Self::MissingValues => "Analyzing Missing Values",
            Self::Duplicates => "Detecting Duplicates",
            Self::Outliers => "Detecting Outliers",
            Self::Distributions => "Analyzing Distributions",
            Self::Scoring => "Scoring",
            Self::Recommendations => "Building Recommendations",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole analysis taken by this stage (0.0 - 1.0).
    ///
    /// Working stages sum to 1.0; terminal states weigh nothing.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Validation => 0.05,
            Self::Profiling => 0.25,
            Self::MissingValues => 0.12,
            Self::Duplicates => 0.15,
            Self::Outliers => 0.15,
            Self::Distributions => 0.18,
            Self::Scoring => 0.05,
            Self::Recommendations => 0.05,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Validation => 0.0,
            Self::Profiling => 0.05,
            Self::MissingValues => 0.30,
            Self::Duplicates => 0.42,
            Self::Outliers => 0.57,
            Self::Distributions => 0.72,
            Self::Scoring => 0.90,
            Self::Recommendations => 0.95,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: AnalysisStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: AnalysisStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: AnalysisStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            stage: AnalysisStage::Cancelled,
            progress: 0.0,
            stage_progress: 0.0,
            message: "Analysis cancelled by caller".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: AnalysisStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receiver of progress updates.
///
/// Implementations must be `Send + Sync`; the engine may run on a worker
/// thread while the reporter forwards updates elsewhere.
pub trait ProgressReporter: Send + Sync {
    /// Called at stage boundaries. Should return quickly.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running analysis.
///
/// Clones share the same flag, so [`cancel()`](Self::cancel) may be called
/// from any thread. The engine then returns
/// [`QualityError::Cancelled`](crate::error::QualityError::Cancelled) at
/// the next stage boundary.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another analysis.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

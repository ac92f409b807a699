//! Custom error types for the data-quality engine.
//!
//! Input and configuration problems are rejected before analysis starts;
//! numeric edge cases (zero variance, zero MAD, single-valued columns) are
//! never errors and are resolved inside the analyzers.
//!
//! Errors are serializable so an API layer can forward them as-is.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for quality analysis.
#[derive(Error, Debug)]
pub enum QualityError {
    /// Analysis was cancelled through a [`CancellationToken`](crate::CancellationToken).
    #[error("Analysis cancelled")]
    Cancelled,

    /// A column named in the configuration does not exist in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// A column whose storage type has no candidate quality type.
    #[error("Column '{column}' has unsupported type {dtype}")]
    UnsupportedColumnType { column: String, dtype: String },

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<QualityError>,
    },
}

impl QualityError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        QualityError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for API consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::UnsupportedColumnType { .. } => "UNSUPPORTED_COLUMN_TYPE",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if re-invoking with a corrected input or configuration can succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Cancelled
            | Self::ColumnNotFound(_)
            | Self::InvalidConfig(_)
            | Self::UnsupportedColumnType { .. } => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for QualityError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("QualityError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for quality analysis.
pub type Result<T> = std::result::Result<T, QualityError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| QualityError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::error::PolarsError;

    fn compute_error(message: &str) -> QualityError {
        QualityError::Polars(PolarsError::ComputeError(message.to_string().into()))
    }

    #[test]
    fn test_error_code() {
        assert_eq!(QualityError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            QualityError::ColumnNotFound("test".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            QualityError::UnsupportedColumnType {
                column: "tags".to_string(),
                dtype: "List(String)".to_string(),
            }
            .error_code(),
            "UNSUPPORTED_COLUMN_TYPE"
        );
        assert_eq!(compute_error("boom").error_code(), "POLARS_ERROR");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(QualityError::Cancelled.is_cancelled());
        assert!(QualityError::Cancelled.with_context("Scoring").is_cancelled());
        assert!(!compute_error("boom").is_cancelled());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(QualityError::Cancelled.is_recoverable());
        assert!(QualityError::ColumnNotFound("x".to_string()).is_recoverable());
        assert!(
            QualityError::InvalidConfig(ConfigValidationError::InvalidConsensusK(0))
                .is_recoverable()
        );
        assert!(!compute_error("error").is_recoverable());
    }

    #[test]
    fn test_error_serialization() {
        let error = QualityError::ColumnNotFound("Age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Age"));
    }

    #[test]
    fn test_with_context() {
        let error = QualityError::ColumnNotFound("test".to_string()).with_context("During profiling");
        assert!(error.to_string().contains("During profiling"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }
}

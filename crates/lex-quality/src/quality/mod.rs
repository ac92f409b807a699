//! Quality analyzers.
//!
//! Each analyzer reads the profiled columns and returns its structured
//! summary together with the findings it emits. Analyzers never see each
//! other's output.

pub mod distribution;
pub mod duplicates;
pub mod missing;
pub mod normality;
pub mod outliers;

pub use distribution::{
    CardinalityBucket, ColumnDistribution, EntropyClass, NumericShape, SkewClass,
    analyze_distributions,
};
pub use duplicates::{DuplicateGroup, DuplicateSummary, analyze_duplicates};
pub use missing::{ColumnMissing, MissingCorrelation, MissingValueSummary, analyze_missing};
pub use normality::NormalityTest;
pub use outliers::{
    ColumnOutliers, MethodCounts, OutlierMethod, OutlierValue, analyze_outliers,
};

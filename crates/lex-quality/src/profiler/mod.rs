//! Column profiling.
//!
//! The profiler is the only stage that reads the `DataFrame`. It decides a
//! quality type per column and materializes the column into a
//! [`TypedColumn`]: typed values, a missing mask and the raw text of cells
//! that did not parse as the inferred type. Every analyzer works from these
//! typed columns.

mod role_inference;
pub(crate) mod statistics;
mod type_inference;

use crate::config::QualityConfig;
use crate::error::{QualityError, Result, ResultExt};
use crate::types::{ColumnProfile, ColumnType, Finding, FindingKind, Severity, TypeIssue};
use crate::utils::{
    dtype_name, is_datetime_dtype, is_missing_marker, is_numeric_dtype, is_text_dtype,
    parse_boolean_string, parse_numeric_string,
};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use tracing::debug;

use role_inference::is_identifier_like;
use type_inference::{parse_datetime_string, sample_positions, vote_text_type};

/// Values rendered to text for identifier pattern checks.
const IDENTIFIER_SAMPLE_SIZE: usize = 100;

/// Typed cell storage. `None` marks a missing or non-conforming cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Datetime(Vec<Option<NaiveDateTime>>),
    Boolean(Vec<Option<bool>>),
}

impl ColumnValues {
    fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
            Self::Datetime(v) => v.len(),
            Self::Boolean(v) => v.len(),
        }
    }
}

/// Hashable, comparable view of one typed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey<'a> {
    Number(u64),
    Text(&'a str),
    Timestamp(i64),
    Flag(bool),
}

impl ValueKey<'_> {
    fn number(value: f64) -> Self {
        // -0.0 and 0.0 are the same value
        let normalized = if value == 0.0 { 0.0 } else { value };
        ValueKey::Number(normalized.to_bits())
    }
}

/// A column after profiling.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedColumn {
    pub profile: ColumnProfile,
    pub values: ColumnValues,
    /// `true` where the cell is missing.
    pub missing: Vec<bool>,
    /// Raw text of present cells that did not parse, sorted by row.
    pub non_conforming: Vec<(usize, String)>,
}

impl TypedColumn {
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn len(&self) -> usize {
        self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn inferred_type(&self) -> ColumnType {
        self.profile.inferred_type
    }

    /// Typed value of a conforming cell.
    pub fn key(&self, row: usize) -> Option<ValueKey<'_>> {
        match &self.values {
            ColumnValues::Numeric(v) => v[row].map(ValueKey::number),
            ColumnValues::Categorical(v) => v[row].as_deref().map(ValueKey::Text),
            ColumnValues::Datetime(v) => v[row]
                .map(|dt| ValueKey::Timestamp(dt.and_utc().timestamp_micros())),
            ColumnValues::Boolean(v) => v[row].map(ValueKey::Flag),
        }
    }

    /// Conforming numeric values with their row positions. Empty for
    /// non-numeric columns.
    pub fn numeric_values(&self) -> Vec<(usize, f64)> {
        match &self.values {
            ColumnValues::Numeric(v) => v
                .iter()
                .enumerate()
                .filter_map(|(row, value)| value.map(|x| (row, x)))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn raw_text(&self, row: usize) -> Option<&str> {
        self.non_conforming
            .binary_search_by_key(&row, |(r, _)| *r)
            .ok()
            .map(|idx| self.non_conforming[idx].1.as_str())
    }

    /// Feed one cell into a hasher. Missing, conforming and non-conforming
    /// cells get distinct tags.
    pub fn hash_cell<H: Hasher>(&self, row: usize, state: &mut H) {
        if self.missing[row] {
            0u8.hash(state);
        } else if let Some(key) = self.key(row) {
            1u8.hash(state);
            key.hash(state);
        } else {
            2u8.hash(state);
            self.raw_text(row).hash(state);
        }
    }

    /// Whether two rows hold the same cell, using the same rules as [`hash_cell`](Self::hash_cell).
    pub fn cells_equal(&self, a: usize, b: usize) -> bool {
        match (self.missing[a], self.missing[b]) {
            (true, true) => true,
            (false, false) => match (self.key(a), self.key(b)) {
                (Some(x), Some(y)) => x == y,
                (None, None) => self.raw_text(a) == self.raw_text(b),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Profile every column of `df`, in parallel, preserving frame order.
pub fn profile_dataset(df: &DataFrame, config: &QualityConfig) -> Result<Vec<TypedColumn>> {
    let columns = df.get_columns();
    let typed: Vec<TypedColumn> = columns
        .par_iter()
        .map(|column| profile_column(column.as_materialized_series(), config))
        .collect::<Result<Vec<_>>>()?;

    for column in &typed {
        debug!(
            "Profiled column '{}': {:?} ({} missing, {} unique, {:.2} conforming)",
            column.name(),
            column.inferred_type(),
            column.profile.missing_count,
            column.profile.unique_count,
            column.profile.conforming_ratio
        );
    }
    Ok(typed)
}

/// Share of non-conforming values above which a mixed column is Medium.
const MIXED_VALUES_MEDIUM_RATIO: f64 = 0.05;

/// Type consistency findings: text-stored typed columns and columns mixing
/// parseable and unparseable values.
pub fn type_findings(columns: &[TypedColumn]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for column in columns {
        let profile = &column.profile;
        if profile.stored_as_text() {
            findings.push(Finding::new(
                FindingKind::TypeMismatch {
                    issue: TypeIssue::StoredAsText {
                        suggested: profile.inferred_type,
                    },
                },
                vec![profile.name.clone()],
                Severity::Medium,
                profile.conforming_ratio,
                format!(
                    "Column '{}' holds {} values stored as text",
                    profile.name,
                    profile.inferred_type.as_str()
                ),
            ));
        }
        if !column.non_conforming.is_empty() {
            let bad_ratio = 1.0 - profile.conforming_ratio;
            let severity = if bad_ratio > MIXED_VALUES_MEDIUM_RATIO {
                Severity::Medium
            } else {
                Severity::Low
            };
            findings.push(Finding::new(
                FindingKind::TypeMismatch {
                    issue: TypeIssue::MixedValues {
                        conforming_ratio: profile.conforming_ratio,
                    },
                },
                vec![profile.name.clone()],
                severity,
                profile.conforming_ratio,
                format!(
                    "Column '{}' has {} values that are not {} (e.g. '{}')",
                    profile.name,
                    column.non_conforming.len(),
                    profile.inferred_type.as_str(),
                    column.non_conforming[0].1
                ),
            ));
        }
    }
    findings
}

/// Check that every column has a supported storage type.
pub fn validate_column_types(df: &DataFrame) -> Result<()> {
    for column in df.get_columns() {
        let dtype = column.dtype();
        if !is_supported_dtype(dtype) {
            return Err(QualityError::UnsupportedColumnType {
                column: column.name().to_string(),
                dtype: dtype_name(dtype),
            });
        }
    }
    Ok(())
}

fn is_supported_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype)
        || is_datetime_dtype(dtype)
        || is_text_dtype(dtype)
        || matches!(dtype, DataType::Boolean | DataType::Null)
}

fn profile_column(series: &Series, config: &QualityConfig) -> Result<TypedColumn> {
    let name = series.name().to_string();
    let dtype = series.dtype().clone();
    let context = || format!("Failed to profile column '{name}'");

    let (values, missing, non_conforming) = if is_numeric_dtype(&dtype) {
        read_numeric(series).context(context())?
    } else if dtype == DataType::Boolean {
        read_boolean(series).context(context())?
    } else if is_datetime_dtype(&dtype) {
        read_datetime(series).context(context())?
    } else if is_text_dtype(&dtype) || dtype == DataType::Null {
        read_text(series, config).context(context())?
    } else {
        return Err(QualityError::UnsupportedColumnType {
            column: name.clone(),
            dtype: dtype_name(&dtype),
        });
    };

    let row_count = missing.len();
    let missing_count = missing.iter().filter(|m| **m).count();
    let present_count = row_count - missing_count;
    let conforming_ratio = if present_count == 0 {
        1.0
    } else {
        (present_count - non_conforming.len()) as f64 / present_count as f64
    };

    let inferred_type = match &values {
        ColumnValues::Numeric(_) => ColumnType::Numeric,
        ColumnValues::Categorical(_) => ColumnType::Categorical,
        ColumnValues::Datetime(_) => ColumnType::Datetime,
        ColumnValues::Boolean(_) => ColumnType::Boolean,
    };

    let mut column = TypedColumn {
        profile: ColumnProfile {
            name,
            storage_dtype: dtype_name(&dtype),
            text_storage: is_text_dtype(&dtype),
            inferred_type,
            row_count,
            missing_count,
            unique_count: 0,
            conforming_ratio,
            identifier_like: false,
        },
        values,
        missing,
        non_conforming,
    };

    let unique: HashSet<ValueKey<'_>> = (0..row_count).filter_map(|row| column.key(row)).collect();
    let unique_count = unique.len();

    let identifier_like = matches!(inferred_type, ColumnType::Numeric | ColumnType::Categorical)
        && is_identifier_like(
            column.name(),
            &identifier_sample(&column),
            unique_count,
            present_count,
        );

    column.profile.unique_count = unique_count;
    column.profile.identifier_like = identifier_like;
    Ok(column)
}

/// Text rendering of a deterministic sample of conforming values.
fn identifier_sample(column: &TypedColumn) -> Vec<String> {
    let rows: Vec<usize> = (0..column.len())
        .filter(|&row| column.key(row).is_some())
        .collect();
    sample_positions(rows.len(), IDENTIFIER_SAMPLE_SIZE)
        .into_iter()
        .filter_map(|pos| match &column.values {
            ColumnValues::Numeric(v) => v[rows[pos]].map(|x| x.to_string()),
            ColumnValues::Categorical(v) => v[rows[pos]].clone(),
            _ => None,
        })
        .collect()
}

type ReadOutput = (ColumnValues, Vec<bool>, Vec<(usize, String)>);

fn read_numeric(series: &Series) -> PolarsResult<ReadOutput> {
    let floats = series.cast(&DataType::Float64)?;
    let ca = floats.f64()?;
    let mut values = Vec::with_capacity(ca.len());
    let mut missing = Vec::with_capacity(ca.len());
    let mut non_conforming = Vec::new();

    for (row, value) in ca.into_iter().enumerate() {
        match value {
            Some(x) if x.is_finite() => {
                values.push(Some(x));
                missing.push(false);
            }
            Some(x) if x.is_infinite() => {
                values.push(None);
                missing.push(false);
                non_conforming.push((row, x.to_string()));
            }
            // null or NaN
            _ => {
                values.push(None);
                missing.push(true);
            }
        }
    }
    Ok((ColumnValues::Numeric(values), missing, non_conforming))
}

fn read_boolean(series: &Series) -> PolarsResult<ReadOutput> {
    let ca = series.bool()?;
    let values: Vec<Option<bool>> = ca.into_iter().collect();
    let missing = values.iter().map(Option::is_none).collect();
    Ok((ColumnValues::Boolean(values), missing, Vec::new()))
}

fn read_datetime(series: &Series) -> PolarsResult<ReadOutput> {
    let values: Vec<Option<NaiveDateTime>> = match series.dtype() {
        DataType::Date => {
            let days = series.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .map(|d| {
                    d.and_then(|d| DateTime::from_timestamp(i64::from(d) * 86_400, 0))
                        .map(|dt| dt.naive_utc())
                })
                .collect()
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let raw = series.cast(&DataType::Int64)?;
            raw.i64()?
                .into_iter()
                .map(|t| t.and_then(|t| timestamp_to_naive(t, unit)))
                .collect()
        }
        other => {
            return Err(PolarsError::InvalidOperation(
                format!("not a temporal dtype: {other}").into(),
            ));
        }
    };
    let missing = values.iter().map(Option::is_none).collect();
    Ok((ColumnValues::Datetime(values), missing, Vec::new()))
}

fn timestamp_to_naive(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    };
    dt.map(|dt| dt.naive_utc())
}

fn read_text(series: &Series, config: &QualityConfig) -> PolarsResult<ReadOutput> {
    let text = series.cast(&DataType::String)?;
    let ca = text.str()?;
    let cells: Vec<Option<&str>> = ca
        .into_iter()
        .map(|v| v.filter(|s| !is_missing_marker(s)))
        .collect();
    let missing: Vec<bool> = cells.iter().map(Option::is_none).collect();

    let present: Vec<&str> = cells.iter().flatten().copied().collect();
    let sample: Vec<&str> = sample_positions(present.len(), config.type_inference_sample_size)
        .into_iter()
        .map(|pos| present[pos])
        .collect();
    let inferred = vote_text_type(&sample);

    let mut non_conforming = Vec::new();
    let values = match inferred {
        ColumnType::Numeric => ColumnValues::Numeric(parse_cells(
            &cells,
            parse_numeric_string,
            &mut non_conforming,
        )),
        ColumnType::Datetime => ColumnValues::Datetime(parse_cells(
            &cells,
            parse_datetime_string,
            &mut non_conforming,
        )),
        ColumnType::Boolean => ColumnValues::Boolean(parse_cells(
            &cells,
            parse_boolean_string,
            &mut non_conforming,
        )),
        ColumnType::Categorical => ColumnValues::Categorical(
            cells.iter().map(|v| v.map(str::to_string)).collect(),
        ),
    };
    debug_assert_eq!(values.len(), missing.len());
    Ok((values, missing, non_conforming))
}

fn parse_cells<T>(
    cells: &[Option<&str>],
    parse: impl Fn(&str) -> Option<T>,
    non_conforming: &mut Vec<(usize, String)>,
) -> Vec<Option<T>> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let raw = (*cell)?;
            let parsed = parse(raw);
            if parsed.is_none() {
                non_conforming.push((row, raw.to_string()));
            }
            parsed
        })
        .collect()
}

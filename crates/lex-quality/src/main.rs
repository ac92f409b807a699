//! CLI entry point for the data-quality engine.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Parser;
use lex_quality::{
    FreshnessMetadata, QualityConfig, QualityDimension, QualityEngine, QualityReport, Severity,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Data-quality analysis for tabular datasets",
    long_about = "Scores a CSV dataset on completeness, consistency, validity, \
                  uniqueness and timeliness, and lists prioritized fixes.\n\n\
                  EXAMPLES:\n  \
                  # Human-readable summary\n  \
                  lex-quality -i data.csv\n\n  \
                  # JSON report for other tools\n  \
                  lex-quality -i data.csv --json | jq .overall_score\n\n  \
                  # Stricter outlier consensus and freshness scoring\n  \
                  lex-quality -i data.csv --k 3 --last-updated 2024-01-31T00:00:00Z"
)]
struct Args {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: String,

    /// Print the full report as JSON instead of a summary
    ///
    /// Disables all logs so stdout only contains the report.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the result)
    #[arg(short, long)]
    quiet: bool,

    /// Number of outlier detectors that must agree (1 - 3)
    #[arg(long, default_value = "2")]
    k: usize,

    /// IQR fence multiplier
    #[arg(long, default_value = "1.5")]
    iqr_multiplier: f64,

    /// Z-score threshold
    #[arg(long, default_value = "3.0")]
    zscore_threshold: f64,

    /// Modified z-score (MAD) threshold
    #[arg(long, default_value = "3.5")]
    mad_threshold: f64,

    /// Comma-separated columns for partial-duplicate detection
    ///
    /// Defaults to every numeric column.
    #[arg(long, value_delimiter = ',')]
    duplicate_subset: Option<Vec<String>>,

    /// When the dataset was last updated (RFC 3339); enables timeliness scoring
    #[arg(long)]
    last_updated: Option<String>,
}

/// Initialize the tracing subscriber for logging.
///
/// With `json_output` no subscriber is installed so stdout only carries
/// the report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !std::path::Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_csv(&args.input)?;
    info!("Dataset loaded: {:?}", data.shape());

    let mut config_builder = QualityConfig::builder()
        .outlier_consensus_k(args.k)
        .iqr_multiplier(args.iqr_multiplier)
        .zscore_threshold(args.zscore_threshold)
        .mad_threshold(args.mad_threshold);
    if let Some(columns) = &args.duplicate_subset {
        config_builder = config_builder.duplicate_subset_columns(columns.clone());
    }
    let config = config_builder.build()?;

    let mut engine_builder = QualityEngine::builder().config(config);
    if let Some(raw) = &args.last_updated {
        let last_updated = DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid --last-updated timestamp '{}'", raw))?
            .with_timezone(&Utc);
        engine_builder = engine_builder.freshness(FreshnessMetadata::new(last_updated, Utc::now()));
    }
    if !args.json && !args.quiet {
        engine_builder = engine_builder.on_progress(|update| {
            debug!("[{:>3.0}%] {}", update.progress * 100.0, update.message);
        });
    }

    let report = engine_builder
        .build()?
        .analyze(&data)
        .map_err(|e| anyhow!("Quality analysis failed: {}", e))?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report, &args.input);
    }
    Ok(())
}

/// Load a CSV file, retrying without quote handling on failure.
fn load_csv(path: &str) -> Result<DataFrame> {
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard loading failed: {}", e),
    }

    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .with_context(|| format!("Could not parse CSV file '{}'", path))
}

/// Print a human-readable summary.
///
/// Uses `println!` on purpose: this is the command's output, not a log.
fn print_summary(report: &QualityReport, input: &str) {
    let (rows, columns) = report.details.shape;

    println!("\n{}", "=".repeat(80));
    println!("DATA QUALITY REPORT");
    println!("{}", "=".repeat(80));
    println!("  File: {}", input);
    println!("  Shape: {} rows x {} columns", rows, columns);
    println!("  Overall score: {:.1} / 100", report.overall_score);
    println!();

    println!("SUB-SCORES");
    println!("{}", "-".repeat(40));
    for dimension in QualityDimension::ALL {
        println!(
            "  {:<14} {:>6.1}",
            dimension.display_name(),
            report.sub_scores.get(dimension)
        );
    }
    println!();

    println!("FINDINGS ({})", report.findings.len());
    println!("{}", "-".repeat(40));
    if report.findings.is_empty() {
        println!("  No data quality issues detected");
    }
    let mut findings: Vec<_> = report.findings.iter().collect();
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    for finding in findings {
        println!(
            "  - [{}] {}",
            severity_label(finding.severity),
            finding.description
        );
    }
    println!();

    println!("RECOMMENDATIONS");
    println!("{}", "-".repeat(40));
    if report.recommendations.is_empty() {
        println!("  Nothing to fix");
    }
    for (i, rec) in report.recommendations.iter().enumerate() {
        println!(
            "  {}. [{:?}] {} (+{:.1} pts)",
            i + 1,
            rec.priority,
            rec.action,
            rec.estimated_impact
        );
    }
    println!("{}", "=".repeat(80));
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "LOW",
        Severity::Medium => "MEDIUM",
        Severity::High => "HIGH",
        Severity::Critical => "CRITICAL",
    }
}

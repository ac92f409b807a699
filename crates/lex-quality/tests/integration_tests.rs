//! Integration tests for the quality engine.
//!
//! These tests run the full analysis through the public API on small
//! in-memory frames and a CSV fixture.

use chrono::{DateTime, Duration, Utc};
use lex_quality::{
    AnalysisStage, CancellationToken, Confidence, FindingKind, FreshnessMetadata, Priority,
    QualityConfig, QualityEngine, QualityError, QualityReport, Severity, TypeIssue, analyze,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    let path = fixtures_path().join(filename);
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn run(df: &DataFrame) -> QualityReport {
    analyze(df, &QualityConfig::default()).expect("Analysis should succeed")
}

fn orders_df() -> DataFrame {
    let n = 40;
    let amount: Vec<Option<f64>> = (0..n)
        .map(|i| if i % 7 == 3 { None } else { Some(20.0 + (i % 9) as f64 * 1.5) })
        .collect();
    let region: Vec<&str> = (0..n)
        .map(|i| ["north", "south", "east", "west"][i % 4])
        .collect();
    let quantity: Vec<i64> = (0..n).map(|i| (i % 6) as i64 + 1).collect();
    df![
        "amount" => amount,
        "region" => region,
        "quantity" => quantity,
    ]
    .unwrap()
}

fn uniqueness_with_duplicates(copies: usize) -> f64 {
    let mut a: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let mut b: Vec<String> = (0..20).map(|i| format!("item-{}", i % 7)).collect();
    for _ in 0..copies {
        a.push(a[0]);
        b.push(b[0].clone());
    }
    let df = df!["a" => a, "b" => b].unwrap();
    run(&df).sub_scores.uniqueness
}

// ============================================================================
// Report invariants
// ============================================================================

#[test]
fn test_scores_within_bounds() {
    let frames = vec![
        orders_df(),
        df!["x" => [1.0, 2.0, 3.0, 4.0, 100.0]].unwrap(),
        df![
            "mostly_missing" => [None, None, None, Some(1.0), None, None],
            "constant" => ["a", "a", "a", "a", "a", "a"],
        ]
        .unwrap(),
        load_csv("customers.csv"),
    ];

    for df in &frames {
        let report = run(df);
        assert!((0.0..=100.0).contains(&report.overall_score));
        for value in [
            report.sub_scores.completeness,
            report.sub_scores.consistency,
            report.sub_scores.validity,
            report.sub_scores.uniqueness,
            report.sub_scores.timeliness,
        ] {
            assert!((0.0..=100.0).contains(&value));
        }
        for rec in &report.recommendations {
            assert!(rec.estimated_impact >= 0.0);
        }
    }
}

#[test]
fn test_analysis_is_idempotent() {
    let df = load_csv("customers.csv");
    let first = run(&df);
    let second = run(&df);
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_analysis_does_not_modify_input() {
    let df = orders_df();
    let before = df.clone();
    run(&df);
    assert!(df.equals_missing(&before));
}

#[test]
fn test_added_duplicates_never_raise_uniqueness() {
    let mut previous = uniqueness_with_duplicates(0);
    assert_eq!(previous, 100.0);
    for copies in 1..=8 {
        let current = uniqueness_with_duplicates(copies);
        assert!(
            current <= previous,
            "uniqueness rose from {} to {} with {} copies",
            previous,
            current,
            copies
        );
        previous = current;
    }
    assert!(previous < 100.0);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_empty_dataset() {
    let df = df![
        "a" => Vec::<f64>::new(),
        "b" => Vec::<&str>::new(),
    ]
    .unwrap();
    let report = run(&df);

    assert_eq!(report.overall_score, 0.0);
    assert_eq!(report.sub_scores.completeness, 0.0);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].severity, Severity::Critical);
    assert_eq!(
        report.findings[0].kind,
        FindingKind::TypeMismatch {
            issue: TypeIssue::EmptyDataset
        }
    );
    assert_eq!(report.recommendations[0].priority, Priority::Critical);
    assert!(report.recommendations[0].action.starts_with("STOP"));

    let missing = &report.details.missing;
    assert_eq!(missing.columns.len(), 2);
    assert_eq!(missing.columns[0].column, "a");
    assert_eq!(missing.columns[1].column, "b");
    assert!(missing.columns.iter().all(|c| c.missing_count == 0 && c.missing_ratio == 0.0));
}

#[test]
fn test_frame_without_columns_is_empty() {
    let report = run(&DataFrame::empty());
    assert_eq!(report.overall_score, 0.0);
    assert_eq!(report.findings.len(), 1);
}

#[test]
fn test_duplicate_scenario() {
    let df = df![
        "a" => [1i64, 2, 3, 4, 5, 1, 2, 3, 4, 5],
        "b" => ["x", "y", "z", "w", "v", "x", "y", "z", "w", "v"],
    ]
    .unwrap();
    let report = run(&df);

    let duplicates = &report.details.duplicates;
    assert_eq!(duplicates.exact_duplicates, 5);
    assert_eq!(duplicates.duplicate_percentage, 50.0);
    assert_eq!(duplicates.exact_group_count, 5);
    assert_eq!(duplicates.partial_duplicates, 0);

    let finding = report
        .findings
        .iter()
        .find(|f| matches!(f.kind, FindingKind::Duplicate { .. }))
        .expect("duplicate finding");
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(report.sub_scores.uniqueness, 90.0);
}

#[test]
fn test_partial_duplicates_on_explicit_subset() {
    // rows 0 and 1 are exact copies; rows 2 and 3 repeat row 0's customer
    // and amount under a different order id
    let df = df![
        "order_id" => ["o1", "o1", "o2", "o3", "o4", "o5"],
        "customer" => ["ann", "ann", "ann", "ann", "bob", "cat"],
        "amount" => [10.0, 10.0, 10.0, 10.0, 25.0, 40.0],
    ]
    .unwrap();
    let config = QualityConfig::builder()
        .duplicate_subset_columns(vec!["customer".to_string(), "amount".to_string()])
        .build()
        .unwrap();
    let report = analyze(&df, &config).unwrap();

    let duplicates = &report.details.duplicates;
    assert_eq!(duplicates.exact_duplicates, 1);
    assert_eq!(duplicates.partial_duplicates, 2);
    assert_eq!(
        duplicates.subset_columns,
        vec!["customer".to_string(), "amount".to_string()]
    );
}

#[test]
fn test_single_numeric_column_has_no_partial_duplicates() {
    let names: Vec<String> = ('a'..='j').map(|c| c.to_string()).collect();
    let df = df![
        "name" => names,
        "age" => [30i64, 30, 30, 30, 30, 41, 41, 41, 52, 52],
    ]
    .unwrap();
    let report = run(&df);

    assert!(report.details.duplicates.subset_columns.is_empty());
    assert_eq!(report.details.duplicates.partial_duplicates, 0);
    assert_eq!(report.sub_scores.uniqueness, 100.0);
}

#[test]
fn test_outlier_scenario() {
    let df = df!["x" => [1.0, 2.0, 3.0, 4.0, 100.0]].unwrap();
    let report = run(&df);

    let outliers = &report.details.outliers[0];
    assert_eq!(outliers.column, "x");
    assert_eq!(outliers.per_method_counts.iqr, Some(1));
    assert_eq!(outliers.per_method_counts.zscore, Some(0));
    assert_eq!(outliers.per_method_counts.modified_zscore, Some(1));
    assert_eq!(outliers.consensus_outliers.len(), 1);
    assert_eq!(outliers.consensus_outliers[0].value, 100.0);
    assert_eq!(outliers.consensus_outliers[0].votes, 2);
    assert_eq!(outliers.consensus_outliers[0].confidence, Confidence::Medium);
}

#[test]
fn test_single_detector_flag_is_not_consensus() {
    // 32 is past the IQR fence (30) but |z| ~ 2.83 and modified z ~ 2.97
    let mut values: Vec<f64> = (0..20).map(|i| i as f64).collect();
    values.push(32.0);
    let report = run(&df!["x" => values].unwrap());

    let outliers = &report.details.outliers[0];
    assert!(!outliers.capped);
    assert!(outliers.consensus_outliers.is_empty());
    assert_eq!(outliers.single_method_flags.len(), 1);
    assert_eq!(outliers.single_method_flags[0].value, 32.0);
    assert_eq!(outliers.single_method_flags[0].confidence, Confidence::Low);
    assert!(
        !report
            .findings
            .iter()
            .any(|f| matches!(f.kind, FindingKind::Outlier { .. }))
    );
}

#[test]
fn test_unanimous_flag_is_high_confidence() {
    let mut values: Vec<f64> = (0..30).map(|i| 10.0 + (i % 5) as f64).collect();
    values.push(500.0);
    let report = run(&df!["x" => values].unwrap());

    let outliers = &report.details.outliers[0];
    assert_eq!(outliers.consensus_outliers.len(), 1);
    assert_eq!(outliers.consensus_outliers[0].votes, 3);
    assert_eq!(outliers.consensus_outliers[0].confidence, Confidence::High);
}

#[test]
fn test_skipped_detector_caps_two_vote_outlier() {
    // MAD is 0, so only IQR and z-score run and both flag 1000
    let mut values = vec![10.0; 20];
    values.push(1000.0);
    let config = QualityConfig::builder().outlier_consensus_k(2).build().unwrap();
    let report = analyze(&df!["x" => values].unwrap(), &config).unwrap();

    let outliers = &report.details.outliers[0];
    assert!(outliers.capped);
    assert_eq!(outliers.per_method_counts.modified_zscore, None);
    assert_eq!(outliers.consensus_outliers.len(), 1);
    assert_eq!(outliers.consensus_outliers[0].value, 1000.0);
    assert_eq!(outliers.consensus_outliers[0].votes, 2);
    assert_eq!(outliers.consensus_outliers[0].confidence, Confidence::Medium);
    assert_eq!(outliers.confidence, Some(Confidence::Medium));
}

#[test]
fn test_mixed_values_lower_consistency() {
    let prices = |bad: bool| -> Vec<String> {
        (0..20)
            .map(|i| {
                if bad && i == 7 {
                    "abc".to_string()
                } else {
                    format!("{}", 10 + i % 5)
                }
            })
            .collect()
    };
    let region: Vec<&str> = (0..20).map(|i| ["north", "south", "east", "west"][i % 4]).collect();
    let clean = run(&df!["price" => prices(false), "region" => region.clone()].unwrap());
    let mixed = run(&df!["price" => prices(true), "region" => region].unwrap());

    assert!(mixed.findings.iter().any(|f| matches!(
        f.kind,
        FindingKind::TypeMismatch {
            issue: TypeIssue::MixedValues { .. }
        }
    )));
    assert!(mixed.sub_scores.consistency < clean.sub_scores.consistency);
}

#[test]
fn test_distinct_value_cap_truncates_entropy() {
    let skus: Vec<String> = (0..50).map(|i| format!("sku-{i}")).collect();
    let config = QualityConfig::builder().max_distinct_values(10).build().unwrap();
    let report = QualityEngine::builder()
        .config(config)
        .build()
        .unwrap()
        .analyze(&df!["sku" => skus].unwrap())
        .unwrap();

    let sku = &report.details.distributions[0];
    assert_eq!(sku.column, "sku");
    assert!(sku.entropy_truncated);
    assert!((sku.normalized_entropy - 1.0).abs() < 1e-9);
}

#[test]
fn test_imbalanced_column_and_small_dataset_advisory() {
    let mut status = vec!["paid"; 24];
    status.extend(["refunded", "refunded", "disputed"]);
    let amount: Vec<f64> = (0..27).map(|i| 20.0 + (i % 9) as f64).collect();
    let report = run(&df!["status" => status, "amount" => amount].unwrap());

    let imbalance = report
        .findings
        .iter()
        .find(|f| matches!(f.kind, FindingKind::ClassImbalance { .. }))
        .expect("class imbalance finding");
    assert_eq!(imbalance.columns, vec!["status".to_string()]);
    assert_eq!(imbalance.metric_value, 24.0);
    assert_eq!(imbalance.severity, Severity::Medium);
    assert!(report.sub_scores.consistency < 100.0);

    let advisory = report
        .recommendations
        .iter()
        .find(|r| r.issue == "Very small dataset (n=27)")
        .expect("small dataset advisory");
    assert_eq!(advisory.priority, Priority::High);
    assert_eq!(advisory.estimated_impact, 0.0);
    assert!(report.recommendations.iter().any(|r| r.issue == "Only 1 numeric column"));
}

#[test]
fn test_entropy_bounds() {
    let df = df![
        "constant" => ["x"; 12],
        "skewed" => ["a", "a", "a", "a", "a", "a", "a", "a", "a", "a", "b", "c"],
        "uniform" => ["a", "b", "c", "d", "a", "b", "c", "d", "a", "b", "c", "d"],
        "numbers" => [1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 4.0, 4.0, 5.0, 9.0],
    ]
    .unwrap();
    let report = run(&df);

    for dist in &report.details.distributions {
        assert!(dist.entropy.is_finite());
        assert!((0.0..=1.0).contains(&dist.normalized_entropy));
    }
    let constant = &report.details.distributions[0];
    assert_eq!(constant.unique_count, 1);
    assert_eq!(constant.entropy, 0.0);
    assert_eq!(constant.normalized_entropy, 0.0);

    let uniform = &report.details.distributions[2];
    assert!((uniform.normalized_entropy - 1.0).abs() < 1e-12);

    let low_entropy: Vec<&str> = report
        .findings
        .iter()
        .filter(|f| matches!(f.kind, FindingKind::LowEntropy { .. }))
        .map(|f| f.columns[0].as_str())
        .collect();
    assert!(low_entropy.contains(&"constant"));
    assert!(!low_entropy.contains(&"uniform"));
}

#[test]
fn test_correlated_missingness_scenario() {
    let n = 24;
    let status: Vec<&str> = (0..n)
        .map(|i| if i % 4 == 0 { "closed" } else { "open" })
        .collect();
    let amount: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 4 != 0).then(|| 10.0 + i as f64))
        .collect();
    let fee: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 4 != 0).then(|| (i % 5) as f64 + 1.0))
        .collect();
    let df = df![
        "status" => status,
        "amount" => amount,
        "fee" => fee,
    ]
    .unwrap();
    let report = run(&df);

    let correlated = report
        .findings
        .iter()
        .find(|f| matches!(f.kind, FindingKind::CorrelatedMissing { .. }))
        .expect("correlated missingness finding");
    assert_eq!(correlated.columns, vec!["amount".to_string(), "fee".to_string()]);
    assert!(correlated.metric_value > 0.5);

    let missing = &report.details.missing;
    assert!(missing.pattern_evaluated);
    assert_eq!(missing.columns_with_missing, 2);
    assert_eq!(missing.rows_with_missing, 6);
    assert_eq!(missing.mnar_score, 1.0);
    assert_eq!(missing.mcar_score, 0.0);
}

#[test]
fn test_single_column_missingness_is_neutral() {
    let df = df!["x" => [Some(1.0), None, Some(3.0), Some(4.0), None, Some(6.0)]].unwrap();
    let report = run(&df);
    assert_eq!(report.details.missing.mcar_score, 0.5);
    assert_eq!(report.details.missing.mnar_score, 0.5);
}

// ============================================================================
// CSV fixture
// ============================================================================

#[test]
fn test_customers_fixture() {
    let df = load_csv("customers.csv");
    let report = run(&df);

    assert_eq!(report.details.shape, (10, 6));
    assert_eq!(report.details.duplicates.exact_duplicates, 1);
    assert_eq!(report.details.duplicates.groups[0].rows, vec![2, 5]);

    // "NA" is a missing marker, so age is numeric text with two gaps
    let age = &report.details.column_profiles[2];
    assert_eq!(age.name, "age");
    assert_eq!(age.missing_count, 2);
    assert_eq!(age.inferred_type, lex_quality::ColumnType::Numeric);

    let stored_as_text: Vec<&str> = report
        .findings
        .iter()
        .filter(|f| {
            matches!(
                f.kind,
                FindingKind::TypeMismatch {
                    issue: TypeIssue::StoredAsText { .. }
                }
            )
        })
        .map(|f| f.columns[0].as_str())
        .collect();
    assert_eq!(stored_as_text, vec!["age", "signup_date"]);

    let income = report
        .details
        .outliers
        .iter()
        .find(|o| o.column == "income")
        .expect("income outliers");
    assert_eq!(income.consensus_outliers.len(), 1);
    assert_eq!(income.consensus_outliers[0].value, 1_000_000.0);

    assert!(report.sub_scores.completeness < 100.0);
    assert!(report.sub_scores.validity < 100.0);
    assert!(!report.recommendations.is_empty());
}

// ============================================================================
// Configuration, freshness and control flow
// ============================================================================

#[test]
fn test_invalid_config_rejected() {
    let mut config = QualityConfig::default();
    config.zscore_threshold = -3.0;
    let err = analyze(&orders_df(), &config).unwrap_err();
    assert!(matches!(err, QualityError::InvalidConfig(_)));
    assert_eq!(err.error_code(), "INVALID_CONFIG");

    let mut config = QualityConfig::default();
    config.subscore_weights.completeness = -1.0;
    assert!(analyze(&orders_df(), &config).is_err());
}

#[test]
fn test_unsupported_column_rejected() {
    let list = Series::new(
        "tags".into(),
        [Series::new("".into(), [1i32, 2]), Series::new("".into(), [3i32])],
    );
    let df = DataFrame::new(vec![list.into()]).unwrap();
    let err = analyze(&df, &QualityConfig::default()).unwrap_err();
    assert!(matches!(err, QualityError::UnsupportedColumnType { .. }));
}

#[test]
fn test_stricter_consensus_drops_two_vote_outliers() {
    let config = QualityConfig::builder().outlier_consensus_k(3).build().unwrap();
    let df = df!["x" => [1.0, 2.0, 3.0, 4.0, 100.0]].unwrap();
    let report = analyze(&df, &config).unwrap();
    assert!(report.details.outliers[0].consensus_outliers.is_empty());
    assert_eq!(report.details.outliers[0].single_method_flags.len(), 1);
}

#[test]
fn test_freshness_affects_timeliness() {
    let as_of: DateTime<Utc> = DateTime::parse_from_rfc3339("2025-06-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let stale = FreshnessMetadata::new(as_of - Duration::days(400), as_of);
    let fresh = FreshnessMetadata::new(as_of - Duration::days(2), as_of);

    let analyze_with = |freshness: FreshnessMetadata| {
        QualityEngine::builder()
            .freshness(freshness)
            .build()
            .unwrap()
            .analyze(&orders_df())
            .unwrap()
    };

    let stale_report = analyze_with(stale);
    assert_eq!(stale_report.sub_scores.timeliness, 60.0);
    assert_eq!(stale_report.details.dataset_age_days, Some(400.0));

    let fresh_report = analyze_with(fresh);
    assert_eq!(fresh_report.sub_scores.timeliness, 100.0);
    assert!(fresh_report.overall_score > stale_report.overall_score);
}

#[test]
fn test_cancellation_between_stages() {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let stages_clone = stages.clone();

    let engine = QualityEngine::builder()
        .cancellation_token(token)
        .on_progress(move |update| {
            if update.stage == AnalysisStage::Duplicates {
                token_clone.cancel();
            }
            stages_clone.lock().unwrap().push(update.stage);
        })
        .build()
        .unwrap();

    let err = engine.analyze(&orders_df()).unwrap_err();
    assert!(err.is_cancelled());

    let stages = stages.lock().unwrap();
    assert!(!stages.contains(&AnalysisStage::Outliers));
    assert_eq!(stages.last(), Some(&AnalysisStage::Cancelled));
}

#[test]
fn test_low_score_gets_stop_recommendation() {
    let df = df![
        "a" => [None, None, None, None, Some(1.0), None, None, None, None, None],
        "b" => [Some("x"), None, None, None, None, None, None, None, None, None],
    ]
    .unwrap();
    let config = QualityConfig::builder()
        .critical_score_threshold(95)
        .build()
        .unwrap();
    let report = analyze(&df, &config).unwrap();

    assert!(report.overall_score < 95.0);
    assert_eq!(
        report.recommendations[0].action,
        "STOP: dataset requires major cleaning before analysis."
    );
    let impacts: Vec<f64> = report.recommendations[1..]
        .iter()
        .map(|r| r.estimated_impact)
        .collect();
    assert!(impacts.iter().all(|i| *i >= 0.0));
}

#[test]
fn test_report_serializes_to_tagged_json() {
    let report = run(&load_csv("customers.csv"));
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert!(json["overall_score"].is_number());
    assert!(json["sub_scores"]["completeness"].is_number());
    let kinds: Vec<&str> = json["findings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"missing_value"));
    assert!(kinds.contains(&"duplicate"));
}

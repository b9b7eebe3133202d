//! End-to-end tests for the churn training pipeline.
//!
//! These run the full train / save / load / predict flow on a telco-style
//! CSV fixture with a reduced forest.

use churn_learning::churn_processing::{FeatureSpec, PreprocessingError};
use churn_learning::{
    ChurnError, ForestParams, Pipeline, PipelineConfig, PipelineEvent, RandomForestClassifier,
    TrainedModel,
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

fn telco() -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(fixtures_path().join("telco_sample.csv")))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn config() -> PipelineConfig {
    PipelineConfig::builder()
        .forest(ForestParams::default().with_n_estimators(20))
        .model_version("it-1")
        .build()
        .unwrap()
}

fn trained_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::builder().config(config()).build().unwrap();
    pipeline.train(&telco()).unwrap();
    pipeline
}

/// Synthetic table with `positives` churners out of `rows`.
fn skewed_frame(rows: usize, positives: usize) -> DataFrame {
    let tenure: Vec<f64> = (0..rows)
        .map(|i| if i < positives { (i % 6) as f64 } else { 12.0 + (i % 60) as f64 })
        .collect();
    let contract: Vec<&str> = (0..rows)
        .map(|i| match i % 3 {
            0 => "Month-to-month",
            1 => "One year",
            _ => "Two year",
        })
        .collect();
    let churn: Vec<&str> = (0..rows)
        .map(|i| if i < positives { "Yes" } else { "No" })
        .collect();
    df! {
        "tenure" => tenure,
        "Contract" => contract,
        "Churn" => churn,
    }
    .unwrap()
}

/// Two-feature config for the synthetic frames, with optional binary columns.
fn small_config(binary: &[&str], version: &str) -> PipelineConfig {
    PipelineConfig::builder()
        .features(
            FeatureSpec::builder()
                .numeric(["tenure"])
                .categorical(["Contract"])
                .binary(binary.iter().copied())
                .build()
                .unwrap(),
        )
        .forest(ForestParams::default().with_n_estimators(10))
        .model_version(version)
        .build()
        .unwrap()
}

/// `skewed_frame` plus a `Partner` column that is null at `null_rows`.
fn frame_with_partner(rows: usize, positives: usize, null_rows: &[usize]) -> DataFrame {
    let partner: Vec<Option<&str>> = (0..rows)
        .map(|i| {
            if null_rows.contains(&i) {
                None
            } else if i % 2 == 0 {
                Some("Yes")
            } else {
                Some("No")
            }
        })
        .collect();
    let mut df = skewed_frame(rows, positives);
    df.with_column(Series::new("Partner".into(), partner)).unwrap();
    df
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_training_on_fixture() {
    let mut pipeline = Pipeline::builder().config(config()).build().unwrap();
    let result = pipeline.train(&telco()).unwrap();

    assert_eq!(result.model_version, "it-1");
    assert_eq!(result.train_rows, 240);
    assert_eq!(result.test_rows, 60);
    assert_eq!(result.resampled_rows, 2 * 154);
    assert_eq!(result.feature_importance.len(), 15);
    assert!(result.warnings.is_empty());

    let total: f64 = result.feature_importance.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(
        result
            .feature_importance
            .windows(2)
            .all(|w| w[0].importance >= w[1].importance)
    );

    assert_eq!(result.cross_validation.fold_scores.len(), 5);
    let auc = result.evaluation.roc_auc.unwrap();
    assert!((0.0..=1.0).contains(&auc));
}

#[test]
fn test_test_support_matches_held_out_proportions() {
    let mut pipeline = Pipeline::builder().config(config()).build().unwrap();
    let result = pipeline.train(&telco()).unwrap();

    // 192 "No" and 108 "Yes" rows; 20% of each is held out untouched.
    let support: Vec<usize> = result.evaluation.per_class.iter().map(|m| m.support).collect();
    assert_eq!(support, vec![38, 22]);
    assert_eq!(result.evaluation.n_samples, 60);
}

#[test]
fn test_same_seed_same_results() {
    let mut a = Pipeline::builder().config(config()).build().unwrap();
    let mut b = Pipeline::builder().config(config()).build().unwrap();
    let ra = a.train(&telco()).unwrap();
    let rb = b.train(&telco()).unwrap();

    assert_eq!(ra.evaluation, rb.evaluation);
    assert_eq!(ra.cross_validation, rb.cross_validation);
    assert_eq!(ra.feature_importance, rb.feature_importance);

    let df = telco();
    assert_eq!(a.predict_proba(&df).unwrap(), b.predict_proba(&df).unwrap());
}

#[test]
fn test_severe_imbalance_warns_and_still_trains() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let mut pipeline = Pipeline::builder()
        .config(small_config(&[], "skewed"))
        .on_event(move |event| {
            if let PipelineEvent::ValidationWarning(warning) = event {
                sink.lock().unwrap().push(warning.to_string());
            }
        })
        .build()
        .unwrap();

    let result = pipeline.train(&skewed_frame(500, 10)).unwrap();

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(
        *events.lock().unwrap(),
        vec!["Severe class imbalance detected: 2.00% churn rate".to_string()]
    );
    assert_eq!(result.test_rows, 100);
    let support: Vec<usize> = result.evaluation.per_class.iter().map(|m| m.support).collect();
    assert_eq!(support, vec![98, 2]);
    assert!(pipeline.is_fitted());
}

#[test]
fn test_two_churners_in_minimum_table_still_train() {
    let mut pipeline = Pipeline::builder()
        .config(small_config(&[], "two-churners"))
        .build()
        .unwrap();

    let result = pipeline.train(&skewed_frame(100, 2)).unwrap();

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.test_rows, 21);
    let support: Vec<usize> = result.evaluation.per_class.iter().map(|m| m.support).collect();
    assert_eq!(support, vec![20, 1]);
    assert!(result.evaluation.roc_auc.is_some());
    assert!(pipeline.is_fitted());
    assert_eq!(pipeline.predict(&skewed_frame(100, 2)).unwrap().len(), 100);
}

#[test]
fn test_invalid_binary_value_reports_input_row() {
    let mut pipeline = Pipeline::builder()
        .config(small_config(&["Partner"], "partner"))
        .build()
        .unwrap();

    // A single null lands in whichever half the split puts row 7.
    let err = pipeline
        .train(&frame_with_partner(120, 30, &[7]))
        .unwrap_err();
    match err {
        ChurnError::Processing(PreprocessingError::InvalidBinaryValue { column, row }) => {
            assert_eq!(column, "Partner");
            assert_eq!(row, 7);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let nulls: Vec<usize> = (0..120).filter(|i| i % 10 == 7).collect();
    let err = pipeline
        .train(&frame_with_partner(120, 30, &nulls))
        .unwrap_err();
    match err {
        ChurnError::Processing(PreprocessingError::InvalidBinaryValue { column, row }) => {
            assert_eq!(column, "Partner");
            assert!(nulls.contains(&row), "row {row} is not a null row");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!pipeline.is_fitted());
}

#[test]
fn test_too_few_rows_fail_before_fitting() {
    let mut pipeline = Pipeline::builder().config(config()).build().unwrap();
    let err = pipeline.train(&telco().head(Some(99))).unwrap_err();
    assert!(matches!(
        err,
        ChurnError::Processing(PreprocessingError::InsufficientData { rows: 99, .. })
    ));
    assert!(!pipeline.is_fitted());
}

// ============================================================================
// Inference
// ============================================================================

#[test]
fn test_predict_before_training_fails() {
    let pipeline = Pipeline::builder().config(config()).build().unwrap();
    assert!(matches!(
        pipeline.predict_proba(&telco()),
        Err(ChurnError::NotFitted)
    ));
}

#[test]
fn test_score_matches_separate_predictions() {
    let pipeline = trained_pipeline();
    let sample = telco().head(Some(40));

    let (probabilities, classes) = pipeline.score(&sample).unwrap();

    assert_eq!(probabilities, pipeline.predict_proba(&sample).unwrap());
    assert_eq!(classes, pipeline.predict(&sample).unwrap());
    assert!(matches!(
        Pipeline::builder().config(config()).build().unwrap().score(&sample),
        Err(ChurnError::NotFitted)
    ));
}

#[test]
fn test_unseen_category_scores_like_reference_level() {
    let pipeline = trained_pipeline();
    let reference = pipeline
        .model()
        .unwrap()
        .transform_state()
        .categorical()
        .iter()
        .find(|v| v.column == "Contract")
        .and_then(|v| v.reference())
        .unwrap()
        .to_string();

    let mut unseen = telco().head(Some(1));
    unseen
        .replace("Contract", Series::new("Contract".into(), ["Three year"]))
        .unwrap();
    let mut baseline = telco().head(Some(1));
    baseline
        .replace("Contract", Series::new("Contract".into(), [reference.as_str()]))
        .unwrap();

    assert_eq!(
        pipeline.predict_proba(&unseen).unwrap(),
        pipeline.predict_proba(&baseline).unwrap()
    );
}

#[test]
fn test_missing_fit_time_column_at_inference() {
    let pipeline = trained_pipeline();
    let df = telco().drop("PaymentMethod").unwrap();
    assert!(matches!(
        pipeline.predict(&df),
        Err(ChurnError::Processing(
            PreprocessingError::ColumnMismatchAtTransform { .. }
        ))
    ));
}

// ============================================================================
// Artifacts
// ============================================================================

#[test]
fn test_save_load_round_trip() {
    let pipeline = trained_pipeline();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("churn.bin");
    pipeline.save(&path).unwrap();

    let mut reloaded = Pipeline::builder()
        .config(PipelineConfig::default())
        .build()
        .unwrap();
    reloaded.load(&path).unwrap();

    let sample = telco().head(Some(25));
    assert_eq!(
        reloaded.predict_proba(&sample).unwrap(),
        pipeline.predict_proba(&sample).unwrap()
    );
    assert_eq!(
        reloaded.feature_names().unwrap(),
        pipeline.feature_names().unwrap()
    );
    assert_eq!(reloaded.model().unwrap().version_tag(), "it-1");

    let standalone = TrainedModel::<RandomForestClassifier>::load(&path).unwrap();
    assert_eq!(
        standalone.predict(&sample).unwrap(),
        pipeline.predict(&sample).unwrap()
    );
}

#[test]
fn test_failed_load_keeps_current_model() {
    let mut pipeline = trained_pipeline();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.bin");
    std::fs::write(&path, b"definitely not a model").unwrap();

    assert!(matches!(
        pipeline.load(&path),
        Err(ChurnError::CorruptArtifact { .. })
    ));
    assert!(pipeline.is_fitted());
    assert_eq!(pipeline.model().unwrap().version_tag(), "it-1");
}

#[test]
fn test_save_before_training_fails() {
    let pipeline = Pipeline::builder().config(config()).build().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("churn.bin");
    assert!(matches!(pipeline.save(&path), Err(ChurnError::NotFitted)));
    assert!(!path.exists());
}

#[test]
fn test_evaluate_on_labeled_table() {
    let pipeline = trained_pipeline();
    let report = pipeline.evaluate(&telco()).unwrap();
    assert_eq!(report.n_samples, 300);
    assert_eq!(report.per_class[1].support, 108);
    assert!(report.to_string().contains("ROC-AUC Score"));
}

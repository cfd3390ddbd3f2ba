//! End-to-end pipeline tests against the pinned fixture artifacts
//!
//! Fixtures (tests/fixtures):
//! - scaler.json: standardization fitted on red-wine dataset statistics
//! - model.json: 3-tree classifier over quality classes 3..=8
//!
//! Expected scores below are properties of these fixtures, not re-derived.

use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use wqp_common::artifacts::{load_scaler, ArtifactPaths};
use wqp_common::{Error, FeatureName, FeatureRecord, PredictionContext, QualityScore, QualityTier};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn load_context() -> PredictionContext {
    PredictionContext::load(&ArtifactPaths::in_dir(fixtures_dir())).expect("fixture artifacts should load")
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

/// Initial values of the entry form
fn reference_inputs() -> Map<String, Value> {
    as_map(json!({
        "fixed_acidity": 7.4,
        "volatile_acidity": 0.7,
        "citric_acid": 0.0,
        "residual_sugar": 0.64,
        "chlorides": 0.09,
        "free_sulfur_dioxide": 15.0,
        "total_sulfur_dioxide": 98.0,
        "density": 1.0,
        "pH": 3.0,
        "sulphates": 0.68,
        "alcohol": 5.3
    }))
}

#[test]
fn test_reference_input_predicts_good() {
    let context = load_context();
    let prediction = context.predict(&reference_inputs()).unwrap();

    assert_eq!(prediction.score, QualityScore(5));
    assert_eq!(prediction.tier, QualityTier::Good);
    assert_eq!(prediction.tier, QualityTier::classify(prediction.score));
}

#[test]
fn test_strong_wine_predicts_excellent() {
    let context = load_context();
    let mut raw = reference_inputs();
    raw.insert("volatile_acidity".to_string(), json!(0.3));
    raw.insert("total_sulfur_dioxide".to_string(), json!(30.0));
    raw.insert("sulphates".to_string(), json!(0.9));
    raw.insert("alcohol".to_string(), json!(13.0));

    let prediction = context.predict(&raw).unwrap();
    assert_eq!(prediction.score, QualityScore(7));
    assert_eq!(prediction.tier, QualityTier::Excellent);
}

#[test]
fn test_repeated_calls_are_identical() {
    let context = load_context();
    let raw = reference_inputs();

    let first = context.predict(&raw).unwrap();
    for _ in 0..100 {
        assert_eq!(context.predict(&raw).unwrap(), first);
    }

    let reloaded = load_context();
    assert_eq!(reloaded.predict(&raw).unwrap(), first);
}

#[test]
fn test_supply_order_does_not_matter() {
    let context = load_context();
    let forward = reference_inputs();

    let mut reversed = Map::new();
    for name in FeatureName::ALL.iter().rev() {
        reversed.insert(name.key().to_string(), forward[name.key()].clone());
    }

    assert_eq!(
        context.predict(&forward).unwrap(),
        context.predict(&reversed).unwrap()
    );
}

#[test]
fn test_column_labels_match_request_keys() {
    let context = load_context();

    let mut by_column = Map::new();
    for name in FeatureName::ALL {
        by_column.insert(name.column().to_string(), reference_inputs()[name.key()].clone());
    }

    assert_eq!(
        context.predict(&by_column).unwrap(),
        context.predict(&reference_inputs()).unwrap()
    );
}

#[test]
fn test_rejected_requests_leave_context_usable() {
    let context = load_context();

    let mut missing = reference_inputs();
    missing.remove("sulphates");
    assert!(matches!(
        context.predict(&missing),
        Err(Error::MissingField(FeatureName::Sulphates))
    ));

    let mut wrong_type = reference_inputs();
    wrong_type.insert("density".to_string(), json!("heavy"));
    assert!(matches!(
        context.predict(&wrong_type),
        Err(Error::InvalidFieldType { field: FeatureName::Density, .. })
    ));

    assert!(context.predict(&reference_inputs()).is_ok());
}

#[test]
fn test_fitted_means_scale_to_zero() {
    let (scaler, _) = load_scaler(&fixtures_dir().join("scaler.json"), None).unwrap();

    let mut values = [0.0; wqp_common::FEATURE_COUNT];
    values.copy_from_slice(scaler.mean());
    let scaled = scaler.apply(&FeatureRecord::from_values(values)).unwrap();

    for (i, v) in scaled.as_slice().iter().enumerate() {
        assert!(v.abs() < 1e-9, "feature {} scaled to {}", i, v);
    }
}

#[test]
fn test_context_reports_artifact_provenance() {
    let context = load_context();
    let artifacts = context.artifacts();

    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0].format, "wqp.standard_scaler");
    assert_eq!(artifacts[1].format, "wqp.random_forest");
    assert_eq!(
        artifacts[1].summary,
        "random forest classifier with 3 trees over 11 features"
    );
    assert!(artifacts.iter().all(|a| a.sha256.len() == 64));
}

#[test]
fn test_shared_context_across_threads() {
    let context = Arc::new(load_context());
    let expected = context.predict(&reference_inputs()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let context = Arc::clone(&context);
            std::thread::spawn(move || context.predict(&reference_inputs()).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

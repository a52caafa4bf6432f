//! Shared fixtures for unit and handler tests

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::artifacts::resolver::{
    DENSE_MODEL_FILE, FEATURE_NAMES_FILE, METRICS_FILE, PREPROCESSOR_FILE,
};
use crate::artifacts::ArtifactBundle;
use crate::config::Config;
use crate::{create_router, AppState};

pub const FIXTURE_VERSION: &str = "model_v20240101_120000";

/// Post-transform feature order of the fixture bundle
pub const FIXTURE_FEATURES: [&str; 20] = [
    "age",
    "bmi",
    "liver_function_score",
    "alpha_fetoprotein_level",
    "gender_Female",
    "gender_Male",
    "alcohol_consumption_Never",
    "alcohol_consumption_Occasional",
    "alcohol_consumption_Regular",
    "smoking_status_Current",
    "smoking_status_Former",
    "smoking_status_Never",
    "physical_activity_level_High",
    "physical_activity_level_Low",
    "physical_activity_level_Moderate",
    "hepatitis_b",
    "hepatitis_c",
    "cirrhosis_history",
    "family_history_cancer",
    "diabetes",
];

/// The reference request body
pub fn example_request() -> Value {
    json!({
        "age": 55,
        "height_cm": 170,
        "weight_kg": 80,
        "liver_function_score": 1.2,
        "alpha_fetoprotein_level": 3.4,
        "hepatitis_b": 0,
        "hepatitis_c": 0,
        "cirrhosis_history": 0,
        "family_history_cancer": 0,
        "diabetes": 0,
        "gender": "Male",
        "alcohol_consumption": "Never",
        "smoking_status": "Never",
        "physical_activity_level": "Moderate"
    })
}

/// Network with hand-checkable output:
///
/// hidden = relu([age_scaled, 2 * hepatitis_b]), p = sigmoid(h0 + h1 - 0.5)
///
/// For the reference request age_scaled = 0.5 and hepatitis_b = 0, so
/// p = sigmoid(0) = 0.5 exactly.
fn fixture_model() -> Value {
    let mut weights = vec![vec![0.0f32, 0.0]; FIXTURE_FEATURES.len()];
    let idx = |name: &str| FIXTURE_FEATURES.iter().position(|f| *f == name).unwrap();
    weights[idx("age")][0] = 1.0;
    weights[idx("hepatitis_b")][1] = 2.0;

    json!({
        "layers": [
            { "weights": weights, "bias": [0.0, 0.0], "activation": "relu" },
            { "weights": [[1.0], [1.0]], "bias": [-0.5], "activation": "sigmoid" }
        ]
    })
}

fn fixture_preprocessor() -> Value {
    json!({
        "numeric": [
            { "column": "age", "mean": 50.0, "scale": 10.0 },
            { "column": "bmi", "mean": 27.0, "scale": 4.0 },
            { "column": "liver_function_score", "mean": 1.0, "scale": 0.5 },
            { "column": "alpha_fetoprotein_level", "mean": 5.0, "scale": 2.0 }
        ],
        "categorical": [
            { "column": "gender", "categories": ["Female", "Male"] },
            { "column": "alcohol_consumption", "categories": ["Never", "Occasional", "Regular"] },
            { "column": "smoking_status", "categories": ["Current", "Former", "Never"] },
            { "column": "physical_activity_level", "categories": ["High", "Low", "Moderate"] }
        ],
        "passthrough": [
            "hepatitis_b", "hepatitis_c", "cirrhosis_history", "family_history_cancer", "diabetes"
        ]
    })
}

/// Write a complete fixture version directory under `root`.
pub fn write_fixture_bundle(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();

    fs::write(dir.join(DENSE_MODEL_FILE), fixture_model().to_string()).unwrap();
    fs::write(dir.join(PREPROCESSOR_FILE), fixture_preprocessor().to_string()).unwrap();
    fs::write(
        dir.join(FEATURE_NAMES_FILE),
        json!({ "feature_names": FIXTURE_FEATURES }).to_string(),
    )
    .unwrap();
    fs::write(
        dir.join(METRICS_FILE),
        json!({ "sklearn": { "roc_auc": 0.91, "pr_auc": 0.74 } }).to_string(),
    )
    .unwrap();

    dir
}

/// Pin a directory's modification time.
pub fn set_mtime(path: &Path, time: SystemTime) {
    File::open(path).unwrap().set_modified(time).unwrap();
}

/// Loaded fixture bundle; keep the TempDir alive while using it.
pub fn fixture_bundle() -> (TempDir, ArtifactBundle) {
    let dir = TempDir::new().unwrap();
    write_fixture_bundle(dir.path(), FIXTURE_VERSION);
    let bundle = ArtifactBundle::load_latest(dir.path()).unwrap();
    (dir, bundle)
}

/// Router serving the fixture bundle
pub fn test_app() -> (TempDir, Router) {
    let (dir, bundle) = fixture_bundle();
    let config = Config {
        artifacts_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    (dir, create_router(AppState::new(bundle, config)))
}

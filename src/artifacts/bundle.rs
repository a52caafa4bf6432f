//! Artifact Bundle
//!
//! The loaded model, fitted preprocessor and feature order for one version.
//! Built once at startup and shared read-only for the life of the process.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::resolver::{resolve_latest, ArtifactVersion, ModelFormat};
use super::ArtifactError;
use crate::inference::{DenseNetwork, InferenceBackend, OnnxModel, Preprocessor};

#[derive(Debug, Deserialize)]
struct FeatureNamesFile {
    feature_names: Vec<String>,
}

/// Condensed view of `history.json`
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub epochs: usize,
    pub final_values: BTreeMap<String, f64>,
}

impl HistorySummary {
    fn from_history(history: &BTreeMap<String, Vec<f64>>) -> Self {
        Self {
            epochs: history.values().map(Vec::len).max().unwrap_or(0),
            final_values: history
                .iter()
                .filter_map(|(k, v)| v.last().map(|last| (k.clone(), *last)))
                .collect(),
        }
    }
}

pub struct ArtifactBundle {
    version: ArtifactVersion,
    preprocessor: Preprocessor,
    feature_names: Vec<String>,
    model: Box<dyn InferenceBackend>,
    model_sha256: String,
    loaded_at: DateTime<Utc>,
    metrics: Option<serde_json::Value>,
    history: Option<HistorySummary>,
}

impl std::fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("version", &self.version.id)
            .field("backend", &self.model.name())
            .field("features", &self.feature_names.len())
            .field("model_sha256", &self.model_sha256)
            .finish()
    }
}

impl ArtifactBundle {
    /// Resolve the latest version under `root` and load it.
    pub fn load_latest(root: &Path) -> Result<Self, ArtifactError> {
        let version = resolve_latest(root)?;
        tracing::info!(
            "Resolved artifact version {} ({})",
            version.id,
            version.dir.display()
        );
        Self::load(version)
    }

    /// Load every serving file of a resolved version.
    pub fn load(version: ArtifactVersion) -> Result<Self, ArtifactError> {
        let preprocessor_bytes = read(&version.preprocessor_path)?;
        let preprocessor = Preprocessor::from_slice(&preprocessor_bytes)
            .map_err(|e| ArtifactError::load(&version.preprocessor_path, e))?;
        let duplicates = preprocessor.duplicate_columns();
        if !duplicates.is_empty() {
            return Err(ArtifactError::load(
                &version.preprocessor_path,
                format!("columns declared more than once: {}", duplicates.join(", ")),
            ));
        }

        let feature_names = load_feature_names(&version.feature_names_path)?;

        // Requests will be refused with a contract mismatch; say so early
        let produced: HashSet<String> = preprocessor.output_names().into_iter().collect();
        let unproduced: Vec<&str> = feature_names
            .iter()
            .filter(|n| !produced.contains(n.as_str()))
            .map(String::as_str)
            .collect();
        if !unproduced.is_empty() {
            tracing::warn!(
                "Artifact {}: preprocessor does not produce {}",
                version.id,
                unproduced.join(", ")
            );
        }

        let model_bytes = read(&version.model_path)?;
        let model_sha256 = hex::encode(Sha256::digest(&model_bytes));
        let model: Box<dyn InferenceBackend> = match version.model_format {
            ModelFormat::Dense => Box::new(
                DenseNetwork::from_slice(&model_bytes)
                    .map_err(|e| ArtifactError::load(&version.model_path, e))?,
            ),
            ModelFormat::Onnx => Box::new(
                OnnxModel::from_bytes(&model_bytes)
                    .map_err(|e| ArtifactError::load(&version.model_path, e))?,
            ),
        };

        if let Some(width) = model.input_width() {
            if width != feature_names.len() {
                return Err(ArtifactError::load(
                    &version.model_path,
                    format!(
                        "model expects {} inputs but {} lists {} features",
                        width,
                        version.feature_names_path.display(),
                        feature_names.len()
                    ),
                ));
            }
        }

        let metrics = version.metrics_path.as_deref().and_then(|path| {
            read_companion::<serde_json::Value>(path)
        });
        let history = version
            .history_path
            .as_deref()
            .and_then(read_companion::<BTreeMap<String, Vec<f64>>>)
            .map(|h| HistorySummary::from_history(&h));

        tracing::info!(
            "Loaded artifact {}: backend={}, features={}, sha256={}",
            version.id,
            model.name(),
            feature_names.len(),
            model_sha256
        );

        Ok(Self {
            version,
            preprocessor,
            feature_names,
            model,
            model_sha256,
            loaded_at: Utc::now(),
            metrics,
            history,
        })
    }

    pub fn version(&self) -> &ArtifactVersion {
        &self.version
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn model(&self) -> &dyn InferenceBackend {
        self.model.as_ref()
    }

    pub fn model_sha256(&self) -> &str {
        &self.model_sha256
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn metrics(&self) -> Option<&serde_json::Value> {
        self.metrics.as_ref()
    }

    pub fn history(&self) -> Option<&HistorySummary> {
        self.history.as_ref()
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_feature_names(path: &Path) -> Result<Vec<String>, ArtifactError> {
    let bytes = read(path)?;
    let file: FeatureNamesFile =
        serde_json::from_slice(&bytes).map_err(|e| ArtifactError::load(path, e))?;

    if file.feature_names.is_empty() {
        return Err(ArtifactError::load(path, "feature list is empty"));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = file.feature_names.iter().find(|n| !seen.insert(n.as_str())) {
        return Err(ArtifactError::load(
            path,
            format!("feature '{}' listed more than once", dup),
        ));
    }

    Ok(file.feature_names)
}

/// Metrics and history are informational; a bad file is logged and skipped.
fn read_companion<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let parsed = fs::read(path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()));

    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

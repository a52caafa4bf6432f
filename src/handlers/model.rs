//! Model info handler

use axum::{extract::State, Json};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::artifacts::HistorySummary;
use crate::inference::RISK_CUTOFF_PCT;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub version: String,
    pub trained_at: Option<NaiveDateTime>,
    pub directory: String,
    pub backend: &'static str,
    pub model_sha256: String,
    pub loaded_at: DateTime<Utc>,
    pub risk_cutoff_pct: f64,
    pub feature_names: Vec<String>,
    pub metrics: Option<serde_json::Value>,
    pub history: Option<HistorySummary>,
}

/// Describe the artifact bundle currently being served
pub async fn info(State(state): State<AppState>) -> Json<ModelInfo> {
    let bundle = &state.bundle;
    let version = bundle.version();

    Json(ModelInfo {
        version: version.id.clone(),
        trained_at: version.trained_at,
        directory: version.dir.display().to_string(),
        backend: bundle.model().name(),
        model_sha256: bundle.model_sha256().to_string(),
        loaded_at: bundle.loaded_at(),
        risk_cutoff_pct: RISK_CUTOFF_PCT,
        feature_names: bundle.feature_names().to_vec(),
        metrics: bundle.metrics().cloned(),
        history: bundle.history().cloned(),
    })
}

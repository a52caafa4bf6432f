//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    environment: String,
    artifact_version: String,
    artifact_dir: String,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let artifact = state.bundle.version();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        environment: state.config.environment.clone(),
        artifact_version: artifact.id.clone(),
        artifact_dir: artifact.dir.display().to_string(),
    })
}

//! Liver cancer risk scoring API
//!
//! Serves a versioned, pre-trained tabular classifier behind one endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      LIVER RISK API                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  request ──► normalize ──► inference::predict ──► response   │
//! │                                  │                           │
//! │                        ┌─────────▼─────────┐                 │
//! │                        │  ArtifactBundle   │  (Arc, shared)  │
//! │                        │  preprocessor     │                 │
//! │                        │  feature order    │                 │
//! │                        │  model backend    │                 │
//! │                        └─────────▲─────────┘                 │
//! │                                  │ once, at startup          │
//! │                     saved_artifacts/model_v*/                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod artifacts;
pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod normalize;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use artifacts::ArtifactBundle;
pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bundle: Arc<ArtifactBundle>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(bundle: ArtifactBundle, config: config::Config) -> Self {
        Self {
            bundle: Arc::new(bundle),
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/api/v1/predict", post(handlers::predict::predict))
        .route("/api/v1/model", get(handlers::model::info))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

//! Liver risk API server binary

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liver_risk_api::{config::Config, create_router, AppState, ArtifactBundle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "liver_risk_api=debug,tower_http=debug".into());
    if config.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Liver risk API starting ({})", config.environment);
    tracing::info!("Artifacts root: {}", config.artifacts_dir.display());

    // No bundle, no service
    let bundle = ArtifactBundle::load_latest(&config.artifacts_dir)
        .inspect_err(|e| tracing::error!("Artifact loading failed: {}", e))
        .context("failed to load model artifacts")?;

    if config.is_production() {
        tracing::warn!("CORS allows any origin; restrict it at the proxy in production");
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;

    let app = create_router(AppState::new(bundle, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

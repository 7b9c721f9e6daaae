//! Diabetes API - HTTP prediction service
//!
//! Loads the trained model artifacts once at startup and serves
//! predictions, health probes and Prometheus metrics.

use anyhow::Result;
use diabetes_api::{
    api::{self, AppState, API_VERSION, SERVICE_NAME},
    config::ServiceConfig,
};
use model_lib::{ModelRegistry, ServiceMetrics, StructuredLogger};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServiceConfig::load()?;
    info!(
        artifact_dir = %config.artifact_dir.display(),
        addr = %config.bind_addr(),
        "Service configured"
    );

    let metrics = ServiceMetrics::new();
    metrics.set_model_state(None);

    let logger = StructuredLogger::new(SERVICE_NAME);
    logger.log_startup(API_VERSION, &config.artifact_dir.display().to_string());

    let state = Arc::new(AppState::new(ModelRegistry::new(), metrics, logger.clone()));

    // Probes answer while the model is still loading
    let server = tokio::spawn(api::serve(config.bind_addr(), state.clone(), shutdown_signal()));

    let status = api::load_model(&state, &config).await;
    if !status.is_ready() {
        warn!(status = ?status, "Serving without a model; predictions will be refused");
    }

    server.await??;
    logger.log_shutdown("SIGINT received");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

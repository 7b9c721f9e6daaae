//! HTTP API for predictions, health checks and Prometheus metrics

use crate::config::ServiceConfig;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use model_lib::{
    ArtifactStore, Error, FieldViolation, LoadedModel, ModelMetadata, ModelRegistry, PredictionRequest,
    PredictionResponse, Predictor, ServiceMetrics, ServiceStatus, StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub const SERVICE_NAME: &str = "diabetes-api";
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: ModelRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(registry: ModelRegistry, metrics: ServiceMetrics, logger: StructuredLogger) -> Self {
        Self {
            registry,
            metrics,
            logger,
        }
    }
}

/// Error body shared by every non-2xx response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

/// Request failure mapped onto an HTTP status
#[derive(Debug)]
pub enum ApiError {
    MalformedBody(String),
    Validation(Vec<FieldViolation>),
    Unavailable(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(violations) => ApiError::Validation(violations),
            e @ Error::ModelUnavailable(_) => ApiError::Unavailable(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MalformedBody(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "validation_error",
                    details: vec![FieldViolation::new("body", message.clone())],
                    message,
                },
            ),
            ApiError::Validation(details) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "validation_error",
                    message: Error::Validation(details.clone()).to_string(),
                    details,
                },
            ),
            ApiError::Unavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error: "model_unavailable",
                    message,
                    details: Vec::new(),
                },
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "internal_error",
                    message,
                    details: Vec::new(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    status: ServiceStatus,
    endpoints: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct ModelInfoResponse {
    model_metadata: ModelMetadata,
    prediction_count: u64,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    total_predictions: u64,
    model_info: Option<ModelMetadata>,
    api_version: &'static str,
}

/// Service identification
async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ServiceInfo {
        name: SERVICE_NAME,
        version: API_VERSION,
        status: state.registry.status().await,
        endpoints: vec!["/", "/health", "/predict", "/model-info", "/stats", "/readyz", "/metrics"],
    })
}

/// Health check - always 200, the body carries the model state
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.health().await)
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<ModelInfoResponse>, ApiError> {
    let model_metadata = state
        .registry
        .metadata()
        .await
        .ok_or_else(|| ApiError::Unavailable("model unavailable: no model metadata loaded".to_string()))?;

    Ok(Json(ModelInfoResponse {
        model_metadata,
        prediction_count: state.registry.prediction_count(),
    }))
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatsResponse {
        total_predictions: state.registry.prediction_count(),
        model_info: state.registry.metadata().await,
        api_version: API_VERSION,
    })
}

/// Validate, score and log a single prediction request
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let start = Instant::now();
    let elapsed_ms = |start: Instant| start.elapsed().as_secs_f64() * 1000.0;

    let Json(request) = payload.map_err(|rejection| {
        state.metrics.inc_validation_errors();
        let message = rejection.body_text();
        state
            .logger
            .log_rejected(None, &[FieldViolation::new("body", message.clone())], elapsed_ms(start));
        ApiError::MalformedBody(message)
    })?;

    let features = match request.validate() {
        Ok(features) => features,
        Err(Error::Validation(violations)) => {
            state.metrics.inc_validation_errors();
            state.logger.log_rejected(Some(&request), &violations, elapsed_ms(start));
            return Err(ApiError::Validation(violations));
        }
        Err(other) => return Err(other.into()),
    };

    let model = state.registry.model().await.map_err(|e| {
        state.metrics.inc_prediction_errors();
        state
            .logger
            .log_prediction_failure(&features, &e.to_string(), elapsed_ms(start));
        ApiError::from(e)
    })?;

    let prediction = model.predict(&features).map_err(|e| {
        state.metrics.inc_prediction_errors();
        state
            .logger
            .log_prediction_failure(&features, &e.to_string(), elapsed_ms(start));
        ApiError::from(e)
    })?;

    let number = state.registry.record_prediction();
    let latency = start.elapsed();
    state.metrics.inc_predictions();
    state.metrics.observe_prediction_latency(latency.as_secs_f64());
    state.logger.log_prediction(
        &features,
        &prediction,
        model.model_version(),
        latency.as_secs_f64() * 1000.0,
        number,
    );

    Ok(Json(prediction.into_response(model.model_version(), Utc::now())))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/model-info", get(model_info))
        .route("/stats", get(stats))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Load the artifacts named by `config` into the registry.
///
/// Runs at most once per registry; the outcome is terminal.
pub async fn load_model(state: &AppState, config: &ServiceConfig) -> ServiceStatus {
    let store = ArtifactStore::new(&config.artifact_dir);
    let policy = config.retry_policy();
    let threshold = config.decision_threshold;

    let status = state
        .registry
        .initialize(|| async move {
            let artifacts = store.load_with_retry(&policy).await?;
            LoadedModel::new(artifacts.forest, artifacts.metadata, threshold)
                .map_err(|reason| Error::corrupt(store.metadata_path(), reason))
        })
        .await;

    match state.registry.metadata().await {
        Some(metadata) => {
            state.metrics.set_model_state(Some(&metadata.model_version));
            state.logger.log_model_load(Some(&metadata.model_version), None);
        }
        None => {
            state.metrics.set_model_state(None);
            let reason = state.registry.health().await.reason;
            state.logger.log_model_load(None, reason.as_deref());
        }
    }

    status
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<S>(addr: String, state: Arc<AppState>, shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    Ok(())
}

//! Model readiness tracking for the predictor service
//!
//! The registry owns the `Unloaded → Loading → Ready | Failed` state machine
//! and answers health and readiness probes without ever failing itself.

use crate::error::{Error, Result};
use crate::models::ModelMetadata;
use crate::predictor::LoadedModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info};

/// Lifecycle status of the loaded model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Startup has not begun loading artifacts
    Unloaded,
    /// Artifacts are being read
    Loading,
    /// Model is loaded and serving predictions
    Ready,
    /// Artifacts could not be loaded; terminal until restart
    Failed,
}

impl ServiceStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceStatus::Ready)
    }
}

enum ModelState {
    Unloaded,
    Loading,
    Ready(Arc<LoadedModel>),
    Failed(String),
}

impl ModelState {
    fn status(&self) -> ServiceStatus {
        match self {
            ModelState::Unloaded => ServiceStatus::Unloaded,
            ModelState::Loading => ServiceStatus::Loading,
            ModelState::Ready(_) => ServiceStatus::Ready,
            ModelState::Failed(_) => ServiceStatus::Failed,
        }
    }
}

/// Response body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
    pub model_version: Option<String>,
    pub model_loaded: bool,
    pub prediction_count: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Shared handle to the single loaded model
#[derive(Clone)]
pub struct ModelRegistry {
    state: Arc<RwLock<ModelState>>,
    init: Arc<OnceCell<()>>,
    prediction_count: Arc<AtomicU64>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ModelState::Unloaded)),
            init: Arc::new(OnceCell::new()),
            prediction_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Run `load` exactly once and record its outcome.
    ///
    /// Concurrent and repeated callers wait for the single load and get the
    /// resulting status; `load` is never invoked a second time.
    pub async fn initialize<F, Fut>(&self, load: F) -> ServiceStatus
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<LoadedModel>>,
    {
        self.init
            .get_or_init(|| async move {
                *self.state.write().await = ModelState::Loading;
                let next = match load().await {
                    Ok(model) => {
                        info!(version = %model.metadata().model_version, "Model ready");
                        ModelState::Ready(Arc::new(model))
                    }
                    Err(e) => {
                        error!(error = %e, "Model failed to load");
                        ModelState::Failed(e.to_string())
                    }
                };
                *self.state.write().await = next;
            })
            .await;
        self.status().await
    }

    pub async fn status(&self) -> ServiceStatus {
        self.state.read().await.status()
    }

    /// The loaded model, or `ModelUnavailable` if not ready
    pub async fn model(&self) -> Result<Arc<LoadedModel>> {
        match &*self.state.read().await {
            ModelState::Ready(model) => Ok(Arc::clone(model)),
            ModelState::Failed(reason) => Err(Error::ModelUnavailable(format!("model failed to load: {}", reason))),
            ModelState::Loading => Err(Error::ModelUnavailable("model is still loading".to_string())),
            ModelState::Unloaded => Err(Error::ModelUnavailable("model has not been loaded".to_string())),
        }
    }

    /// Metadata of the loaded model, if any
    pub async fn metadata(&self) -> Option<ModelMetadata> {
        match &*self.state.read().await {
            ModelState::Ready(model) => Some(model.metadata().clone()),
            _ => None,
        }
    }

    /// Count a served prediction, returning the new total
    pub fn record_prediction(&self) -> u64 {
        self.prediction_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn prediction_count(&self) -> u64 {
        self.prediction_count.load(Ordering::Relaxed)
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let (model_version, reason) = match &*state {
            ModelState::Ready(model) => (Some(model.metadata().model_version.clone()), None),
            ModelState::Failed(reason) => (None, Some(reason.clone())),
            _ => (None, None),
        };
        HealthResponse {
            status: state.status(),
            model_loaded: model_version.is_some(),
            model_version,
            prediction_count: self.prediction_count(),
            timestamp: Utc::now(),
            reason,
        }
    }

    /// Get readiness response
    pub async fn readiness(&self) -> ReadinessResponse {
        match &*self.state.read().await {
            ModelState::Ready(_) => ReadinessResponse {
                ready: true,
                reason: None,
            },
            ModelState::Failed(reason) => ReadinessResponse {
                ready: false,
                reason: Some(format!("Model failed to load: {}", reason)),
            },
            ModelState::Loading => ReadinessResponse {
                ready: false,
                reason: Some("Model is loading".to_string()),
            },
            ModelState::Unloaded => ReadinessResponse {
                ready: false,
                reason: Some("Model not yet loaded".to_string()),
            },
        }
    }
}

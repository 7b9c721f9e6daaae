//! Model library for the diabetes risk predictor
//!
//! This crate provides the core functionality for:
//! - Loading labeled data and training the random forest
//! - Persisting and loading the model/metadata artifact pair
//! - Request validation and inference
//! - Model readiness tracking and observability

pub mod artifact;
pub mod error;
pub mod forest;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod training;

pub use artifact::{ArtifactStore, Artifacts, RetryPolicy};
pub use error::{Error, FieldViolation, Result};
pub use health::{HealthResponse, ModelRegistry, ReadinessResponse, ServiceStatus};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{LoadedModel, PredictionRequest, Predictor};

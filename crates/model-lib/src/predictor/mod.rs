//! Prediction engine: request validation, inference and output

mod features;
mod inference;
mod output;

pub use features::{FieldRule, PredictionRequest, ValidatedFeatures, ValueKind, FIELD_RULES};
pub use inference::{InferenceStats, LoadedModel};
pub use output::{DecisionThreshold, Prediction};

use crate::error::Result;

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Score validated features
    fn predict(&self, features: &ValidatedFeatures) -> Result<Prediction>;

    /// Version of the model behind this predictor
    fn model_version(&self) -> &str;
}

//! Decision threshold and prediction output
//!
//! `diabetic` is always derived from `probability` through the one
//! threshold carried by the loaded model, so the two never disagree.

use crate::models::{PredictionResponse, DEFAULT_DECISION_THRESHOLD};
use chrono::{DateTime, Utc};

/// Probability cutoff at or above which a prediction is positive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionThreshold(f64);

impl DecisionThreshold {
    pub fn new(value: f64) -> Result<Self, String> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("decision threshold {} is outside [0, 1]", value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_positive(&self, probability: f64) -> bool {
        probability >= self.0
    }
}

impl Default for DecisionThreshold {
    fn default() -> Self {
        Self(DEFAULT_DECISION_THRESHOLD)
    }
}

/// Scored request before it is stamped with version and time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub diabetic: bool,
    pub probability: f64,
}

impl Prediction {
    pub fn from_probability(probability: f64, threshold: DecisionThreshold) -> Self {
        Self {
            diabetic: threshold.is_positive(probability),
            probability,
        }
    }

    pub fn into_response(self, model_version: &str, timestamp: DateTime<Utc>) -> PredictionResponse {
        PredictionResponse {
            diabetic: self.diabetic,
            probability: self.probability,
            model_version: model_version.to_string(),
            timestamp,
        }
    }
}

//! Core data models shared by the trainer and the predictor service

use crate::forest::ForestParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default probability cutoff for a positive prediction
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Model family recorded in metadata
pub const MODEL_TYPE: &str = "RandomForestClassifier";

/// The five health metrics the classifier consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    Pregnancies,
    Glucose,
    BloodPressure,
    #[serde(rename = "BMI")]
    Bmi,
    Age,
}

impl Feature {
    /// Canonical column order used by the trainer
    pub const ALL: [Feature; 5] = [
        Feature::Pregnancies,
        Feature::Glucose,
        Feature::BloodPressure,
        Feature::Bmi,
        Feature::Age,
    ];

    /// Wire and CSV header name
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Pregnancies => "Pregnancies",
            Feature::Glucose => "Glucose",
            Feature::BloodPressure => "BloodPressure",
            Feature::Bmi => "BMI",
            Feature::Age => "Age",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata record written next to the model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_version: String,
    pub model_type: String,
    pub trained_at: DateTime<Utc>,
    /// Column order fed into fitting; inference input is assembled in this order
    pub feature_order: Vec<String>,
    pub label_column: String,
    pub training_row_count: usize,
    pub validation_row_count: usize,
    #[serde(default)]
    pub dropped_row_count: usize,
    pub validation_metrics: BTreeMap<String, f64>,
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    #[serde(default)]
    pub feature_importances: BTreeMap<String, f64>,
    pub hyperparameters: ForestParams,
    pub validation_fraction: f64,
    /// SHA-256 of the model file this record describes
    pub model_checksum: String,
}

fn default_decision_threshold() -> f64 {
    DEFAULT_DECISION_THRESHOLD
}

/// Successful prediction returned by `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub diabetic: bool,
    pub probability: f64,
    pub model_version: String,
    /// Time the request was served
    pub timestamp: DateTime<Utc>,
}

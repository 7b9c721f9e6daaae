//! In-memory model handle used for inference
//!
//! A `LoadedModel` is built once from the artifacts and never mutated
//! afterwards (apart from its statistics counters), so any number of
//! request handlers can share it behind an `Arc` without locking.

use super::features::ValidatedFeatures;
use super::output::{DecisionThreshold, Prediction};
use super::Predictor;
use crate::error::{Error, Result};
use crate::forest::RandomForest;
use crate::models::{Feature, ModelMetadata, MODEL_TYPE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

pub struct LoadedModel {
    forest: RandomForest,
    metadata: ModelMetadata,
    feature_order: Vec<Feature>,
    threshold: DecisionThreshold,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl LoadedModel {
    /// Bind a forest to its metadata.
    ///
    /// `threshold_override` replaces `metadata.decision_threshold` when set.
    /// Fails when the metadata does not describe this forest.
    pub fn new(
        forest: RandomForest,
        metadata: ModelMetadata,
        threshold_override: Option<f64>,
    ) -> std::result::Result<Self, String> {
        if metadata.model_type != MODEL_TYPE {
            return Err(format!("unsupported model type {:?}", metadata.model_type));
        }
        let feature_order = parse_feature_order(&metadata.feature_order)?;
        if forest.n_features() != feature_order.len() {
            return Err(format!(
                "model expects {} features but metadata lists {}",
                forest.n_features(),
                feature_order.len()
            ));
        }
        let threshold = DecisionThreshold::new(threshold_override.unwrap_or(metadata.decision_threshold))?;

        Ok(Self {
            forest,
            metadata,
            feature_order,
            threshold,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn feature_order(&self) -> &[Feature] {
        &self.feature_order
    }

    pub fn threshold(&self) -> DecisionThreshold {
        self.threshold
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

impl Predictor for LoadedModel {
    fn predict(&self, features: &ValidatedFeatures) -> Result<Prediction> {
        let start = Instant::now();

        let input = features.ordered(&self.feature_order);
        let probability = self.forest.predict_proba(&input)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(Error::Internal(format!(
                "model produced probability {} outside [0, 1]",
                probability
            )));
        }

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(Prediction::from_probability(probability, self.threshold))
    }

    fn model_version(&self) -> &str {
        &self.metadata.model_version
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// Feature order must name each known feature exactly once
fn parse_feature_order(names: &[String]) -> std::result::Result<Vec<Feature>, String> {
    let mut order = Vec::with_capacity(names.len());
    for name in names {
        let feature = Feature::from_name(name).ok_or_else(|| format!("unknown feature {:?} in feature_order", name))?;
        if order.contains(&feature) {
            return Err(format!("feature {:?} listed twice in feature_order", name));
        }
        order.push(feature);
    }
    if order.len() != Feature::ALL.len() {
        return Err(format!(
            "feature_order lists {} features, expected {}",
            order.len(),
            Feature::ALL.len()
        ));
    }
    Ok(order)
}

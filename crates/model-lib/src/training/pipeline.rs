//! End-to-end training run: load, split, fit, evaluate, persist

use super::dataset::{Dataset, DEFAULT_LABEL_COLUMN};
use super::metrics;
use crate::artifact::ArtifactStore;
use crate::error::{Error, Result};
use crate::forest::{ForestParams, RandomForest};
use crate::models::{ModelMetadata, DEFAULT_DECISION_THRESHOLD, MODEL_TYPE};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Default share of rows held out for validation
pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub label_column: String,
    pub validation_fraction: f64,
    pub forest: ForestParams,
    /// Explicit version; derived from the training time when `None`
    pub model_version: Option<String>,
    pub decision_threshold: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            validation_fraction: DEFAULT_VALIDATION_FRACTION,
            forest: ForestParams::default(),
            model_version: None,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
        }
    }
}

/// Fitted model plus its metadata, not yet persisted
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub forest: RandomForest,
    pub metadata: ModelMetadata,
}

/// Result of a completed training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub metadata: ModelMetadata,
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on the CSV at `data_path` and write both artifacts to `store`.
    ///
    /// Nothing is written unless every earlier step succeeded.
    pub fn run(&self, data_path: &Path, store: &ArtifactStore) -> Result<TrainingOutcome> {
        let dataset = Dataset::from_csv_path(data_path, &self.config.label_column)?;
        let trained = self.fit(&dataset)?;
        let metadata = store.write(&trained.forest, trained.metadata)?;
        Ok(TrainingOutcome {
            metadata,
            model_path: store.model_path(),
            metadata_path: store.metadata_path(),
        })
    }

    /// Split, fit and evaluate without touching the filesystem
    pub fn fit(&self, dataset: &Dataset) -> Result<TrainedModel> {
        if !(0.0..=1.0).contains(&self.config.decision_threshold) {
            return Err(Error::Data(format!(
                "decision threshold {} is outside [0, 1]",
                self.config.decision_threshold
            )));
        }
        let seed = self.config.forest.seed;
        let (train, valid) = dataset.split(self.config.validation_fraction, seed)?;
        info!(
            training_rows = train.len(),
            validation_rows = valid.len(),
            positives = train.positive_count(),
            "Training random forest"
        );

        let start = Instant::now();
        let forest = RandomForest::fit(train.rows(), train.labels(), &self.config.forest)?;

        let probabilities = valid
            .rows()
            .iter()
            .map(|row| forest.predict_proba(row))
            .collect::<Result<Vec<f64>>>()?;
        let validation_metrics = metrics::evaluate(&probabilities, valid.labels(), self.config.decision_threshold);

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            trees = forest.n_trees(),
            accuracy = validation_metrics.get("accuracy").copied().unwrap_or_default(),
            "Model fitted"
        );

        let feature_importances: BTreeMap<String, f64> = dataset
            .feature_order()
            .iter()
            .zip(forest.feature_importances())
            .map(|(f, &imp)| (f.name().to_string(), imp))
            .collect();

        let trained_at = Utc::now();
        let metadata = ModelMetadata {
            model_version: self
                .config
                .model_version
                .clone()
                .unwrap_or_else(|| version_from_time(trained_at)),
            model_type: MODEL_TYPE.to_string(),
            trained_at,
            feature_order: dataset.feature_order().iter().map(|f| f.name().to_string()).collect(),
            label_column: self.config.label_column.clone(),
            training_row_count: train.len(),
            validation_row_count: valid.len(),
            dropped_row_count: dataset.dropped_rows(),
            validation_metrics,
            decision_threshold: self.config.decision_threshold,
            feature_importances,
            hyperparameters: self.config.forest.clone(),
            validation_fraction: self.config.validation_fraction,
            model_checksum: String::new(),
        };

        Ok(TrainedModel { forest, metadata })
    }
}

fn version_from_time(at: DateTime<Utc>) -> String {
    format!("v{}", at.format("%Y%m%d.%H%M%S"))
}

//! Training pipeline
//!
//! Loads labeled data, fits the random forest on the fixed feature set,
//! evaluates it on a held-out split and hands the result to the artifact
//! store.

mod dataset;
mod metrics;
mod pipeline;
mod synthetic;

pub use dataset::{Dataset, DEFAULT_LABEL_COLUMN};
pub use metrics::{evaluate, roc_auc};
pub use pipeline::{TrainedModel, Trainer, TrainingConfig, TrainingOutcome, DEFAULT_VALIDATION_FRACTION};
pub use synthetic::SyntheticData;

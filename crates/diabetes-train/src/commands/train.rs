//! Model training command

use anyhow::{Context, Result};
use colored::Colorize;
use model_lib::{
    forest::ForestParams,
    training::{Trainer, TrainingConfig},
    ArtifactStore, ModelMetadata,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::output::{print_info, print_json, print_metadata, print_success, OutputFormat};
use crate::TrainArgs;

#[derive(Serialize)]
struct TrainSummary {
    model_path: PathBuf,
    metadata_path: PathBuf,
    elapsed_ms: u64,
    metadata: ModelMetadata,
}

impl TrainArgs {
    fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            label_column: self.label_column.clone(),
            validation_fraction: self.validation_fraction,
            forest: ForestParams {
                n_estimators: self.trees,
                max_depth: self.max_depth,
                seed: self.seed,
                ..Default::default()
            },
            model_version: self.model_version.clone(),
            decision_threshold: self.threshold,
        }
    }
}

/// Train on `args.data` and write both artifacts to `args.artifact_dir`
pub fn run(args: TrainArgs, format: OutputFormat) -> Result<()> {
    let trainer = Trainer::new(args.training_config());
    let store = ArtifactStore::new(&args.artifact_dir);

    if matches!(format, OutputFormat::Table) {
        print_info(&format!(
            "Training on {} ({} trees, seed {})",
            args.data.display(),
            args.trees,
            args.seed
        ));
    }

    let start = Instant::now();
    let outcome = trainer
        .run(&args.data, &store)
        .with_context(|| format!("Training on {} failed", args.data.display()))?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match format {
        OutputFormat::Json => print_json(&TrainSummary {
            model_path: outcome.model_path,
            metadata_path: outcome.metadata_path,
            elapsed_ms,
            metadata: outcome.metadata,
        })?,
        OutputFormat::Table => {
            print_success(&format!(
                "Model {} trained in {:.1}s",
                outcome.metadata.model_version.cyan(),
                elapsed_ms as f64 / 1000.0
            ));
            println!("Model:    {}", outcome.model_path.display());
            println!("Metadata: {}", outcome.metadata_path.display());
            println!();
            print_metadata(&outcome.metadata);
        }
    }

    Ok(())
}

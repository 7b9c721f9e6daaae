//! Artifact inspection command

use anyhow::{Context, Result};
use model_lib::ArtifactStore;
use std::path::Path;

use crate::output::{print_json, print_metadata, print_success, print_warning, OutputFormat};

/// Show the metadata in `artifact_dir` after checking it against the model file
pub fn run(artifact_dir: &Path, format: OutputFormat) -> Result<()> {
    let store = ArtifactStore::new(artifact_dir);
    let artifacts = store
        .load()
        .with_context(|| format!("No usable model in {}", artifact_dir.display()))?;

    match format {
        OutputFormat::Json => print_json(&artifacts.metadata)?,
        OutputFormat::Table => {
            print_metadata(&artifacts.metadata);
            println!();
            if artifacts.forest.n_trees() == artifacts.metadata.hyperparameters.n_estimators {
                print_success(&format!(
                    "Checksum verified ({} trees)",
                    artifacts.forest.n_trees()
                ));
            } else {
                print_warning(&format!(
                    "Checksum verified, but the model holds {} trees while metadata records {}",
                    artifacts.forest.n_trees(),
                    artifacts.metadata.hyperparameters.n_estimators
                ));
            }
        }
    }

    Ok(())
}

//! Synthetic dataset generation

use anyhow::{Context, Result};
use model_lib::training::SyntheticData;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::output::{print_json, print_success, OutputFormat};

#[derive(Serialize)]
struct GenerateSummary<'a> {
    path: &'a Path,
    rows: usize,
    positives: usize,
    seed: u64,
}

/// Write `rows` synthetic labeled rows to `output`
pub fn run(rows: usize, seed: u64, output: &Path, format: OutputFormat) -> Result<()> {
    let data = SyntheticData::generate(rows, seed)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    data.write_csv(BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let summary = GenerateSummary {
        path: output,
        rows: data.rows.len(),
        positives: data.labels.iter().filter(|&&l| l).count(),
        seed,
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_success(&format!(
            "Wrote {} rows ({} positive) to {}",
            summary.rows,
            summary.positives,
            output.display()
        )),
    }

    Ok(())
}

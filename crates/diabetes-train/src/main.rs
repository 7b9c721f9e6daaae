//! Diabetes model trainer CLI
//!
//! Trains the random forest from a labeled CSV, writes the model and
//! metadata artifacts the predictor service loads, and inspects them.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{generate, inspect, train};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Diabetes Risk Model Trainer
#[derive(Parser)]
#[command(name = "diabetes-train")]
#[command(author, version, about = "Train and inspect the Diabetes Risk Model", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model from a labeled CSV and write its artifacts
    Train(TrainArgs),

    /// Write a synthetic labeled dataset
    Generate {
        /// Number of rows to generate
        #[arg(long, default_value_t = 1000)]
        rows: usize,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output CSV path
        #[arg(long, short, default_value = "data/diabetes.csv")]
        output: PathBuf,
    },

    /// Show the metadata of a trained model and verify its checksum
    Inspect {
        /// Directory holding the model artifacts
        #[arg(long, env = "ARTIFACT_DIR", default_value = "artifacts")]
        artifact_dir: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct TrainArgs {
    /// Labeled training CSV
    #[arg(long, env = "TRAIN_DATA")]
    pub data: PathBuf,

    /// Directory to write the model artifacts to
    #[arg(long, env = "ARTIFACT_DIR", default_value = "artifacts")]
    pub artifact_dir: PathBuf,

    /// Name of the binary label column
    #[arg(long, default_value = model_lib::training::DEFAULT_LABEL_COLUMN)]
    pub label_column: String,

    /// Random seed for the split and the forest
    #[arg(long, env = "TRAIN_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Number of trees
    #[arg(long, default_value_t = 100)]
    pub trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 12)]
    pub max_depth: usize,

    /// Share of rows held out for validation
    #[arg(long, default_value_t = model_lib::training::DEFAULT_VALIDATION_FRACTION)]
    pub validation_fraction: f64,

    /// Model version tag (defaults to one derived from the training time)
    #[arg(long)]
    pub model_version: Option<String>,

    /// Probability at or above which a patient is classified diabetic
    #[arg(long, default_value_t = model_lib::DEFAULT_DECISION_THRESHOLD)]
    pub threshold: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Train(args) => train::run(args, cli.format)?,
        Commands::Generate { rows, seed, output } => generate::run(rows, seed, &output, cli.format)?,
        Commands::Inspect { artifact_dir } => inspect::run(&artifact_dir, cli.format)?,
    }

    Ok(())
}

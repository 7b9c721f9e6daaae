//! Output formatting utilities

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use model_lib::ModelMetadata;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format timestamp for display
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Color a score in [0, 1]
pub fn color_score(score: f64) -> String {
    let formatted = format!("{:.4}", score);
    if score >= 0.8 {
        formatted.green().to_string()
    } else if score >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Validation metrics as a two-column table
pub fn metrics_table(metrics: &BTreeMap<String, f64>) -> String {
    let rows: Vec<MetricRow> = metrics
        .iter()
        .map(|(name, &value)| MetricRow {
            name: name.clone(),
            value: color_score(value),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Feature importances, largest first
pub fn importance_table(importances: &BTreeMap<String, f64>) -> String {
    let mut sorted: Vec<(&String, &f64)> = importances.iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(a.1));
    let rows: Vec<ImportanceRow> = sorted
        .into_iter()
        .map(|(feature, importance)| ImportanceRow {
            feature: feature.clone(),
            importance: format!("{:.4}", importance),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Human summary of a model's metadata
pub fn print_metadata(metadata: &ModelMetadata) {
    println!("{}", "Model".bold());
    println!("{}", "=".repeat(60));
    println!("Version:        {}", metadata.model_version.cyan());
    println!("Type:           {}", metadata.model_type);
    println!("Trained at:     {}", format_timestamp(&metadata.trained_at));
    println!("Features:       {}", metadata.feature_order.join(", "));
    println!("Label column:   {}", metadata.label_column);
    println!("Threshold:      {}", metadata.decision_threshold);
    println!(
        "Rows:           {} train / {} validation / {} dropped",
        metadata.training_row_count, metadata.validation_row_count, metadata.dropped_row_count
    );
    println!(
        "Forest:         {} trees, max depth {}, seed {}",
        metadata.hyperparameters.n_estimators, metadata.hyperparameters.max_depth, metadata.hyperparameters.seed
    );
    println!();

    println!("{}", "Validation metrics".bold());
    println!("{}", metrics_table(&metadata.validation_metrics));

    if !metadata.feature_importances.is_empty() {
        println!();
        println!("{}", "Feature importances".bold());
        println!("{}", importance_table(&metadata.feature_importances));
    }
}

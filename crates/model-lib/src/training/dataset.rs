//! Labeled training data loaded from CSV
//!
//! Columns are located by header name, so the file may carry extra columns
//! in any order. Rows with a missing or unparsable value in a required
//! column are dropped, never imputed.

use crate::error::{Error, Result};
use crate::models::Feature;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use csv::{StringRecord, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Default name of the binary label column
pub const DEFAULT_LABEL_COLUMN: &str = "Diabetic";

const MISSING_MARKERS: [&str; 5] = ["", "na", "nan", "null", "none"];

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Column order of every row in `rows`
    feature_order: Vec<Feature>,
    rows: Vec<Vec<f64>>,
    labels: Vec<bool>,
    dropped_rows: usize,
}

impl Dataset {
    /// Build from rows already in `feature_order`
    pub fn new(feature_order: Vec<Feature>, rows: Vec<Vec<f64>>, labels: Vec<bool>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(Error::Data(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if rows.iter().any(|r| r.len() != feature_order.len()) {
            return Err(Error::Data("row width does not match feature order".to_string()));
        }
        Ok(Self {
            feature_order,
            rows,
            labels,
            dropped_rows: 0,
        })
    }

    pub fn from_csv_path(path: &Path, label_column: &str) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let dataset = Self::from_csv_reader(BufReader::new(file), label_column).map_err(|e| match e {
            // Attach the real path to read failures
            Error::Io { source, .. } => Error::io(path, source),
            other => other,
        })?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            dropped = dataset.dropped_rows,
            positives = dataset.positive_count(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_csv_reader<R: Read>(reader: R, label_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(csv_error)?.clone();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(Error::Data("dataset is empty".to_string()));
        }
        let columns: Vec<&str> = headers.iter().map(|h| h.trim_start_matches(BOM)).collect();

        let locate = |name: &str| columns.iter().position(|c| *c == name);
        let mut missing: Vec<&str> = Vec::new();
        let mut feature_columns = Vec::with_capacity(Feature::ALL.len());
        for feature in Feature::ALL {
            match locate(feature.name()) {
                Some(idx) => feature_columns.push(idx),
                None => missing.push(feature.name()),
            }
        }
        let label_idx = locate(label_column);
        if label_idx.is_none() {
            missing.push(label_column);
        }
        let label_idx = match label_idx {
            Some(idx) if missing.is_empty() => idx,
            _ => {
                return Err(Error::Data(format!(
                    "dataset is missing required columns: {}",
                    missing.join(", ")
                )))
            }
        };

        let mut rows = Vec::new();
        let mut labels = Vec::new();
        let mut dropped_rows = 0;
        let mut record = StringRecord::new();

        while reader.read_record(&mut record).map_err(csv_error)? {
            let row: Option<Vec<f64>> = feature_columns
                .iter()
                .map(|&idx| record.get(idx).and_then(parse_number))
                .collect();
            let label = record.get(label_idx).and_then(parse_label);

            match (row, label) {
                (Some(row), Some(label)) => {
                    rows.push(row);
                    labels.push(label);
                }
                _ => {
                    debug!(
                        line = record.position().map(|p| p.line()),
                        "Dropping row with missing values"
                    );
                    dropped_rows += 1;
                }
            }
        }

        if rows.is_empty() {
            return Err(Error::Data(format!(
                "dataset has no usable rows after dropping {} with missing values",
                dropped_rows
            )));
        }

        Ok(Self {
            feature_order: Feature::ALL.to_vec(),
            rows,
            labels,
            dropped_rows,
        })
    }

    pub fn feature_order(&self) -> &[Feature] {
        &self.feature_order
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    /// Stratified split into (training, validation).
    ///
    /// Each class is shuffled with `seed` and contributes
    /// `round(class_size * validation_fraction)` rows to validation, so the
    /// result depends only on the data, the fraction and the seed.
    pub fn split(&self, validation_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
        if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
            return Err(Error::Data(format!(
                "validation fraction {} must be between 0 and 1",
                validation_fraction
            )));
        }
        if self.len() < 2 {
            return Err(Error::Data(format!(
                "need at least 2 rows to split, dataset has {}",
                self.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train_idx = Vec::new();
        let mut valid_idx = Vec::new();

        for class in [false, true] {
            let mut members: Vec<usize> = (0..self.len()).filter(|&i| self.labels[i] == class).collect();
            members.shuffle(&mut rng);
            let n_valid = (members.len() as f64 * validation_fraction).round() as usize;
            valid_idx.extend_from_slice(&members[..n_valid]);
            train_idx.extend_from_slice(&members[n_valid..]);
        }

        // Tiny datasets can round a side down to zero rows
        if valid_idx.is_empty() {
            if let Some(i) = train_idx.pop() {
                valid_idx.push(i);
            }
        }
        if train_idx.is_empty() {
            if let Some(i) = valid_idx.pop() {
                train_idx.push(i);
            }
        }

        train_idx.shuffle(&mut rng);
        valid_idx.shuffle(&mut rng);

        Ok((self.subset(&train_idx), self.subset(&valid_idx)))
    }

    fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_order: self.feature_order.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            dropped_rows: 0,
        }
    }
}

/// Read failures keep their io kind; anything else is malformed input
fn csv_error(err: csv::Error) -> Error {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => Error::io("<dataset>", e),
        _ => Error::Data(format!("malformed CSV: {}", message)),
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    if MISSING_MARKERS.contains(&cell.to_ascii_lowercase().as_str()) {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_label(cell: &str) -> Option<bool> {
    match cell.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

//! Synthetic diabetes dataset for demos and tests
//!
//! Risk grows with pregnancies, glucose above 100, BMI above 25 and age
//! above 30, plus Gaussian noise. The top quarter of risk scores is
//! labeled positive. Readings are clipped to plausible clinical ranges
//! after the risk score is computed.

use super::dataset::{Dataset, DEFAULT_LABEL_COLUMN};
use crate::error::{Error, Result};
use crate::models::Feature;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::io::Write;

/// Fraction of rows labeled positive
const POSITIVE_QUANTILE: f64 = 0.75;

/// Generated rows in canonical feature order
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticData {
    pub rows: Vec<[f64; 5]>,
    pub labels: Vec<bool>,
}

impl SyntheticData {
    pub fn generate(n_rows: usize, seed: u64) -> Result<Self> {
        if n_rows == 0 {
            return Err(Error::Data("cannot generate an empty dataset".to_string()));
        }
        let glucose_dist = normal(120.0, 30.0)?;
        let blood_pressure_dist = normal(70.0, 15.0)?;
        let bmi_dist = normal(30.0, 8.0)?;
        let noise_dist = normal(0.0, 0.1)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut rows = Vec::with_capacity(n_rows);
        let mut risks = Vec::with_capacity(n_rows);

        for _ in 0..n_rows {
            let pregnancies = rng.gen_range(0..15) as f64;
            let glucose = glucose_dist.sample(&mut rng);
            let blood_pressure = blood_pressure_dist.sample(&mut rng);
            let bmi = bmi_dist.sample(&mut rng);
            let age = rng.gen_range(18..80) as f64;

            let risk = 0.01 * pregnancies
                + 0.005 * (glucose - 100.0).max(0.0)
                + 0.01 * (bmi - 25.0).max(0.0)
                + 0.005 * (age - 30.0).max(0.0)
                + noise_dist.sample(&mut rng);
            risks.push(risk);

            rows.push([
                pregnancies,
                round1(glucose.clamp(60.0, 250.0)),
                round1(blood_pressure.clamp(50.0, 120.0)),
                round1(bmi.clamp(15.0, 50.0)),
                age,
            ]);
        }

        let cutoff = percentile(&risks, POSITIVE_QUANTILE);
        let labels = risks.iter().map(|&r| r > cutoff).collect();
        Ok(Self { rows, labels })
    }

    pub fn to_dataset(&self) -> Result<Dataset> {
        Dataset::new(
            Feature::ALL.to_vec(),
            self.rows.iter().map(|r| r.to_vec()).collect(),
            self.labels.clone(),
        )
    }

    /// Write as CSV with a header row and a `Diabetic` label column
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let header: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        writeln!(writer, "{},{}", header.join(","), DEFAULT_LABEL_COLUMN)?;
        for (row, &label) in self.rows.iter().zip(&self.labels) {
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                row[0], row[1], row[2], row[3], row[4], label as u8
            )?;
        }
        writer.flush()
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| Error::Internal(format!("invalid normal distribution: {}", e)))
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Linear-interpolated percentile, `q` in [0, 1]
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

//! Random forest classifier
//!
//! Bagged CART trees with balanced class weights and random feature
//! subsets per split. Probabilities are the mean of per-tree leaf
//! probabilities. Fitting is fully determined by `ForestParams::seed`.

mod tree;

pub use tree::{DecisionTree, Node};

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tree::{TreeData, TreeLimits};

/// Forest hyperparameters, recorded verbatim in the metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 12,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::Data("n_estimators must be at least 1".to_string()));
        }
        if self.max_depth == 0 {
            return Err(Error::Data("max_depth must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(Error::Data("min_samples_split must be at least 2".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    params: ForestParams,
    trees: Vec<DecisionTree>,
    /// Normalized mean impurity decrease, indexed like the training columns
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest on row-major `rows` with binary `labels`
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], params: &ForestParams) -> Result<Self> {
        params.validate()?;
        if rows.is_empty() {
            return Err(Error::Data("cannot fit a forest on zero rows".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(Error::Data(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let n_features = rows[0].len();
        if n_features == 0 {
            return Err(Error::Data("rows have no features".to_string()));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != n_features) {
            return Err(Error::Data(format!(
                "row {} has {} features, expected {}",
                bad,
                rows[bad].len(),
                n_features
            )));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::Data("training rows contain non-finite values".to_string()));
        }

        let data = TreeData {
            rows,
            labels,
            class_weights: balanced_class_weights(labels),
        };
        let limits = TreeLimits {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features: ((n_features as f64).sqrt() as usize).max(1),
        };

        let n = rows.len();
        let mut seeder = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut importances = vec![0.0; n_features];

        for _ in 0..params.n_estimators {
            let mut rng = StdRng::seed_from_u64(seeder.gen());
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

            let mut tree_importances = vec![0.0; n_features];
            let tree = DecisionTree::grow(&data, bootstrap, &limits, &mut rng, &mut tree_importances);
            normalize(&mut tree_importances);
            for (acc, v) in importances.iter_mut().zip(&tree_importances) {
                *acc += v;
            }
            trees.push(tree);
        }
        normalize(&mut importances);

        Ok(Self {
            n_features,
            params: params.clone(),
            trees,
            feature_importances: importances,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Positive-class probability for one feature vector in training column order
    pub fn predict_proba(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.n_features {
            return Err(Error::Internal(format!(
                "forest expects {} features, got {}",
                self.n_features,
                x.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::Internal("feature vector contains non-finite values".to_string()));
        }
        if self.trees.is_empty() {
            return Err(Error::Internal("forest has no trees".to_string()));
        }

        let mut sum = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            sum += tree
                .probability(x)
                .ok_or_else(|| Error::Internal(format!("tree {} could not score input", i)))?;
        }
        Ok((sum / self.trees.len() as f64).clamp(0.0, 1.0))
    }

    /// Structural check for forests read back from disk
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.feature_importances.len() != self.n_features {
            return Err(format!(
                "{} feature importances for {} features",
                self.feature_importances.len(),
                self.n_features
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check(self.n_features).map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// `n / (2 * n_class)` per class, as in scikit-learn's "balanced" mode
fn balanced_class_weights(labels: &[bool]) -> [f64; 2] {
    let n = labels.len() as f64;
    let pos = labels.iter().filter(|&&l| l).count() as f64;
    let neg = n - pos;
    let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 1.0 };
    [weight(neg), weight(pos)]
}

fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

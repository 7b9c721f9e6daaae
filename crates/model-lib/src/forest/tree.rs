//! CART decision tree with weighted Gini impurity

use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Gains below this are treated as no improvement
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        /// Weighted fraction of positive samples that reached this leaf
        probability: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Flattened tree; node 0 is the root and children always follow their parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// Training inputs shared by every node of one tree
pub(crate) struct TreeData<'a> {
    pub rows: &'a [Vec<f64>],
    pub labels: &'a [bool],
    /// Weight of the negative and positive class
    pub class_weights: [f64; 2],
}

pub(crate) struct TreeLimits {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl DecisionTree {
    /// Grow a tree on `samples` (row indices, duplicates allowed for bootstrap draws).
    ///
    /// `importances` accumulates the weighted impurity decrease per feature.
    pub(crate) fn grow(
        data: &TreeData<'_>,
        samples: Vec<usize>,
        limits: &TreeLimits,
        rng: &mut StdRng,
        importances: &mut [f64],
    ) -> Self {
        let mut builder = Builder {
            data,
            limits,
            nodes: Vec::new(),
            importances,
        };
        builder.build(samples, 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    /// Positive-class probability for one row
    pub fn probability(&self, x: &[f64]) -> Option<f64> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx)? {
                Node::Leaf { probability, .. } => return Some(*probability),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = *x.get(*feature)?;
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Structural check for trees read back from disk
    pub fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { probability, .. } => {
                    if !(0.0..=1.0).contains(probability) {
                        return Err(format!("leaf {} has probability {}", idx, probability));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on unknown feature {}", idx, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has non-finite threshold", idx));
                    }
                    // Children after parent rules out cycles
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", idx, child));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

struct Builder<'a, 'd> {
    data: &'a TreeData<'d>,
    limits: &'a TreeLimits,
    nodes: Vec<Node>,
    importances: &'a mut [f64],
}

impl Builder<'_, '_> {
    fn build(&mut self, samples: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let (neg, pos) = self.weighted_counts(&samples);
        let total = neg + pos;
        let probability = if total > 0.0 { pos / total } else { 0.0 };

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            probability,
            samples: samples.len(),
        });

        if depth >= self.limits.max_depth
            || samples.len() < self.limits.min_samples_split
            || neg == 0.0
            || pos == 0.0
        {
            return idx;
        }

        let Some(best) = self.best_split(&samples, neg, pos, rng) else {
            return idx;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&s| self.data.rows[s][best.feature] <= best.threshold);

        self.importances[best.feature] += best.gain;

        let left = self.build(left_samples, depth + 1, rng);
        let right = self.build(right_samples, depth + 1, rng);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn weighted_counts(&self, samples: &[usize]) -> (f64, f64) {
        let [w_neg, w_pos] = self.data.class_weights;
        samples.iter().fold((0.0, 0.0), |(neg, pos), &s| {
            if self.data.labels[s] {
                (neg, pos + w_pos)
            } else {
                (neg + w_neg, pos)
            }
        })
    }

    fn best_split(&self, samples: &[usize], neg: f64, pos: f64, rng: &mut StdRng) -> Option<BestSplit> {
        let n_features = self.data.rows[samples[0]].len();
        let k = self.limits.max_features.clamp(1, n_features);
        let total = neg + pos;
        let parent_impurity = gini(neg, pos);
        let [w_neg, w_pos] = self.data.class_weights;

        let mut best: Option<BestSplit> = None;
        let mut column: Vec<(f64, bool)> = Vec::with_capacity(samples.len());

        for feature in index::sample(rng, n_features, k).into_iter() {
            column.clear();
            column.extend(samples.iter().map(|&s| (self.data.rows[s][feature], self.data.labels[s])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (mut left_neg, mut left_pos) = (0.0, 0.0);
            for i in 0..column.len() - 1 {
                let (value, label) = column[i];
                if label {
                    left_pos += w_pos;
                } else {
                    left_neg += w_neg;
                }
                let next = column[i + 1].0;
                if next <= value {
                    continue;
                }

                let left_total = left_neg + left_pos;
                let right_neg = neg - left_neg;
                let right_pos = pos - left_pos;
                let right_total = right_neg + right_pos;
                let child_impurity =
                    left_total * gini(left_neg, left_pos) + right_total * gini(right_neg, right_pos);
                let gain = total * parent_impurity - child_impurity;

                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: value + (next - value) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

fn gini(neg: f64, pos: f64) -> f64 {
    let total = neg + pos;
    if total <= 0.0 {
        return 0.0;
    }
    let (p, n) = (pos / total, neg / total);
    1.0 - p * p - n * n
}

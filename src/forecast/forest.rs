//! Random forest regressor: bootstrap-sampled CART trees averaged together.
//!
//! Trees split on squared-error reduction, consider every feature at every
//! node and grow until leaves are pure or too small to split. The bootstrap
//! draws come from a seeded RNG, so a fit is reproducible.

use anyhow::{Result, ensure};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analytics::utility::mean;

/// Settings of a [`RandomForest`] fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub seed: u64,
    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            seed: 0,
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// # Errors
    ///
    /// Returns an error if `x` is empty, not the same length as `y`, or the
    /// config asks for zero trees.
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &ForestConfig) -> Result<Self> {
        ensure!(!x.is_empty(), "cannot fit a forest on zero samples");
        ensure!(
            x.len() == y.len(),
            "{} feature rows for {} targets",
            x.len(),
            y.len()
        );
        ensure!(config.n_estimators > 0, "a forest needs at least one tree");

        let mut rng = StdRng::seed_from_u64(config.seed);
        let n = x.len();

        let trees = (0..config.n_estimators)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, sample, config)
            })
            .collect();

        Ok(RandomForest { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the per-tree predictions.
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let votes: Vec<f64> = self.trees.iter().map(|t| t.predict(row)).collect();
        mean(&votes)
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART tree stored as a node arena; node 0 is the root.
#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn fit(x: &[Vec<f64>], y: &[f64], sample: Vec<usize>, config: &ForestConfig) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.grow(x, y, sample, 0, config);
        tree
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        sample: Vec<usize>,
        depth: usize,
        config: &ForestConfig,
    ) -> usize {
        let values: Vec<f64> = sample.iter().map(|&i| y[i]).collect();
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf(mean(&values)));

        let splittable = sample.len() >= config.min_samples_split
            && config.max_depth.is_none_or(|max| depth < max);
        let Some(split) = splittable.then(|| best_split(x, y, &sample)).flatten() else {
            return id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        let left = self.grow(x, y, left, depth + 1, config);
        let right = self.grow(x, y, right, depth + 1, config);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
}

/// Finds the split minimising the children's summed squared error, or `None`
/// when the node is pure or no split lowers the error.
fn best_split(x: &[Vec<f64>], y: &[f64], sample: &[usize]) -> Option<Split> {
    let n = sample.len() as f64;
    let total_sum: f64 = sample.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = sample.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n;
    if parent_sse <= 1e-12 * (1.0 + total_sq) {
        return None;
    }

    let width = x[sample[0]].len();
    let mut order = sample.to_vec();
    let mut best: Option<(f64, Split)> = None;

    for feature in 0..width {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..order.len() - 1 {
            let yi = y[order[k]];
            left_sum += yi;
            left_sq += yi * yi;

            let here = x[order[k]][feature];
            let next = x[order[k + 1]][feature];
            if next <= here {
                continue;
            }

            let n_left = (k + 1) as f64;
            let n_right = n - n_left;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left)
                + (right_sq - right_sum * right_sum / n_right);

            if best.as_ref().is_none_or(|(b, _)| sse < *b) {
                best = Some((
                    sse,
                    Split {
                        feature,
                        threshold: (here + next) / 2.0,
                    },
                ));
            }
        }
    }

    best.filter(|(sse, _)| *sse < parent_sse)
        .map(|(_, split)| split)
}

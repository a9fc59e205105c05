//! Regression tree (CART, squared-error splits)

use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Node work (rows x candidate features) above which features are scanned in parallel
const PARALLEL_SPLIT_WORK: usize = 50_000;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split; rows with `x[feature] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    /// Reduction of the node's sum of squared errors
    gain: f64,
}

/// Regression tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (unlimited when `None`)
    pub max_depth: Option<usize>,
    /// Minimum samples to split an internal node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Features drawn at each split (all when `None`)
    pub max_features: Option<usize>,
    /// Seed for feature sub-sampling
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_regressor()
    }
}

impl DecisionTree {
    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &indices)
    }

    /// Fit on a subset of rows (repeats allowed, as in a bootstrap sample)
    pub fn fit_rows(&mut self, x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> Result<&mut Self> {
        let n_features = x.ncols();

        if x.nrows() != y.len() {
            return Err(InsightError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if rows.is_empty() {
            return Err(InsightError::FitError("cannot fit a tree on zero rows".to_string()));
        }

        self.n_features = n_features;
        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut importances = vec![0.0; n_features];
        let mut rows = rows.to_vec();
        self.root = Some(self.build_tree(x, y, &mut rows, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &mut [usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = rows.len();
        let value = rows.iter().map(|&i| y[i]).sum::<f64>() / n_samples as f64;
        let leaf = TreeNode::Leaf { value, n_samples };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure(y, rows);
        if should_stop {
            return leaf;
        }

        let features = self.candidate_features(rng);
        let best = match self.find_best_split(x, y, rows, &features) {
            Some(best) => best,
            None => return leaf,
        };

        // in-place partition: left rows first
        let mut n_left = 0;
        for i in 0..rows.len() {
            if x[[rows[i], best.feature_idx]] <= best.threshold {
                rows.swap(i, n_left);
                n_left += 1;
            }
        }
        if n_left < self.min_samples_leaf || n_samples - n_left < self.min_samples_leaf {
            return leaf;
        }

        importances[best.feature_idx] += best.gain;

        let (left_rows, right_rows) = rows.split_at_mut(n_left);
        let left = Box::new(self.build_tree(x, y, left_rows, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, right_rows, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut picked = sample(rng, self.n_features, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        features: &[usize],
    ) -> Option<SplitCandidate> {
        let scan = |&feature_idx: &usize| self.best_split_for_feature(x, y, rows, feature_idx);

        let per_feature: Vec<Option<SplitCandidate>> = if rows.len() * features.len() >= PARALLEL_SPLIT_WORK {
            features.par_iter().map(scan).collect()
        } else {
            features.iter().map(scan).collect()
        };

        // first feature wins ties so results do not depend on scheduling
        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, c| match best {
                Some(b) if b.gain >= c.gain => Some(b),
                _ => Some(c),
            })
    }

    /// Sweep sorted values with running sums; the SSE reduction of a split is
    /// `sl²/nl + sr²/nr - s²/n`.
    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        feature_idx: usize,
    ) -> Option<SplitCandidate> {
        let mut pairs: Vec<(f64, f64)> = rows.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let total: f64 = pairs.iter().map(|p| p.1).sum();
        let parent_score = total * total / n as f64;

        let mut best: Option<SplitCandidate> = None;
        let mut left_sum = 0.0;

        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            let n_left = i + 1;
            let n_right = n - n_left;

            if pairs[i].0 >= pairs[i + 1].0 {
                continue;
            }
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            let gain = score - parent_score;

            if gain > best.map_or(0.0, |b| b.gain) {
                let mut threshold = (pairs[i].0 + pairs[i + 1].0) / 2.0;
                // midpoint can round up to the right value for adjacent floats
                if threshold >= pairs[i + 1].0 {
                    threshold = pairs[i].0;
                }
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold,
                    gain,
                });
            }
        }
        best
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(InsightError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(InsightError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows().into_iter().map(|row| predict_row(root, row)).collect())
    }

    /// Normalized total SSE reduction per feature
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth (a lone leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

fn is_pure(y: &Array1<f64>, rows: &[usize]) -> bool {
    let first = y[rows[0]];
    rows.iter().all(|&i| (y[i] - first).abs() < 1e-12)
}

fn predict_row(mut node: &TreeNode, row: ArrayView1<f64>) -> f64 {
    loop {
        match node {
            TreeNode::Leaf { value, .. } => return *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                node = if row[*feature_idx] <= *threshold { left } else { right };
            }
        }
    }
}

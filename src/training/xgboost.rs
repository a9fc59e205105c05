//! XGBoost-style gradient boosting with second-order approximation
//!
//! - Uses both gradient (first derivative) and hessian (second derivative) of loss
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - Built-in L1 (alpha) and L2 (lambda) regularization
//! - Minimum child weight constraint
//! - Sparsity-aware splits: NaN cells follow a learned default direction
//!
//! Only the squared-error objective is implemented, so the hessian is 1 for
//! every row.

use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// XGBoost configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(0),
        }
    }
}

/// A single node in the XGBoost tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        gain: f64,
        /// Side taken by rows whose feature value is missing
        default_left: bool,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                XGBNode::Leaf { weight } => return *weight,
                XGBNode::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                    ..
                } => {
                    node = if goes_left(sample[*feature], *threshold, *default_left) {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn goes_left(value: f64, threshold: f64, default_left: bool) -> bool {
    if value.is_nan() {
        default_left
    } else {
        value <= threshold
    }
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    default_left: bool,
}

/// Build an XGBoost tree using exact greedy split finding
fn build_xgb_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &mut [usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let n = indices.len();

    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || n < 2 || h_sum < config.min_child_weight {
        return XGBNode::Leaf { weight: leaf_weight };
    }

    let rows: &[usize] = indices;
    let candidates: Vec<BestSplit> = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split_for_feature(x, grad, hess, rows, f, config))
        .collect();
    // lowest feature index wins ties
    let best = candidates.into_iter().fold(None, |best: Option<BestSplit>, c| match best {
        Some(b) if b.gain >= c.gain => Some(b),
        _ => Some(c),
    });

    match best {
        Some(split) if split.gain > config.gamma => {
            let mut n_left = 0;
            for i in 0..indices.len() {
                if goes_left(x[[indices[i], split.feature]], split.threshold, split.default_left) {
                    indices.swap(i, n_left);
                    n_left += 1;
                }
            }
            if n_left == 0 || n_left == n {
                return XGBNode::Leaf { weight: leaf_weight };
            }

            let (left_idx, right_idx) = indices.split_at_mut(n_left);
            let left = build_xgb_tree(x, grad, hess, left_idx, feature_indices, depth + 1, config);
            let right = build_xgb_tree(x, grad, hess, right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                gain: split.gain,
                default_left: split.default_left,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf { weight: leaf_weight },
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    if alpha > 0.0 {
        // Soft-threshold for L1
        let g_adj = if g_sum > alpha {
            g_sum - alpha
        } else if g_sum < -alpha {
            g_sum + alpha
        } else {
            return 0.0;
        };
        -g_adj / (h_sum + lambda)
    } else {
        -g_sum / (h_sum + lambda)
    }
}

/// Find best split for a single feature using exact greedy method.
///
/// Rows with a missing value are tried on both sides of every candidate
/// threshold; ties send them left.
fn find_best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &XGBoostConfig,
) -> Option<BestSplit> {
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(indices.len());
    let mut g_missing = 0.0;
    let mut h_missing = 0.0;
    for &i in indices {
        let value = x[[i, feature]];
        if value.is_nan() {
            g_missing += grad[i];
            h_missing += hess[i];
        } else {
            sorted.push((value, i));
        }
    }
    if sorted.len() < 2 {
        return None;
    }
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let g_total: f64 = sorted.iter().map(|&(_, i)| grad[i]).sum::<f64>() + g_missing;
    let h_total: f64 = sorted.iter().map(|&(_, i)| hess[i]).sum::<f64>() + h_missing;
    let lambda = config.reg_lambda;
    let parent_score = (g_total * g_total) / (h_total + lambda);
    let score = |g_l: f64, h_l: f64| -> Option<f64> {
        let g_r = g_total - g_l;
        let h_r = h_total - h_l;
        if h_l < config.min_child_weight || h_r < config.min_child_weight {
            return None;
        }
        Some(0.5 * ((g_l * g_l) / (h_l + lambda) + (g_r * g_r) / (h_r + lambda) - parent_score))
    };

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<BestSplit> = None;

    for pos in 0..sorted.len() - 1 {
        let (value, idx) = sorted[pos];
        let next_value = sorted[pos + 1].0;
        g_left += grad[idx];
        h_left += hess[idx];

        // Skip if next sample has same feature value
        if value >= next_value {
            continue;
        }

        let with_missing_left = score(g_left + g_missing, h_left + h_missing);
        let with_missing_right = if h_missing > 0.0 { score(g_left, h_left) } else { None };
        let (gain, default_left) = match (with_missing_left, with_missing_right) {
            (Some(l), Some(r)) if r > l => (r, false),
            (Some(l), _) => (l, true),
            (None, Some(r)) => (r, false),
            (None, None) => continue,
        };

        if best.map_or(true, |b| gain > b.gain) {
            let mut threshold = (value + next_value) / 2.0;
            if threshold >= next_value {
                threshold = value;
            }
            best = Some(BestSplit {
                feature,
                threshold,
                gain,
                default_left,
            });
        }
    }
    best
}

/// XGBoost Regressor (squared error loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostRegressor {
    config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    n_features: usize,
}

impl Default for XGBoostRegressor {
    fn default() -> Self {
        Self::new(XGBoostConfig::default())
    }
}

impl XGBoostRegressor {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(InsightError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(InsightError::FitError("no training rows".to_string()));
        }
        self.n_features = n_features;

        // Base prediction = mean(y)
        self.base_score = y.mean().unwrap_or(0.0);
        let mut preds = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();
        let hess = Array1::from_elem(n_samples, 1.0);

        for _ in 0..self.config.n_estimators {
            // Squared error: grad = pred - y, hess = 1.0
            let grad: Array1<f64> = &preds - y;

            let mut row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let tree = build_xgb_tree(x, &grad, &hess, &mut row_indices, &col_indices, 0, &self.config);

            // every row moves, sampled or not
            for (i, row) in x.rows().into_iter().enumerate() {
                preds[i] += self.config.learning_rate * tree.predict(row);
            }

            self.trees.push(tree);
        }

        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_features == 0 && self.trees.is_empty() {
            return Err(InsightError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(InsightError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|tree| self.config.learning_rate * tree.predict(row))
                        .sum::<f64>()
            })
            .collect())
    }

    /// Average split gain per feature, normalized to sum to 1
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut gains = vec![0.0f64; self.n_features];
        let mut counts = vec![0usize; self.n_features];
        for tree in &self.trees {
            collect_gains(tree, &mut gains, &mut counts);
        }

        let mut importances: Vec<f64> = gains
            .iter()
            .zip(counts.iter())
            .map(|(&g, &c)| if c > 0 { g / c as f64 } else { 0.0 })
            .collect();
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in importances.iter_mut() {
                *v /= total;
            }
        }
        Some(Array1::from_vec(importances))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn collect_gains(node: &XGBNode, gains: &mut [f64], counts: &mut [usize]) {
    if let XGBNode::Split {
        feature,
        gain,
        left,
        right,
        ..
    } = node
    {
        gains[*feature] += gain;
        counts[*feature] += 1;
        collect_gains(left, gains, counts);
        collect_gains(right, gains, counts);
    }
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| r[0] * 2.0 + r[1] * 0.5 + 1.0)
            .collect();
        (x, y)
    }

    fn r2(model: &XGBoostRegressor, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let p = model.predict(x).unwrap();
        let ym = y.mean().unwrap();
        let ss_res = (&p - y).mapv(|v| v * v).sum();
        let ss_tot = y.mapv(|v| (v - ym).powi(2)).sum();
        1.0 - ss_res / ss_tot
    }

    #[test]
    fn test_xgboost_regressor() {
        let (x, y) = regression_data();
        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 50,
            max_depth: 4,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let score = r2(&model, &x, &y);
        assert!(score > 0.9, "XGBoost regressor R² = {}", score);
        assert_eq!(model.n_trees(), 50);
    }

    #[test]
    fn test_zero_rounds_predicts_mean() {
        let (x, y) = regression_data();
        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 0,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let mean = y.mean().unwrap();
        assert!(model.predict(&x).unwrap().iter().all(|&p| (p - mean).abs() < 1e-12));
    }

    #[test]
    fn test_xgboost_regularization() {
        let (x, y) = regression_data();
        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 30,
            reg_lambda: 10.0,
            reg_alpha: 1.0,
            gamma: 1.0,
            subsample: 0.8,
            colsample_bytree: 0.5,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds.len(), 50);
        assert!(preds.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_gain_importances() {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { 0.0 });
        let y: Array1<f64> = (0..n).map(|i| if i < 30 { 1.0 } else { 5.0 }).collect();

        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 5,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert_eq!(imp[0], 1.0);
        assert_eq!(imp[1], 0.0);
    }

    #[test]
    fn test_missing_values_follow_default_direction() {
        // rows with a missing x behave like the high group
        let n = 60;
        let x = Array2::from_shape_fn((n, 1), |(i, _)| if i % 10 == 9 { f64::NAN } else { i as f64 });
        let y: Array1<f64> = (0..n)
            .map(|i| if i % 10 == 9 || i >= 30 { 5.0 } else { 1.0 })
            .collect();

        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 30,
            max_depth: 3,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let rows = ndarray::array![[f64::NAN], [3.0], [45.0]];
        let preds = model.predict(&rows).unwrap();
        assert!((preds[0] - 5.0).abs() < 0.5, "missing row predicted {}", preds[0]);
        assert!((preds[1] - 1.0).abs() < 0.5);
        assert!((preds[2] - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_all_missing_feature_never_splits() {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { f64::NAN } else { i as f64 });
        let y: Array1<f64> = (0..20).map(|i| i as f64).collect();
        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 10,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert_eq!(imp[0], 0.0);
        assert!(model.predict(&x).unwrap().iter().all(|p| p.is_finite()));
    }
}

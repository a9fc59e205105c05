//! Model selection and estimator parameters

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of model to train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Ordinary least squares
    LinearRegression,
    /// Single regression tree
    DecisionTree,
    /// Bagged regression trees
    RandomForest,
    /// Second-order gradient boosted trees
    #[serde(rename = "xgboost")]
    XGBoost,
}

impl ModelType {
    pub const ALL: [ModelType; 4] = [
        ModelType::LinearRegression,
        ModelType::DecisionTree,
        ModelType::RandomForest,
        ModelType::XGBoost,
    ];

    /// Token used in requests, records and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::LinearRegression => "linear_regression",
            ModelType::DecisionTree => "decision_tree",
            ModelType::RandomForest => "random_forest",
            ModelType::XGBoost => "xgboost",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::LinearRegression => "Linear Regression",
            ModelType::DecisionTree => "Decision Tree",
            ModelType::RandomForest => "Random Forest",
            ModelType::XGBoost => "XGBoost",
        }
    }

    /// Whether fitted models of this type report feature importances
    pub fn exposes_importances(&self) -> bool {
        !matches!(self, ModelType::LinearRegression)
    }

    /// Whether the estimator learns a route for missing (NaN) feature cells
    pub fn handles_missing_values(&self) -> bool {
        matches!(self, ModelType::XGBoost)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        ModelType::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| InsightError::UnknownModelType(s.to_string()))
    }
}

/// Optional estimator overrides; `None` keeps the estimator's default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: Option<usize>,
    pub min_samples_leaf: Option<usize>,
    pub n_estimators: Option<usize>,
    pub learning_rate: Option<f64>,
    pub reg_lambda: Option<f64>,
    pub random_state: Option<u64>,
    pub fit_intercept: Option<bool>,
}

impl EstimatorParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = Some(lr);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Reject values no estimator can use
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &str, value: impl ToString, reason: &str) -> InsightError {
            InsightError::InvalidParameter {
                name: name.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.max_depth == Some(0) {
            return Err(invalid("max_depth", 0, "must be at least 1"));
        }
        if let Some(v) = self.min_samples_split.filter(|&v| v < 2) {
            return Err(invalid("min_samples_split", v, "must be at least 2"));
        }
        if self.min_samples_leaf == Some(0) {
            return Err(invalid("min_samples_leaf", 0, "must be at least 1"));
        }
        if self.n_estimators == Some(0) {
            return Err(invalid("n_estimators", 0, "must be at least 1"));
        }
        if let Some(lr) = self.learning_rate.filter(|lr| !(*lr > 0.0 && lr.is_finite())) {
            return Err(invalid("learning_rate", lr, "must be positive"));
        }
        if let Some(l) = self.reg_lambda.filter(|l| !(*l >= 0.0 && l.is_finite())) {
            return Err(invalid("reg_lambda", l, "must be non-negative"));
        }
        Ok(())
    }
}

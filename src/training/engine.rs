//! Training engine: fit, evaluate and chart one regression model

use super::config::{EstimatorParams, ModelType};
use super::decision_tree::DecisionTree;
use super::linear_models::LinearRegression;
use super::models::{validate_features, validate_training_input, MetricsRecord, Regressor};
use super::random_forest::RandomForest;
use super::xgboost::{XGBoostConfig, XGBoostRegressor};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::{InsightError, Result};
use crate::preprocessing::{prepare_regression_data, PreparedData};
use crate::visualization::{charts, Visualizations};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LinearRegression(LinearRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    XGBoost(XGBoostRegressor),
}

impl TrainedModel {
    pub fn model_type(&self) -> ModelType {
        match self {
            TrainedModel::LinearRegression(_) => ModelType::LinearRegression,
            TrainedModel::DecisionTree(_) => ModelType::DecisionTree,
            TrainedModel::RandomForest(_) => ModelType::RandomForest,
            TrainedModel::XGBoost(_) => ModelType::XGBoost,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::LinearRegression(m) => m.predict(x),
            TrainedModel::DecisionTree(m) => m.predict(x),
            TrainedModel::RandomForest(m) => m.predict(x),
            TrainedModel::XGBoost(m) => m.predict(x),
        }
    }

    /// Per-feature importances; `None` for linear regression
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            TrainedModel::LinearRegression(_) => None,
            TrainedModel::DecisionTree(m) => m.feature_importances().cloned(),
            TrainedModel::RandomForest(m) => m.feature_importances().cloned(),
            TrainedModel::XGBoost(m) => m.feature_importances(),
        }
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LinearRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LinearRegression::predict(self, x)
    }
}

impl Regressor for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTree::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        DecisionTree::feature_importances(self).cloned()
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForest::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForest::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        RandomForest::feature_importances(self).cloned()
    }
}

impl Regressor for XGBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        XGBoostRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        XGBoostRegressor::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        XGBoostRegressor::feature_importances(self)
    }
}

impl Regressor for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            TrainedModel::LinearRegression(m) => Regressor::fit(m, x, y),
            TrainedModel::DecisionTree(m) => Regressor::fit(m, x, y),
            TrainedModel::RandomForest(m) => Regressor::fit(m, x, y),
            TrainedModel::XGBoost(m) => Regressor::fit(m, x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        TrainedModel::predict(self, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        TrainedModel::feature_importances(self)
    }
}

/// Everything produced by one prediction run
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub model_type: ModelType,
    pub target_column: String,
    pub metrics: MetricsRecord,
    pub feature_names: Vec<String>,
    /// Held-out targets and the model's predictions for them
    pub y_test: Array1<f64>,
    pub y_pred: Array1<f64>,
    pub n_train: usize,
    pub dropped_rows: usize,
    pub training_time_secs: f64,
    pub visualizations: Visualizations,
}

/// Model trainer / evaluator
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: PipelineConfig,
}

impl ModelTrainer {
    /// Create a new trainer
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fit `model_type` on the training partition.
    ///
    /// Unset parameters keep the estimator defaults; seeds default to the
    /// split seed so repeated runs give the same model.
    pub fn train(
        &self,
        model_type: ModelType,
        x: &Array2<f64>,
        y: &Array1<f64>,
        params: &EstimatorParams,
    ) -> Result<TrainedModel> {
        params.validate()?;
        validate_training_input(x, y)?;
        validate_features(x, model_type.handles_missing_values())?;

        let start = Instant::now();
        let seed = params.random_state.unwrap_or(self.config.split.random_state);

        let mut model = match model_type {
            ModelType::LinearRegression => TrainedModel::LinearRegression(
                LinearRegression::new().with_fit_intercept(params.fit_intercept.unwrap_or(true)),
            ),
            ModelType::DecisionTree => {
                let mut tree = DecisionTree::new_regressor().with_random_state(seed);
                if let Some(d) = params.max_depth {
                    tree = tree.with_max_depth(d);
                }
                if let Some(n) = params.min_samples_split {
                    tree = tree.with_min_samples_split(n);
                }
                if let Some(n) = params.min_samples_leaf {
                    tree = tree.with_min_samples_leaf(n);
                }
                TrainedModel::DecisionTree(tree)
            }
            ModelType::RandomForest => {
                let mut forest =
                    RandomForest::new_regressor(params.n_estimators.unwrap_or(100)).with_random_state(seed);
                if let Some(d) = params.max_depth {
                    forest = forest.with_max_depth(d);
                }
                if let Some(n) = params.min_samples_split {
                    forest = forest.with_min_samples_split(n);
                }
                if let Some(n) = params.min_samples_leaf {
                    forest = forest.with_min_samples_leaf(n);
                }
                TrainedModel::RandomForest(forest)
            }
            ModelType::XGBoost => {
                let defaults = XGBoostConfig::default();
                TrainedModel::XGBoost(XGBoostRegressor::new(XGBoostConfig {
                    n_estimators: params.n_estimators.unwrap_or(defaults.n_estimators),
                    learning_rate: params.learning_rate.unwrap_or(defaults.learning_rate),
                    max_depth: params.max_depth.unwrap_or(defaults.max_depth),
                    reg_lambda: params.reg_lambda.unwrap_or(defaults.reg_lambda),
                    random_state: Some(seed),
                    ..defaults
                }))
            }
        };

        Regressor::fit(&mut model, x, y).map_err(|e| match e {
            InsightError::FitError(_) => e,
            other => InsightError::FitError(other.to_string()),
        })?;

        info!(
            model = %model_type,
            rows = x.nrows(),
            features = x.ncols(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model trained"
        );
        Ok(model)
    }

    /// Predict the test partition and score the predictions
    pub fn evaluate(
        &self,
        model: &TrainedModel,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<(MetricsRecord, Array1<f64>)> {
        if x_test.nrows() == 0 {
            return Err(InsightError::DataError(
                "cannot evaluate on an empty test set".to_string(),
            ));
        }
        validate_features(x_test, model.model_type().handles_missing_values())
            .map_err(|e| match e {
                InsightError::FitError(msg) => InsightError::FitError(format!("test partition {}", msg)),
                other => other,
            })?;
        let y_pred = model.predict(x_test)?;
        let metrics = MetricsRecord::compute(y_test, &y_pred)?;

        debug!(mse = metrics.mse, rmse = metrics.rmse, r2 = metrics.r2, "Model evaluated");
        Ok((metrics, y_pred))
    }

    /// Actual-vs-predicted scatter, plus the importance chart when the model
    /// reports importances
    pub fn visualize(
        &self,
        model: &TrainedModel,
        feature_names: &[String],
        target: &str,
        y_test: &Array1<f64>,
        y_pred: &Array1<f64>,
    ) -> Result<Visualizations> {
        let size = (self.config.charts.width, self.config.charts.height);
        let mut images = Visualizations::new();

        images.insert(charts::actual_vs_predicted(
            target,
            &y_test.to_vec(),
            &y_pred.to_vec(),
            size,
        )?);

        if let Some(importances) = model.feature_importances() {
            let named: Vec<(String, f64)> = feature_names
                .iter()
                .cloned()
                .zip(importances.iter().copied())
                .collect();
            images.insert(charts::feature_importance(&named, self.config.top_features, size)?);
        }
        Ok(images)
    }

    /// Prepare, train, evaluate and chart in one call
    pub fn run(
        &self,
        dataset: &Dataset,
        target: &str,
        model_type: ModelType,
        params: &EstimatorParams,
    ) -> Result<PredictionOutcome> {
        let PreparedData {
            x_train,
            x_test,
            y_train,
            y_test,
            feature_names,
            dropped_rows,
            ..
        } = prepare_regression_data(dataset, target, &self.config.split)?;

        let start = Instant::now();
        let model = self.train(model_type, &x_train, &y_train, params)?;
        let training_time_secs = start.elapsed().as_secs_f64();

        let (metrics, y_pred) = self.evaluate(&model, &x_test, &y_test)?;
        let visualizations = self.visualize(&model, &feature_names, target, &y_test, &y_pred)?;

        info!(
            model = %model_type,
            target = %target,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "Prediction run complete"
        );

        Ok(PredictionOutcome {
            model_type,
            target_column: target.to_string(),
            metrics,
            feature_names,
            y_test,
            y_pred,
            n_train: x_train.nrows(),
            dropped_rows,
            training_time_secs,
            visualizations,
        })
    }
}

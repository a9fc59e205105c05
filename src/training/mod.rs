//! Model training module
//!
//! Regression estimators behind a single [`ModelTrainer`]:
//! - Ordinary least squares
//! - Decision tree
//! - Random forest (bagged trees)
//! - XGBoost-style second-order gradient boosting

mod config;
mod engine;
mod models;
pub mod linear_models;
pub mod decision_tree;
pub mod random_forest;
pub mod xgboost;

pub use config::{EstimatorParams, ModelType};
pub use engine::{ModelTrainer, PredictionOutcome, TrainedModel};
pub use models::{validate_features, validate_training_input, MetricsRecord, Regressor};
pub use linear_models::LinearRegression;
pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};

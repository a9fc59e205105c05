//! Tabular Insights - summaries, charts and regression reports for tabular data
//!
//! This crate loads an uploaded `.csv` / `.xlsx` file and provides:
//! - Descriptive statistics, dtype labels and missing-value counts
//! - Distribution, frequency and correlation charts (SVG)
//! - Regression training (linear, decision tree, random forest, XGBoost)
//! - MSE / RMSE / R² evaluation with actual-vs-predicted and importance charts
//! - HTML reports and a local store for uploads and report records
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - In-memory table with column kinds and dtype labels
//! - [`utils`] - File loading (CSV, XLSX)
//! - [`analysis`] - Tabular summarizer
//! - [`preprocessing`] - Target filtering, one-hot encoding, train/test split
//!
//! ## Models
//! - [`training`] - Estimators, metrics and the model trainer
//! - [`visualization`] - Chart rendering
//!
//! ## Services
//! - [`report`] - HTML report assembly
//! - [`storage`] - Upload and report records
//! - [`pipeline`] - Analysis and prediction flows
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod error;
pub mod config;

// Data
pub mod dataset;
pub mod utils;
pub mod analysis;
pub mod preprocessing;

// Models
pub mod training;
pub mod visualization;

// Services
pub mod report;
pub mod storage;
pub mod pipeline;
pub mod cli;

pub use error::{InsightError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{InsightError, Result};

    // Configuration
    pub use crate::config::{AppConfig, ChartConfig, PipelineConfig, SplitConfig};

    // Data
    pub use crate::dataset::{ColumnKind, Dataset};
    pub use crate::analysis::{summarize, visualize, ColumnStats, SummaryRecord};
    pub use crate::preprocessing::{prepare_regression_data, PreparedData};

    // Training
    pub use crate::training::{EstimatorParams, MetricsRecord, ModelTrainer, ModelType, PredictionOutcome, TrainedModel};

    // Output
    pub use crate::visualization::{Visualization, Visualizations};
    pub use crate::report::{render_analysis_report, render_prediction_report, ModelDescriptor};
    pub use crate::storage::{LocalStorage, ReportKind};
    pub use crate::pipeline::{run_analysis, run_prediction};
}

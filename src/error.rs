//! Error types for the insights pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Unsupported file format: {0} (only .csv and .xlsx are accepted)")]
    UnsupportedFormat(String),

    #[error("Target column {0} not found in data")]
    TargetNotFound(String),

    #[error("Unknown model type: {0}")]
    UnknownModelType(String),

    #[error("Model fit failed: {0}")]
    FitError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Chart rendering error: {0}")]
    RenderError(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for InsightError {
    fn from(err: polars::error::PolarsError) -> Self {
        InsightError::DataError(err.to_string())
    }
}

impl From<calamine::XlsxError> for InsightError {
    fn from(err: calamine::XlsxError) -> Self {
        InsightError::DataError(format!("xlsx: {}", err))
    }
}

impl From<serde_json::Error> for InsightError {
    fn from(err: serde_json::Error) -> Self {
        InsightError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for InsightError {
    fn from(err: ndarray::ShapeError) -> Self {
        InsightError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for InsightError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        InsightError::RenderError(err.to_string())
    }
}

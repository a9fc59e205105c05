//! Evaluation metrics and the shared estimator trait

use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Regression metrics on the held-out partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Coefficient of determination
    pub r2: f64,
}

impl MetricsRecord {
    /// Compute regression metrics.
    ///
    /// When the true values are constant R² is 1 for an exact fit and 0
    /// otherwise.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(InsightError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(InsightError::DataError(
                "cannot evaluate on an empty test set".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum();
        let mse = ss_res / n;

        let y_mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            r2,
        })
    }

    /// `(label, value)` rows for tables
    pub fn rows(&self) -> [(&'static str, f64); 3] {
        [
            ("Mean Squared Error (MSE)", self.mse),
            ("Root Mean Squared Error (RMSE)", self.rmse),
            ("R² Score", self.r2),
        ]
    }
}

/// Trait for regression estimators
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// Check shapes and target values before handing data to an estimator
pub fn validate_training_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(InsightError::FitError("training set is empty".to_string()));
    }
    if x.ncols() == 0 {
        return Err(InsightError::FitError("no feature columns to train on".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(InsightError::FitError(format!(
            "feature matrix has {} rows but target has {}",
            x.nrows(),
            y.len()
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(InsightError::FitError("target contains non-finite values".to_string()));
    }
    Ok(())
}

/// Reject feature cells an estimator cannot route.
///
/// Infinite values are always rejected; NaN (a missing cell) only when
/// `allow_missing` is false.
pub fn validate_features(x: &Array2<f64>, allow_missing: bool) -> Result<()> {
    let bad = x
        .indexed_iter()
        .find(|(_, v)| v.is_infinite() || (!allow_missing && v.is_nan()));
    if let Some(((row, col), _)) = bad {
        return Err(InsightError::FitError(format!(
            "feature matrix contains missing or non-finite value at row {}, column {}",
            row, col
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.0, 2.9, 4.1, 5.0];

        let metrics = MetricsRecord::compute(&y_true, &y_pred).unwrap();
        assert!((metrics.mse - 0.006).abs() < 1e-12);
        assert_eq!(metrics.rmse, metrics.mse.sqrt());
        assert!(metrics.r2 > 0.99);
    }

    #[test]
    fn test_perfect_predictions() {
        let y = array![3.0, 1.0, 2.0];
        let metrics = MetricsRecord::compute(&y, &y).unwrap();
        assert_eq!(metrics.mse, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn test_constant_target() {
        let y = array![2.0, 2.0];
        assert_eq!(MetricsRecord::compute(&y, &y).unwrap().r2, 1.0);
        assert_eq!(MetricsRecord::compute(&y, &array![2.0, 3.0]).unwrap().r2, 0.0);
    }

    #[test]
    fn test_empty_test_set() {
        let empty = Array1::<f64>::zeros(0);
        assert!(MetricsRecord::compute(&empty, &empty).is_err());
    }

    #[test]
    fn test_validate_training_input() {
        let x = array![[1.0], [2.0]];
        assert!(validate_training_input(&x, &array![1.0, 2.0]).is_ok());
        assert!(validate_training_input(&x, &array![1.0]).is_err());
        assert!(validate_training_input(&x, &array![1.0, f64::NAN]).is_err());
        assert!(validate_training_input(&Array2::zeros((2, 0)), &array![1.0, 2.0]).is_err());
        assert!(validate_training_input(&Array2::zeros((0, 1)), &Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_validate_features() {
        let x = array![[1.0, f64::NAN], [2.0, 3.0]];
        let err = validate_features(&x, false).unwrap_err();
        assert!(err.to_string().contains("row 0, column 1"));
        assert!(validate_features(&x, true).is_ok());
        assert!(validate_features(&array![[f64::INFINITY]], true).is_err());
    }
}

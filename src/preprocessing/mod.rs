//! Data preparation for regression training
//!
//! Turns a [`Dataset`] and a target column name into numeric train/test
//! matrices:
//! - rows with a missing target are dropped (on a copy)
//! - text features are expanded into indicator columns
//! - rows are shuffled into train and test partitions with a fixed seed

mod encoder;
mod split;

pub use encoder::{one_hot_encode, to_feature_matrix};
pub use split::{train_test_split, SplitIndices};

use crate::config::SplitConfig;
use crate::dataset::{dtype_label, ColumnKind, Dataset};
use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2, Axis};
use tracing::debug;

/// Encoded, partitioned data ready for an estimator
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    /// Feature names after encoding, one per matrix column
    pub feature_names: Vec<String>,
    /// Row positions in the filtered dataset
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    /// Rows removed because the target was missing
    pub dropped_rows: usize,
}

impl PreparedData {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Prepare `dataset` for predicting `target`.
///
/// The dataset itself is left untouched; filtering happens on a copy.
pub fn prepare_regression_data(dataset: &Dataset, target: &str, split: &SplitConfig) -> Result<PreparedData> {
    let kind = dataset
        .column_kind(target)
        .ok_or_else(|| InsightError::TargetNotFound(target.to_string()))?;

    if !matches!(kind, ColumnKind::Numeric | ColumnKind::Boolean) {
        return Err(InsightError::FitError(format!(
            "target column {} must be numeric, found {}",
            target,
            dtype_label(&dataset.dtype(target)?)
        )));
    }

    let target_values = dataset.f64_values(target)?;
    let kept: Vec<usize> = target_values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    let y: Array1<f64> = target_values.iter().flatten().copied().collect();
    let dropped_rows = dataset.height() - kept.len();

    let filtered = if dropped_rows > 0 {
        dataset.take_rows(&kept)?
    } else {
        dataset.clone()
    };

    let features = one_hot_encode(filtered.without_column(target)?.frame())?;
    let feature_names: Vec<String> = features
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    let x = to_feature_matrix(&features)?;

    let SplitIndices {
        train_indices,
        test_indices,
    } = train_test_split(y.len(), split.test_size, split.random_state)?;

    debug!(
        target = %target,
        dropped_rows,
        features = feature_names.len(),
        train = train_indices.len(),
        test = test_indices.len(),
        "Prepared regression data"
    );

    Ok(PreparedData {
        x_train: x.select(Axis(0), &train_indices),
        x_test: x.select(Axis(0), &test_indices),
        y_train: y.select(Axis(0), &train_indices),
        y_test: y.select(Axis(0), &test_indices),
        feature_names,
        train_indices,
        test_indices,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn sample() -> Dataset {
        df!(
            "size" => &[50.0f64, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0, 120.0, 130.0, 140.0],
            "zone" => &["a", "b", "a", "b", "c", "a", "b", "c", "a", "b"],
            "price" => &[Some(1.0f64), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0), Some(f64::NAN), Some(8.0), Some(9.0), Some(10.0)]
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_missing_target_rows_are_dropped() {
        let ds = sample();
        let prepared = prepare_regression_data(&ds, "price", &SplitConfig::default()).unwrap();

        assert_eq!(prepared.dropped_rows, 2);
        assert_eq!(prepared.x_train.nrows() + prepared.x_test.nrows(), 8);
        assert_eq!(prepared.x_test.nrows(), 2);
        assert_eq!(prepared.feature_names, vec!["size", "zone_a", "zone_b", "zone_c"]);
        assert_eq!(prepared.n_features(), 4);
        // input dataset is untouched
        assert_eq!(ds.shape(), (10, 3));
    }

    #[test]
    fn test_target_not_found() {
        let err = prepare_regression_data(&sample(), "nope", &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, InsightError::TargetNotFound(ref t) if t == "nope"));
    }

    #[test]
    fn test_text_target_is_a_fit_error() {
        let err = prepare_regression_data(&sample(), "zone", &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, InsightError::FitError(_)));
    }

    #[test]
    fn test_rows_stay_aligned() {
        let ds: Dataset = df!(
            "x" => &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0],
            "y" => &[10.0f64, 20.0, 30.0, 40.0, 50.0, 60.0]
        )
        .unwrap()
        .into();
        let prepared = prepare_regression_data(&ds, "y", &SplitConfig::default()).unwrap();
        for (row, y) in prepared.x_train.rows().into_iter().zip(prepared.y_train.iter()) {
            assert_eq!(row[0] * 10.0, *y);
        }
        for (row, y) in prepared.x_test.rows().into_iter().zip(prepared.y_test.iter()) {
            assert_eq!(row[0] * 10.0, *y);
        }
    }
}

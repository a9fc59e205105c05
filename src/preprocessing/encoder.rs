//! Feature encoding: dummy expansion of text columns

use crate::dataset::ColumnKind;
use crate::error::{InsightError, Result};
use ndarray::Array2;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Expand every text column into one 0/1 column per distinct value.
///
/// Numeric columns are cast to Float64 with nulls kept, booleans become
/// 0/1 and temporal columns become their integer timestamp. Indicator
/// columns are named `{column}_{value}` with values in sorted order; a
/// null row is 0 in every indicator. Output columns are all Float64, so
/// encoding the result again is a no-op.
pub fn one_hot_encode(df: &DataFrame) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        match ColumnKind::from_dtype(series.dtype()) {
            ColumnKind::Numeric | ColumnKind::Boolean => {
                columns.push(series.cast(&DataType::Float64)?.into());
            }
            ColumnKind::Datetime => {
                columns.push(series.to_physical_repr().cast(&DataType::Float64)?.into());
            }
            ColumnKind::Categorical => {
                columns.extend(dummies(series)?);
            }
        }
    }

    DataFrame::new(columns).map_err(|e| InsightError::DataError(format!("one-hot encoding: {}", e)))
}

fn dummies(series: &Series) -> Result<Vec<Column>> {
    let text = series.cast(&DataType::String)?;
    let values: Vec<Option<&str>> = text.str()?.into_iter().collect();

    let categories: BTreeSet<&str> = values.iter().flatten().copied().collect();
    let columns = categories
        .into_iter()
        .map(|category| {
            let indicator: Vec<f64> = values
                .iter()
                .map(|v| if *v == Some(category) { 1.0 } else { 0.0 })
                .collect();
            Column::new(format!("{}_{}", series.name(), category).into(), indicator)
        })
        .collect();
    Ok(columns)
}

/// Row-major `f64` matrix of a fully numeric frame; nulls become NaN
pub fn to_feature_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    let (n_rows, n_cols) = df.shape();
    let mut matrix = Array2::<f64>::zeros((n_rows, n_cols));

    for (j, column) in df.get_columns().iter().enumerate() {
        let casted = column.as_materialized_series().cast(&DataType::Float64)?;
        for (i, value) in casted.f64()?.into_iter().enumerate() {
            matrix[[i, j]] = value.unwrap_or(f64::NAN);
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_hot_expands_text_columns() {
        let df = df!(
            "age" => &[30i64, 40, 50],
            "city" => &[Some("Oslo"), None, Some("Bergen")],
            "member" => &[true, false, true]
        )
        .unwrap();

        let encoded = one_hot_encode(&df).unwrap();
        assert_eq!(names(&encoded), vec!["age", "city_Bergen", "city_Oslo", "member"]);

        let matrix = to_feature_matrix(&encoded).unwrap();
        assert_eq!(matrix.row(0).to_vec(), vec![30.0, 0.0, 1.0, 1.0]);
        assert_eq!(matrix.row(1).to_vec(), vec![40.0, 0.0, 0.0, 0.0]);
        assert_eq!(matrix.row(2).to_vec(), vec![50.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let df = df!(
            "x" => &[1.5f64, 2.5],
            "kind" => &["a", "b"]
        )
        .unwrap();
        let once = one_hot_encode(&df).unwrap();
        let twice = one_hot_encode(&once).unwrap();
        assert_eq!(names(&once), names(&twice));
        assert_eq!(once.width(), twice.width());
    }

    #[test]
    fn test_nulls_become_nan() {
        let df = df!("x" => &[Some(1.0f64), None]).unwrap();
        let matrix = to_feature_matrix(&one_hot_encode(&df).unwrap()).unwrap();
        assert_eq!(matrix[[0, 0]], 1.0);
        assert!(matrix[[1, 0]].is_nan());
    }
}

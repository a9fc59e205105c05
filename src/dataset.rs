//! In-memory tabular dataset
//!
//! A thin wrapper around a polars [`DataFrame`] that classifies columns into
//! the kinds the pipeline cares about and hands out plain vectors of values.
//! A `Dataset` is never mutated: row filtering produces a new one.

use crate::error::{InsightError, Result};
use crate::utils::data_loader::DataLoader;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Coarse column classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Integer or floating point
    Numeric,
    Boolean,
    /// Text and anything else without a numeric meaning
    Categorical,
    /// Date or datetime
    Datetime,
}

impl ColumnKind {
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64 => ColumnKind::Numeric,
            DataType::Boolean => ColumnKind::Boolean,
            DataType::Date | DataType::Datetime(_, _) => ColumnKind::Datetime,
            _ => ColumnKind::Categorical,
        }
    }
}

/// pandas-style dtype label for display and for picking target candidates
pub fn dtype_label(dtype: &DataType) -> String {
    match dtype {
        DataType::Int8 => "int8".to_string(),
        DataType::Int16 => "int16".to_string(),
        DataType::Int32 => "int32".to_string(),
        DataType::Int64 => "int64".to_string(),
        DataType::UInt8 => "uint8".to_string(),
        DataType::UInt16 => "uint16".to_string(),
        DataType::UInt32 => "uint32".to_string(),
        DataType::UInt64 => "uint64".to_string(),
        DataType::Float32 => "float32".to_string(),
        DataType::Float64 => "float64".to_string(),
        DataType::Boolean => "bool".to_string(),
        DataType::String => "object".to_string(),
        DataType::Date | DataType::Datetime(_, _) => "datetime64[ns]".to_string(),
        other => other.to_string(),
    }
}

/// Tabular data loaded for one pipeline invocation
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Load a `.csv` or `.xlsx` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let frame = DataLoader::new().load(path.as_ref())?;
        Ok(Self::new(frame))
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.frame.height(), self.frame.width())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    fn series(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map(|column| column.as_materialized_series())
            .map_err(|_| InsightError::DataError(format!("column {} not found", name)))
    }

    pub fn dtype(&self, name: &str) -> Result<DataType> {
        Ok(self.series(name)?.dtype().clone())
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.series(name).ok().map(|s| ColumnKind::from_dtype(s.dtype()))
    }

    pub fn dtype_label(&self, name: &str) -> Result<String> {
        Ok(dtype_label(self.series(name)?.dtype()))
    }

    pub fn null_count(&self, name: &str) -> Result<usize> {
        Ok(self.series(name)?.null_count())
    }

    /// Null entries plus NaN entries of float columns
    pub fn missing_count(&self, name: &str) -> Result<usize> {
        let series = self.series(name)?;
        match series.dtype() {
            DataType::Float32 | DataType::Float64 => {
                Ok(self.f64_values(name)?.iter().filter(|v| v.is_none()).count())
            }
            _ => Ok(series.null_count()),
        }
    }

    /// Names of integer/float columns, in column order
    pub fn numeric_columns(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .filter(|c| ColumnKind::from_dtype(c.dtype()) == ColumnKind::Numeric)
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Values as `f64`; null and NaN both come back as `None`.
    ///
    /// Booleans map to 0/1 and temporal columns to their integer timestamp.
    /// Text columns are rejected.
    pub fn f64_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self.series(name)?;
        let casted = match ColumnKind::from_dtype(series.dtype()) {
            ColumnKind::Numeric | ColumnKind::Boolean => series.cast(&DataType::Float64)?,
            ColumnKind::Datetime => series.to_physical_repr().cast(&DataType::Float64)?,
            ColumnKind::Categorical => {
                return Err(InsightError::DataError(format!(
                    "column {} is not numeric ({})",
                    name,
                    dtype_label(series.dtype())
                )))
            }
        };
        let values = casted
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Ok(values)
    }

    /// Values rendered as strings, nulls preserved
    pub fn string_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let series = self.series(name)?;
        let casted = series.cast(&DataType::String)?;
        let values = casted
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect();
        Ok(values)
    }

    /// New dataset holding only the given rows, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Result<Dataset> {
        let idx = IdxCa::from_vec(
            "idx".into(),
            rows.iter().map(|&i| i as IdxSize).collect(),
        );
        Ok(Dataset::new(self.frame.take(&idx)?))
    }

    /// New dataset without the named column
    pub fn without_column(&self, name: &str) -> Result<Dataset> {
        Ok(Dataset::new(self.frame.drop(name)?))
    }
}

impl From<DataFrame> for Dataset {
    fn from(frame: DataFrame) -> Self {
        Self::new(frame)
    }
}

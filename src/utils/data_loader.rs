//! Data loading utilities

use crate::error::{InsightError, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Cell text read as missing, as pandas does by default
const NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            _ => Err(InsightError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Xlsx => "xlsx",
        }
    }
}

/// Integer columns holding nulls become Float64, matching how pandas reads them
fn promote_nullable_integers(mut df: DataFrame) -> Result<DataFrame> {
    let targets: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_integer() && c.null_count() > 0)
        .map(|c| c.name().to_string())
        .collect();
    for name in targets {
        let promoted = df.column(&name)?.cast(&DataType::Float64)?;
        df.with_column(promoted)?;
    }
    Ok(df)
}

/// Data loader for the supported upload formats
pub struct DataLoader {
    /// Rows scanned to infer CSV column types
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: 100,
        }
    }

    /// Set how many rows are scanned for CSV type inference
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n.max(1);
        self
    }

    /// Detect file format from extension and load
    pub fn load(&self, path: &Path) -> Result<DataFrame> {
        let format = FileFormat::from_path(path)?;
        let start = Instant::now();

        let df = match format {
            FileFormat::Csv => self.load_csv(path)?,
            FileFormat::Xlsx => self.load_xlsx(path)?,
        };
        let df = promote_nullable_integers(df)?;

        debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(df)
    }

    /// Load a CSV file with a header row; the pandas null tokens read as null
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(InsightError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        let null_values = NullValues::AllColumns(NULL_TOKENS.iter().map(|t| (*t).into()).collect());
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Ok(df)
    }

    /// Load the first worksheet of an `.xlsx` workbook.
    ///
    /// The first row is the header. Each column becomes Int64 when every
    /// non-empty cell is an integer, Float64 when every non-empty cell is
    /// numeric, Boolean when every non-empty cell is a bool, Datetime when
    /// every non-empty cell is a date, and String otherwise.
    pub fn load_xlsx(&self, path: &Path) -> Result<DataFrame> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| InsightError::DataError("workbook has no worksheets".to_string()))??;

        let mut rows = range.rows();
        let header: Vec<String> = match rows.next() {
            Some(cells) => cells
                .iter()
                .enumerate()
                .map(|(i, cell)| match cell {
                    Data::Empty => format!("Unnamed: {}", i),
                    other => other.to_string(),
                })
                .collect(),
            None => return Ok(DataFrame::empty()),
        };

        let empty = Data::Empty;
        let mut cells_by_column: Vec<Vec<&Data>> = vec![Vec::new(); header.len()];
        for row in rows {
            for (i, column) in cells_by_column.iter_mut().enumerate() {
                column.push(row.get(i).unwrap_or(&empty));
            }
        }

        let columns = header
            .iter()
            .zip(cells_by_column.iter())
            .map(|(name, cells)| build_column(name, cells))
            .collect::<Vec<_>>();

        Ok(DataFrame::new(columns)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellType {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

fn cell_type(cell: &Data) -> Option<CellType> {
    match cell {
        Data::Empty => None,
        Data::Int(_) => Some(CellType::Int),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(CellType::Int),
        Data::Float(_) => Some(CellType::Float),
        Data::Bool(_) => Some(CellType::Bool),
        Data::DateTime(dt) if dt.is_datetime() => Some(CellType::DateTime),
        Data::DateTimeIso(s) if parse_iso_datetime(s).is_some() => Some(CellType::DateTime),
        Data::String(s) if s.trim().is_empty() => None,
        _ => Some(CellType::Text),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
}

/// Milliseconds since the Unix epoch of a date cell
fn cell_timestamp_ms(cell: &Data) -> Option<i64> {
    let datetime = match cell {
        Data::DateTime(dt) => dt.as_datetime()?,
        Data::DateTimeIso(s) => parse_iso_datetime(s)?,
        _ => return None,
    };
    Some(datetime.and_utc().timestamp_millis())
}

fn column_type(cells: &[&Data]) -> CellType {
    let mut result: Option<CellType> = None;
    for ty in cells.iter().filter_map(|c| cell_type(c)) {
        result = Some(match (result, ty) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(CellType::Int), CellType::Float) | (Some(CellType::Float), CellType::Int) => {
                CellType::Float
            }
            _ => return CellType::Text,
        });
    }
    // An all-empty column carries no type; pandas reads it as float NaN
    result.unwrap_or(CellType::Float)
}

fn build_column(name: &str, cells: &[&Data]) -> Column {
    match column_type(cells) {
        CellType::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellType::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v as f64),
                    Data::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellType::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellType::DateTime => {
            let values = cells.iter().map(|c| cell_timestamp_ms(c));
            Int64Chunked::from_iter_options(name.into(), values)
                .into_datetime(TimeUnit::Milliseconds, None)
                .into_series()
                .into()
        }
        CellType::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| match c {
                    Data::Empty => None,
                    Data::String(s) if s.trim().is_empty() => None,
                    other => Some(other.to_string()),
                })
                .collect();
            Column::new(name.into(), values)
        }
    }
}

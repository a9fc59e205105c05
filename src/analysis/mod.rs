//! Tabular summarizer
//!
//! Produces a [`SummaryRecord`] of descriptive statistics and the
//! distribution / correlation charts for a [`Dataset`].

pub mod stats;

use crate::config::ChartConfig;
use crate::dataset::{ColumnKind, Dataset};
use crate::error::Result;
use crate::visualization::{charts, Visualizations};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

pub use stats::{BoxStats, ColumnStats};

/// Descriptive summary of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Statistics for each numeric column, in column order
    pub describe: IndexMap<String, ColumnStats>,
    /// Column -> dtype label (`int64`, `float64`, `object`, ...)
    pub dtypes: IndexMap<String, String>,
    /// Column -> missing cells (null, or NaN in float columns)
    pub missing_values: IndexMap<String, usize>,
    /// (rows, columns)
    pub shape: (usize, usize),
    pub columns: Vec<String>,
}

impl SummaryRecord {
    /// Columns whose dtype label names an integer or float type
    pub fn numeric_columns(&self) -> Vec<String> {
        self.dtypes
            .iter()
            .filter(|(_, dtype)| dtype.contains("int") || dtype.contains("float"))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn total_missing(&self) -> usize {
        self.missing_values.values().sum()
    }
}

/// Compute the summary record for a dataset
pub fn summarize(dataset: &Dataset) -> Result<SummaryRecord> {
    let columns = dataset.column_names();
    let mut describe = IndexMap::new();
    let mut dtypes = IndexMap::new();
    let mut missing_values = IndexMap::new();

    for name in &columns {
        dtypes.insert(name.clone(), dataset.dtype_label(name)?);
        missing_values.insert(name.clone(), dataset.missing_count(name)?);
    }

    for name in dataset.numeric_columns() {
        let values = present(&dataset.f64_values(&name)?);
        describe.insert(name, ColumnStats::from_values(&values));
    }

    debug!(
        rows = dataset.height(),
        columns = columns.len(),
        described = describe.len(),
        "Summarized dataset"
    );

    Ok(SummaryRecord {
        describe,
        dtypes,
        missing_values,
        shape: dataset.shape(),
        columns,
    })
}

/// Render distribution charts for `columns` plus a correlation heatmap.
///
/// Names not present in the dataset are skipped. The heatmap is added when
/// the dataset has more than one numeric column.
pub fn visualize(dataset: &Dataset, columns: &[String], config: &ChartConfig) -> Result<Visualizations> {
    let mut images = Visualizations::new();

    for column in columns {
        let image = match dataset.column_kind(column) {
            None => {
                debug!(column = %column, "Skipping unknown column");
                continue;
            }
            Some(ColumnKind::Numeric) => {
                let values = present(&dataset.f64_values(column)?);
                charts::distribution_chart(
                    column,
                    &values,
                    (config.distribution_width, config.distribution_height),
                )?
            }
            Some(_) => {
                let counts = value_counts(&dataset.string_values(column)?);
                charts::frequency_chart(column, &counts, config.max_frequency_bars, (config.width, config.height))?
            }
        };
        images.insert(image);
    }

    let numeric = dataset.numeric_columns();
    if numeric.len() > 1 {
        let data = numeric
            .iter()
            .map(|name| dataset.f64_values(name))
            .collect::<Result<Vec<_>>>()?;
        let matrix = stats::correlation_matrix(&data);
        images.insert(charts::correlation_heatmap(
            &numeric,
            &matrix,
            (config.heatmap_width, config.heatmap_height),
        )?);
    }

    info!(charts = images.len(), "Rendered analysis charts");
    Ok(images)
}

/// Frequencies of non-null values, most frequent first; ties keep the order
/// in which values first appear
pub fn value_counts(values: &[Option<String>]) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for value in values.iter().flatten() {
        let entry = counts.entry(value.as_str()).or_insert(0);
        if *entry == 0 {
            order.push(value.clone());
        }
        *entry += 1;
    }

    let mut result: Vec<(String, usize)> = order
        .into_iter()
        .map(|v| {
            let c = counts.get(v.as_str()).copied().unwrap_or(0);
            (v, c)
        })
        .collect();
    // stable sort keeps first-appearance order among equal counts
    result.sort_by(|a, b| b.1.cmp(&a.1));
    result
}

fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn sample() -> Dataset {
        df!(
            "age" => &[Some(25i64), Some(32), Some(47), None, Some(51)],
            "income" => &[40000.0f64, 52000.0, 61000.0, 58000.0, 75000.0],
            "city" => &[Some("Oslo"), Some("Bergen"), Some("Oslo"), None, Some("Bergen")],
            "member" => &[true, false, true, true, false]
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_summarize_shape_and_missing() {
        let summary = summarize(&sample()).unwrap();
        assert_eq!(summary.shape, (5, 4));
        assert_eq!(summary.columns, vec!["age", "income", "city", "member"]);
        assert_eq!(summary.missing_values["age"], 1);
        assert_eq!(summary.missing_values["city"], 1);
        assert_eq!(summary.missing_values["income"], 0);
        assert_eq!(summary.total_missing(), 2);
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let dataset: Dataset = df!(
            "score" => &[Some(1.5f64), Some(f64::NAN), None, Some(4.0)]
        )
        .unwrap()
        .into();
        let summary = summarize(&dataset).unwrap();
        assert_eq!(summary.missing_values["score"], 2);
        assert_eq!(summary.describe["score"].count + summary.missing_values["score"], 4);
    }

    #[test]
    fn test_describe_covers_numeric_only() {
        let summary = summarize(&sample()).unwrap();
        let keys: Vec<&String> = summary.describe.keys().collect();
        assert_eq!(keys, vec!["age", "income"]);
        assert_eq!(summary.describe["age"].count, 4);
        assert_eq!(summary.describe["income"].max, 75000.0);
        assert_eq!(summary.numeric_columns(), vec!["age", "income"]);
        assert_eq!(summary.dtypes["city"], "object");
    }

    #[test]
    fn test_value_counts_order() {
        let values: Vec<Option<String>> = ["b", "a", "b", "c", "a", "d"]
            .iter()
            .map(|s| Some(s.to_string()))
            .chain(std::iter::once(None))
            .collect();
        let counts = value_counts(&values);
        assert_eq!(
            counts,
            vec![
                ("b".to_string(), 2),
                ("a".to_string(), 2),
                ("c".to_string(), 1),
                ("d".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_visualize_selected_columns() {
        let columns = vec!["age".to_string(), "city".to_string(), "nope".to_string()];
        let images = visualize(&sample(), &columns, &ChartConfig::default()).unwrap();
        assert_eq!(
            images.names(),
            vec!["age_distribution", "city_distribution", "correlation_heatmap"]
        );
    }

    #[test]
    fn test_absent_column_yields_nothing() {
        let ds: Dataset = df!("only" => &[1.0f64, 2.0]).unwrap().into();
        let images = visualize(&ds, &["ghost".to_string()], &ChartConfig::default()).unwrap();
        assert!(images.is_empty());
    }
}

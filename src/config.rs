//! Application and pipeline configuration

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Train/test split settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed for the row shuffle
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
        }
    }
}

/// Chart canvas sizes in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    /// Width of the side-by-side histogram + boxplot figure
    pub distribution_width: u32,
    pub distribution_height: u32,
    /// Heatmap canvas is square-ish and taller than the others
    pub heatmap_width: u32,
    pub heatmap_height: u32,
    /// Bars in a category frequency chart; `None` draws every category
    pub max_frequency_bars: Option<usize>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            distribution_width: 1200,
            distribution_height: 500,
            heatmap_width: 1000,
            heatmap_height: 800,
            max_frequency_bars: Some(30),
        }
    }
}

/// Configuration for the analysis and prediction stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub split: SplitConfig,
    /// Number of bars in the feature importance chart
    pub top_features: usize,
    /// Statistics cards rendered in an analysis report before truncating
    pub max_summary_cards: usize,
    pub charts: ChartConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            split: SplitConfig::default(),
            top_features: 10,
            max_summary_cards: 40,
            charts: ChartConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.split.test_size = test_size;
        self
    }

    /// Builder method to set the split seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.split.random_state = seed;
        self
    }

    /// Builder method to set the number of importance bars
    pub fn with_top_features(mut self, n: usize) -> Self {
        self.top_features = n;
        self
    }

    pub fn with_charts(mut self, charts: ChartConfig) -> Self {
        self.charts = charts;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let t = self.split.test_size;
        if !(t > 0.0 && t < 1.0) {
            return Err(InsightError::InvalidParameter {
                name: "test_size".to_string(),
                value: t.to_string(),
                reason: "must be strictly between 0 and 1".to_string(),
            });
        }
        if self.top_features == 0 {
            return Err(InsightError::InvalidParameter {
                name: "top_features".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let c = &self.charts;
        if [c.width, c.height, c.distribution_width, c.distribution_height, c.heatmap_width, c.heatmap_height]
            .iter()
            .any(|&v| v < 100)
        {
            return Err(InsightError::ConfigError(
                "chart dimensions must be at least 100 pixels".to_string(),
            ));
        }
        if c.max_frequency_bars == Some(0) {
            return Err(InsightError::InvalidParameter {
                name: "max_frequency_bars".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1 or unset".to_string(),
            });
        }
        Ok(())
    }
}

/// Top-level configuration used by the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding uploads, reports and the record index
    pub storage_dir: PathBuf,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("insights-data"),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load a JSON configuration file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| InsightError::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.pipeline.validate()?;
        Ok(config)
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.split.test_size, 0.2);
        assert_eq!(config.split.random_state, 42);
        assert_eq!(config.top_features, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(PipelineConfig::new().with_test_size(0.0).validate().is_err());
        assert!(PipelineConfig::new().with_test_size(1.0).validate().is_err());
        assert!(PipelineConfig::new().with_test_size(0.5).validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage_dir": "/tmp/x", "pipeline": {"top_features": 5}}"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.pipeline.top_features, 5);
        assert_eq!(config.pipeline.split.test_size, 0.2);
    }

    #[test]
    fn test_frequency_bar_cap() {
        assert_eq!(ChartConfig::default().max_frequency_bars, Some(30));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"pipeline": {"charts": {"max_frequency_bars": null}}}"#).unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.pipeline.charts.max_frequency_bars, None);
        assert_eq!(config.pipeline.charts.width, 1000);

        let mut pipeline = PipelineConfig::default();
        pipeline.charts.max_frequency_bars = Some(0);
        assert!(pipeline.validate().is_err());
    }
}

//! Local storage for uploads, reports and their records
//!
//! Everything lives under one base directory:
//!
//! ```text
//! <base>/index.json    records for files, analyses and predictions
//! <base>/uploads/      copied data files
//! <base>/reports/      rendered reports
//! ```
//!
//! Each operation reads the index, applies its change and writes it back.

use crate::error::{InsightError, Result};
use crate::training::{MetricsRecord, ModelType};
use crate::utils::data_loader::FileFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An uploaded data file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFileRecord {
    pub id: u64,
    /// Sanitized original file name
    pub filename: String,
    /// Location of the stored copy
    pub filepath: PathBuf,
    pub uploaded_at: DateTime<Utc>,
}

/// A generated analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: u64,
    pub data_file_id: u64,
    pub analysis_type: String,
    pub parameters: serde_json::Value,
    pub result_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

/// A trained model's report and scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: u64,
    pub data_file_id: u64,
    pub model_type: ModelType,
    pub target_column: String,
    pub parameters: serde_json::Value,
    pub metrics: MetricsRecord,
    pub result_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

/// Report kinds that can be deleted individually
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Analysis,
    Prediction,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StorageIndex {
    next_file_id: u64,
    next_analysis_id: u64,
    next_prediction_id: u64,
    files: Vec<DataFileRecord>,
    analyses: Vec<AnalysisRecord>,
    predictions: Vec<PredictionRecord>,
}

impl StorageIndex {
    fn file(&self, id: u64) -> Result<&DataFileRecord> {
        self.files
            .iter()
            .find(|f| f.id == id)
            .ok_or(InsightError::NotFound { kind: "data file", id })
    }

    fn allocate(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }

    /// Drop an upload and its reports from the index.
    ///
    /// Returns the record and the files that belonged to it; nothing on disk
    /// is touched.
    fn detach_file(&mut self, id: u64) -> Result<(DataFileRecord, Vec<PathBuf>)> {
        let record = self.file(id)?.clone();
        let mut artifacts = Vec::new();

        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.analyses).into_iter().partition(|a| a.data_file_id == id);
        self.analyses = kept;
        artifacts.extend(removed.into_iter().filter_map(|a| a.result_path));

        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.predictions).into_iter().partition(|p| p.data_file_id == id);
        self.predictions = kept;
        artifacts.extend(removed.into_iter().filter_map(|p| p.result_path));

        self.files.retain(|f| f.id != id);
        artifacts.push(record.filepath.clone());
        Ok((record, artifacts))
    }

    /// Drop one report record, returning its report file if it had one
    fn detach_report(&mut self, kind: ReportKind, id: u64) -> Result<Option<PathBuf>> {
        match kind {
            ReportKind::Analysis => {
                let pos = self
                    .analyses
                    .iter()
                    .position(|a| a.id == id)
                    .ok_or(InsightError::NotFound { kind: "analysis", id })?;
                Ok(self.analyses.remove(pos).result_path)
            }
            ReportKind::Prediction => {
                let pos = self
                    .predictions
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or(InsightError::NotFound { kind: "prediction", id })?;
                Ok(self.predictions.remove(pos).result_path)
            }
        }
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` and strip leading dots
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Local file system storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Open (and create if needed) a storage directory
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self { base_dir: base_dir.into() };
        fs::create_dir_all(storage.uploads_dir())?;
        fs::create_dir_all(storage.reports_dir())?;
        debug!(dir = %storage.base_dir.display(), "Storage opened");
        Ok(storage)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn index_file(&self) -> PathBuf {
        self.base_dir.join("index.json")
    }

    fn uploads_dir(&self) -> PathBuf {
        self.base_dir.join("uploads")
    }

    fn reports_dir(&self) -> PathBuf {
        self.base_dir.join("reports")
    }

    /// Path a report with this file name is written to
    pub fn report_path(&self, file_name: &str) -> PathBuf {
        self.reports_dir().join(sanitize_filename(file_name))
    }

    fn load_index(&self) -> Result<StorageIndex> {
        let path = self.index_file();
        if !path.exists() {
            return Ok(StorageIndex::default());
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text)
            .map_err(|e| InsightError::StorageError(format!("corrupt index {}: {}", path.display(), e)))
    }

    fn save_index(&self, index: &StorageIndex) -> Result<()> {
        let json = serde_json::to_string_pretty(index)?;
        fs::write(self.index_file(), json)?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut StorageIndex) -> Result<T>) -> Result<T> {
        let mut index = self.load_index()?;
        let out = f(&mut index)?;
        self.save_index(&index)?;
        Ok(out)
    }

    fn remove_artifact(path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "Removed file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
        }
    }

    /// Copy a `.csv`/`.xlsx` file into the uploads folder and record it
    pub fn store_upload(&self, source: &Path) -> Result<DataFileRecord> {
        FileFormat::from_path(source)?;
        let original = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| InsightError::StorageError(format!("invalid file name: {}", source.display())))?;
        let filename = sanitize_filename(original);
        if filename.is_empty() || FileFormat::from_path(Path::new(&filename)).is_err() {
            return Err(InsightError::UnsupportedFormat(original.to_string()));
        }

        self.update(|index| {
            let id = StorageIndex::allocate(&mut index.next_file_id);
            let filepath = self.uploads_dir().join(format!("{}_{}", id, filename));
            fs::copy(source, &filepath)?;

            let record = DataFileRecord {
                id,
                filename: filename.clone(),
                filepath,
                uploaded_at: Utc::now(),
            };
            index.files.push(record.clone());
            info!(id, file = %record.filename, "Stored upload");
            Ok(record)
        })
    }

    pub fn get_file(&self, id: u64) -> Result<DataFileRecord> {
        self.load_index()?.file(id).cloned()
    }

    /// All uploads, newest first
    pub fn list_files(&self) -> Result<Vec<DataFileRecord>> {
        let mut files = self.load_index()?.files;
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        Ok(files)
    }

    pub fn add_analysis(
        &self,
        data_file_id: u64,
        analysis_type: &str,
        parameters: serde_json::Value,
    ) -> Result<AnalysisRecord> {
        self.update(|index| {
            index.file(data_file_id)?;
            let record = AnalysisRecord {
                id: StorageIndex::allocate(&mut index.next_analysis_id),
                data_file_id,
                analysis_type: analysis_type.to_string(),
                parameters,
                result_path: None,
                created_at: Utc::now(),
            };
            index.analyses.push(record.clone());
            Ok(record)
        })
    }

    pub fn add_prediction(
        &self,
        data_file_id: u64,
        model_type: ModelType,
        target_column: &str,
        parameters: serde_json::Value,
        metrics: MetricsRecord,
    ) -> Result<PredictionRecord> {
        self.update(|index| {
            index.file(data_file_id)?;
            let record = PredictionRecord {
                id: StorageIndex::allocate(&mut index.next_prediction_id),
                data_file_id,
                model_type,
                target_column: target_column.to_string(),
                parameters,
                metrics,
                result_path: None,
                created_at: Utc::now(),
            };
            index.predictions.push(record.clone());
            Ok(record)
        })
    }

    pub fn set_analysis_result(&self, id: u64, path: &Path) -> Result<AnalysisRecord> {
        self.update(|index| {
            let record = index
                .analyses
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(InsightError::NotFound { kind: "analysis", id })?;
            record.result_path = Some(path.to_path_buf());
            Ok(record.clone())
        })
    }

    pub fn set_prediction_result(&self, id: u64, path: &Path) -> Result<PredictionRecord> {
        self.update(|index| {
            let record = index
                .predictions
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(InsightError::NotFound { kind: "prediction", id })?;
            record.result_path = Some(path.to_path_buf());
            Ok(record.clone())
        })
    }

    pub fn get_analysis(&self, id: u64) -> Result<AnalysisRecord> {
        self.load_index()?
            .analyses
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(InsightError::NotFound { kind: "analysis", id })
    }

    pub fn get_prediction(&self, id: u64) -> Result<PredictionRecord> {
        self.load_index()?
            .predictions
            .into_iter()
            .find(|p| p.id == id)
            .ok_or(InsightError::NotFound { kind: "prediction", id })
    }

    pub fn analyses_for(&self, data_file_id: u64) -> Result<Vec<AnalysisRecord>> {
        let index = self.load_index()?;
        index.file(data_file_id)?;
        Ok(index
            .analyses
            .into_iter()
            .filter(|a| a.data_file_id == data_file_id)
            .collect())
    }

    pub fn predictions_for(&self, data_file_id: u64) -> Result<Vec<PredictionRecord>> {
        let index = self.load_index()?;
        index.file(data_file_id)?;
        Ok(index
            .predictions
            .into_iter()
            .filter(|p| p.data_file_id == data_file_id)
            .collect())
    }

    /// Delete an upload together with every report generated from it
    pub fn delete_file(&self, id: u64) -> Result<DataFileRecord> {
        // files go only once the index no longer points at them
        let (record, artifacts) = self.update(|index| index.detach_file(id))?;
        for path in &artifacts {
            Self::remove_artifact(path);
        }
        info!(id, reports = artifacts.len() - 1, "Deleted data file");
        Ok(record)
    }

    /// Delete one report's record and its file
    pub fn delete_report(&self, kind: ReportKind, id: u64) -> Result<()> {
        if let Some(path) = self.update(|index| index.detach_report(kind, id))? {
            Self::remove_artifact(&path);
        }
        info!(?kind, id, "Deleted report");
        Ok(())
    }
}

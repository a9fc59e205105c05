//! Request flows: analysis and prediction against a stored upload
//!
//! Both flows finish all fallible computation before creating a record, so a
//! failed run leaves no record and no report behind.

use crate::analysis::{self, SummaryRecord};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::report::{render_analysis_report, render_prediction_report, ModelDescriptor};
use crate::storage::{AnalysisRecord, LocalStorage, PredictionRecord, ReportKind};
use crate::training::{EstimatorParams, MetricsRecord, ModelTrainer, ModelType};
use chrono::Utc;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of [`run_analysis`]
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub record: AnalysisRecord,
    pub summary: SummaryRecord,
    pub report_path: PathBuf,
}

/// Result of [`run_prediction`]
#[derive(Debug, Clone)]
pub struct PredictionRun {
    pub record: PredictionRecord,
    pub metrics: MetricsRecord,
    pub report_path: PathBuf,
}

/// Write a report file; on failure drop the record created for it.
///
/// The write error is returned even when the rollback fails too.
fn write_report(storage: &LocalStorage, kind: ReportKind, record_id: u64, path: &Path, html: &str) -> Result<()> {
    if let Err(e) = fs::write(path, html) {
        if let Err(rollback) = storage.delete_report(kind, record_id) {
            warn!(?kind, record_id, error = %rollback, "Failed to remove record of unwritten report");
        }
        return Err(e.into());
    }
    Ok(())
}

/// Summarize a stored upload, chart `columns` and write the analysis report
pub fn run_analysis(
    storage: &LocalStorage,
    file_id: u64,
    columns: &[String],
    config: &PipelineConfig,
) -> Result<AnalysisRun> {
    config.validate()?;
    let file = storage.get_file(file_id)?;
    let dataset = Dataset::from_path(&file.filepath)?;

    let summary = analysis::summarize(&dataset)?;
    let images = analysis::visualize(&dataset, columns, &config.charts)?;
    let html = render_analysis_report(&summary, &images, Utc::now(), config.max_summary_cards);

    let record = storage.add_analysis(file_id, "summary", json!({ "columns": columns }))?;
    let report_path = storage.report_path(&format!("analysis_report_{}_{}.html", file_id, record.id));
    write_report(storage, ReportKind::Analysis, record.id, &report_path, &html)?;
    let record = storage.set_analysis_result(record.id, &report_path)?;

    info!(file_id, analysis_id = record.id, charts = images.len(), "Analysis report written");
    Ok(AnalysisRun {
        record,
        summary,
        report_path,
    })
}

/// Train `model_type` on a stored upload and write the prediction report
pub fn run_prediction(
    storage: &LocalStorage,
    file_id: u64,
    target: &str,
    model_type: ModelType,
    params: &EstimatorParams,
    config: &PipelineConfig,
) -> Result<PredictionRun> {
    config.validate()?;
    let file = storage.get_file(file_id)?;
    let dataset = Dataset::from_path(&file.filepath)?;

    let trainer = ModelTrainer::new(config.clone());
    let outcome = trainer.run(&dataset, target, model_type, params)?;

    let descriptor = ModelDescriptor {
        model_type,
        target_column: target.to_string(),
        training_date: Utc::now(),
    };
    let html = render_prediction_report(&descriptor, &outcome.metrics, &outcome.visualizations);

    let record = storage.add_prediction(
        file_id,
        model_type,
        target,
        json!({ "test_size": config.split.test_size }),
        outcome.metrics,
    )?;
    let report_path = storage.report_path(&format!("prediction_report_{}_{}.html", file_id, record.id));
    write_report(storage, ReportKind::Prediction, record.id, &report_path, &html)?;
    let record = storage.set_prediction_result(record.id, &report_path)?;

    info!(
        file_id,
        prediction_id = record.id,
        model = %model_type,
        r2 = outcome.metrics.r2,
        "Prediction report written"
    );
    Ok(PredictionRun {
        record,
        metrics: outcome.metrics,
        report_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsightError;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalStorage, u64) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path().join("store")).unwrap();
        let source = dir.path().join("people.csv");
        let mut csv = String::from("age,income,city\n");
        for i in 0..30 {
            csv.push_str(&format!("{},{},{}\n", 20 + i, 1000.0 + 50.0 * i as f64, ["a", "b", "c"][i % 3]));
        }
        fs::write(&source, csv).unwrap();
        let file = storage.store_upload(&source).unwrap();
        (dir, storage, file.id)
    }

    #[test]
    fn test_run_analysis_writes_report() {
        let (_dir, storage, file_id) = setup();
        let run = run_analysis(&storage, file_id, &["age".to_string()], &PipelineConfig::default()).unwrap();

        assert_eq!(run.summary.shape, (30, 3));
        let name = run.report_path.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(name, format!("analysis_report_{}_{}.html", file_id, run.record.id));
        assert!(fs::read_to_string(&run.report_path).unwrap().contains("age distribution"));
        assert_eq!(storage.analyses_for(file_id).unwrap().len(), 1);
    }

    #[test]
    fn test_run_prediction_records_parameters() {
        let (_dir, storage, file_id) = setup();
        let run = run_prediction(
            &storage,
            file_id,
            "income",
            ModelType::LinearRegression,
            &EstimatorParams::new(),
            &PipelineConfig::default(),
        )
        .unwrap();

        assert_eq!(run.record.parameters, json!({ "test_size": 0.2 }));
        assert_eq!(run.record.metrics, run.metrics);
        assert!(run.report_path.exists());
    }

    #[test]
    fn test_failed_prediction_leaves_no_record() {
        let (_dir, storage, file_id) = setup();
        let err = run_prediction(
            &storage,
            file_id,
            "salary",
            ModelType::RandomForest,
            &EstimatorParams::new(),
            &PipelineConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, InsightError::TargetNotFound(_)));
        assert!(storage.predictions_for(file_id).unwrap().is_empty());
    }

    #[test]
    fn test_report_write_failure_keeps_io_error() {
        let (dir, storage, file_id) = setup();
        let unwritable = dir.path().join("no such dir").join("report.html");

        let record = storage.add_analysis(file_id, "summary", json!({ "columns": [] })).unwrap();
        let err = write_report(&storage, ReportKind::Analysis, record.id, &unwritable, "<html></html>").unwrap_err();
        assert!(matches!(err, InsightError::IoError(_)));
        assert!(storage.analyses_for(file_id).unwrap().is_empty());

        // the record is already gone, so the rollback itself fails
        let err = write_report(&storage, ReportKind::Analysis, record.id, &unwritable, "<html></html>").unwrap_err();
        assert!(matches!(err, InsightError::IoError(_)));
    }
}

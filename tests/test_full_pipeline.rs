//! Integration test: Full pipeline (upload → analyze → predict → delete)

use std::fs;
use std::path::PathBuf;
use tabular_insights::config::PipelineConfig;
use tabular_insights::error::InsightError;
use tabular_insights::pipeline::{run_analysis, run_prediction};
use tabular_insights::storage::{LocalStorage, ReportKind};
use tabular_insights::training::{EstimatorParams, ModelType};

fn write_dataset(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("sales data.csv");
    let mut csv = String::from("units,price,region,revenue\n");
    for i in 0..60 {
        let units = 5 + (i * 7) % 40;
        let price = 10.0 + (i % 5) as f64 * 2.5;
        let region = ["north", "south", "east"][i % 3];
        let revenue = if i % 11 == 0 {
            String::new()
        } else {
            format!("{:.2}", units as f64 * price)
        };
        csv.push_str(&format!("{},{},{},{}\n", units, price, region, revenue));
    }
    fs::write(&path, csv).unwrap();
    path
}

#[test]
fn test_upload_analyze_predict_delete() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::open(dir.path().join("store")).unwrap();
    let file = storage.store_upload(&write_dataset(dir.path())).unwrap();
    assert_eq!(file.filename, "sales_data.csv");

    let config = PipelineConfig::default();
    let columns = vec!["units".to_string(), "region".to_string(), "missing".to_string()];
    let analysis = run_analysis(&storage, file.id, &columns, &config).unwrap();
    assert_eq!(analysis.summary.shape, (60, 4));
    assert_eq!(analysis.summary.missing_values["revenue"], 6);

    let html = fs::read_to_string(&analysis.report_path).unwrap();
    assert!(html.contains("units distribution"));
    assert!(html.contains("region distribution"));
    assert!(html.contains("correlation heatmap"));
    assert!(!html.contains("missing distribution"));

    let params = EstimatorParams::new().with_n_estimators(25).with_max_depth(4);
    let mut predictions = Vec::new();
    for model_type in ModelType::ALL {
        let run = run_prediction(&storage, file.id, "revenue", model_type, &params, &config).unwrap();
        assert_eq!(run.record.model_type, model_type);
        assert!(run.metrics.rmse >= 0.0);
        let html = fs::read_to_string(&run.report_path).unwrap();
        assert!(html.contains(model_type.display_name()));
        assert_eq!(html.contains("feature importance"), model_type.exposes_importances());
        predictions.push(run);
    }
    assert_eq!(storage.predictions_for(file.id).unwrap().len(), 4);

    storage.delete_report(ReportKind::Prediction, predictions[0].record.id).unwrap();
    assert!(!predictions[0].report_path.exists());
    assert_eq!(storage.predictions_for(file.id).unwrap().len(), 3);

    storage.delete_file(file.id).unwrap();
    assert!(!analysis.report_path.exists());
    assert!(predictions.iter().all(|p| !p.report_path.exists()));
    assert!(matches!(
        storage.get_file(file.id),
        Err(InsightError::NotFound { .. })
    ));
}

#[test]
fn test_unknown_model_creates_no_record() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::open(dir.path().join("store")).unwrap();
    let file = storage.store_upload(&write_dataset(dir.path())).unwrap();

    let parsed = "bogus".parse::<ModelType>();
    assert!(matches!(parsed, Err(InsightError::UnknownModelType(_))));
    assert!(storage.predictions_for(file.id).unwrap().is_empty());
}

#[test]
fn test_text_target_is_fit_error() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::open(dir.path().join("store")).unwrap();
    let file = storage.store_upload(&write_dataset(dir.path())).unwrap();

    let err = run_prediction(
        &storage,
        file.id,
        "region",
        ModelType::LinearRegression,
        &EstimatorParams::new(),
        &PipelineConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, InsightError::FitError(_)));
    assert!(storage.predictions_for(file.id).unwrap().is_empty());
    assert!(fs::read_dir(dir.path().join("store/reports")).unwrap().next().is_none());
}

//! Integration test: Training pipeline end-to-end

use polars::prelude::*;
use tabular_insights::config::PipelineConfig;
use tabular_insights::dataset::Dataset;
use tabular_insights::error::InsightError;
use tabular_insights::preprocessing::prepare_regression_data;
use tabular_insights::training::{EstimatorParams, ModelTrainer, ModelType};

fn people_df(n: usize) -> DataFrame {
    let age: Vec<i64> = (0..n).map(|i| 20 + (i as i64 * 7) % 45).collect();
    let city: Vec<&str> = (0..n).map(|i| ["Jakarta", "Bandung", "Surabaya"][i % 3]).collect();
    let income: Vec<f64> = (0..n)
        .map(|i| {
            let bonus = match i % 3 {
                0 => 1500.0,
                1 => 500.0,
                _ => 0.0,
            };
            1000.0 + 40.0 * age[i] as f64 + bonus + ((i * 13) % 17) as f64
        })
        .collect();

    df!(
        "age" => &age,
        "income" => &income,
        "city" => &city
    )
    .unwrap()
}

#[test]
fn test_linear_regression_scenario() {
    let dataset = Dataset::new(people_df(100));
    let trainer = ModelTrainer::new(PipelineConfig::default());

    let outcome = trainer
        .run(&dataset, "income", ModelType::LinearRegression, &EstimatorParams::new())
        .unwrap();

    assert!(outcome.metrics.rmse >= 0.0);
    assert!(outcome.metrics.r2 <= 1.0);
    assert_eq!(outcome.metrics.rmse, outcome.metrics.mse.sqrt());
    assert_eq!(outcome.y_test.len(), 20);
    assert_eq!(outcome.n_train, 80);
    assert_eq!(outcome.visualizations.len(), 1);
    assert!(outcome.visualizations.contains("actual_vs_predicted"));
    assert!(!outcome.visualizations.contains("feature_importance"));
}

#[test]
fn test_tree_models_report_importances() {
    let dataset = Dataset::new(people_df(100));
    let trainer = ModelTrainer::new(PipelineConfig::default());
    let params = EstimatorParams::new().with_n_estimators(20);

    for model_type in [ModelType::DecisionTree, ModelType::RandomForest, ModelType::XGBoost] {
        let outcome = trainer.run(&dataset, "income", model_type, &params).unwrap();
        assert!(outcome.visualizations.contains("actual_vs_predicted"), "{}", model_type);
        assert!(outcome.visualizations.contains("feature_importance"), "{}", model_type);
        assert!(outcome.metrics.r2 > 0.5, "{}: r2 = {}", model_type, outcome.metrics.r2);
    }
}

#[test]
fn test_categorical_features_are_encoded() {
    let dataset = Dataset::new(people_df(60));
    let trainer = ModelTrainer::new(PipelineConfig::default());

    let outcome = trainer
        .run(&dataset, "income", ModelType::DecisionTree, &EstimatorParams::new())
        .unwrap();

    assert_eq!(
        outcome.feature_names,
        vec!["age", "city_Bandung", "city_Jakarta", "city_Surabaya"]
    );
}

#[test]
fn test_unknown_model_token() {
    let err = "bogus".parse::<ModelType>().unwrap_err();
    assert!(matches!(err, InsightError::UnknownModelType(_)));
}

#[test]
fn test_missing_target() {
    let dataset = Dataset::new(people_df(20));
    let trainer = ModelTrainer::new(PipelineConfig::default());
    let err = trainer
        .run(&dataset, "salary", ModelType::LinearRegression, &EstimatorParams::new())
        .unwrap_err();
    assert!(matches!(err, InsightError::TargetNotFound(_)));
}

#[test]
fn test_runs_are_reproducible() {
    let dataset = Dataset::new(people_df(80));
    let trainer = ModelTrainer::new(PipelineConfig::default());
    let params = EstimatorParams::new().with_n_estimators(15);

    let a = trainer.run(&dataset, "income", ModelType::RandomForest, &params).unwrap();
    let b = trainer.run(&dataset, "income", ModelType::RandomForest, &params).unwrap();
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.y_pred, b.y_pred);
}

#[test]
fn test_rows_with_missing_target_are_dropped() {
    let df = df!(
        "x" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "y" => &[Some(2.0), None, Some(6.0), Some(8.0), None, Some(12.0), Some(14.0), Some(16.0), Some(18.0), Some(20.0)]
    )
    .unwrap();
    let dataset = Dataset::new(df);
    let trainer = ModelTrainer::new(PipelineConfig::default());

    let outcome = trainer
        .run(&dataset, "y", ModelType::LinearRegression, &EstimatorParams::new())
        .unwrap();
    assert_eq!(outcome.dropped_rows, 2);
    assert_eq!(outcome.n_train + outcome.y_test.len(), 8);
    assert!((outcome.metrics.r2 - 1.0).abs() < 1e-9);
}

#[test]
fn test_missing_feature_in_test_row() {
    let n = 30;
    let clean = df!(
        "x" => &(0..n).map(|i| i as f64).collect::<Vec<_>>(),
        "y" => &(0..n).map(|i| 3.0 * i as f64 + 1.0).collect::<Vec<_>>()
    )
    .unwrap();
    let config = PipelineConfig::default();
    let test_row = prepare_regression_data(&Dataset::new(clean), "y", &config.split)
        .unwrap()
        .test_indices[0];

    let x: Vec<Option<f64>> = (0..n).map(|i| (i != test_row).then_some(i as f64)).collect();
    let df = df!(
        "x" => &x,
        "y" => &(0..n).map(|i| 3.0 * i as f64 + 1.0).collect::<Vec<_>>()
    )
    .unwrap();
    let dataset = Dataset::new(df);
    let trainer = ModelTrainer::new(config);
    let params = EstimatorParams::new().with_n_estimators(10);

    for model_type in [ModelType::LinearRegression, ModelType::DecisionTree, ModelType::RandomForest] {
        let err = trainer.run(&dataset, "y", model_type, &params).unwrap_err();
        assert!(matches!(err, InsightError::FitError(_)), "{}: {:?}", model_type, err);
    }

    let outcome = trainer.run(&dataset, "y", ModelType::XGBoost, &params).unwrap();
    assert!(outcome.metrics.mse.is_finite());
    assert!(outcome.metrics.r2.is_finite());
}

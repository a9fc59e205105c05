use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tabular_insights::config::PipelineConfig;
use tabular_insights::dataset::Dataset;
use tabular_insights::preprocessing::prepare_regression_data;
use tabular_insights::training::{EstimatorParams, ModelTrainer, ModelType};

fn create_regression_data(n_rows: usize, n_features: usize) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let mut columns: Vec<Column> = (0..n_features)
        .map(|i| {
            let values: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect();
            Column::new(format!("feature_{}", i).into(), values)
        })
        .collect();

    let regions: Vec<&str> = (0..n_rows).map(|i| ["a", "b", "c", "d"][i % 4]).collect();
    columns.push(Column::new("region".into(), regions));

    // Create target as sum of features + noise
    let target: Vec<f64> = (0..n_rows)
        .map(|i| {
            let mut sum = 0.0;
            for c in &columns[..n_features] {
                sum += c.as_materialized_series().f64().ok().and_then(|ca| ca.get(i)).unwrap_or(0.0);
            }
            sum + rng.gen::<f64>() * 0.1
        })
        .collect();
    columns.push(Column::new("target".into(), target));

    Dataset::new(DataFrame::new(columns).unwrap())
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let trainer = ModelTrainer::new(PipelineConfig::default());
    let params = EstimatorParams::new().with_n_estimators(50);
    let dataset = create_regression_data(2000, 10);
    let data = prepare_regression_data(&dataset, "target", &trainer.config().split).unwrap();

    for model_type in ModelType::ALL {
        group.bench_with_input(BenchmarkId::new("fit", model_type), &data, |b, data| {
            b.iter(|| {
                trainer
                    .train(model_type, black_box(&data.x_train), black_box(&data.y_train), &params)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    let trainer = ModelTrainer::new(PipelineConfig::default());
    for n_rows in [1000, 5000].iter() {
        let dataset = create_regression_data(*n_rows, 10);
        group.bench_with_input(BenchmarkId::new("decision_tree", n_rows), &dataset, |b, dataset| {
            b.iter(|| {
                trainer
                    .run(black_box(dataset), "target", ModelType::DecisionTree, &EstimatorParams::new())
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_pipeline);
criterion_main!(benches);

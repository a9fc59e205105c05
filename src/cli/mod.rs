//! Tabular Insights CLI Module
//!
//! Command-line interface for uploads, summaries, analysis and prediction reports.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::analysis;
use crate::config::AppConfig;
use crate::dataset::Dataset;
use crate::pipeline::{run_analysis, run_prediction};
use crate::storage::{LocalStorage, ReportKind};
use crate::training::{EstimatorParams, ModelType};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{:<16}", key)), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "insights")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Summaries, charts and regression reports for tabular files")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage directory (overrides the configuration file)
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportArg {
    Analysis,
    Prediction,
}

impl From<ReportArg> for ReportKind {
    fn from(arg: ReportArg) -> Self {
        match arg {
            ReportArg::Analysis => ReportKind::Analysis,
            ReportArg::Prediction => ReportKind::Prediction,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a CSV or XLSX file
    Upload {
        /// File to upload
        file: PathBuf,
    },

    /// Print the statistical summary of an uploaded file
    Summary {
        /// Data file id
        file_id: u64,
    },

    /// Render an analysis report with distribution charts
    Analyze {
        /// Data file id
        file_id: u64,

        /// Columns to chart (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Train a regression model and render its report
    Predict {
        /// Data file id
        file_id: u64,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Model type (linear_regression, decision_tree, random_forest, xgboost)
        #[arg(short, long, default_value = "linear_regression")]
        model: String,

        /// Held-out fraction
        #[arg(long)]
        test_size: Option<f64>,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Number of trees / boosting rounds
        #[arg(long)]
        n_estimators: Option<usize>,

        /// Boosting learning rate
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Seed for the estimator
        #[arg(long)]
        random_state: Option<u64>,
    },

    /// List uploads, or the reports of one upload
    List {
        /// Data file id
        file_id: Option<u64>,
    },

    /// Delete an upload and every report generated from it
    DeleteFile {
        /// Data file id
        file_id: u64,
    },

    /// Delete a single report
    DeleteReport {
        #[arg(value_enum)]
        kind: ReportArg,

        /// Report id
        id: u64,
    },
}

/// Resolve the configuration from `--config` and `--storage-dir`
pub fn load_config(path: Option<&Path>, storage_dir: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    Ok(match storage_dir {
        Some(dir) => config.with_storage_dir(dir),
        None => config,
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_upload(storage: &LocalStorage, file: &Path) -> anyhow::Result<()> {
    section("Upload");

    step_run(&format!("Storing {}", file.display()));
    let record = storage.store_upload(file)?;
    step_done(&record.filename);

    step_run("Reading");
    let dataset = Dataset::from_path(&record.filepath)?;
    step_done(&format!("{} rows × {} cols", dataset.height(), dataset.width()));

    println!();
    println!("  {}", kv("File id", &record.id.to_string()));
    println!();
    Ok(())
}

pub fn cmd_summary(storage: &LocalStorage, file_id: u64) -> anyhow::Result<()> {
    section("Summary");

    let file = storage.get_file(file_id)?;
    let start = Instant::now();
    let dataset = Dataset::from_path(&file.filepath)?;
    let summary = analysis::summarize(&dataset)?;

    println!("  {}", kv("File", &file.filename));
    println!("  {}", kv("Shape", &format!("{} × {}", summary.shape.0, summary.shape.1)));
    println!("  {}", kv("Missing", &summary.total_missing().to_string()));
    println!("  {}", kv("Time", &format!("{:.2?}", start.elapsed())));

    println!();
    println!("  {:<24} {:>14} {:>10}", muted("Column"), muted("Type"), muted("Missing"));
    println!("  {}", dim(&"─".repeat(50)));
    for column in &summary.columns {
        let dtype = summary.dtypes.get(column).map(String::as_str).unwrap_or("");
        let missing = summary.missing_values.get(column).copied().unwrap_or(0);
        println!("  {:<24} {:>14} {:>10}", column, dtype, missing);
    }

    if !summary.describe.is_empty() {
        println!();
        println!(
            "  {:<16} {:>8} {:>12} {:>12} {:>12} {:>12}",
            muted("Column"), muted("Count"), muted("Mean"), muted("Std"), muted("Min"), muted("Max")
        );
        println!("  {}", dim(&"─".repeat(78)));
        for (column, stats) in &summary.describe {
            println!(
                "  {:<16} {:>8} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                column, stats.count, stats.mean, stats.std, stats.min, stats.max
            );
        }
    }

    let targets = summary.numeric_columns();
    if !targets.is_empty() {
        println!();
        println!("  {} {}", muted("Target candidates:"), targets.join(", ").cyan());
    }
    println!();
    Ok(())
}

pub fn cmd_analyze(storage: &LocalStorage, config: &AppConfig, file_id: u64, columns: &[String]) -> anyhow::Result<()> {
    section("Analyze");

    step_run("Rendering analysis report");
    let start = Instant::now();
    let run = run_analysis(storage, file_id, columns, &config.pipeline)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_ok(&format!("Analysis {} saved", run.record.id));
    println!("  {}", kv("Report", &run.report_path.display().to_string()));
    println!();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_predict(
    storage: &LocalStorage,
    config: &AppConfig,
    file_id: u64,
    target: &str,
    model: &str,
    test_size: Option<f64>,
    params: EstimatorParams,
) -> anyhow::Result<()> {
    section("Predict");

    let model_type: ModelType = model.parse()?;
    let mut pipeline = config.pipeline.clone();
    if let Some(t) = test_size {
        pipeline = pipeline.with_test_size(t);
    }

    step_run(&format!("Training {}", model_type.display_name().cyan()));
    let start = Instant::now();
    let run = run_prediction(storage, file_id, target, model_type, &params, &pipeline)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    for (label, value) in run.metrics.rows() {
        println!("  {:<32} {}", muted(label), format!("{:.4}", value).white().bold());
    }
    println!();
    step_ok(&format!("Prediction {} saved", run.record.id));
    println!("  {}", kv("Report", &run.report_path.display().to_string()));
    println!();
    Ok(())
}

pub fn cmd_list(storage: &LocalStorage, file_id: Option<u64>) -> anyhow::Result<()> {
    match file_id {
        None => {
            section("Files");
            let files = storage.list_files()?;
            if files.is_empty() {
                println!("  {}", dim("no uploads yet"));
            }
            for file in files {
                println!(
                    "  {:>4}  {:<32} {}",
                    file.id.to_string().cyan(),
                    file.filename,
                    dim(&file.uploaded_at.format("%Y-%m-%d %H:%M").to_string())
                );
            }
        }
        Some(id) => {
            let file = storage.get_file(id)?;
            section(&format!("Reports for {}", file.filename));
            for analysis in storage.analyses_for(id)? {
                println!(
                    "  {:>4}  {:<12} {:<20} {}",
                    analysis.id.to_string().cyan(),
                    "analysis",
                    analysis.analysis_type,
                    dim(&analysis.created_at.format("%Y-%m-%d %H:%M").to_string())
                );
            }
            for prediction in storage.predictions_for(id)? {
                println!(
                    "  {:>4}  {:<12} {:<20} {} {}",
                    prediction.id.to_string().cyan(),
                    "prediction",
                    format!("{} → {}", prediction.model_type, prediction.target_column),
                    muted(&format!("r2 {:.4}", prediction.metrics.r2)),
                    dim(&prediction.created_at.format("%Y-%m-%d %H:%M").to_string())
                );
            }
        }
    }
    println!();
    Ok(())
}

pub fn cmd_delete_file(storage: &LocalStorage, file_id: u64) -> anyhow::Result<()> {
    let record = storage.delete_file(file_id)?;
    step_ok(&format!("Deleted {} and its reports", record.filename));
    Ok(())
}

pub fn cmd_delete_report(storage: &LocalStorage, kind: ReportArg, id: u64) -> anyhow::Result<()> {
    storage.delete_report(kind.into(), id)?;
    step_ok(&format!("Deleted report {}", id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from([
            "insights", "--storage-dir", "/tmp/s", "predict", "3", "-t", "income", "-m", "xgboost", "--max-depth", "4",
        ])
        .unwrap();
        assert_eq!(cli.storage_dir, Some(PathBuf::from("/tmp/s")));
        match cli.command {
            Commands::Predict { file_id, target, model, max_depth, .. } => {
                assert_eq!(file_id, 3);
                assert_eq!(target, "income");
                assert_eq!(model, "xgboost");
                assert_eq!(max_depth, Some(4));
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_parse_analyze_columns() {
        let cli = Cli::try_parse_from(["insights", "analyze", "1", "-c", "age,city"]).unwrap();
        match cli.command {
            Commands::Analyze { columns, .. } => assert_eq!(columns, vec!["age", "city"]),
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_load_config_override() {
        let config = load_config(None, Some(PathBuf::from("elsewhere"))).unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("elsewhere"));
    }
}

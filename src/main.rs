//! Tabular Insights - Main Entry Point

use clap::Parser;
use tabular_insights::cli::{
    cmd_analyze, cmd_delete_file, cmd_delete_report, cmd_list, cmd_predict, cmd_summary, cmd_upload, load_config,
    Cli, Commands,
};
use tabular_insights::storage::LocalStorage;
use tabular_insights::training::EstimatorParams;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabular_insights=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.storage_dir)?;
    let storage = LocalStorage::open(&config.storage_dir)?;

    match cli.command {
        Commands::Upload { file } => cmd_upload(&storage, &file)?,
        Commands::Summary { file_id } => cmd_summary(&storage, file_id)?,
        Commands::Analyze { file_id, columns } => cmd_analyze(&storage, &config, file_id, &columns)?,
        Commands::Predict {
            file_id,
            target,
            model,
            test_size,
            max_depth,
            n_estimators,
            learning_rate,
            random_state,
        } => {
            let params = EstimatorParams {
                max_depth,
                n_estimators,
                learning_rate,
                random_state,
                ..EstimatorParams::default()
            };
            cmd_predict(&storage, &config, file_id, &target, &model, test_size, params)?;
        }
        Commands::List { file_id } => cmd_list(&storage, file_id)?,
        Commands::DeleteFile { file_id } => cmd_delete_file(&storage, file_id)?,
        Commands::DeleteReport { kind, id } => cmd_delete_report(&storage, kind, id)?,
    }

    Ok(())
}

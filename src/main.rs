use std::process::ExitCode;

use table_storage_samples::{
    ConsoleReporter, CosmosConfig, CosmosStore, SampleSettings, TableError, run_samples,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "table_storage_samples=info";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "samples failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), TableError> {
    let config = CosmosConfig::from_env()?;
    info!(account = %config.account_name, database = %config.database, "loaded configuration");

    let store = CosmosStore::new(&config)?;
    let settings = SampleSettings::from_config(&config);
    let outcome = run_samples(&store, &settings, &mut ConsoleReporter).await?;

    if let Some(charge) = outcome.entity_metrics.request_charge {
        info!(table = %outcome.table, request_charge = charge, "entity operations finished");
    }
    Ok(())
}

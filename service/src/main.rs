mod config;
mod enrichment;
mod models;
mod pipeline;
mod processor;
mod storage;

use clap::Parser;
use config::{Cli, Config};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enricher=info,parser=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from(Cli::parse());
    tracing::info!(
        "Enriching {} into {}",
        config.input.display(),
        config.output.display()
    );

    match pipeline::run_file(&config).await {
        Ok(summary) => {
            match serde_json::to_string(&summary) {
                Ok(json) => tracing::debug!("Run summary: {}", json),
                Err(e) => tracing::warn!("Could not encode run summary: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

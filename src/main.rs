//! Main entry point for the organism-tractability CLI

use clap::Parser;
use organism_tractability::cli::{Cli, Commands};
use organism_tractability::metrics;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("organism_tractability=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Metrics are opt-in; a failed exporter never blocks the batch.
    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = metrics::init_metrics(addr) {
            warn!("Failed to initialize metrics exporter: {}", e);
        }
    }

    let result = match cli.command {
        Commands::GetFeatures(ref args) => {
            args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Sources(ref sources_cmd) => sources_cmd.execute().await,
        Commands::Validate(ref validate_cmd) => {
            validate_cmd.execute().await.map_err(|e| anyhow::anyhow!(e))
        }
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

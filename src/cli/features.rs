//! get-features command implementation

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use super::{CliError, SourcesCommand, ValidateCommand};
use crate::catalog::FeatureCatalog;
use crate::pipeline::{config, FeaturesPipeline};
use crate::source::SourceRegistry;

/// Top-level CLI
#[derive(Debug, Parser)]
#[command(
    name = "organism-tractability",
    about = "Fetch per-organism tractability features from external data sources",
    version
)]
pub struct Cli {
    /// Total attempts per outbound network call, including the first
    #[arg(long, global = true, default_value_t = config::MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Expose Prometheus metrics on this address (e.g. 0.0.0.0:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch features for organisms from an input CSV
    GetFeatures(GetFeaturesArgs),
    /// Inspect registered sources
    Sources(SourcesCommand),
    /// Validate inputs without fetching anything
    Validate(ValidateCommand),
}

/// Arguments for the get-features command
#[derive(Debug, Args)]
pub struct GetFeaturesArgs {
    /// Path to input CSV (requires columns: organism_scientific_name, organism_id)
    #[arg(long)]
    pub input: PathBuf,

    /// Path to output CSV to write
    #[arg(long)]
    pub output: PathBuf,

    /// Source IDs to fetch (repeatable). If omitted, fetches all sources.
    #[arg(long = "source-ids", short = 's')]
    pub source_ids: Vec<String>,
}

impl GetFeaturesArgs {
    /// Execute the get-features command.
    ///
    /// Catalog validation, source construction (credentials), source-id
    /// validation, and roster validation all happen before the first
    /// network call; any of them failing is a hard error with no output
    /// rows written.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        if !self.input.exists() {
            return Err(CliError::InvalidArgument(format!(
                "input file does not exist: {}",
                self.input.display()
            )));
        }

        let catalog = FeatureCatalog::load_embedded()?;
        let registry = SourceRegistry::with_max_attempts(cli.max_attempts)?;
        let pipeline = FeaturesPipeline::new(catalog, registry)?;

        let source_ids = if self.source_ids.is_empty() {
            None
        } else {
            Some(self.source_ids.clone())
        };

        let rows_written = pipeline
            .run_csv(&self.input, &self.output, source_ids.as_deref())
            .await?;

        info!(
            rows = rows_written,
            output = %self.output.display(),
            "Feature fetch completed"
        );
        println!(
            "Wrote {} rows to {}",
            rows_written,
            self.output.display()
        );
        Ok(())
    }
}

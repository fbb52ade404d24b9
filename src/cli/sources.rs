//! CLI command for listing available data sources

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::catalog::FeatureCatalog;
use crate::source::DEFAULT_SOURCE_IDS;

/// Sources subcommand
#[derive(Debug, Args)]
pub struct SourcesCommand {
    #[command(subcommand)]
    action: SourcesAction,
}

/// Sources actions
#[derive(Debug, clap::Subcommand)]
enum SourcesAction {
    /// List all registered sources and their catalog features
    List {
        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

/// Output format for sources command
#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

impl SourcesCommand {
    /// Execute the sources command.
    ///
    /// Works from the default registration order and the embedded catalog,
    /// so listing never requires credentials or network access.
    pub async fn execute(&self) -> Result<()> {
        match &self.action {
            SourcesAction::List { format } => self.execute_list(format),
        }
    }

    fn execute_list(&self, format: &OutputFormat) -> Result<()> {
        let catalog = FeatureCatalog::load_embedded().context("failed to load catalog")?;

        let mut all_results = Vec::new();
        for source_id in DEFAULT_SOURCE_IDS {
            let features = catalog.features_for_source(source_id);
            all_results.push(json!({
                "source_id": source_id,
                "feature_count": features.len(),
                "feature_ids": features
                    .iter()
                    .map(|f| f.feature_id.as_str())
                    .collect::<Vec<_>>(),
            }));
        }

        match format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&all_results)
                        .context("failed to serialize results to JSON")?
                );
            }
            OutputFormat::Human => {
                println!("Registered sources:\n");
                for result in all_results {
                    let ids: Vec<&str> = result["feature_ids"]
                        .as_array()
                        .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
                        .unwrap_or_default();
                    println!(
                        "{} | {} feature(s) | {}",
                        result["source_id"].as_str().unwrap_or(""),
                        result["feature_count"],
                        ids.join(", ")
                    );
                }
            }
        }

        Ok(())
    }
}

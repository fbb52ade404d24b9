//! Validation command: check inputs without fetching anything

use clap::Args;
use tracing::info;

use super::CliError;
use crate::catalog::FeatureCatalog;
use crate::input::read_organisms;
use crate::source::DEFAULT_SOURCE_IDS;

/// Validate subcommand
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// What to validate
    #[command(subcommand)]
    pub target: ValidateTarget,
}

/// Validation targets
#[derive(Debug, clap::Subcommand)]
pub enum ValidateTarget {
    /// Validate the embedded feature catalog
    Catalog,
    /// Validate an organism input CSV
    Input {
        /// Path to the input CSV
        path: std::path::PathBuf,
    },
}

impl ValidateCommand {
    /// Execute the validate command.
    pub async fn execute(&self) -> Result<(), CliError> {
        match &self.target {
            ValidateTarget::Catalog => self.validate_catalog(),
            ValidateTarget::Input { path } => self.validate_input(path),
        }
    }

    fn validate_catalog(&self) -> Result<(), CliError> {
        let catalog = FeatureCatalog::load_embedded()?;

        // The catalog may only reference sources that have adapters.
        for source_id in catalog.source_ids() {
            if !DEFAULT_SOURCE_IDS.contains(&source_id) {
                return Err(CliError::InvalidArgument(format!(
                    "catalog references unregistered source: {source_id}"
                )));
            }
        }

        info!(entries = catalog.len(), "Catalog validated");
        println!("Catalog OK: {} feature(s)", catalog.len());
        for source_id in DEFAULT_SOURCE_IDS {
            println!(
                "  {} -> {} feature(s)",
                source_id,
                catalog.features_for_source(source_id).len()
            );
        }
        Ok(())
    }

    fn validate_input(&self, path: &std::path::Path) -> Result<(), CliError> {
        let organisms = read_organisms(path)?;
        info!(organisms = organisms.len(), "Input roster validated");
        println!(
            "Input OK: {} organism(s) in {}",
            organisms.len(),
            path.display()
        );
        Ok(())
    }
}

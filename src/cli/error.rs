//! CLI error types and conversions

use crate::catalog::CatalogError;
use crate::input::InputError;
use crate::output::OutputError;
use crate::pipeline::PipelineError;
use crate::source::SourceError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Catalog error
    #[error("catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    /// Source error
    #[error("source error: {0}")]
    SourceError(#[from] SourceError),

    /// Pipeline error
    #[error("pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    /// Input roster error
    #[error("input error: {0}")]
    InputError(#[from] InputError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

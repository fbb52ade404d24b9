//! CLI command implementations

pub mod error;
pub mod features;
pub mod sources;
pub mod validate;

pub use error::CliError;
pub use features::{Cli, Commands, GetFeaturesArgs};
pub use sources::SourcesCommand;
pub use validate::ValidateCommand;

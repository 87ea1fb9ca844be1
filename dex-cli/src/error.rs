//! Error types for the CLI.

use dex_catalog::LoadFailure;
use dex_core::DexError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dex(#[from] DexError),
    #[error("{0}")]
    Load(LoadFailure),
}

impl From<LoadFailure> for CliError {
    fn from(failure: LoadFailure) -> Self {
        CliError::Load(failure)
    }
}

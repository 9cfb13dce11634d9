mod loader;
mod types;
mod validate;

pub use loader::*;
pub use types::*;
pub use validate::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("config file \"{name}\" not found in {paths:?}")]
    NotFound { name: String, paths: Vec<PathBuf> },

    #[error("failed to read configuration file: {0}")]
    ParseError(String),

    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}

impl ConfigError {
    /// Whether a configuration file was located before the error occurred.
    pub fn file_found(&self) -> bool {
        !matches!(self, Self::FileNotFound(_) | Self::NotFound { .. })
    }
}

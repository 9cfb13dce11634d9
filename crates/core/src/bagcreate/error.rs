//! Error types for bag creation.

use std::path::PathBuf;
use thiserror::Error;

use crate::workflow::ActivityError;

#[derive(Debug, Error)]
pub enum BagCreateError {
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("source is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("source is already a bag: {}", path.display())]
    AlreadyBagged { path: PathBuf },

    #[error("failed to walk payload: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bagging task failed: {0}")]
    Task(String),
}

impl From<BagCreateError> for ActivityError {
    fn from(err: BagCreateError) -> Self {
        ActivityError::failed(format!("bagcreate: {}", err))
    }
}

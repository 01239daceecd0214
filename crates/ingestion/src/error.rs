//! Ingestion error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Directory could not be listed
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Station file could not be read or written
    #[error("cannot access station file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Station file is not a valid station document
    #[error("failed to parse station file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl IngestionError {
    /// Path the error refers to
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::ReadDir { path, .. } | Self::File { path, .. } | Self::ParseFailed { path, .. } => {
                path
            }
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        ContractError::ingestion(err.path().display().to_string(), err.to_string())
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;

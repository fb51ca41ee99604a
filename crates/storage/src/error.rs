//! Storage error types.

use std::path::PathBuf;

use ais_common::HeatmapError;
use thiserror::Error;

/// Unexpected storage failures. These abort a render.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot probe {path}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StorageError> for HeatmapError {
    fn from(err: StorageError) -> Self {
        HeatmapError::Storage(err.to_string())
    }
}

/// Why a present partition could not be read. Recoverable: the hour is
/// skipped and reported.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("missing {0} column")]
    MissingColumn(&'static str),

    #[error("line {line}: invalid {column} value '{value}'")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
}

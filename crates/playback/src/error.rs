use std::path::PathBuf;

use ais_common::HeatmapError;
use storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid viewport: {0}")]
    Viewport(String),

    #[error("invalid background color: {0}")]
    Background(String),
}

impl From<PlaybackError> for HeatmapError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::Storage(e) => e.into(),
            other => HeatmapError::Playback(other.to_string()),
        }
    }
}

//! Error types for the heatmap pipeline.

use thiserror::Error;

/// Result type alias using HeatmapError.
pub type HeatmapResult<T> = Result<T, HeatmapError>;

/// Primary error type for rendering and playback operations.
#[derive(Debug, Error)]
pub enum HeatmapError {
    // === Caller Errors ===
    #[error("Unsupported interval: {0}")]
    UnsupportedInterval(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    // === Rendering Errors ===
    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    // === Playback Errors ===
    #[error("Playback error: {0}")]
    Playback(String),

    // === Concurrency ===
    #[error("A render is already in progress")]
    RenderInProgress,

    #[error("Render worker terminated unexpectedly: {0}")]
    WorkerPanicked(String),
}

impl HeatmapError {
    /// True for errors the caller caused and can fix by changing the request.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            HeatmapError::UnsupportedInterval(_)
                | HeatmapError::InvalidTime(_)
                | HeatmapError::Config(_)
        )
    }
}

impl From<std::io::Error> for HeatmapError {
    fn from(err: std::io::Error) -> Self {
        HeatmapError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for HeatmapError {
    fn from(err: serde_json::Error) -> Self {
        HeatmapError::Config(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for HeatmapError {
    fn from(err: serde_yaml::Error) -> Self {
        HeatmapError::Config(format!("YAML error: {}", err))
    }
}

//! Error types for window aggregation.

use ais_common::HeatmapError;
use renderer::RenderError;
use storage::StorageError;
use thiserror::Error;

/// Failures that abort aggregation of a window.
///
/// Missing or unreadable partitions are not errors; they are reported as
/// events and the window carries on.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// The point source failed in a way that is not tied to one partition.
    #[error("point source failed: {0}")]
    Source(#[from] StorageError),

    /// Shading the accumulated grid failed.
    #[error("shading failed: {0}")]
    Shading(#[from] RenderError),
}

impl From<AggregationError> for HeatmapError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::Source(e) => e.into(),
            other => HeatmapError::Aggregation(other.to_string()),
        }
    }
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregationError>;

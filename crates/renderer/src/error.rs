//! Rendering errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown colormap: {0}")]
    UnknownColormap(String),

    #[error("invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("colormap needs at least two stops, got {0}")]
    TooFewStops(usize),

    #[error("grid of {len} cells does not match {width}x{height}")]
    GridSize {
        len: usize,
        width: u32,
        height: u32,
    },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

impl From<RenderError> for ais_common::HeatmapError {
    fn from(err: RenderError) -> Self {
        ais_common::HeatmapError::Render(err.to_string())
    }
}

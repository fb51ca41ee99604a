//! Common types and utilities shared across the AIS heatmap crates.

pub mod bbox;
pub mod config;
pub mod error;
pub mod interval;
pub mod time;

pub use bbox::BoundingBox;
pub use config::{
    CanvasConfig, ColormapSpec, HeatmapConfig, OutputConfig, PartitionFormat, ShadingConfig, SourceConfig,
    ViewerConfig,
};
pub use error::{HeatmapError, HeatmapResult};
pub use interval::IntervalLabel;
pub use time::{parse_datetime, TimeWindow, WindowPlan};

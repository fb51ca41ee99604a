//! Filesystem storage for the heatmap pipeline.
//!
//! Provides:
//! - Hourly source partitions (path layout, CSV / CSV.gz point reader)
//! - The frame store (rendered PNGs keyed by interval and window start)
//! - The per-interval render manifest

pub mod error;
pub mod frame_store;
pub mod manifest;
pub mod partition;

pub use error::{PartitionError, StorageError};
pub use frame_store::{frame_file_name, parse_frame_file_name, FrameEntry, FrameStore};
pub use manifest::{ManifestCheck, RenderManifest, MANIFEST_FILE};
pub use partition::{
    read_partition, FilesystemSource, HourLoad, PartitionLayout, PointBatch, PointSource,
};

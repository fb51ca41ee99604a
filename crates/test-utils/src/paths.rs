//! Temporary directory layouts for tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ais_common::config::PartitionFormat;
use ais_common::HeatmapConfig;
use tempfile::TempDir;

use crate::fixtures::small_config;

/// A throwaway root holding `source/` partitions and `frames/` output,
/// plus a small configuration pointing at both.
///
/// The directory is removed when the workspace is dropped.
pub struct TestWorkspace {
    dir: TempDir,
    pub config: Arc<HeatmapConfig>,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_format(PartitionFormat::Csv)
    }

    pub fn with_format(format: PartitionFormat) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut config = small_config();
        config.source.base_path = dir.path().join("source");
        config.source.format = format;
        config.output.root = dir.path().join("frames");
        std::fs::create_dir_all(&config.source.base_path).expect("create source dir");
        Self {
            dir,
            config: Arc::new(config),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_dir(&self) -> &Path {
        &self.config.source.base_path
    }

    pub fn frames_dir(&self) -> &Path {
        &self.config.output.root
    }

    pub fn format(&self) -> PartitionFormat {
        self.config.source.format
    }

    /// `frames/<label>`
    pub fn interval_dir(&self, label: &str) -> PathBuf {
        self.frames_dir().join(label)
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

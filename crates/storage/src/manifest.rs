//! Per-interval render manifest.
//!
//! Frame identity is the file name only, so frames rendered with another
//! canvas or colormap would be served as cache hits. The manifest records
//! the fingerprint of the parameters the directory was rendered with so the
//! mismatch can at least be reported.

use std::path::PathBuf;

use ais_common::{CanvasConfig, HeatmapConfig, IntervalLabel, ShadingConfig};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::frame_store::FrameStore;

pub const MANIFEST_FILE: &str = "render-manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderManifest {
    pub fingerprint: String,
    pub canvas: CanvasConfig,
    pub shading: ShadingConfig,
    pub created_at: NaiveDateTime,
}

impl RenderManifest {
    pub fn for_config(config: &HeatmapConfig) -> Self {
        Self {
            fingerprint: config.render_fingerprint(),
            canvas: config.canvas.clone(),
            shading: config.shading.clone(),
            created_at: Utc::now().naive_utc(),
        }
    }
}

/// Comparison of a directory's manifest with the active configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestCheck {
    /// No manifest yet.
    Absent,
    Matches,
    Stale { recorded: String, current: String },
}

impl FrameStore {
    pub fn manifest_path(&self, interval: IntervalLabel) -> PathBuf {
        self.interval_dir(interval).join(MANIFEST_FILE)
    }

    pub fn read_manifest(&self, interval: IntervalLabel) -> Result<Option<RenderManifest>, StorageError> {
        let path = self.manifest_path(interval);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Manifest { path, source })
    }

    pub fn write_manifest(&self, interval: IntervalLabel, manifest: &RenderManifest) -> Result<(), StorageError> {
        let dir = self.interval_dir(interval);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let path = self.manifest_path(interval);
        let json = serde_json::to_vec_pretty(manifest).map_err(|source| StorageError::Manifest {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|e| StorageError::io(&path, e))?;
        debug!(path = %path.display(), fingerprint = %manifest.fingerprint, "Manifest written");
        Ok(())
    }

    /// Compare the stored manifest against `config`.
    pub fn check_manifest(&self, interval: IntervalLabel, config: &HeatmapConfig) -> Result<ManifestCheck, StorageError> {
        let current = config.render_fingerprint();
        Ok(match self.read_manifest(interval)? {
            None => ManifestCheck::Absent,
            Some(m) if m.fingerprint == current => ManifestCheck::Matches,
            Some(m) => {
                warn!(
                    interval = %interval,
                    recorded = %m.fingerprint,
                    current = %current,
                    "Frames were rendered with different parameters"
                );
                ManifestCheck::Stale {
                    recorded: m.fingerprint,
                    current,
                }
            }
        })
    }
}

//! Rendered frames on disk.
//!
//! Layout: `<root>/<interval label>/ais_<YYYY-MM-DD_HH-MM>.png`, keyed by the
//! window start. A frame's presence is the cache-hit signal; contents are
//! never re-validated.

use std::io::Write;
use std::path::{Path, PathBuf};

use ais_common::config::OutputConfig;
use ais_common::IntervalLabel;
use chrono::NaiveDateTime;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::error::StorageError;

const FRAME_PREFIX: &str = "ais_";
const FRAME_SUFFIX: &str = ".png";
const FRAME_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// File name of the frame for a window starting at `start`.
pub fn frame_file_name(start: NaiveDateTime) -> String {
    format!(
        "{}{}{}",
        FRAME_PREFIX,
        start.format(FRAME_TIME_FORMAT),
        FRAME_SUFFIX
    )
}

/// Window start encoded in a frame file name, if it is one.
pub fn parse_frame_file_name(name: &str) -> Option<NaiveDateTime> {
    let stamp = name.strip_prefix(FRAME_PREFIX)?.strip_suffix(FRAME_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, FRAME_TIME_FORMAT).ok()
}

/// A frame found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
}

impl FrameEntry {
    pub fn file_name(&self) -> String {
        frame_file_name(self.timestamp)
    }
}

/// Frame directory tree rooted at the configured output root.
#[derive(Debug, Clone)]
pub struct FrameStore {
    root: PathBuf,
}

impl FrameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn interval_dir(&self, interval: IntervalLabel) -> PathBuf {
        self.root.join(interval.label())
    }

    pub fn frame_path(&self, interval: IntervalLabel, start: NaiveDateTime) -> PathBuf {
        self.interval_dir(interval).join(frame_file_name(start))
    }

    pub fn exists(&self, interval: IntervalLabel, start: NaiveDateTime) -> bool {
        self.frame_path(interval, start).is_file()
    }

    /// All frames of an interval, oldest first.
    ///
    /// Files whose names do not parse as frames are skipped. A missing
    /// interval directory is an empty list.
    pub fn list(&self, interval: IntervalLabel) -> Result<Vec<FrameEntry>, StorageError> {
        let dir = self.interval_dir(interval);
        let read_dir = match std::fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(dir, e)),
        };

        let mut frames = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(timestamp) = name.to_str().and_then(parse_frame_file_name) else {
                continue;
            };
            frames.push(FrameEntry {
                path: entry.path(),
                timestamp,
            });
        }

        frames.sort_by_key(|f| f.timestamp);
        Ok(frames)
    }

    /// Persist encoded PNG bytes as the frame for `start`.
    ///
    /// The bytes land in a temporary file in the interval directory first
    /// and are renamed into place, so readers never see a partial frame.
    #[instrument(skip_all, fields(interval = %interval, start = %start, bytes = png.len()))]
    pub fn write(
        &self,
        interval: IntervalLabel,
        start: NaiveDateTime,
        png: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let dir = self.interval_dir(interval);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let path = dir.join(frame_file_name(start));
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StorageError::io(&dir, e))?;
        tmp.write_all(png).map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StorageError::io(&path, e.error))?;

        debug!(path = %path.display(), "Frame written");
        Ok(path)
    }

    /// Raw bytes of a stored frame.
    pub fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        std::fs::read(path).map_err(|e| StorageError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_frame_name_round_trip() {
        let name = frame_file_name(at(3, 6));
        assert_eq!(name, "ais_2024-01-03_06-00.png");
        assert_eq!(parse_frame_file_name(&name), Some(at(3, 6)));
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        for name in [
            "ais_2024-01-03.png",
            "frame_2024-01-03_06-00.png",
            "ais_2024-13-03_06-00.png",
            "ais_2024-01-03_06-00.jpg",
            "render-manifest.json",
        ] {
            assert_eq!(parse_frame_file_name(name), None, "{}", name);
        }
    }

    #[test]
    fn test_write_then_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FrameStore::new(tmp.path());
        assert!(!store.exists(IntervalLabel::OneDay, at(1, 0)));

        let path = store.write(IntervalLabel::OneDay, at(1, 0), b"png-bytes").unwrap();
        assert_eq!(path, tmp.path().join("1 Day").join("ais_2024-01-01_00-00.png"));
        assert!(store.exists(IntervalLabel::OneDay, at(1, 0)));
        assert!(!store.exists(IntervalLabel::ThreeDays, at(1, 0)));
        assert_eq!(store.read(&path).unwrap(), b"png-bytes");

        // no temp files left behind
        let names: Vec<_> = std::fs::read_dir(store.interval_dir(IntervalLabel::OneDay))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FrameStore::new(tmp.path().join("nowhere"));
        assert!(store.list(IntervalLabel::SevenDays).unwrap().is_empty());
    }
}

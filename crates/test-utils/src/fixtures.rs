//! Fixture writers for partitions and frames.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use ais_common::config::PartitionFormat;
use ais_common::{parse_datetime, HeatmapConfig};
use chrono::NaiveDateTime;
use image::{Rgba, RgbaImage};
use storage::{frame_file_name, PartitionLayout};

/// Canvas small enough for fast tests, same extent as the default.
pub fn small_config() -> HeatmapConfig {
    let mut config = HeatmapConfig::default();
    config.canvas.width = 96;
    config.canvas.height = 54;
    config
}

/// Parse a test timestamp, panicking on typos.
pub fn ts(s: &str) -> NaiveDateTime {
    parse_datetime(s).unwrap_or_else(|e| panic!("bad test timestamp {s}: {e}"))
}

/// Points strung along a shipping lane off New York, `(lon, lat)`.
pub fn lane_points(n: usize) -> Vec<(f32, f32)> {
    (0..n)
        .map(|i| (-74.0 + i as f32 * 0.35, 40.5 - i as f32 * 0.05))
        .collect()
}

fn write_bytes(path: &Path, bytes: &[u8], format: PartitionFormat) {
    std::fs::create_dir_all(path.parent().expect("partition has a parent")).expect("create partition dir");
    let file = std::fs::File::create(path).expect("create partition");
    match format {
        PartitionFormat::Csv => {
            let mut file = file;
            file.write_all(bytes).expect("write partition");
        }
        PartitionFormat::CsvGz => {
            let mut gz = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
            gz.write_all(bytes).expect("write partition");
            gz.finish().expect("finish gzip");
        }
    }
}

/// Write the partition for `hour` with the given `(lon, lat)` points, using
/// the original dataset's column names plus an unused column.
pub fn write_partition(
    base: &Path,
    hour: NaiveDateTime,
    points: &[(f32, f32)],
    format: PartitionFormat,
) -> PathBuf {
    let path = PartitionLayout::new(base, format).path_for(hour);
    let mut csv = String::from("MMSI,LAT,LON\n");
    for (i, (lon, lat)) in points.iter().enumerate() {
        csv.push_str(&format!("{},{},{}\n", 366_000_000 + i, lat, lon));
    }
    write_bytes(&path, csv.as_bytes(), format);
    path
}

/// Write an unreadable partition for `hour`.
pub fn write_corrupt_partition(base: &Path, hour: NaiveDateTime, format: PartitionFormat) -> PathBuf {
    let path = PartitionLayout::new(base, format).path_for(hour);
    std::fs::create_dir_all(path.parent().expect("partition has a parent")).expect("create partition dir");
    // neither valid CSV columns nor a valid gzip stream
    std::fs::write(&path, b"\x1f\x8b\x08garbage\nLON,LAT\nnorth,east\n").expect("write partition");
    path
}

/// A tiny encoded PNG frame.
pub fn frame_png(color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(4, 2, Rgba(color));
    renderer::encode_png(&img).expect("encode test frame")
}

/// Write a frame file for `start` into `dir`.
pub fn write_frame_file(dir: &Path, start: NaiveDateTime) -> PathBuf {
    std::fs::create_dir_all(dir).expect("create frame dir");
    let path = dir.join(frame_file_name(start));
    std::fs::write(&path, frame_png([255, 90, 0, 255])).expect("write frame");
    path
}

/// Relative path → contents of every file under `root`.
pub fn snapshot_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap_or(e.path())
                .to_string_lossy()
                .into_owned();
            (rel, std::fs::read(e.path()).expect("read snapshot file"))
        })
        .collect()
}

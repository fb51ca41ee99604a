//! Hourly source partitions.
//!
//! Each calendar hour of AIS reports lives in at most one file:
//!
//! ```text
//! <base>/year=2024/month=01/day=05/hour=07/AIS_2024_01_05_processed_hour07.csv
//! ```
//!
//! Only the longitude and latitude columns are read. Accepted headers are
//! `LON`/`LAT`, `lon`/`lat` and `longitude`/`latitude` (any case); other
//! columns are skipped without being parsed.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use ais_common::config::{PartitionFormat, SourceConfig};
use chrono::NaiveDateTime;
use flate2::read::MultiGzDecoder;
use tracing::{debug, instrument};

use crate::error::{PartitionError, StorageError};

const LON_HEADERS: [&str; 2] = ["lon", "longitude"];
const LAT_HEADERS: [&str; 2] = ["lat", "latitude"];

/// Deterministic path layout for hourly partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    base: PathBuf,
    format: PartitionFormat,
}

impl PartitionLayout {
    pub fn new(base: impl Into<PathBuf>, format: PartitionFormat) -> Self {
        Self {
            base: base.into(),
            format,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.base_path.clone(), config.format)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn format(&self) -> PartitionFormat {
        self.format
    }

    /// Path of the partition holding `hour`. Minutes are ignored.
    pub fn path_for(&self, hour: NaiveDateTime) -> PathBuf {
        let dir = hour.format("year=%Y/month=%m/day=%d/hour=%H").to_string();
        let file = format!(
            "{}.{}",
            hour.format("AIS_%Y_%m_%d_processed_hour%H"),
            self.format.extension()
        );
        self.base.join(dir).join(file)
    }
}

/// Longitude/latitude columns of one partition, in degrees.
///
/// Empty cells are kept as NaN so `len()` is the partition's row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBatch {
    pub lon: Vec<f32>,
    pub lat: Vec<f32>,
}

impl PointBatch {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            lon: Vec::with_capacity(n),
            lat: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, lon: f32, lat: f32) {
        self.lon.push(lon);
        self.lat.push(lat);
    }

    pub fn len(&self) -> usize {
        self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lon.is_empty()
    }
}

/// Outcome of loading one hour.
#[derive(Debug)]
pub enum HourLoad {
    /// No partition exists for the hour.
    Missing { path: PathBuf },
    Loaded { path: PathBuf, batch: PointBatch },
    /// A partition exists but could not be read.
    Failed { path: PathBuf, error: PartitionError },
}

impl HourLoad {
    pub fn path(&self) -> &Path {
        match self {
            HourLoad::Missing { path } | HourLoad::Loaded { path, .. } | HourLoad::Failed { path, .. } => path,
        }
    }
}

/// Supplier of hourly point batches.
///
/// `Ok` covers every expected per-hour outcome, including missing and
/// unreadable partitions. `Err` is reserved for failures that must abort
/// the whole render.
pub trait PointSource: Send + Sync {
    fn load_hour(&self, hour: NaiveDateTime) -> Result<HourLoad, StorageError>;
}

/// Partitions read from the local filesystem.
#[derive(Debug, Clone)]
pub struct FilesystemSource {
    layout: PartitionLayout,
}

impl FilesystemSource {
    pub fn new(layout: PartitionLayout) -> Self {
        Self { layout }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(PartitionLayout::from_config(config))
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }
}

impl PointSource for FilesystemSource {
    #[instrument(level = "debug", skip(self), fields(hour = %hour))]
    fn load_hour(&self, hour: NaiveDateTime) -> Result<HourLoad, StorageError> {
        let path = self.layout.path_for(hour);

        match std::fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Partition missing");
                return Ok(HourLoad::Missing { path });
            }
            Err(source) => return Err(StorageError::Probe { path, source }),
        }

        match read_partition(&path, self.layout.format) {
            Ok(batch) => {
                debug!(path = %path.display(), rows = batch.len(), "Partition loaded");
                Ok(HourLoad::Loaded { path, batch })
            }
            Err(error) => Ok(HourLoad::Failed { path, error }),
        }
    }
}

/// Read the point columns of one partition file.
pub fn read_partition(path: &Path, format: PartitionFormat) -> Result<PointBatch, PartitionError> {
    let file = File::open(path)?;
    match format {
        PartitionFormat::Csv => read_points(BufReader::new(file)),
        PartitionFormat::CsvGz => read_points(MultiGzDecoder::new(BufReader::new(file))),
    }
}

fn find_column(headers: &csv::ByteRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        std::str::from_utf8(h)
            .map(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
            .unwrap_or(false)
    })
}

fn parse_coord(field: Option<&[u8]>, line: u64, column: &'static str) -> Result<f32, PartitionError> {
    let raw = field.unwrap_or_default();
    let text = std::str::from_utf8(raw).unwrap_or_default().trim();
    if text.is_empty() {
        return Ok(f32::NAN);
    }
    text.parse().map_err(|_| PartitionError::InvalidValue {
        line,
        column,
        value: String::from_utf8_lossy(raw).into_owned(),
    })
}

fn read_points<R: Read>(reader: R) -> Result<PointBatch, PartitionError> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv.byte_headers()?.clone();
    let lon_idx = find_column(&headers, &LON_HEADERS).ok_or(PartitionError::MissingColumn("longitude"))?;
    let lat_idx = find_column(&headers, &LAT_HEADERS).ok_or(PartitionError::MissingColumn("latitude"))?;

    let mut batch = PointBatch::with_capacity(4096);
    let mut record = csv::ByteRecord::new();
    while csv.read_byte_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let lon = parse_coord(record.get(lon_idx), line, "longitude")?;
        let lat = parse_coord(record.get(lat_idx), line, "latitude")?;
        batch.push(lon, lat);
    }
    Ok(batch)
}

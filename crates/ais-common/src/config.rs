//! Immutable deployment configuration.
//!
//! A `HeatmapConfig` is built once (defaults, YAML file or environment) and
//! then shared read-only, usually as `Arc<HeatmapConfig>`, by the renderer,
//! the aggregation engine and the viewer. Two configurations with different
//! canvases can live side by side in one process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bbox::BoundingBox;
use crate::error::{HeatmapError, HeatmapResult};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HeatmapConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub shading: ShadingConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

/// Where the hourly point partitions live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_path: PathBuf,
    pub format: PartitionFormat,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./coast_guard_ais"),
            format: PartitionFormat::default(),
        }
    }
}

/// On-disk encoding of a source partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartitionFormat {
    /// Plain CSV with a header row.
    #[default]
    Csv,
    /// Gzip-compressed CSV.
    CsvGz,
}

impl PartitionFormat {
    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PartitionFormat::Csv => "csv",
            PartitionFormat::CsvGz => "csv.gz",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().trim_start_matches('.') {
            "csv" => Some(PartitionFormat::Csv),
            "csv.gz" | "csv_gz" | "gz" => Some(PartitionFormat::CsvGz),
            _ => None,
        }
    }
}

/// Where rendered frames are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./ais_renders"),
        }
    }
}

/// Raster resolution and projected extent shared by every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// (min_x, max_x) in Web Mercator meters
    pub x_range: (f64, f64),
    /// (min_y, max_y) in Web Mercator meters
    pub y_range: (f64, f64),
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            x_range: (-18_000_000.0, 18_000_000.0),
            y_range: (-4_000_000.0, 9_000_000.0),
        }
    }
}

impl CanvasConfig {
    /// The projected extent covered by the raster.
    pub fn extent(&self) -> BoundingBox {
        BoundingBox::from_ranges(self.x_range, self.y_range)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Colormap selection: a built-in name or explicit hex stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColormapSpec {
    Named(String),
    Stops(Vec<String>),
}

impl Default for ColormapSpec {
    fn default() -> Self {
        ColormapSpec::Named("fire".to_string())
    }
}

/// How an aggregated grid is turned into colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    pub colormap: ColormapSpec,
    /// Alpha of the least dense non-empty cell.
    pub min_alpha: u8,
    /// Neighbor density above which spreading stops.
    pub spread_threshold: f32,
    /// Largest spreading radius in pixels.
    pub spread_max_px: u32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            colormap: ColormapSpec::default(),
            min_alpha: 40,
            spread_threshold: 0.5,
            spread_max_px: 3,
        }
    }
}

/// Playback and display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Auto-play tick in milliseconds.
    pub tick_ms: u64,
    /// Opacity of the heatmap overlay over the basemap.
    pub overlay_alpha: f32,
    /// Tile URL template of the basemap layer.
    pub basemap_url: String,
    /// Fill color used where no basemap is drawn.
    pub background: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            overlay_alpha: 0.75,
            basemap_url: "https://basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png".to_string(),
            background: "#0e0e0e".to_string(),
        }
    }
}

impl HeatmapConfig {
    /// Parse a YAML document. Missing sections take their defaults.
    pub fn from_yaml_str(yaml: &str) -> HeatmapResult<Self> {
        let config: HeatmapConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> HeatmapResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HeatmapError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_yaml_str(&content)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> HeatmapResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `var` returns for the `AIS_*` keys.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> HeatmapResult<Self> {
        let mut config = Self::default();

        if let Some(val) = var("AIS_BASE_PATH") {
            config.source.base_path = PathBuf::from(val);
        }

        if let Some(val) = var("AIS_OUTPUT_ROOT") {
            config.output.root = PathBuf::from(val);
        }

        if let Some(val) = var("AIS_PARTITION_FORMAT") {
            config.source.format = PartitionFormat::from_str(&val).ok_or_else(|| {
                HeatmapError::Config(format!("unknown partition format: {}", val))
            })?;
        }

        if let Some(val) = var("AIS_CANVAS_WIDTH") {
            config.canvas.width = parse_dimension("AIS_CANVAS_WIDTH", &val)?;
        }

        if let Some(val) = var("AIS_CANVAS_HEIGHT") {
            config.canvas.height = parse_dimension("AIS_CANVAS_HEIGHT", &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> HeatmapResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(HeatmapError::Config(
                "canvas width and height must be > 0".to_string(),
            ));
        }

        if !self.canvas.extent().is_valid() {
            return Err(HeatmapError::Config(format!(
                "canvas extent {:?} x {:?} is empty or inverted",
                self.canvas.x_range, self.canvas.y_range
            )));
        }

        if !(0.0..=1.0).contains(&self.shading.spread_threshold) {
            return Err(HeatmapError::Config(
                "spread_threshold must be within 0-1".to_string(),
            ));
        }

        if let ColormapSpec::Stops(stops) = &self.shading.colormap {
            if stops.len() < 2 {
                return Err(HeatmapError::Config(
                    "a colormap needs at least two stops".to_string(),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.viewer.overlay_alpha) {
            return Err(HeatmapError::Config(
                "overlay_alpha must be within 0-1".to_string(),
            ));
        }

        if self.viewer.tick_ms == 0 {
            return Err(HeatmapError::Config("tick_ms must be > 0".to_string()));
        }

        Ok(())
    }

    /// Fingerprint of every parameter that affects frame pixels.
    ///
    /// Stored next to the frames so a changed canvas or colormap can be
    /// detected; frame file names do not carry it.
    pub fn render_fingerprint(&self) -> String {
        let mut hash = Fnv1a64::new();
        hash.write_u64(u64::from(self.canvas.width));
        hash.write_u64(u64::from(self.canvas.height));
        for v in [
            self.canvas.x_range.0,
            self.canvas.x_range.1,
            self.canvas.y_range.0,
            self.canvas.y_range.1,
        ] {
            hash.write_u64(v.to_bits());
        }
        match &self.shading.colormap {
            ColormapSpec::Named(name) => {
                hash.write_u8(0);
                hash.write_str(name);
            }
            ColormapSpec::Stops(stops) => {
                hash.write_u8(1);
                hash.write_u64(stops.len() as u64);
                for stop in stops {
                    hash.write_str(&stop.to_lowercase());
                }
            }
        }
        hash.write_u8(self.shading.min_alpha);
        hash.write_u64(u64::from(self.shading.spread_threshold.to_bits()));
        hash.write_u64(u64::from(self.shading.spread_max_px));
        format!("{:016x}", hash.finish())
    }
}

fn parse_dimension(key: &str, val: &str) -> HeatmapResult<u32> {
    val.trim()
        .parse()
        .map_err(|e| HeatmapError::Config(format!("{} must be a pixel count, got {:?}: {}", key, val, e)))
}

struct Fnv1a64(u64);

impl Fnv1a64 {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }

    fn write_u8(&mut self, byte: u8) {
        self.0 ^= u64::from(byte);
        self.0 = self.0.wrapping_mul(0x100000001b3);
    }

    fn write_u64(&mut self, v: u64) {
        for byte in v.to_le_bytes() {
            self.write_u8(byte);
        }
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        for byte in s.bytes() {
            self.write_u8(byte);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

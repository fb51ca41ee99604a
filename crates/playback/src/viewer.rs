//! Map viewer: the current frame over a basemap, repeated across the
//! antimeridian.

use std::path::PathBuf;
use std::sync::Arc;

use ais_common::{BoundingBox, HeatmapConfig, IntervalLabel};
use chrono::NaiveDateTime;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use projection::WORLD_WIDTH;
use rayon::prelude::*;
use renderer::hex_to_rgb;
use storage::{FrameEntry, FrameStore};
use tracing::{debug, info};

use crate::error::PlaybackError;
use crate::sequencer::{Direction, FrameSequencer};

/// Horizontal copies of the frame, in world widths.
const WORLD_COPIES: [f64; 3] = [-1.0, 0.0, 1.0];

/// The tile layer under the overlays. Tiles are fetched by whatever displays
/// the composite; rasterizing fills the background color only.
#[derive(Debug, Clone, PartialEq)]
pub struct Basemap {
    pub url_template: String,
    pub background: [u8; 3],
}

/// One placement of the frame image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    /// Projected bounds, already shifted by `x_offset`.
    pub bounds: BoundingBox,
    pub x_offset: f64,
    pub alpha: f32,
}

/// Everything needed to draw the current view.
#[derive(Debug, Clone)]
pub struct Composite {
    pub basemap: Basemap,
    /// Initial view extent.
    pub view: BoundingBox,
    pub timestamp: String,
    /// Current frame at canvas resolution, shared by every overlay.
    pub image: Option<Arc<RgbaImage>>,
    pub overlays: Vec<Overlay>,
}

impl Composite {
    /// Draw the composite for a projected viewport into a `width` x `height`
    /// image. Overlays are sampled nearest-neighbor and blended over the
    /// basemap background.
    pub fn rasterize(&self, viewport: &BoundingBox, width: u32, height: u32) -> Result<RgbaImage, PlaybackError> {
        if width == 0 || height == 0 || !viewport.is_valid() {
            return Err(PlaybackError::Viewport(format!(
                "{}x{} over {:?}",
                width, height, viewport
            )));
        }

        let [br, bg, bb] = self.basemap.background;
        let mut out = RgbaImage::from_pixel(width, height, Rgba([br, bg, bb, 255]));
        let Some(image) = self.image.as_deref() else {
            return Ok(out);
        };

        let px_w = viewport.width() / width as f64;
        let px_h = viewport.height() / height as f64;
        let row_len = width as usize * 4;

        out.par_chunks_mut(row_len).enumerate().for_each(|(py, row)| {
            let y = viewport.max_y - (py as f64 + 0.5) * px_h;
            for (px, dst) in row.chunks_exact_mut(4).enumerate() {
                let x = viewport.min_x + (px as f64 + 0.5) * px_w;
                for overlay in &self.overlays {
                    if let Some(src) = sample(image, &overlay.bounds, x, y) {
                        blend(dst, src, overlay.alpha);
                    }
                }
            }
        });

        Ok(out)
    }
}

/// Pixel of `image` stretched over `bounds` at projected `(x, y)`.
fn sample<'a>(image: &'a RgbaImage, bounds: &BoundingBox, x: f64, y: f64) -> Option<&'a Rgba<u8>> {
    if x < bounds.min_x || x >= bounds.max_x || y <= bounds.min_y || y > bounds.max_y {
        return None;
    }
    let (w, h) = image.dimensions();
    let sx = (((x - bounds.min_x) / bounds.width()) * w as f64) as u32;
    let sy = (((bounds.max_y - y) / bounds.height()) * h as f64) as u32;
    Some(image.get_pixel(sx.min(w - 1), sy.min(h - 1)))
}

/// Straight-alpha "over" onto an opaque destination.
fn blend(dst: &mut [u8], src: &Rgba<u8>, opacity: f32) {
    let a = src.0[3] as f32 / 255.0 * opacity;
    if a <= 0.0 {
        return;
    }
    for c in 0..3 {
        dst[c] = (src.0[c] as f32 * a + dst[c] as f32 * (1.0 - a)).round() as u8;
    }
}

/// Playback state plus the composite of the current frame.
pub struct MapViewer {
    config: Arc<HeatmapConfig>,
    sequencer: FrameSequencer,
    playing: bool,
    decoded: Option<(PathBuf, Arc<RgbaImage>)>,
}

impl MapViewer {
    /// A viewer over the configured frame store. The sequence starts loaded.
    pub fn new(config: Arc<HeatmapConfig>, interval: IntervalLabel) -> Result<Self, PlaybackError> {
        let store = FrameStore::from_config(&config.output);
        let mut viewer = Self {
            config,
            sequencer: FrameSequencer::new(store, interval),
            playing: false,
            decoded: None,
        };
        viewer.sequencer.reload()?;
        Ok(viewer)
    }

    pub fn sequencer(&self) -> &FrameSequencer {
        &self.sequencer
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current(&self) -> Option<&FrameEntry> {
        self.sequencer.current()
    }

    pub fn timestamp_label(&self) -> String {
        self.sequencer.timestamp_label()
    }

    pub fn reload(&mut self) -> Result<usize, PlaybackError> {
        self.sequencer.reload()
    }

    pub fn set_interval(&mut self, interval: IntervalLabel) -> Result<usize, PlaybackError> {
        self.sequencer.set_interval(interval)
    }

    pub fn set_bounds(
        &mut self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<usize, PlaybackError> {
        self.sequencer.set_bounds(start, end)
    }

    /// Point the viewer at a finished render's interval and range.
    pub fn show_range(
        &mut self,
        interval: IntervalLabel,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<usize, PlaybackError> {
        self.sequencer.retarget(interval, Some(start), Some(end))
    }

    /// Manual step. Always stops auto-play.
    pub fn step(&mut self, direction: Direction) -> Option<&FrameEntry> {
        self.playing = false;
        self.sequencer.step(direction)
    }

    /// Timer tick: advance if playing. Returns whether the frame changed.
    pub fn tick(&mut self) -> bool {
        if !self.playing || self.sequencer.is_empty() {
            return false;
        }
        self.sequencer.advance();
        true
    }

    /// Reload, then start playing unless the sequence is empty. Returns
    /// whether playback is running.
    pub fn play(&mut self) -> Result<bool, PlaybackError> {
        let frames = self.sequencer.reload()?;
        self.playing = frames > 0;
        info!(interval = %self.sequencer.interval(), frames, playing = self.playing, "Play requested");
        Ok(self.playing)
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// The configured projected extent.
    pub fn initial_view(&self) -> BoundingBox {
        self.config.canvas.extent()
    }

    /// Compose the current frame over the basemap.
    pub fn render_current(&mut self) -> Result<Composite, PlaybackError> {
        let viewer = &self.config.viewer;
        let background = hex_to_rgb(&viewer.background)
            .ok_or_else(|| PlaybackError::Background(viewer.background.clone()))?;
        let basemap = Basemap {
            url_template: viewer.basemap_url.clone(),
            background: [background.0, background.1, background.2],
        };
        let extent = self.config.canvas.extent();
        let alpha = viewer.overlay_alpha;

        let image = self.current_image()?;
        let overlays = match image {
            Some(_) => WORLD_COPIES
                .iter()
                .map(|k| {
                    let x_offset = k * WORLD_WIDTH;
                    Overlay {
                        bounds: extent.translate_x(x_offset),
                        x_offset,
                        alpha,
                    }
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(Composite {
            basemap,
            view: extent,
            timestamp: self.timestamp_label(),
            image,
            overlays,
        })
    }

    /// Decoded current frame at canvas size, cached per path.
    fn current_image(&mut self) -> Result<Option<Arc<RgbaImage>>, PlaybackError> {
        let Some(frame) = self.sequencer.current() else {
            return Ok(None);
        };
        if let Some((path, image)) = &self.decoded {
            if *path == frame.path {
                return Ok(Some(image.clone()));
            }
        }

        let path = frame.path.clone();
        let bytes = self.sequencer.store().read(&path)?;
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .map_err(|source| PlaybackError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgba8();

        let (w, h) = (self.config.canvas.width, self.config.canvas.height);
        let image = if decoded.dimensions() == (w, h) {
            decoded
        } else {
            debug!(path = %path.display(), from = ?decoded.dimensions(), to = ?(w, h), "Resizing frame");
            imageops::resize(&decoded, w, h, FilterType::Lanczos3)
        };

        let image = Arc::new(image);
        self.decoded = Some((path, image.clone()));
        Ok(Some(image))
    }
}

//! The aggregation engine: one time window in, one shaded frame out.

use std::path::Path;
use std::sync::Arc;

use ais_common::{HeatmapConfig, TimeWindow};
use image::RgbaImage;
use projection::project_points;
use renderer::{dynspread, Shader};
use storage::{HourLoad, PartitionError, PointSource};
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::grid::DensityGrid;

/// Per-hour outcome reported while a window is aggregated.
#[derive(Debug)]
pub enum AggregationEvent<'a> {
    HourMissing { path: &'a Path },
    HourFailed { path: &'a Path, error: &'a PartitionError },
    HourLoaded { path: &'a Path, rows: usize },
}

/// Result of aggregating one window.
#[derive(Debug)]
pub enum WindowAggregate {
    /// No hour contributed any rows. Nothing should be written.
    NoData,
    Rendered {
        image: RgbaImage,
        /// Rows read across all loaded partitions, in or out of the extent.
        rows: u64,
    },
}

/// Aggregates windows of points read from a `PointSource`.
pub struct AggregationEngine<S> {
    config: Arc<HeatmapConfig>,
    source: S,
    shader: Shader,
}

impl<S: PointSource> AggregationEngine<S> {
    /// Build an engine for `config`. Fails if the configured colormap does
    /// not resolve.
    pub fn new(config: Arc<HeatmapConfig>, source: S) -> Result<Self> {
        let shader = Shader::from_config(&config.shading)?;
        Ok(Self {
            config,
            source,
            shader,
        })
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load and bin every hour of `window` into a fresh grid.
    ///
    /// Returns the grid and the number of rows loaded. Missing and
    /// unreadable partitions are reported through `on_event` and skipped;
    /// only a source-level failure is returned as an error.
    pub fn accumulate(
        &self,
        window: &TimeWindow,
        on_event: &mut dyn FnMut(AggregationEvent<'_>),
    ) -> Result<(DensityGrid, u64)> {
        let mut grid = DensityGrid::for_canvas(&self.config.canvas);
        let mut rows = 0u64;

        for hour in window.hours() {
            match self.source.load_hour(hour)? {
                HourLoad::Missing { path } => {
                    on_event(AggregationEvent::HourMissing { path: &path });
                }
                HourLoad::Failed { path, error } => {
                    warn!(path = %path.display(), error = %error, "Skipping unreadable partition");
                    on_event(AggregationEvent::HourFailed {
                        path: &path,
                        error: &error,
                    });
                }
                HourLoad::Loaded { path, batch } => {
                    if !batch.is_empty() {
                        let (xs, ys) = project_points(&batch.lon, &batch.lat);
                        let binned = grid.accumulate(&xs, &ys);
                        debug!(path = %path.display(), rows = batch.len(), binned, "Binned partition");
                        rows += batch.len() as u64;
                    }
                    on_event(AggregationEvent::HourLoaded {
                        path: &path,
                        rows: batch.len(),
                    });
                }
            }
        }

        Ok((grid, rows))
    }

    /// Aggregate `window` and shade it into a frame image.
    #[instrument(skip(self, on_event), fields(start = %window.start, end = %window.end))]
    pub fn aggregate(
        &self,
        window: &TimeWindow,
        on_event: &mut dyn FnMut(AggregationEvent<'_>),
    ) -> Result<WindowAggregate> {
        let (grid, rows) = self.accumulate(window, on_event)?;
        if rows == 0 {
            debug!("No rows in window");
            return Ok(WindowAggregate::NoData);
        }

        let image = self.shade(&grid)?;
        debug!(rows, cells = grid.nonzero(), "Window aggregated");
        Ok(WindowAggregate::Rendered { image, rows })
    }

    /// Eq-hist shading followed by dynamic spreading.
    pub fn shade(&self, grid: &DensityGrid) -> Result<RgbaImage> {
        let shaded = self.shader.shade(grid.counts(), grid.width(), grid.height())?;
        let shading = &self.config.shading;
        Ok(dynspread(shaded, shading.spread_threshold, shading.spread_max_px))
    }
}

//! Date-range frame rendering.

use std::sync::Arc;

use ais_common::{HeatmapConfig, HeatmapResult, IntervalLabel, TimeWindow, WindowPlan};
use chrono::NaiveDateTime;
use grid_processor::{AggregationEngine, AggregationEvent, WindowAggregate};
use renderer::encode_png;
use storage::{frame_file_name, FilesystemSource, FrameStore, ManifestCheck, PointSource, RenderManifest};
use tracing::{info, warn};

use crate::events::{RenderObserver, RenderPhase, StatusEvent};

/// Percent of `total` windows done after `done`, rounded to nearest.
///
/// Never 100 while windows remain.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 || done >= total {
        return 100;
    }
    let percent = ((done as f64 * 100.0) / total as f64).round() as u8;
    percent.min(99)
}

/// Renders every window of a date range into the frame store.
pub struct Renderer<S> {
    config: Arc<HeatmapConfig>,
    store: FrameStore,
    engine: AggregationEngine<S>,
}

impl Renderer<FilesystemSource> {
    /// Renderer reading partitions from the configured source directory.
    pub fn from_config(config: Arc<HeatmapConfig>) -> HeatmapResult<Self> {
        let source = FilesystemSource::from_config(&config.source);
        Self::new(config, source)
    }
}

impl<S: PointSource> Renderer<S> {
    pub fn new(config: Arc<HeatmapConfig>, source: S) -> HeatmapResult<Self> {
        let store = FrameStore::from_config(&config.output);
        let engine = AggregationEngine::new(config.clone(), source)?;
        Ok(Self {
            config,
            store,
            engine,
        })
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    /// Render the frames of `[start, end]` for `interval`.
    ///
    /// Frames already on disk are skipped, windows without rows produce no
    /// file. Returns the number of frames written. The interval label is
    /// validated before anything is read. Progress is reported once per
    /// window; an empty range reports nothing and returns 0.
    pub fn render(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: &str,
        observer: &mut dyn RenderObserver,
    ) -> HeatmapResult<usize> {
        let interval: IntervalLabel = interval.parse()?;
        let plan = WindowPlan::new(start, end, interval);

        observer.phase(RenderPhase::Running);
        info!(%start, %end, %interval, windows = plan.len(), "Render started");

        match self.render_plan(&plan, observer) {
            Ok(produced) => {
                info!(%interval, produced, "Render finished");
                observer.phase(RenderPhase::Completed { produced });
                Ok(produced)
            }
            Err(e) => {
                warn!(%interval, error = %e, "Render aborted");
                observer.phase(RenderPhase::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn render_plan(&self, plan: &WindowPlan, observer: &mut dyn RenderObserver) -> HeatmapResult<usize> {
        let total = plan.len();
        if total == 0 {
            return Ok(0);
        }

        let mut manifest_present = self.check_manifest(plan.interval, observer);
        let mut produced = 0;

        for (i, window) in plan.windows().enumerate() {
            let file = frame_file_name(window.start);
            if self.store.exists(plan.interval, window.start) {
                observer.status(StatusEvent::Skipped { file });
            } else if self.render_window(plan.interval, &window, file, observer)? {
                produced += 1;
                if !manifest_present {
                    self.store
                        .write_manifest(plan.interval, &RenderManifest::for_config(&self.config))?;
                    manifest_present = true;
                }
            }
            observer.progress(progress_percent(i + 1, total));
        }

        Ok(produced)
    }

    /// Aggregate and persist one window. Returns whether a frame was written.
    fn render_window(
        &self,
        interval: IntervalLabel,
        window: &TimeWindow,
        file: String,
        observer: &mut dyn RenderObserver,
    ) -> HeatmapResult<bool> {
        observer.status(StatusEvent::Processing {
            start: window.start,
            end: window.end,
        });

        let outcome = self.engine.aggregate(window, &mut |event| match event {
            AggregationEvent::HourMissing { path } => observer.status(StatusEvent::Missing {
                path: path.to_path_buf(),
            }),
            AggregationEvent::HourFailed { path, error } => observer.status(StatusEvent::Failed {
                path: path.to_path_buf(),
                error: error.to_string(),
            }),
            AggregationEvent::HourLoaded { .. } => {}
        })?;

        match outcome {
            WindowAggregate::NoData => {
                observer.status(StatusEvent::NoData { file });
                Ok(false)
            }
            WindowAggregate::Rendered { image, rows } => {
                let png = encode_png(&image)?;
                self.store.write(interval, window.start, &png)?;
                observer.status(StatusEvent::Saved { file, rows });
                Ok(true)
            }
        }
    }

    /// Reports a stale manifest. Returns whether a manifest is already on
    /// disk; an unreadable one counts as present and is left alone.
    fn check_manifest(&self, interval: IntervalLabel, observer: &mut dyn RenderObserver) -> bool {
        match self.store.check_manifest(interval, &self.config) {
            Ok(ManifestCheck::Absent) => false,
            Ok(ManifestCheck::Matches) => true,
            Ok(ManifestCheck::Stale { recorded, current }) => {
                observer.status(StatusEvent::StaleFrames { recorded, current });
                true
            }
            Err(e) => {
                warn!(%interval, error = %e, "Ignoring unreadable render manifest");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_rounds_to_nearest() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn test_progress_holds_below_100_until_done() {
        assert_eq!(progress_percent(200, 201), 99);
        assert_eq!(progress_percent(999, 1000), 99);
        assert_eq!(progress_percent(201, 201), 100);
    }
}

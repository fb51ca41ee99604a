//! Ordered frame list for one interval.

use ais_common::IntervalLabel;
use chrono::NaiveDateTime;
use storage::{FrameEntry, FrameStore};
use tracing::debug;

use crate::error::PlaybackError;

/// Label shown when there is nothing to play.
pub const NO_FRAME_LABEL: &str = "No frame loaded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Frames of one interval, filtered to an optional inclusive date range,
/// with a wrapping cursor.
#[derive(Debug, Clone)]
pub struct FrameSequencer {
    store: FrameStore,
    interval: IntervalLabel,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    frames: Vec<FrameEntry>,
    index: usize,
}

impl FrameSequencer {
    /// An empty sequencer; call `reload` to read the store.
    pub fn new(store: FrameStore, interval: IntervalLabel) -> Self {
        Self {
            store,
            interval,
            start: None,
            end: None,
            frames: Vec::new(),
            index: 0,
        }
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn interval(&self) -> IntervalLabel {
        self.interval
    }

    pub fn bounds(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        (self.start, self.end)
    }

    pub fn frames(&self) -> &[FrameEntry] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Re-read the store, apply the bounds and rewind. Returns the number of
    /// frames in the sequence.
    pub fn reload(&mut self) -> Result<usize, PlaybackError> {
        let (start, end) = (self.start, self.end);
        self.frames = self
            .store
            .list(self.interval)?
            .into_iter()
            .filter(|f| start.map_or(true, |s| f.timestamp >= s) && end.map_or(true, |e| f.timestamp <= e))
            .collect();
        self.index = 0;
        debug!(interval = %self.interval, frames = self.frames.len(), "Sequence reloaded");
        Ok(self.frames.len())
    }

    pub fn set_interval(&mut self, interval: IntervalLabel) -> Result<usize, PlaybackError> {
        self.interval = interval;
        self.reload()
    }

    pub fn set_bounds(
        &mut self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<usize, PlaybackError> {
        self.start = start;
        self.end = end;
        self.reload()
    }

    /// Switch interval and bounds together, reloading once.
    pub fn retarget(
        &mut self,
        interval: IntervalLabel,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<usize, PlaybackError> {
        self.interval = interval;
        self.start = start;
        self.end = end;
        self.reload()
    }

    /// Move one frame, wrapping at either end. No-op on an empty sequence.
    pub fn step(&mut self, direction: Direction) -> Option<&FrameEntry> {
        let len = self.frames.len();
        if len == 0 {
            return None;
        }
        self.index = match direction {
            Direction::Forward => (self.index + 1) % len,
            Direction::Backward => (self.index + len - 1) % len,
        };
        self.frames.get(self.index)
    }

    pub fn advance(&mut self) -> Option<&FrameEntry> {
        self.step(Direction::Forward)
    }

    pub fn current(&self) -> Option<&FrameEntry> {
        self.frames.get(self.index)
    }

    /// Date of the current frame, or `NO_FRAME_LABEL`.
    pub fn timestamp_label(&self) -> String {
        match self.current() {
            Some(frame) => frame.timestamp.format("%Y-%m-%d").to_string(),
            None => NO_FRAME_LABEL.to_string(),
        }
    }
}

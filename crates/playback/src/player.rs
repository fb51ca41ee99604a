//! Timed auto-play on top of a `MapViewer`.

use std::sync::Arc;
use std::time::Duration;

use storage::FrameEntry;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::error::PlaybackError;
use crate::sequencer::Direction;
use crate::viewer::MapViewer;

/// Snapshot of the viewer published after every frame change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameState {
    pub index: usize,
    pub len: usize,
    pub frame: Option<FrameEntry>,
    pub label: String,
    pub playing: bool,
}

impl FrameState {
    fn of(viewer: &MapViewer) -> Self {
        let seq = viewer.sequencer();
        Self {
            index: seq.index(),
            len: seq.len(),
            frame: seq.current().cloned(),
            label: seq.timestamp_label(),
            playing: viewer.is_playing(),
        }
    }
}

/// Drives a shared `MapViewer` from a tokio interval.
///
/// The viewer's playing flag and cursor sit behind one mutex; the timer task
/// re-checks the flag under that lock on every tick, so no advance can land
/// after `pause` returns.
pub struct PlaybackController {
    viewer: Arc<Mutex<MapViewer>>,
    tick: Duration,
    state: Arc<watch::Sender<FrameState>>,
    timer: Option<JoinHandle<()>>,
}

impl PlaybackController {
    pub fn new(viewer: MapViewer, tick: Duration) -> Self {
        let (state, _) = watch::channel(FrameState::of(&viewer));
        Self {
            viewer: Arc::new(Mutex::new(viewer)),
            tick,
            state: Arc::new(state),
            timer: None,
        }
    }

    pub fn viewer(&self) -> Arc<Mutex<MapViewer>> {
        self.viewer.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FrameState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FrameState {
        self.state.borrow().clone()
    }

    /// Reload and start the timer. Returns `false`, without a timer, when
    /// there is nothing to play.
    pub async fn play(&mut self) -> Result<bool, PlaybackError> {
        let mut viewer = self.viewer.lock().await;
        let playing = viewer.play()?;
        self.state.send_replace(FrameState::of(&viewer));
        drop(viewer);

        if playing && self.timer.as_ref().map_or(true, |t| t.is_finished()) {
            self.timer = Some(self.spawn_timer());
        }
        Ok(playing)
    }

    pub async fn pause(&mut self) {
        let mut viewer = self.viewer.lock().await;
        viewer.pause();
        self.state.send_replace(FrameState::of(&viewer));
        drop(viewer);
        self.stop_timer();
    }

    /// Manual step; stops auto-play.
    pub async fn step(&mut self, direction: Direction) {
        let mut viewer = self.viewer.lock().await;
        viewer.step(direction);
        self.state.send_replace(FrameState::of(&viewer));
        drop(viewer);
        self.stop_timer();
    }

    pub async fn reload(&mut self) -> Result<usize, PlaybackError> {
        let mut viewer = self.viewer.lock().await;
        let frames = viewer.reload()?;
        self.state.send_replace(FrameState::of(&viewer));
        Ok(frames)
    }

    fn spawn_timer(&self) -> JoinHandle<()> {
        let viewer = self.viewer.clone();
        let state = self.state.clone();
        let period = self.tick;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let mut viewer = viewer.lock().await;
                if !viewer.is_playing() {
                    debug!("Auto-play stopped");
                    break;
                }
                if viewer.tick() {
                    state.send_replace(FrameState::of(&viewer));
                }
            }
        })
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

//! Background render worker.
//!
//! One render at a time runs on a dedicated OS thread. Observer callbacks are
//! forwarded over an unbounded tokio channel so a UI task can consume them
//! without blocking the renderer.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ais_common::{HeatmapError, HeatmapResult};
use chrono::NaiveDateTime;
use storage::PointSource;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::events::{RenderEvent, RenderObserver, RenderPhase, StatusEvent};
use crate::renderer::Renderer;

/// Forwards observer callbacks into a channel. Sends after the receiver is
/// gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RenderEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<RenderEvent>) -> Self {
        Self { tx }
    }
}

impl RenderObserver for ChannelObserver {
    fn status(&mut self, event: StatusEvent) {
        let _ = self.tx.send(RenderEvent::Status(event));
    }

    fn progress(&mut self, percent: u8) {
        let _ = self.tx.send(RenderEvent::Progress(percent));
    }

    fn phase(&mut self, phase: RenderPhase) {
        let _ = self.tx.send(RenderEvent::Phase(phase));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub interval: String,
}

/// Clears the busy flag when the render thread ends, panicking or not.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs renders off the caller's thread, refusing overlapping requests.
pub struct RenderWorker<S> {
    renderer: Arc<Renderer<S>>,
    busy: Arc<AtomicBool>,
}

impl<S> Clone for RenderWorker<S> {
    fn clone(&self) -> Self {
        Self {
            renderer: self.renderer.clone(),
            busy: self.busy.clone(),
        }
    }
}

impl<S: PointSource + 'static> RenderWorker<S> {
    pub fn new(renderer: Renderer<S>) -> Self {
        Self {
            renderer: Arc::new(renderer),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn renderer(&self) -> &Renderer<S> {
        &self.renderer
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a render in the background.
    ///
    /// Fails with `RenderInProgress` while another render started by this
    /// worker (or a clone of it) is still running.
    pub fn spawn(&self, request: RenderRequest) -> HeatmapResult<RenderHandle> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(HeatmapError::RenderInProgress);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let renderer = self.renderer.clone();
        let busy = self.busy.clone();

        let spawned = std::thread::Builder::new()
            .name("ais-render".to_string())
            .spawn(move || {
                let mut observer = ChannelObserver::new(tx);
                // dropped before the observer, so the flag is clear once the
                // channel closes
                let _guard = BusyGuard(busy);
                debug!(?request, "Render thread started");
                renderer.render(request.start, request.end, &request.interval, &mut observer)
            });

        match spawned {
            Ok(join) => Ok(RenderHandle { events: rx, join }),
            Err(e) => {
                self.busy.store(false, Ordering::Release);
                Err(HeatmapError::WorkerPanicked(format!("failed to spawn render thread: {}", e)))
            }
        }
    }
}

/// A running render: its event stream and its result.
pub struct RenderHandle {
    events: mpsc::UnboundedReceiver<RenderEvent>,
    join: JoinHandle<HeatmapResult<usize>>,
}

impl RenderHandle {
    /// Next observer event; `None` once the render thread has finished and
    /// every event was received.
    pub async fn next_event(&mut self) -> Option<RenderEvent> {
        self.events.recv().await
    }

    /// Wait for the render thread and return its result. Events not yet
    /// received are discarded.
    pub fn join(self) -> HeatmapResult<usize> {
        match self.join.join() {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "Render thread panicked");
                Err(HeatmapError::WorkerPanicked(message))
            }
        }
    }

    /// Feed every event to `on_event`, then return the render result.
    pub async fn finish(mut self, mut on_event: impl FnMut(RenderEvent)) -> HeatmapResult<usize> {
        while let Some(event) = self.events.recv().await {
            on_event(event);
        }
        tokio::task::spawn_blocking(move || self.join())
            .await
            .map_err(|e| HeatmapError::WorkerPanicked(e.to_string()))?
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Status, progress and phase reporting.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;

/// A user-facing status line emitted while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The frame is already on disk.
    Skipped { file: String },
    Processing { start: NaiveDateTime, end: NaiveDateTime },
    /// No partition for an hour.
    Missing { path: PathBuf },
    /// A partition exists but could not be read.
    Failed { path: PathBuf, error: String },
    Saved { file: String, rows: u64 },
    NoData { file: String },
    /// The interval directory was rendered with other parameters.
    StaleFrames { recorded: String, current: String },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Skipped { file } => write!(f, "Skipped existing: {}", file),
            StatusEvent::Processing { start, end } => write!(f, "Processing: {} → {}", start, end),
            StatusEvent::Missing { path } => write!(f, "Missing: {}", path.display()),
            StatusEvent::Failed { path, error } => write!(f, "Failed on {}: {}", path.display(), error),
            StatusEvent::Saved { file, rows } => write!(f, "Saved: {} (rows: {})", file, rows),
            StatusEvent::NoData { file } => write!(f, "No data found for interval: {}", file),
            StatusEvent::StaleFrames { recorded, current } => write!(
                f,
                "Warning: existing frames were rendered with different parameters (recorded {}, current {})",
                recorded, current
            ),
        }
    }
}

/// Lifecycle of one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPhase {
    Running,
    Completed { produced: usize },
    Failed { error: String },
}

/// Receives render callbacks, synchronously, on the rendering thread.
pub trait RenderObserver {
    fn status(&mut self, _event: StatusEvent) {}

    /// Percent of windows processed, `0..=100`.
    fn progress(&mut self, _percent: u8) {}

    fn phase(&mut self, _phase: RenderPhase) {}
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RenderObserver for NoopObserver {}

/// Observer built from a status closure and a progress closure.
pub struct FnObserver<S, P> {
    on_status: S,
    on_progress: P,
}

impl<S, P> FnObserver<S, P>
where
    S: FnMut(StatusEvent),
    P: FnMut(u8),
{
    pub fn new(on_status: S, on_progress: P) -> Self {
        Self {
            on_status,
            on_progress,
        }
    }
}

impl<S, P> RenderObserver for FnObserver<S, P>
where
    S: FnMut(StatusEvent),
    P: FnMut(u8),
{
    fn status(&mut self, event: StatusEvent) {
        (self.on_status)(event)
    }

    fn progress(&mut self, percent: u8) {
        (self.on_progress)(percent)
    }
}

/// One observer callback, as sent across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Status(StatusEvent),
    Progress(u8),
    Phase(RenderPhase),
}

/// Records every callback in order.
#[derive(Debug, Default, Clone)]
pub struct StatusLog {
    pub events: Vec<RenderEvent>,
}

impl StatusLog {
    pub fn statuses(&self) -> impl Iterator<Item = &StatusEvent> {
        self.events.iter().filter_map(|e| match e {
            RenderEvent::Status(s) => Some(s),
            _ => None,
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.statuses().map(|s| s.to_string()).collect()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn phases(&self) -> Vec<RenderPhase> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Phase(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RenderObserver for StatusLog {
    fn status(&mut self, event: StatusEvent) {
        self.events.push(RenderEvent::Status(event));
    }

    fn progress(&mut self, percent: u8) {
        self.events.push(RenderEvent::Progress(percent));
    }

    fn phase(&mut self, phase: RenderPhase) {
        self.events.push(RenderEvent::Phase(phase));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_status_messages() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let cases = [
            (
                StatusEvent::Skipped { file: "ais_2024-01-01_00-00.png".into() },
                "Skipped existing: ais_2024-01-01_00-00.png",
            ),
            (
                StatusEvent::Processing { start, end },
                "Processing: 2024-01-01 00:00:00 → 2024-01-02 00:00:00",
            ),
            (
                StatusEvent::Missing { path: "/d/x.csv".into() },
                "Missing: /d/x.csv",
            ),
            (
                StatusEvent::Failed { path: "/d/x.csv".into(), error: "boom".into() },
                "Failed on /d/x.csv: boom",
            ),
            (
                StatusEvent::Saved { file: "a.png".into(), rows: 12 },
                "Saved: a.png (rows: 12)",
            ),
            (
                StatusEvent::NoData { file: "a.png".into() },
                "No data found for interval: a.png",
            ),
        ];
        for (event, text) in cases {
            assert_eq!(event.to_string(), text);
        }
    }

    #[test]
    fn test_fn_observer_forwards() {
        let mut messages = Vec::new();
        let mut percents = Vec::new();
        {
            let mut obs = FnObserver::new(|e: StatusEvent| messages.push(e.to_string()), |p| percents.push(p));
            obs.status(StatusEvent::NoData { file: "f".into() });
            obs.progress(50);
            obs.phase(RenderPhase::Running);
        }
        assert_eq!(messages, vec!["No data found for interval: f"]);
        assert_eq!(percents, vec![50]);
    }
}

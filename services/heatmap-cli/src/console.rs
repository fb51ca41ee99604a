//! Timestamped status lines for the terminal.

use std::io::Write;

use chrono::{Local, NaiveTime};
use frame_pipeline::{RenderEvent, RenderPhase, StatusEvent};

pub const COMPLETE_MESSAGE: &str = "Complete visualization generated.";

/// `HH:MM:SS message`
pub fn status_line(at: NaiveTime, message: &str) -> String {
    format!("{} {}", at.format("%H:%M:%S"), message)
}

/// Prints render events as they arrive.
///
/// Per-window status is only shown with `verbose`; warnings and the final
/// outcome are always shown.
pub struct Console {
    verbose: bool,
    last_progress: Option<u8>,
}

impl Console {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            last_progress: None,
        }
    }

    pub fn say(&self, message: &str) {
        println!("{}", status_line(Local::now().time(), message));
    }

    fn shows(&self, event: &StatusEvent) -> bool {
        self.verbose || matches!(event, StatusEvent::StaleFrames { .. })
    }

    pub fn on_event(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::Status(status) => {
                if self.shows(&status) {
                    self.clear_progress();
                    self.say(&status.to_string());
                }
            }
            RenderEvent::Progress(percent) => {
                if !self.verbose {
                    eprint!("\rProgress: {:>3}%", percent);
                    let _ = std::io::stderr().flush();
                }
                self.last_progress = Some(percent);
            }
            RenderEvent::Phase(RenderPhase::Running) => self.last_progress = None,
            RenderEvent::Phase(_) => self.clear_progress(),
        }
    }

    fn clear_progress(&mut self) {
        if !self.verbose && self.last_progress.take().is_some() {
            eprintln!();
        }
    }
}

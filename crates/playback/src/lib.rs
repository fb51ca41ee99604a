//! Playback of rendered frames.
//!
//! ```text
//!   FrameStore ──list──▶ FrameSequencer ──current──▶ MapViewer ──▶ Composite
//!                                                       ▲              │
//!                               PlaybackController ─tick┘         rasterize()
//! ```

pub mod error;
pub mod player;
pub mod sequencer;
pub mod viewer;

pub use error::PlaybackError;
pub use player::{FrameState, PlaybackController};
pub use sequencer::{Direction, FrameSequencer, NO_FRAME_LABEL};
pub use viewer::{Basemap, Composite, MapViewer, Overlay};

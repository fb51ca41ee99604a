//! Frame rendering over a date range.
//!
//! `Renderer` walks the windows of a date range, skips frames already on
//! disk, aggregates the rest and writes them to the frame store, reporting
//! status and progress to a `RenderObserver`. `RenderWorker` runs renders on
//! a dedicated thread and forwards observer calls over a channel.

pub mod events;
pub mod renderer;
pub mod worker;

pub use events::{FnObserver, NoopObserver, RenderEvent, RenderObserver, RenderPhase, StatusEvent, StatusLog};
pub use renderer::{progress_percent, Renderer};
pub use worker::{ChannelObserver, RenderHandle, RenderRequest, RenderWorker};

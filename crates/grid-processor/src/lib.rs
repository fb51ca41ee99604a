//! Window aggregation for AIS traffic frames.
//!
//! For one time window the engine walks every hour, loads that hour's
//! partition, projects the points to Web Mercator and bins them into a
//! density grid shared by all hours of the window. The finished grid is
//! shaded into a frame image.
//!
//! # Architecture
//!
//! ```text
//! TimeWindow
//!      │
//!      ▼
//! AggregationEngine::aggregate(window)
//!      │
//!      ├─► for each hour: PointSource::load_hour
//!      │         │
//!      │         ├─► Missing / Failed: report event, continue
//!      │         │
//!      │         └─► Loaded: project → DensityGrid::accumulate
//!      │
//!      └─► rows > 0 ? shade + dynspread : NoData
//!               │
//!               ▼
//!          WindowAggregate
//! ```

pub mod engine;
pub mod error;
pub mod grid;

pub use engine::{AggregationEngine, AggregationEvent, WindowAggregate};
pub use error::{AggregationError, Result};
pub use grid::DensityGrid;

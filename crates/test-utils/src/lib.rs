//! Shared test utilities for the AIS heatmap workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Temporary workspaces with a source tree and a frame root
//! - Partition and frame writers
//! - Directory snapshots for idempotence checks
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{TestWorkspace, write_partition};
//! ```

pub mod fixtures;
pub mod paths;

pub use fixtures::*;
pub use paths::*;

/// Assert two numbers are within `epsilon` of each other, comparing as `f64`.
///
/// ```ignore
/// assert_approx_eq!(overlay.alpha, 0.75, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "assertion failed: {} ≈ {} (diff {} > {})",
            left,
            right,
            diff,
            epsilon
        );
    }};
}

//! Colorization of density grids into frame images.
//!
//! Implements the frame look:
//! - Colormaps (built-in ramps and hex stops)
//! - Histogram-equalized shading
//! - Dynamic spreading of sparse pixels
//! - PNG encoding (indexed when possible)

pub mod colormap;
pub mod error;
pub mod png;
pub mod shade;
pub mod spread;

pub use colormap::{hex_to_rgb, Colormap};
pub use error::RenderError;
pub use png::encode_png;
pub use shade::{shade_eq_hist, Shader};
pub use spread::{dynspread, neighbor_density, spread};

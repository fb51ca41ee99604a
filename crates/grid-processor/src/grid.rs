//! Density grid over a fixed projected extent.

use ais_common::{BoundingBox, CanvasConfig};
use rayon::prelude::*;


/// Batches at least this long compute their cell indices in parallel.
const PARALLEL_THRESHOLD: usize = 32_768;

/// Row-major point counts, row 0 at the top (`max_y`) edge.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    width: u32,
    height: u32,
    extent: BoundingBox,
    counts: Vec<u32>,
}

impl DensityGrid {
    pub fn new(width: u32, height: u32, extent: BoundingBox) -> Self {
        Self {
            width,
            height,
            extent,
            counts: vec![0; width as usize * height as usize],
        }
    }

    pub fn for_canvas(canvas: &CanvasConfig) -> Self {
        Self::new(canvas.width, canvas.height, canvas.extent())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn extent(&self) -> &BoundingBox {
        &self.extent
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn get(&self, col: u32, row: u32) -> u32 {
        self.counts[row as usize * self.width as usize + col as usize]
    }

    /// Sum of all cells.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Number of non-empty cells.
    pub fn nonzero(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Cell index of a projected point, if it falls inside the extent.
    ///
    /// Both edges are inclusive; points on `max_x` / `min_y` land in the last
    /// column / bottom row.
    #[inline]
    fn cell_of(&self, x: f64, y: f64) -> Option<usize> {
        let e = &self.extent;
        if !e.contains_point(x, y) {
            return None;
        }
        let col = ((x - e.min_x) * self.width as f64 / e.width()) as u32;
        let from_bottom = ((y - e.min_y) * self.height as f64 / e.height()) as u32;
        let col = col.min(self.width - 1);
        let row = self.height - 1 - from_bottom.min(self.height - 1);
        Some(row as usize * self.width as usize + col as usize)
    }

    /// Add projected points to the grid. Returns how many were binned;
    /// points outside the extent or non-finite are ignored.
    pub fn accumulate(&mut self, xs: &[f32], ys: &[f32]) -> usize {
        let n = xs.len().min(ys.len());
        let (xs, ys) = (&xs[..n], &ys[..n]);

        let cells: Vec<usize> = if n >= PARALLEL_THRESHOLD {
            xs.par_iter()
                .zip(ys.par_iter())
                .filter_map(|(&x, &y)| self.cell_of(x as f64, y as f64))
                .collect()
        } else {
            xs.iter()
                .zip(ys)
                .filter_map(|(&x, &y)| self.cell_of(x as f64, y as f64))
                .collect()
        };

        for &cell in &cells {
            self.counts[cell] = self.counts[cell].saturating_add(1);
        }
        cells.len()
    }
}

//! Histogram-equalized shading of count grids.
//!
//! Each distinct nonzero count is placed by its rank in the cumulative
//! distribution of nonzero cells, so a handful of very busy cells (ports,
//! straits) cannot wash out the rest of the map. Empty cells stay fully
//! transparent. Alpha ramps from the configured minimum up to opaque along
//! the same equalized scale.

use std::collections::HashMap;

use ais_common::config::ShadingConfig;
use image::RgbaImage;
use rayon::prelude::*;
use tracing::trace;

use crate::colormap::{Colormap, LUT_SIZE};
use crate::error::RenderError;

/// Colormap plus alpha floor, ready to shade grids.
#[derive(Debug, Clone)]
pub struct Shader {
    lut: Vec<(u8, u8, u8)>,
    min_alpha: u8,
}

impl Shader {
    pub fn new(colormap: &Colormap, min_alpha: u8) -> Self {
        Self {
            lut: colormap.lut(),
            min_alpha,
        }
    }

    pub fn from_config(config: &ShadingConfig) -> Result<Self, RenderError> {
        let colormap = Colormap::from_spec(&config.colormap)?;
        Ok(Self::new(&colormap, config.min_alpha))
    }

    /// Shade a row-major grid (row 0 at the top) into an image.
    pub fn shade(&self, counts: &[u32], width: u32, height: u32) -> Result<RgbaImage, RenderError> {
        if counts.len() != width as usize * height as usize {
            return Err(RenderError::GridSize {
                len: counts.len(),
                width,
                height,
            });
        }

        let levels = equalized_levels(counts);
        trace!(distinct = levels.len(), "equalized count histogram");

        let mut image = RgbaImage::new(width, height);
        if levels.is_empty() {
            return Ok(image);
        }

        let keys: Vec<u32> = levels.iter().map(|(count, _)| *count).collect();
        let slots: Vec<usize> = levels
            .iter()
            .map(|(_, t)| (t * (LUT_SIZE - 1) as f32).round() as usize)
            .collect();

        let span = 255.0 - self.min_alpha as f32;
        image
            .par_chunks_mut(4)
            .zip(counts.par_iter())
            .filter(|(_, count)| **count > 0)
            .for_each(|(px, count)| {
                // every nonzero count has a level
                let slot = keys.binary_search(count).map(|i| slots[i]).unwrap_or(LUT_SIZE - 1);
                let (r, g, b) = self.lut[slot];
                let t = slot as f32 / (LUT_SIZE - 1) as f32;
                let a = (self.min_alpha as f32 + span * t).round() as u8;
                px.copy_from_slice(&[r, g, b, a]);
            });

        Ok(image)
    }
}

/// Shade with a one-off shader.
pub fn shade_eq_hist(
    counts: &[u32],
    width: u32,
    height: u32,
    colormap: &Colormap,
    min_alpha: u8,
) -> Result<RgbaImage, RenderError> {
    Shader::new(colormap, min_alpha).shade(counts, width, height)
}

/// Distinct nonzero counts in ascending order with their position in `[0, 1]`.
///
/// The lowest count maps to 0 and the highest to 1. A grid with a single
/// distinct value maps it to 1.
pub fn equalized_levels(counts: &[u32]) -> Vec<(u32, f32)> {
    let histogram = counts
        .par_iter()
        .filter(|&&c| c > 0)
        .fold(HashMap::new, |mut acc: HashMap<u32, u64>, &c| {
            *acc.entry(c).or_default() += 1;
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (k, v) in b {
                *a.entry(k).or_default() += v;
            }
            a
        });

    let mut distinct: Vec<(u32, u64)> = histogram.into_iter().collect();
    distinct.sort_unstable_by_key(|(count, _)| *count);

    match distinct.len() {
        0 => return Vec::new(),
        1 => return vec![(distinct[0].0, 1.0)],
        _ => {}
    }

    let total: u64 = distinct.iter().map(|(_, n)| n).sum();
    let first = distinct[0].1 as f64 / total as f64;
    let mut running = 0u64;
    distinct
        .into_iter()
        .map(|(count, n)| {
            running += n;
            let cdf = running as f64 / total as f64;
            (count, ((cdf - first) / (1.0 - first)) as f32)
        })
        .collect()
}

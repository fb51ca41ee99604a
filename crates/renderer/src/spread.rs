//! Dynamic spreading of sparse frames.
//!
//! Isolated lanes of single pixels are hard to see at full-globe scale.
//! `dynspread` grows every nonempty pixel into a disc, picking the largest
//! radius (up to a cap) that keeps the image from clumping.

use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

/// Spread every nonempty pixel into a disc of radius `px`.
///
/// Overlapping contributions are composited "over" in raster order of their
/// source pixels, the same order a scatter pass would apply them.
pub fn spread(image: &RgbaImage, px: u32) -> RgbaImage {
    if px == 0 {
        return image.clone();
    }

    let (width, height) = image.dimensions();
    let r = px as i64;
    let offsets: Vec<(i64, i64)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dy, dx)))
        .filter(|(dy, dx)| dx * dx + dy * dy <= r * r)
        .collect();

    let mut out = RgbaImage::new(width, height);
    let row_len = width as usize * 4;
    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..width as i64 {
                let mut acc = [0u8; 4];
                // sources in raster order: (y - dy, x - dx) walks backwards
                for &(dy, dx) in offsets.iter().rev() {
                    let (sy, sx) = (y - dy, x - dx);
                    if sy < 0 || sx < 0 || sy >= height as i64 || sx >= width as i64 {
                        continue;
                    }
                    let src = image.get_pixel(sx as u32, sy as u32).0;
                    if src[3] != 0 {
                        acc = over(src, acc);
                    }
                }
                let i = x as usize * 4;
                row[i..i + 4].copy_from_slice(&acc);
            }
        });
    out
}

/// Straight-alpha "over" compositing of `src` onto `dst`.
fn over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    match (src[3], dst[3]) {
        (255, _) | (_, 0) => return src,
        (0, _) => return dst,
        _ => {}
    }
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let factor = da * (1.0 - sa);
    let a = sa + factor;
    let mix = |s: u8, d: u8| ((s as f32 * sa + d as f32 * factor) / a).round() as u8;
    [
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        (a * 255.0).round() as u8,
    ]
}

/// Fraction of nonempty pixels that have another nonempty pixel within
/// `px` pixels on both axes. Infinite for an image with no nonempty pixels.
pub fn neighbor_density(image: &RgbaImage, px: u32) -> f64 {
    let (width, height) = image.dimensions();
    let filled = |x: u32, y: u32| image.get_pixel(x, y).0[3] != 0;

    let (count, with_neighbors) = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut count = 0u64;
            let mut with_neighbors = 0u64;
            for x in 0..width {
                if !filled(x, y) {
                    continue;
                }
                count += 1;
                let mut neighbors = 0;
                'window: for ny in y.saturating_sub(px)..(y + px + 1).min(height) {
                    for nx in x.saturating_sub(px)..(x + px + 1).min(width) {
                        if filled(nx, ny) {
                            neighbors += 1;
                            if neighbors > 1 {
                                break 'window;
                            }
                        }
                    }
                }
                if neighbors > 1 {
                    with_neighbors += 1;
                }
            }
            (count, with_neighbors)
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    if count == 0 {
        f64::INFINITY
    } else {
        with_neighbors as f64 / count as f64
    }
}

/// Spread by the largest radius in `0..=max_px` that keeps the frame from
/// clumping.
///
/// Radius `px` is rejected when more than `threshold` of the nonempty pixels
/// already have a neighbor within `2 * px`, since discs of that radius would
/// merge them. Radii are tried in increasing order and the search stops at
/// the first rejection. An empty image is always rejected and comes back
/// unchanged.
pub fn dynspread(image: RgbaImage, threshold: f32, max_px: u32) -> RgbaImage {
    let threshold = threshold as f64;
    let mut chosen: Option<u32> = None;

    for px in 0..=max_px {
        if neighbor_density(&image, px * 2) > threshold {
            break;
        }
        chosen = Some(px);
    }

    match chosen {
        Some(px) if px >= 1 => {
            debug!(px, "spreading frame");
            spread(&image, px)
        }
        _ => image,
    }
}

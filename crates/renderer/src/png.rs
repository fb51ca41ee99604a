//! PNG encoding for frame images.
//!
//! Frames are mostly transparent with a few hundred shading levels, so most
//! of them fit a 256-entry palette:
//! - **Indexed (color type 3)** when the frame has ≤256 distinct RGBA values.
//! - **RGBA (color type 6)** otherwise, typically after spreading has
//!   blended neighboring levels.

use std::collections::HashMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use rayon::prelude::*;

use crate::error::RenderError;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const MAX_PALETTE_SIZE: usize = 256;

/// Frames with fewer pixels than this are scanned on the calling thread.
const PARALLEL_THRESHOLD: usize = 64 * 64;

/// Which PNG color type to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngMode {
    /// Indexed if the palette fits, RGBA otherwise.
    Auto,
    Rgba,
}

/// Encode a frame, picking indexed output when it fits.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    encode_png_with(image, PngMode::Auto)
}

pub fn encode_png_with(image: &RgbaImage, mode: PngMode) -> Result<Vec<u8>, RenderError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::Encode(format!(
            "cannot encode empty {}x{} image",
            width, height
        )));
    }

    if mode == PngMode::Auto {
        if let Some((palette, indices)) = build_palette(image.as_raw()) {
            return write_indexed(width, height, &palette, &indices);
        }
    }
    write_rgba(width, height, image.as_raw())
}

#[inline(always)]
fn pack(px: &[u8]) -> u32 {
    u32::from_le_bytes([px[0], px[1], px[2], px[3]])
}

/// Map every pixel to a palette slot, or `None` past 256 distinct colors.
fn build_palette(pixels: &[u8]) -> Option<(Vec<[u8; 4]>, Vec<u8>)> {
    let pixel_count = pixels.len() / 4;

    let distinct: Vec<u32> = if pixel_count >= PARALLEL_THRESHOLD {
        let rows = (pixel_count / rayon::current_num_threads()).max(256) * 4;
        let partials: Vec<Option<Vec<u32>>> = pixels
            .par_chunks(rows)
            .map(|chunk| {
                let mut seen: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
                for px in chunk.chunks_exact(4) {
                    seen.insert(pack(px), ());
                    if seen.len() > MAX_PALETTE_SIZE {
                        return None;
                    }
                }
                Some(seen.into_keys().collect())
            })
            .collect();
        partials.into_iter().collect::<Option<Vec<_>>>()?.concat()
    } else {
        pixels.chunks_exact(4).map(pack).collect()
    };

    let mut slots: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for color in distinct {
        if slots.contains_key(&color) {
            continue;
        }
        if palette.len() == MAX_PALETTE_SIZE {
            return None;
        }
        slots.insert(color, palette.len() as u8);
        palette.push(color.to_le_bytes());
    }

    let indices = pixels
        .par_chunks_exact(4)
        .map(|px| slots.get(&pack(px)).copied().unwrap_or(0))
        .collect();

    Some((palette, indices))
}

fn ihdr(width: u32, height: u32, color_type: u8) -> [u8; 13] {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&width.to_be_bytes());
    data[4..8].copy_from_slice(&height.to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = color_type;
    // compression, filter and interlace methods stay 0
    data
}

fn write_indexed(
    width: u32,
    height: u32,
    palette: &[[u8; 4]],
    indices: &[u8],
) -> Result<Vec<u8>, RenderError> {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(indices, width as usize)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn write_rgba(width: u32, height: u32, pixels: &[u8]) -> Result<Vec<u8>, RenderError> {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    let idat = deflate_scanlines(pixels, width as usize * 4)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Zlib-compress rows of `stride` bytes, each prefixed with filter type 0.
fn deflate_scanlines(data: &[u8], stride: usize) -> Result<Vec<u8>, RenderError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for row in data.chunks_exact(stride) {
        encoder
            .write_all(&[0])
            .and_then(|_| encoder.write_all(row))
            .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))?;
    }
    encoder
        .finish()
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))
}

fn write_chunk(png: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(kind);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_palette_dedups_colors() {
        let pixels = [
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            0, 0, 0, 0, //
            255, 0, 0, 255,
        ];
        let (palette, indices) = build_palette(&pixels).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(indices.len(), 4);
        assert_eq!(indices[0], indices[3]);
        assert!(palette.iter().any(|c| c[3] == 0));
    }

    #[test]
    fn test_palette_overflow_in_parallel_path() {
        let img = RgbaImage::from_fn(128, 128, |x, y| Rgba([x as u8, y as u8, 7, 255]));
        assert!(build_palette(img.as_raw()).is_none());
    }

    #[test]
    fn test_indexed_png_is_color_type_3() {
        let img = RgbaImage::from_fn(64, 80, |x, _| {
            if x % 2 == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 90, 0, 200])
            }
        });
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[0..8], &SIGNATURE);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(png[25], 3);
    }

    #[test]
    fn test_forced_rgba_is_color_type_6() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 4]));
        let png = encode_png_with(&img, PngMode::Rgba).unwrap();
        assert_eq!(png[25], 6);
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let img = RgbaImage::new(0, 10);
        assert!(matches!(encode_png(&img), Err(RenderError::Encode(_))));
    }
}

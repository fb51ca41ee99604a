//! Tests for the grid-to-PNG path: shading, spreading and encoding together.

use image::GenericImageView;
use renderer::{dynspread, encode_png, png::encode_png_with, png::PngMode, Colormap, Shader};

// ============================================================================
// Helper functions
// ============================================================================

fn grid_with(width: u32, height: u32, cells: &[(u32, u32, u32)]) -> Vec<u32> {
    let mut counts = vec![0u32; (width * height) as usize];
    for &(x, y, n) in cells {
        counts[(y * width + x) as usize] = n;
    }
    counts
}

fn png_color_type(png: &[u8]) -> u8 {
    png[25]
}

// ============================================================================
// Round trip through a real decoder
// ============================================================================

#[test]
fn test_shaded_frame_decodes_with_same_pixels() {
    let counts = grid_with(32, 16, &[(1, 1, 4), (20, 3, 9), (31, 15, 120), (7, 10, 4)]);
    let frame = Shader::new(&Colormap::fire(), 40).shade(&counts, 32, 16).unwrap();

    let png = encode_png(&frame).unwrap();
    assert_eq!(png_color_type(&png), 3);

    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!(decoded.dimensions(), (32, 16));
    assert_eq!(decoded.to_rgba8(), frame);
}

#[test]
fn test_many_colors_fall_back_to_rgba() {
    let counts: Vec<u32> = (1..=600).collect();
    let frame = Shader::new(&Colormap::fire(), 40).shade(&counts, 30, 20).unwrap();
    // 600 distinct levels quantize to 256 lut slots, spreading blends more.
    let spread = renderer::spread(&frame, 2);

    let png = encode_png(&spread).unwrap();
    assert_eq!(png_color_type(&png), 6);
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded, spread);
}

#[test]
fn test_forced_rgba_still_decodes() {
    let counts = grid_with(8, 8, &[(0, 0, 1), (7, 7, 2)]);
    let frame = Shader::new(&Colormap::fire(), 40).shade(&counts, 8, 8).unwrap();
    let png = encode_png_with(&frame, PngMode::Rgba).unwrap();
    assert_eq!(image::load_from_memory(&png).unwrap().to_rgba8(), frame);
}

// ============================================================================
// Frame look
// ============================================================================

#[test]
fn test_sparse_frame_is_spread_before_encoding() {
    let counts = grid_with(64, 64, &[(10, 10, 3), (50, 40, 7)]);
    let frame = Shader::new(&Colormap::fire(), 40).shade(&counts, 64, 64).unwrap();
    let spread = dynspread(frame.clone(), 0.5, 3);

    let lit = |img: &image::RgbaImage| img.pixels().filter(|p| p.0[3] > 0).count();
    assert_eq!(lit(&frame), 2);
    // max radius 3 disc covers 29 cells per point
    assert_eq!(lit(&spread), 58);
    assert_eq!(spread.get_pixel(10, 13).0, frame.get_pixel(10, 10).0);
}

#[test]
fn test_custom_stops_drive_colors() {
    let ramp = Colormap::from_hex_stops(&["#0000ff", "#00ff00"]).unwrap();
    let counts = grid_with(2, 1, &[(0, 0, 1), (1, 0, 2)]);
    let frame = Shader::new(&ramp, 0).shade(&counts, 2, 1).unwrap();
    assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 255, 0]);
    assert_eq!(frame.get_pixel(1, 0).0, [0, 255, 0, 255]);
}

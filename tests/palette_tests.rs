// SPDX-License-Identifier: MPL-2.0

//! Integration tests for palette extraction

use camera_pipeline::palette::{self, Color, PaletteOptions, quantize};
use camera_pipeline::{PixelBuffer, PixelFormat};

const EXACT: PaletteOptions = PaletteOptions {
    quality: 1,
    ignore_white: true,
};

fn bgra_pixels(colors: &[((u8, u8, u8), usize)]) -> Vec<u8> {
    colors
        .iter()
        .flat_map(|&((r, g, b), count)| std::iter::repeat_n([b, g, r, 255], count))
        .flatten()
        .collect()
}

fn gradient(size: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(size * size * 4);
    for y in 0..size {
        for x in 0..size {
            let r = (x * 255 / size) as u8;
            let g = (y * 255 / size) as u8;
            let b = ((x + y) * 127 / size) as u8;
            pixels.extend_from_slice(&[b, g, r, 255]);
        }
    }
    pixels
}

#[test]
fn test_two_clusters_give_two_colors() {
    let pixels = bgra_pixels(&[((255, 0, 0), 50), ((0, 0, 255), 50)]);
    let colors = palette::palette(&pixels, 2, EXACT).unwrap();

    assert_eq!(colors.len(), 2);
    assert!(colors.iter().any(|c| c.r > 200 && c.b < 50));
    assert!(colors.iter().any(|c| c.b > 200 && c.r < 50));
}

#[test]
fn test_palette_never_exceeds_requested_count() {
    let pixels = gradient(64);
    for count in [2, 3, 5, 8, 16] {
        let colors = palette::palette(&pixels, count, EXACT).unwrap();
        assert!(
            !colors.is_empty() && colors.len() <= count,
            "{} colors for a request of {}",
            colors.len(),
            count
        );
    }
}

#[test]
fn test_invalid_requests_have_no_palette() {
    let pixels = gradient(8);
    assert!(quantize(&pixels, 1, true, 1).is_none());
    assert!(quantize(&pixels, 1, true, 257).is_none());
    assert!(quantize(&[], 1, true, 5).is_none());

    let transparent = vec![0u8; 16 * 4];
    assert!(quantize(&transparent, 1, true, 5).is_none());
}

#[test]
fn test_white_is_optional() {
    let white = bgra_pixels(&[((255, 255, 255), 20)]);
    assert!(palette::palette(&white, 4, EXACT).is_none());

    let keep_white = PaletteOptions {
        ignore_white: false,
        ..EXACT
    };
    let colors = palette::palette(&white, 4, keep_white).unwrap();
    assert_eq!(colors.len(), 1);
    assert!(colors[0].r > 240 && colors[0].g > 240 && colors[0].b > 240);
}

#[test]
fn test_minor_cluster_is_kept() {
    let pixels = bgra_pixels(&[((10, 200, 10), 90), ((200, 10, 200), 10)]);
    let colors = palette::palette(&pixels, 5, EXACT).unwrap();

    assert_eq!(colors.len(), 2);
    assert!(colors.iter().any(|c| c.g > 150 && c.r < 50));
    assert!(colors.iter().any(|c| c.r > 150 && c.g < 50));
    assert!(palette::dominant_color(&pixels, EXACT).is_some_and(|c| colors.contains(&c)));
}

#[test]
fn test_nearest_color() {
    let pixels = bgra_pixels(&[((250, 0, 0), 40), ((0, 250, 0), 40)]);
    let map = quantize(&pixels, 1, true, 2).unwrap();

    let nearest = map.nearest_color(Color::new(180, 40, 30));
    assert!(nearest.r > 200 && nearest.g < 50);
}

#[test]
fn test_buffer_palette_reads_either_layout() {
    let rgba = [0u8, 0, 240, 255].repeat(16);
    let buffer = PixelBuffer::from_bytes(4, 4, PixelFormat::Rgba8, rgba).unwrap();
    let colors = palette::buffer_palette(&buffer, 3, EXACT).unwrap();

    assert_eq!(colors.len(), 1);
    assert!(colors[0].b > 200 && colors[0].r < 20);
    assert_eq!(colors[0].hex().len(), 7);
}

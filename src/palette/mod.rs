// SPDX-License-Identifier: MPL-2.0

//! Dominant colors of an image
//!
//! Thin helpers over [`mmcq::quantize`]. Pixels are BGRA bytes, the layout
//! of the pipeline's buffers; [`pixels_from_image`] converts anything the
//! `image` crate decodes.

pub mod mmcq;

pub use mmcq::{Color, ColorMap, Histogram, VBox, median_cut, quantize};

use crate::constants::palette::{DEFAULT_IGNORE_WHITE, DEFAULT_QUALITY, DOMINANT_PALETTE_SIZE};
use crate::media::{PixelBuffer, PixelFormat};
use image::DynamicImage;
use tracing::debug;

/// Sampling options shared by the helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteOptions {
    /// Sample every `quality`-th pixel (1 samples all)
    pub quality: usize,
    /// Skip near-white pixels
    pub ignore_white: bool,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            ignore_white: DEFAULT_IGNORE_WHITE,
        }
    }
}

/// Palette of at most `color_count` colors, most significant first
pub fn palette(pixels: &[u8], color_count: usize, options: PaletteOptions) -> Option<Vec<Color>> {
    let map = quantize(pixels, options.quality, options.ignore_white, color_count)?;
    let colors = map.palette();
    debug!(requested = color_count, found = colors.len(), "Quantized palette");
    Some(colors)
}

/// Representative color of the largest cluster
pub fn dominant_color(pixels: &[u8], options: PaletteOptions) -> Option<Color> {
    palette(pixels, DOMINANT_PALETTE_SIZE, options)?.first().copied()
}

/// BGRA bytes of a decoded image
pub fn pixels_from_image(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = image.to_rgba8().into_raw();
    for pixel in bytes.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    bytes
}

/// Palette of a pixel buffer in either supported format
pub fn buffer_palette(
    buffer: &PixelBuffer,
    color_count: usize,
    options: PaletteOptions,
) -> Option<Vec<Color>> {
    let buffer = buffer.converted(PixelFormat::Bgra8).ok()?;
    buffer.with_bytes(|bytes| palette(bytes, color_count, options))
}

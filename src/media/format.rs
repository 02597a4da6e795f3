// SPDX-License-Identifier: GPL-3.0-only

//! Pixel formats, dimensions and the negotiated format description

use crate::constants::buffers::{BYTES_PER_PIXEL, MAX_DIMENSION};
use crate::errors::{PipelineResult, SetupError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-bit pixel layouts a buffer may carry
///
/// GPU stages only accept [`PixelFormat::Bgra8`]; `Rgba8` exists for
/// buffers that come straight from image decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Blue, green, red, alpha byte order
    #[default]
    Bgra8,
    /// Red, green, blue, alpha byte order
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel (both layouts are 32-bit)
    pub fn bytes_per_pixel(&self) -> usize {
        BYTES_PER_PIXEL
    }

    /// Matching wgpu texture format
    pub fn texture_format(&self) -> wgpu::TextureFormat {
        match self {
            PixelFormat::Bgra8 => wgpu::TextureFormat::Bgra8Unorm,
            PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    /// FourCC-style name used in logs
    pub fn fourcc(&self) -> &'static str {
        match self {
            PixelFormat::Bgra8 => "BGRA",
            PixelFormat::Rgba8 => "RGBA",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fourcc())
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width and height exchanged (portrait/landscape switch)
    pub fn swapped(&self) -> Self {
        Self::new(self.height, self.width)
    }

    /// True if either edge is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height (0 for empty dimensions)
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// Number of pixels
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reject empty or oversized dimensions
    pub fn validate(&self) -> PipelineResult<()> {
        if self.is_empty() || self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(SetupError::InvalidDimensions {
                width: self.width,
                height: self.height,
            }
            .into());
        }
        Ok(())
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Format negotiated from the first sample a stage sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatDescription {
    pub dimensions: Dimensions,
    pub pixel_format: PixelFormat,
}

impl FormatDescription {
    pub fn new(dimensions: Dimensions, pixel_format: PixelFormat) -> Self {
        Self {
            dimensions,
            pixel_format,
        }
    }

    /// Describe an existing buffer
    pub fn of(buffer: &super::PixelBuffer) -> Self {
        Self::new(buffer.dimensions(), buffer.format())
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }
}

impl fmt::Display for FormatDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.dimensions, self.pixel_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swapped() {
        assert_eq!(Dimensions::new(1920, 1080).swapped(), Dimensions::new(1080, 1920));
    }

    #[test]
    fn test_validate_rejects_empty_and_oversized() {
        assert!(Dimensions::new(0, 480).validate().is_err());
        assert!(Dimensions::new(640, 0).validate().is_err());
        assert!(Dimensions::new(MAX_DIMENSION + 1, 480).validate().is_err());
        assert!(Dimensions::new(640, 480).validate().is_ok());
    }

    #[test]
    fn test_aspect_ratio() {
        assert!((Dimensions::new(1920, 1080).aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
        assert_eq!(Dimensions::new(10, 0).aspect_ratio(), 0.0);
    }
}

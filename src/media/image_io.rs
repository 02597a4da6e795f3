// SPDX-License-Identifier: GPL-3.0-only

//! Still image loading and saving

use super::{PixelBuffer, PixelFormat};
use crate::errors::{PipelineError, PipelineResult};
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use tracing::debug;

/// Convert a decoded image into a BGRA pixel buffer
pub fn buffer_from_image(image: &DynamicImage) -> PipelineResult<PixelBuffer> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelBuffer::from_bytes(width, height, PixelFormat::Rgba8, rgba.into_raw())?
        .converted(PixelFormat::Bgra8)
}

/// Convert a pixel buffer (either layout) into an RGBA image
pub fn image_from_buffer(buffer: &PixelBuffer) -> PipelineResult<RgbaImage> {
    let rgba = buffer.converted(PixelFormat::Rgba8)?;
    RgbaImage::from_raw(rgba.width(), rgba.height(), rgba.to_vec())
        .ok_or_else(|| PipelineError::Storage("pixel buffer size mismatch".into()))
}

/// Load an image file as a BGRA pixel buffer
pub fn load_image(path: &Path) -> PipelineResult<PixelBuffer> {
    let image = image::open(path)?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), "Loaded image");
    buffer_from_image(&image)
}

/// Save a pixel buffer; the format follows the file extension
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    image_from_buffer(buffer)?.save(path)?;
    debug!(path = %path.display(), width = buffer.width(), height = buffer.height(), "Saved image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_buffer_conversion() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, image::Rgba([0, 0, 255, 128]));

        let buffer = buffer_from_image(&DynamicImage::ImageRgba8(image.clone())).unwrap();
        assert_eq!(buffer.format(), PixelFormat::Bgra8);
        assert_eq!(buffer.to_vec(), vec![0, 0, 255, 255, 255, 0, 0, 128]);

        assert_eq!(image_from_buffer(&buffer).unwrap(), image);
    }
}

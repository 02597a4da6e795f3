// SPDX-License-Identifier: GPL-3.0-only

//! Overlay preparation
//!
//! Overlays are resized once, at prepare time, to the stage's output size so
//! the shaders can sample them in output space.

use crate::errors::{PipelineError, PipelineResult};
use crate::media::{Dimensions, PixelBuffer, PixelFormat};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Return `overlay` as a BGRA buffer of exactly `target` size
pub fn scale_overlay(overlay: &PixelBuffer, target: Dimensions) -> PipelineResult<PixelBuffer> {
    let overlay = if overlay.format() == PixelFormat::Bgra8 {
        overlay.clone()
    } else {
        overlay.converted(PixelFormat::Bgra8)?
    };
    if overlay.dimensions() == target {
        return Ok(overlay);
    }

    // Channel order doesn't matter to the resampler; keep the bytes as BGRA
    let source = RgbaImage::from_raw(overlay.width(), overlay.height(), overlay.to_vec())
        .ok_or_else(|| PipelineError::Other("overlay size mismatch".into()))?;
    let resized = imageops::resize(&source, target.width, target.height, FilterType::Lanczos3);

    debug!(from = %overlay.dimensions(), to = %target, "Scaled overlay");
    PixelBuffer::from_bytes(target.width, target.height, PixelFormat::Bgra8, resized.into_raw())
}

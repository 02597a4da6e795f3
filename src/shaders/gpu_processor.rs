// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU plumbing for the filter backends
//!
//! - Output buffer allocation with dimension caching
//! - Texture and buffer readback (map, poll, read, unmap)
//! - Row padding for texture-to-buffer copies
//! - Compute dispatch sizing

use crate::constants::gpu::COPY_ROW_ALIGNMENT;
use crate::errors::{FrameError, PipelineResult};
use crate::gpu::wgpu;
use crate::media::{Dimensions, PixelBuffer};

/// Cached resource dimensions - avoids reallocation when dimensions match
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct CachedDimensions {
    pub width: u32,
    pub height: u32,
}

impl CachedDimensions {
    /// Check if dimensions have changed and need update
    pub fn needs_update(&self, dimensions: Dimensions) -> bool {
        self.width != dimensions.width || self.height != dimensions.height
    }

    /// Update cached dimensions
    pub fn update(&mut self, dimensions: Dimensions) {
        self.width = dimensions.width;
        self.height = dimensions.height;
    }

    /// Check if dimensions are initialized (non-zero)
    pub fn is_initialized(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Calculate compute shader dispatch size (workgroups needed)
///
/// Given a dimension and workgroup size, returns the number of workgroups
/// needed to cover the entire dimension.
#[inline]
pub fn compute_dispatch_size(dimension: u32, workgroup_size: u32) -> u32 {
    dimension.div_ceil(workgroup_size)
}

/// Row pitch for a texture-to-buffer copy (multiple of 256 bytes)
#[inline]
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    (width * bytes_per_pixel).div_ceil(COPY_ROW_ALIGNMENT) * COPY_ROW_ALIGNMENT
}

/// Map a readback buffer and copy its contents out
///
/// Submission has already happened; this maps the buffer, waits for the
/// device and copies the bytes out.
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> PipelineResult<Vec<u8>> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let _ = device.poll(wgpu::PollType::wait_indefinitely());

    receiver
        .await
        .map_err(|_| FrameError::Readback("Failed to receive buffer mapping".into()))?
        .map_err(|e| FrameError::Readback(format!("Failed to map buffer: {:?}", e)))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

/// [`read_buffer_async`] for the synchronous frame path
pub fn read_buffer_blocking(device: &wgpu::Device, buffer: &wgpu::Buffer) -> PipelineResult<Vec<u8>> {
    pollster::block_on(read_buffer_async(device, buffer))
}

/// Staging buffer for reading a rendered texture back into a pixel buffer
pub struct TextureReadback {
    buffer: wgpu::Buffer,
    dimensions: Dimensions,
    padded_row: u32,
}

impl TextureReadback {
    pub fn new(device: &wgpu::Device, label: &str, dimensions: Dimensions) -> Self {
        let padded_row = padded_bytes_per_row(dimensions.width, 4);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: padded_row as u64 * dimensions.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            dimensions,
            padded_row,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Record the texture copy into `encoder`
    pub fn record_copy(&self, encoder: &mut wgpu::CommandEncoder, texture: &wgpu::Texture) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row),
                    rows_per_image: Some(self.dimensions.height),
                },
            },
            wgpu::Extent3d {
                width: self.dimensions.width,
                height: self.dimensions.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Wait for the copy and strip row padding into `target`
    pub fn read_into(&self, device: &wgpu::Device, target: &PixelBuffer) -> PipelineResult<()> {
        if target.dimensions() != self.dimensions {
            return Err(FrameError::DimensionMismatch {
                expected: (self.dimensions.width, self.dimensions.height),
                actual: (target.width(), target.height()),
            }
            .into());
        }
        let padded = read_buffer_blocking(device, &self.buffer)?;
        let row = target.bytes_per_row();
        target.with_bytes_mut(|bytes| {
            for (dst, src) in bytes
                .chunks_exact_mut(row)
                .zip(padded.chunks_exact(self.padded_row as usize))
            {
                dst.copy_from_slice(&src[..row]);
            }
        });
        Ok(())
    }
}

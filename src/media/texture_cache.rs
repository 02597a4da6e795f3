// SPDX-License-Identifier: GPL-3.0-only

//! GPU textures bound to pixel buffers
//!
//! A [`TextureCache`] keeps one wgpu texture per pixel buffer it has seen,
//! keyed by the buffer's id. Pool buffers are recycled, so the same few
//! textures are reused frame after frame. Render-target entries retain their
//! buffer, which keeps the pool slot busy; [`TextureCache::flush`] releases
//! every entry that no in-flight [`Texture`] still uses. Sampled entries
//! never retain the buffer they were imported from: that buffer belongs to
//! an upstream pool and is only borrowed for the duration of `process`.

use super::{Dimensions, PixelBuffer, PixelFormat};
use crate::constants::buffers::TEXTURE_CACHE_MAX_AGE;
use crate::errors::{FrameError, PipelineResult};
use crate::gpu::{GpuContext, wgpu};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// What the imported textures are used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureRole {
    /// Sampled by a shader; the buffer's bytes are uploaded on import
    Sampled,
    /// Rendered into and read back; nothing is uploaded
    RenderTarget,
}

impl TextureRole {
    fn usage(&self) -> wgpu::TextureUsages {
        match self {
            TextureRole::Sampled => {
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
            }
            TextureRole::RenderTarget => {
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC
            }
        }
    }
}

/// GPU view over one pixel buffer
///
/// Holding a `Texture` keeps both the GPU texture and the buffer alive; the
/// cache will not release its entry until every `Texture` is dropped.
pub struct Texture {
    texture: Arc<wgpu::Texture>,
    view: wgpu::TextureView,
    buffer: PixelBuffer,
}

impl Texture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn dimensions(&self) -> Dimensions {
        self.buffer.dimensions()
    }
}

struct CacheEntry {
    texture: Arc<wgpu::Texture>,
    // Keeps an owned pool slot checked out while the texture is cached
    retained: Option<PixelBuffer>,
    dimensions: Dimensions,
    last_used: u64,
}

impl CacheEntry {
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.texture) > 1
    }
}

/// Per-stage cache of buffer-backed textures
pub struct TextureCache {
    context: Arc<GpuContext>,
    label: String,
    role: TextureRole,
    entries: HashMap<u64, CacheEntry>,
    generation: u64,
}

impl TextureCache {
    pub fn new(context: Arc<GpuContext>, label: impl Into<String>, role: TextureRole) -> Self {
        Self {
            context,
            label: label.into(),
            role,
            entries: HashMap::new(),
            generation: 0,
        }
    }

    /// Import `buffer` as a texture of `format`
    ///
    /// Fails with `ImportFailed` if the buffer's format differs from the one
    /// the caller negotiated.
    pub fn import_texture(
        &mut self,
        buffer: &PixelBuffer,
        format: PixelFormat,
    ) -> PipelineResult<Texture> {
        if buffer.format() != format {
            return Err(FrameError::ImportFailed(format!(
                "{} buffer imported as {}",
                buffer.format(),
                format
            ))
            .into());
        }

        self.generation += 1;
        self.age_out();

        let generation = self.generation;
        let dimensions = buffer.dimensions();
        let stale = self
            .entries
            .get(&buffer.id())
            .is_some_and(|entry| entry.dimensions != dimensions);
        if stale {
            self.entries.remove(&buffer.id());
        }

        let device = self.context.device().clone();
        let (label, role) = (&self.label, self.role);
        let entry = self.entries.entry(buffer.id()).or_insert_with(|| {
            trace!(cache = %label, id = buffer.id(), %dimensions, "Creating cached texture");
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: dimensions.width,
                    height: dimensions.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: format.texture_format(),
                usage: role.usage(),
                view_formats: &[],
            });
            CacheEntry {
                texture: Arc::new(texture),
                retained: (role == TextureRole::RenderTarget).then(|| buffer.clone()),
                dimensions,
                last_used: generation,
            }
        });
        entry.last_used = generation;

        if self.role == TextureRole::Sampled {
            buffer.with_bytes(|bytes| {
                self.context.queue().write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &entry.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    bytes,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(buffer.bytes_per_row() as u32),
                        rows_per_image: Some(dimensions.height),
                    },
                    wgpu::Extent3d {
                        width: dimensions.width,
                        height: dimensions.height,
                        depth_or_array_layers: 1,
                    },
                );
            });
        }

        let texture = entry.texture.clone();
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Texture {
            texture,
            view,
            buffer: buffer.clone(),
        })
    }

    // Drop idle entries that have not been imported recently
    fn age_out(&mut self) {
        let generation = self.generation;
        self.entries.retain(|_, entry| {
            entry.in_use() || generation - entry.last_used <= TEXTURE_CACHE_MAX_AGE
        });
    }

    /// Release every entry not held by an in-flight [`Texture`]
    ///
    /// Returns the number of entries released.
    pub fn flush(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.in_use());
        let released = before - self.entries.len();
        if released > 0 {
            debug!(cache = %self.label, released, "Flushed texture cache");
        }
        released
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of pixel buffers kept checked out by cached entries
    pub fn retained_buffers(&self) -> usize {
        self.entries.values().filter(|entry| entry.retained.is_some()).count()
    }

    /// Number of cached textures
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for TextureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCache")
            .field("label", &self.label)
            .field("role", &self.role)
            .field("entries", &self.entries.len())
            .finish()
    }
}

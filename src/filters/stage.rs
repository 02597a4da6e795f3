// SPDX-License-Identifier: GPL-3.0-only

//! State and GPU helpers shared by both stage backends
//!
//! [`StageCore`] owns everything that does not depend on how a stage draws:
//! format negotiation, the output pool, the scaled overlay, elapsed time and
//! the per-frame input checks.

use super::overlay::scale_overlay;
use super::types::{StageConfig, StageSetup, StageUniforms};
use crate::constants::buffers::RETAINED_BUFFER_COUNT;
use crate::errors::{FrameError, PipelineResult, SetupError};
use crate::geometry::Transform;
use crate::gpu::{GpuContext, wgpu};
use crate::media::{BufferPool, FormatDescription, MediaTime, PixelBuffer, PixelFormat};
use crate::shaders::StageShader;
use tracing::{debug, info};

/// Format-negotiated state of one stage
pub(crate) struct StageCore {
    label: String,
    config: StageConfig,
    input_format: Option<FormatDescription>,
    output_format: Option<FormatDescription>,
    transform: Transform,
    pool: Option<BufferPool>,
    overlay: Option<PixelBuffer>,
    start_time: Option<MediaTime>,
}

impl StageCore {
    pub fn new(backend: &str, config: StageConfig) -> Self {
        Self {
            label: format!("{}:{}", backend, config.label()),
            config,
            input_format: None,
            output_format: None,
            transform: Transform::identity(),
            pool: None,
            overlay: None,
            start_time: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_prepared(&self) -> bool {
        self.output_format.is_some()
    }

    pub fn output_format(&self) -> Option<FormatDescription> {
        self.output_format
    }

    pub fn overlay(&self) -> Option<&PixelBuffer> {
        self.overlay.as_ref()
    }

    /// Negotiate formats and allocate the output pool
    ///
    /// Returns `Ok(false)` if the stage was already prepared; nothing changes
    /// in that case. On error the stage stays unprepared.
    pub fn begin_prepare(
        &mut self,
        format: &FormatDescription,
        setup: &StageSetup,
    ) -> PipelineResult<bool> {
        if self.is_prepared() {
            return Ok(false);
        }

        if format.pixel_format != PixelFormat::Bgra8 {
            return Err(SetupError::UnsupportedFormat(format!(
                "{} input, stages render {}",
                format.pixel_format,
                PixelFormat::Bgra8
            ))
            .into());
        }
        format.dimensions.validate()?;

        let output = setup.resolve_output(format.dimensions);
        output.validate()?;

        let pool = BufferPool::new(
            output.width,
            output.height,
            PixelFormat::Bgra8,
            RETAINED_BUFFER_COUNT,
        )?;
        let overlay = self
            .config
            .overlay
            .as_ref()
            .map(|overlay| scale_overlay(overlay, output))
            .transpose()?;

        self.input_format = Some(*format);
        self.output_format = Some(pool.format());
        self.transform = setup.transform.unwrap_or_default();
        self.pool = Some(pool);
        self.overlay = overlay;
        self.start_time = None;

        info!(
            stage = %self.label,
            input = %format.dimensions,
            output = %output,
            overlay = self.overlay.is_some(),
            "Stage prepared"
        );
        Ok(true)
    }

    /// Forget the negotiated format and release the pool
    pub fn reset(&mut self) {
        if self.is_prepared() {
            debug!(stage = %self.label, "Stage cleaned up");
        }
        self.input_format = None;
        self.output_format = None;
        self.transform = Transform::identity();
        self.pool = None;
        self.overlay = None;
        self.start_time = None;
    }

    /// Reject inputs that differ from the negotiated format
    pub fn validate_input(&self, input: &PixelBuffer) -> PipelineResult<()> {
        let expected = self.input_format.ok_or(FrameError::NotPrepared)?;
        if input.format() != expected.pixel_format {
            return Err(FrameError::FormatMismatch(format!(
                "expected {}, got {}",
                expected.pixel_format,
                input.format()
            ))
            .into());
        }
        if input.dimensions() != expected.dimensions {
            return Err(FrameError::DimensionMismatch {
                expected: (expected.width(), expected.height()),
                actual: (input.width(), input.height()),
            }
            .into());
        }
        Ok(())
    }

    /// Seconds since the first frame this stage processed
    pub fn elapsed(&mut self, time: MediaTime) -> f32 {
        let start = *self.start_time.get_or_insert(time);
        (time - start).seconds().max(0.0) as f32
    }

    /// Obtain an output buffer, flushing caches and retrying exactly once
    pub fn obtain_output(&self, flush: impl FnOnce() -> usize) -> PipelineResult<PixelBuffer> {
        let pool = self.pool.as_ref().ok_or(FrameError::NotPrepared)?;
        match pool.obtain() {
            Err(e) if e.is_pool_exhausted() => {
                let released = flush();
                debug!(stage = %self.label, released, "Pool exhausted, flushed texture caches");
                pool.obtain()
            }
            other => other,
        }
    }

    /// Uniform block for a frame at `elapsed` seconds
    pub fn uniforms(&self, elapsed: f32) -> PipelineResult<StageUniforms> {
        let input = self.input_format.ok_or(FrameError::NotPrepared)?;
        let output = self.output_format.ok_or(FrameError::NotPrepared)?;
        Ok(StageUniforms::new(
            &self.transform,
            input.dimensions,
            output.dimensions,
            elapsed,
            self.config.effect.shader_mode(),
            self.overlay.is_some(),
        ))
    }
}

/// Run GPU object creation inside a validation error scope
///
/// Shader and pipeline errors surface here as setup failures instead of
/// reaching the device's uncaptured-error handler.
pub(crate) fn validated<T>(device: &wgpu::Device, create: impl FnOnce() -> T) -> PipelineResult<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(SetupError::ShaderCompilation(error.to_string()).into()),
        None => Ok(value),
    }
}

/// Compile a stage shader
pub(crate) fn create_shader(
    device: &wgpu::Device,
    shader: StageShader,
) -> PipelineResult<wgpu::ShaderModule> {
    validated(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Wgsl(shader.source().into()),
        })
    })
}

/// Bind group layout entries shared by both backends (bindings 0-3)
pub(crate) fn shared_layout_entries(
    visibility: wgpu::ShaderStages,
) -> [wgpu::BindGroupLayoutEntry; 4] {
    let texture = wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    };
    [
        // Input texture
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: texture,
            count: None,
        },
        // Sampler
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
        // Overlay texture
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility,
            ty: texture,
            count: None,
        },
        // Uniform buffer
        wgpu::BindGroupLayoutEntry {
            binding: 3,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
    ]
}

/// Resources every stage binds regardless of backend
pub(crate) struct SharedBindings {
    pub sampler: wgpu::Sampler,
    pub uniform_buffer: wgpu::Buffer,
    pub overlay_view: wgpu::TextureView,
    _overlay_texture: wgpu::Texture,
}

impl SharedBindings {
    pub fn new(context: &GpuContext, label: &str, overlay: Option<&PixelBuffer>) -> Self {
        let device = context.device();

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<StageUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Without an overlay a 1x1 transparent texture keeps the layout complete
        let (width, height, bytes) = match overlay {
            Some(buffer) => (buffer.width(), buffer.height(), buffer.to_vec()),
            None => (1, 1, vec![0u8; 4]),
        };
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let overlay_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PixelFormat::Bgra8.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        context.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &overlay_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );
        let overlay_view = overlay_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            sampler,
            uniform_buffer,
            overlay_view,
            _overlay_texture: overlay_texture,
        }
    }

    /// Bind group entries 0-3 for one frame's input
    pub fn entries<'a>(&'a self, input: &'a wgpu::TextureView) -> [wgpu::BindGroupEntry<'a>; 4] {
        [
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(input),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&self.overlay_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: self.uniform_buffer.as_entire_binding(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterType;
    use crate::media::Dimensions;

    fn bgra(width: u32, height: u32) -> FormatDescription {
        FormatDescription::new(Dimensions::new(width, height), PixelFormat::Bgra8)
    }

    #[test]
    fn test_first_prepare_wins() {
        let mut core = StageCore::new("test", StageConfig::effect(FilterType::Film));
        assert!(core.begin_prepare(&bgra(64, 32), &StageSetup::default()).unwrap());

        let other = StageSetup {
            output_dimensions: Some(Dimensions::new(16, 16)),
            ..Default::default()
        };
        assert!(!core.begin_prepare(&bgra(128, 128), &other).unwrap());
        assert_eq!(core.output_format(), Some(bgra(64, 32)));
    }

    #[test]
    fn test_failed_prepare_leaves_stage_unprepared() {
        let mut core = StageCore::new("test", StageConfig::default());
        let rgba = FormatDescription::new(Dimensions::new(8, 8), PixelFormat::Rgba8);
        assert!(core.begin_prepare(&rgba, &StageSetup::default()).is_err());
        assert!(!core.is_prepared());
        assert!(core.begin_prepare(&bgra(0, 8), &StageSetup::default()).is_err());
        assert!(!core.is_prepared());
    }

    #[test]
    fn test_validate_input() {
        let mut core = StageCore::new("test", StageConfig::default());
        let input = PixelBuffer::new(8, 8, PixelFormat::Bgra8).unwrap();
        assert!(core.validate_input(&input).is_err());

        core.begin_prepare(&bgra(8, 8), &StageSetup::default()).unwrap();
        assert!(core.validate_input(&input).is_ok());

        let wrong_size = PixelBuffer::new(8, 4, PixelFormat::Bgra8).unwrap();
        assert!(matches!(
            core.validate_input(&wrong_size),
            Err(crate::errors::PipelineError::Frame(FrameError::DimensionMismatch { .. }))
        ));
        let wrong_format = PixelBuffer::new(8, 8, PixelFormat::Rgba8).unwrap();
        assert!(core.validate_input(&wrong_format).is_err());
    }

    #[test]
    fn test_single_flush_and_retry() {
        let mut core = StageCore::new("test", StageConfig::default());
        core.begin_prepare(&bgra(4, 4), &StageSetup::default()).unwrap();

        let mut held: Vec<_> = (0..RETAINED_BUFFER_COUNT)
            .map(|_| core.obtain_output(|| 0).unwrap())
            .collect();

        let mut flushes = 0;
        assert!(core.obtain_output(|| { flushes += 1; 0 }).is_err());
        assert_eq!(flushes, 1);

        // A flush that frees a slot lets the retry succeed
        let mut slot = held.pop();
        let retried = core.obtain_output(|| {
            slot.take();
            1
        });
        assert!(retried.is_ok());
    }

    #[test]
    fn test_elapsed_is_relative_to_first_frame() {
        let mut core = StageCore::new("test", StageConfig::default());
        assert_eq!(core.elapsed(MediaTime::new(300, 30)), 0.0);
        assert_eq!(core.elapsed(MediaTime::new(315, 30)), 0.5);
    }
}

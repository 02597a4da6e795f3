// SPDX-License-Identifier: GPL-3.0-only

//! Compute backend
//!
//! One invocation per output pixel in 16x16 workgroups. Each invocation maps
//! its pixel back through the inverse stage transform, shades it, and writes
//! packed BGRA into a storage buffer that is then copied to a staging buffer
//! and read into the output pixel buffer.

use super::stage::{SharedBindings, StageCore, create_shader, shared_layout_entries, validated};
use super::{FilterStage, StageConfig, StageSetup};
use crate::constants::gpu::WORKGROUP_SIZE;
use crate::errors::{FrameError, PipelineResult};
use crate::gpu::{GpuContext, wgpu};
use crate::media::{
    Dimensions, FormatDescription, MediaTime, PixelBuffer, PixelFormat, TextureCache, TextureRole,
};
use crate::shaders::{
    CachedDimensions, StageShader, compute_dispatch_size, read_buffer_blocking,
};
use std::sync::Arc;
use tracing::{debug, warn};

struct ComputeResources {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bindings: SharedBindings,
    input_cache: TextureCache,
    // Sized for the current output dimensions
    cached_dims: CachedDimensions,
    output_buffer: Option<wgpu::Buffer>,
    staging_buffer: Option<wgpu::Buffer>,
}

impl ComputeResources {
    fn ensure_buffers(&mut self, device: &wgpu::Device, dimensions: Dimensions) {
        if !self.cached_dims.needs_update(dimensions) && self.output_buffer.is_some() {
            return;
        }

        let size = (dimensions.area() * PixelFormat::Bgra8.bytes_per_pixel()) as u64;
        debug!(%dimensions, size, "Allocating compute stage buffers");

        self.output_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("compute_stage_output_buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        }));
        self.staging_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("compute_stage_staging_buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.cached_dims.update(dimensions);
    }
}

/// Filter stage run as a compute dispatch
pub struct ComputeFilter {
    context: Arc<GpuContext>,
    core: StageCore,
    resources: Option<ComputeResources>,
}

impl ComputeFilter {
    pub fn new(context: Arc<GpuContext>, config: StageConfig) -> Self {
        Self {
            context,
            core: StageCore::new("compute", config),
            resources: None,
        }
    }

    fn create_resources(&self, output: FormatDescription) -> PipelineResult<ComputeResources> {
        let device = self.context.device();
        let label = self.core.label();

        let shader = create_shader(device, StageShader::Compute)?;

        let [input, sampler, overlay, uniforms] = shared_layout_entries(wgpu::ShaderStages::COMPUTE);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compute_stage_bind_group_layout"),
            entries: &[
                input,
                sampler,
                overlay,
                uniforms,
                // Output storage buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compute_stage_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, || {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("compute_stage_pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        })?;

        let mut resources = ComputeResources {
            pipeline,
            bind_group_layout,
            bindings: SharedBindings::new(&self.context, label, self.core.overlay()),
            input_cache: TextureCache::new(
                self.context.clone(),
                format!("{} input", label),
                TextureRole::Sampled,
            ),
            cached_dims: CachedDimensions::default(),
            output_buffer: None,
            staging_buffer: None,
        };
        resources.ensure_buffers(device, output.dimensions);
        Ok(resources)
    }

    fn dispatch(&mut self, input: &PixelBuffer, time: MediaTime) -> PipelineResult<PixelBuffer> {
        self.core.validate_input(input)?;
        let elapsed = self.core.elapsed(time);
        let uniforms = self.core.uniforms(elapsed)?;
        let resources = self.resources.as_mut().ok_or(FrameError::NotPrepared)?;

        let _context = self.context.bind();
        let device = self.context.device();
        let queue = self.context.queue();

        let source = resources
            .input_cache
            .import_texture(input, PixelFormat::Bgra8)?;
        let output = self
            .core
            .obtain_output(|| resources.input_cache.flush())?;
        let dimensions = output.dimensions();
        resources.ensure_buffers(device, dimensions);

        let (Some(output_buffer), Some(staging_buffer)) =
            (&resources.output_buffer, &resources.staging_buffer)
        else {
            return Err(FrameError::NotPrepared.into());
        };

        queue.write_buffer(
            &resources.bindings.uniform_buffer,
            0,
            bytemuck::bytes_of(&uniforms),
        );

        let [e0, e1, e2, e3] = resources.bindings.entries(source.view());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("compute_stage_bind_group"),
            layout: &resources.bind_group_layout,
            entries: &[
                e0,
                e1,
                e2,
                e3,
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("compute_stage_encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("compute_stage_pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&resources.pipeline);
            compute_pass.set_bind_group(0, Some(&bind_group), &[]);

            let workgroups_x = compute_dispatch_size(dimensions.width, WORKGROUP_SIZE);
            let workgroups_y = compute_dispatch_size(dimensions.height, WORKGROUP_SIZE);
            compute_pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
        }

        let size = (dimensions.area() * PixelFormat::Bgra8.bytes_per_pixel()) as u64;
        encoder.copy_buffer_to_buffer(output_buffer, 0, staging_buffer, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        // Rows are tightly packed, so the staging bytes are the buffer bytes
        let data = read_buffer_blocking(device, staging_buffer)?;
        output.with_bytes_mut(|bytes| bytes.copy_from_slice(&data[..bytes.len()]));

        Ok(output)
    }
}

impl FilterStage for ComputeFilter {
    fn label(&self) -> &str {
        self.core.label()
    }

    fn prepare(&mut self, format: &FormatDescription, setup: &StageSetup) -> PipelineResult<()> {
        if !self.core.begin_prepare(format, setup)? {
            return Ok(());
        }
        let Some(output) = self.core.output_format() else {
            return Err(FrameError::NotPrepared.into());
        };

        let _context = self.context.bind();
        match self.create_resources(output) {
            Ok(resources) => {
                self.resources = Some(resources);
                Ok(())
            }
            Err(e) => {
                warn!(stage = %self.core.label(), error = %e, "Failed to prepare stage");
                self.core.reset();
                Err(e)
            }
        }
    }

    fn output_format(&self) -> Option<FormatDescription> {
        self.core.output_format()
    }

    fn process(&mut self, input: &PixelBuffer, time: MediaTime) -> Option<PixelBuffer> {
        match self.dispatch(input, time) {
            Ok(output) => Some(output),
            Err(e) => {
                debug!(stage = %self.core.label(), error = %e, "Dropping frame");
                None
            }
        }
    }

    fn cleanup(&mut self) {
        let _context = self.context.bind();
        self.resources = None;
        self.core.reset();
    }
}

impl Drop for ComputeFilter {
    fn drop(&mut self) {
        self.cleanup();
    }
}

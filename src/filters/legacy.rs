// SPDX-License-Identifier: GPL-3.0-only

//! Render-pass backend
//!
//! Draws a 4-vertex triangle strip whose vertices are multiplied by the stage
//! transform into a texture bound to the output buffer, then copies the
//! texture back. The draw is synchronous: the call returns after the GPU has
//! finished and the output buffer holds the result.

use super::stage::{SharedBindings, StageCore, create_shader, shared_layout_entries, validated};
use super::{FilterStage, StageConfig, StageSetup};
use crate::errors::{FrameError, PipelineResult};
use crate::gpu::{GpuContext, wgpu};
use crate::media::{
    FormatDescription, MediaTime, PixelBuffer, PixelFormat, TextureCache, TextureRole,
};
use crate::shaders::{StageShader, TextureReadback};
use std::sync::Arc;
use tracing::{debug, warn};

struct RenderResources {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bindings: SharedBindings,
    readback: TextureReadback,
    input_cache: TextureCache,
    render_cache: TextureCache,
}

/// Filter stage rendered with a full-screen quad
pub struct LegacyFilter {
    context: Arc<GpuContext>,
    core: StageCore,
    resources: Option<RenderResources>,
}

impl LegacyFilter {
    pub fn new(context: Arc<GpuContext>, config: StageConfig) -> Self {
        Self {
            context,
            core: StageCore::new("legacy", config),
            resources: None,
        }
    }

    fn create_resources(&self, output: FormatDescription) -> PipelineResult<RenderResources> {
        let device = self.context.device();
        let label = self.core.label();

        let shader = create_shader(device, StageShader::Render)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("legacy_stage_bind_group_layout"),
            entries: &shared_layout_entries(
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("legacy_stage_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("legacy_stage_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: output.pixel_format.texture_format(),
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            })
        })?;

        Ok(RenderResources {
            pipeline,
            bind_group_layout,
            bindings: SharedBindings::new(&self.context, label, self.core.overlay()),
            readback: TextureReadback::new(device, "legacy_stage_readback", output.dimensions),
            input_cache: TextureCache::new(
                self.context.clone(),
                format!("{} input", label),
                TextureRole::Sampled,
            ),
            render_cache: TextureCache::new(
                self.context.clone(),
                format!("{} render", label),
                TextureRole::RenderTarget,
            ),
        })
    }

    fn render(&mut self, input: &PixelBuffer, time: MediaTime) -> PipelineResult<PixelBuffer> {
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
        let output = self.core.obtain_output(|| {
            resources.input_cache.flush() + resources.render_cache.flush()
        })?;
        let target = resources
            .render_cache
            .import_texture(&output, PixelFormat::Bgra8)?;

        queue.write_buffer(
            &resources.bindings.uniform_buffer,
            0,
            bytemuck::bytes_of(&uniforms),
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("legacy_stage_bind_group"),
            layout: &resources.bind_group_layout,
            entries: &resources.bindings.entries(source.view()),
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("legacy_stage_encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("legacy_stage_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&resources.pipeline);
            render_pass.set_bind_group(0, Some(&bind_group), &[]);
            render_pass.draw(0..4, 0..1);
        }

        resources.readback.record_copy(&mut encoder, target.texture());
        queue.submit(std::iter::once(encoder.finish()));

        // Blocks until the draw and copy have completed
        resources.readback.read_into(device, &output)?;

        Ok(output)
    }
}

impl FilterStage for LegacyFilter {
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
        match self.render(input, time) {
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

impl Drop for LegacyFilter {
    fn drop(&mut self) {
        self.cleanup();
    }
}

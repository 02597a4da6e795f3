// SPDX-License-Identifier: GPL-3.0-only
//! Shared shader sources and GPU helpers for the filter stages
//!
//! Both backends run the same effect code: `effects.wgsl` declares the stage
//! bindings and the effect functions, and each backend appends its own entry
//! points. Composing the sources here keeps one canonical loader.

mod gpu_processor;
mod params;

pub use gpu_processor::{
    CachedDimensions, TextureReadback, compute_dispatch_size, padded_bytes_per_row,
    read_buffer_async, read_buffer_blocking,
};
pub use params::StageUniforms;

/// Shared bindings and effect functions (WGSL)
/// Contains: StageParams, luminance(), hash(), apply_effect(), shade()
pub const EFFECT_FUNCTIONS: &str = include_str!("effects.wgsl");

/// Legacy backend entry points (`vs_main`, `fs_main`)
const RENDER_STAGE_ENTRY: &str = include_str!("render_stage.wgsl");

/// Compute backend entry point (`main`)
const COMPUTE_STAGE_ENTRY: &str = include_str!("compute_stage.wgsl");

/// Which entry shader to compose with the effect functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageShader {
    Render,
    Compute,
}

impl StageShader {
    /// Complete WGSL source for this stage kind
    pub fn source(&self) -> String {
        let entry = match self {
            StageShader::Render => RENDER_STAGE_ENTRY,
            StageShader::Compute => COMPUTE_STAGE_ENTRY,
        };
        format!("{}\n{}", EFFECT_FUNCTIONS, entry)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageShader::Render => "render_stage_shader",
            StageShader::Compute => "compute_stage_shader",
        }
    }
}

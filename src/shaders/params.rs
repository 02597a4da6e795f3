// SPDX-License-Identifier: GPL-3.0-only

//! Uniform block shared by both stage shaders
//!
//! Mirrors `StageParams` in `effects.wgsl`; field order and padding must
//! match the WGSL layout (160 bytes).

use crate::geometry::Transform;
use crate::media::Dimensions;

/// Per-frame uniform state for one filter stage
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StageUniforms {
    /// Vertex transform (legacy backend), column-major
    pub transform: [[f32; 4]; 4],
    /// Output-to-source mapping (compute backend), column-major
    pub inverse_transform: [[f32; 4]; 4],
    /// Output width, height
    pub output_size: [f32; 2],
    /// Input width, height
    pub input_size: [f32; 2],
    /// Seconds since the stage saw its first frame
    pub time: f32,
    /// Effect selector (`FilterType::shader_mode`)
    pub effect_mode: u32,
    /// 1 if an overlay texture is bound
    pub has_overlay: u32,
    pub _padding: u32,
}

impl StageUniforms {
    pub fn new(
        transform: &Transform,
        input: Dimensions,
        output: Dimensions,
        time: f32,
        effect_mode: u32,
        has_overlay: bool,
    ) -> Self {
        // A singular transform collapses the quad; sample nothing
        let inverse = transform.inverse_2d().unwrap_or_else(Transform::zero);
        Self {
            transform: transform.to_cols(),
            inverse_transform: inverse.to_cols(),
            output_size: [output.width as f32, output.height as f32],
            input_size: [input.width as f32, input.height as f32],
            time,
            effect_mode,
            has_overlay: has_overlay as u32,
            _padding: 0,
        }
    }
}

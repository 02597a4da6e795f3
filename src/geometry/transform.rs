// SPDX-License-Identifier: GPL-3.0-only

//! 4x4 column-major transform matrices
//!
//! Transforms act on normalized device coordinates (x right, y up, both in
//! -1..1). The legacy backend multiplies quad vertices by the matrix; the
//! compute backend maps output pixels back through [`Transform::inverse_2d`].

use crate::media::Dimensions;
use std::ops::Mul;

const EPSILON: f32 = 1e-6;

/// Column-major 4x4 matrix (`cols[column][row]`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    cols: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    pub const fn identity() -> Self {
        Self::from_cols([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// All-zero matrix (maps everything to the origin)
    pub const fn zero() -> Self {
        Self::from_cols([[0.0; 4]; 4])
    }

    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        Self::from_cols([
            [x, 0.0, 0.0, 0.0],
            [0.0, y, 0.0, 0.0],
            [0.0, 0.0, z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        Self::from_cols([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [x, y, z, 1.0],
        ])
    }

    /// Counter-clockwise rotation about the Z axis
    pub fn z_rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::from_cols([
            [cos, sin, 0.0, 0.0],
            [-sin, cos, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Build from a 2D affine transform `[a b c d tx ty]`
    /// (`x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`)
    pub fn from_affine(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self::from_cols([
            [a, b, 0.0, 0.0],
            [c, d, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [tx, ty, 0.0, 1.0],
        ])
    }

    /// Columns, ready for a uniform buffer
    pub fn to_cols(&self) -> [[f32; 4]; 4] {
        self.cols
    }

    /// Element at `row`, `col`
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.cols[col][row]
    }

    /// Apply to a 2D point (z = 0, w = 1)
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let c = &self.cols;
        (
            c[0][0] * x + c[1][0] * y + c[3][0],
            c[0][1] * x + c[1][1] * y + c[3][1],
        )
    }

    /// Inverse of the XY affine part, `None` if it is singular
    pub fn inverse_2d(&self) -> Option<Transform> {
        let c = &self.cols;
        let (a, b, cc, d) = (c[0][0], c[0][1], c[1][0], c[1][1]);
        let (tx, ty) = (c[3][0], c[3][1]);
        let det = a * d - b * cc;
        if det.abs() < EPSILON {
            return None;
        }
        let ia = d / det;
        let ib = -b / det;
        let ic = -cc / det;
        let id = a / det;
        Some(Self::from_affine(
            ia,
            ib,
            ic,
            id,
            -(ia * tx + ic * ty),
            -(ib * tx + id * ty),
        ))
    }

    /// True for quarter-turn rotations that exchange the X and Y axes
    pub fn swaps_axes(&self) -> bool {
        let c = &self.cols;
        c[0][0].abs() < EPSILON
            && c[1][1].abs() < EPSILON
            && c[0][1].abs() > EPSILON
            && c[1][0].abs() > EPSILON
    }

    /// True if every element is within `epsilon` of `other`
    pub fn approx_eq(&self, other: &Transform, epsilon: f32) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Mul for Transform {
    type Output = Transform;

    /// `self * rhs`: applies `rhs` first, then `self`
    fn mul(self, rhs: Transform) -> Transform {
        let mut cols = [[0.0f32; 4]; 4];
        for (col, out) in cols.iter_mut().enumerate() {
            for (row, value) in out.iter_mut().enumerate() {
                *value = (0..4).map(|k| self.cols[k][row] * rhs.cols[col][k]).sum();
            }
        }
        Transform::from_cols(cols)
    }
}

/// Scale matrix that letterboxes `input` inside `output`, keeping aspect
///
/// The larger relative edge fills the output; the other edge shrinks.
pub fn scale_with_matrix(input: Dimensions, output: Dimensions) -> Transform {
    if input.is_empty() || output.is_empty() {
        return Transform::identity();
    }
    let input_aspect = input.aspect_ratio() as f32;
    let output_aspect = output.aspect_ratio() as f32;
    if input_aspect > output_aspect {
        Transform::scale(1.0, output_aspect / input_aspect, 0.0)
    } else {
        Transform::scale(input_aspect / output_aspect, 1.0, 0.0)
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Geometry: transforms, track orientation and content fitting

mod fit;
mod orientation;
mod transform;

pub use fit::{ContentFit, FitTransform, compute_fit};
pub use orientation::Orientation;
pub use transform::{Transform, scale_with_matrix};

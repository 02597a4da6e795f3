// SPDX-License-Identifier: GPL-3.0-only

//! Content-fit computation (pure, no GPU)
//!
//! Reconciles a source size with a presentation target under one of three
//! policies, producing a scale and a translation in target pixels.

use super::Transform;
use crate::media::Dimensions;
use serde::{Deserialize, Serialize};

/// How a source is reconciled with a target of a different aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentFit {
    /// Stretch each axis independently to the target
    Fill,
    /// Cover the target, cropping the overflow symmetrically
    #[default]
    AspectFill,
    /// Show the whole source, padding the short axis symmetrically
    AspectFit,
}

impl ContentFit {
    pub const ALL: [ContentFit; 3] = [
        ContentFit::Fill,
        ContentFit::AspectFill,
        ContentFit::AspectFit,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ContentFit::Fill => "fill",
            ContentFit::AspectFill => "aspect-fill",
            ContentFit::AspectFit => "aspect-fit",
        }
    }

    /// Parse from the display name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|fit| fit.display_name() == name)
    }
}

/// Scale and translation placing the source inside the target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    /// Left edge of the scaled source in target pixels
    pub translate_x: f64,
    /// Top edge of the scaled source in target pixels
    pub translate_y: f64,
    /// Source size after any portrait swap
    pub source_width: f64,
    pub source_height: f64,
    pub target_width: f64,
    pub target_height: f64,
}

/// Compute the fit of `source` into `target`
///
/// With `portrait` set, a landscape source is treated as rotated (its edges
/// swapped) before the ratios are taken.
pub fn compute_fit(
    source: Dimensions,
    target: Dimensions,
    policy: ContentFit,
    portrait: bool,
) -> FitTransform {
    let source = if portrait && source.width > source.height {
        source.swapped()
    } else {
        source
    };
    let (sw, sh) = (source.width as f64, source.height as f64);
    let (tw, th) = (target.width as f64, target.height as f64);

    let mut fit = FitTransform {
        scale_x: 1.0,
        scale_y: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
        source_width: sw,
        source_height: sh,
        target_width: tw,
        target_height: th,
    };

    if source.is_empty() || target.is_empty() {
        return fit;
    }

    let width_ratio = tw / sw;
    let height_ratio = th / sh;

    let (scale_x, scale_y) = match policy {
        ContentFit::Fill => (width_ratio, height_ratio),
        ContentFit::AspectFill => {
            let scale = width_ratio.max(height_ratio);
            (scale, scale)
        }
        ContentFit::AspectFit => {
            let scale = width_ratio.min(height_ratio);
            (scale, scale)
        }
    };
    fit.scale_x = scale_x;
    fit.scale_y = scale_y;

    if policy != ContentFit::Fill {
        fit.translate_x = (tw - sw * scale_x) / 2.0;
        fit.translate_y = (th - sh * scale_y) / 2.0;
    }

    fit
}

impl FitTransform {
    /// Uniform scale (X scale; equal to Y for the aspect policies)
    pub fn scale(&self) -> f64 {
        self.scale_x
    }

    /// Source size after scaling, in target pixels
    pub fn scaled_size(&self) -> (f64, f64) {
        (
            self.source_width * self.scale_x,
            self.source_height * self.scale_y,
        )
    }

    /// Same placement as a transform on normalized device coordinates
    ///
    /// Maps the source quad (-1..1 on both axes) onto the region of the
    /// target it occupies.
    pub fn to_ndc_transform(&self) -> Transform {
        if self.target_width <= 0.0 || self.target_height <= 0.0 {
            return Transform::identity();
        }
        let (scaled_w, scaled_h) = self.scaled_size();
        let sx = scaled_w / self.target_width;
        let sy = scaled_h / self.target_height;
        let tx = (2.0 * self.translate_x + scaled_w) / self.target_width - 1.0;
        // Target pixels grow downwards, NDC grows upwards
        let ty = 1.0 - (2.0 * self.translate_y + scaled_h) / self.target_height;
        Transform::translation(tx as f32, ty as f32, 0.0) * Transform::scale(sx as f32, sy as f32, 1.0)
    }
}

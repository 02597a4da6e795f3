// SPDX-License-Identifier: GPL-3.0-only

//! Filter catalogue and per-stage configuration

use crate::geometry::Transform;
use crate::media::{Dimensions, PixelBuffer};
use serde::{Deserialize, Serialize};

pub use crate::shaders::StageUniforms;

/// Visual effect applied by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// No effect (the chain's leading stage)
    #[default]
    #[serde(rename = "normal")]
    Passthrough,
    #[serde(rename = "wave_pool")]
    WavePool,
    #[serde(rename = "plasma")]
    Plasma,
    #[serde(rename = "em_interference")]
    EmInterference,
    #[serde(rename = "rgb")]
    Rgb,
    #[serde(rename = "lego")]
    Lego,
    #[serde(rename = "chroma")]
    Chroma,
    #[serde(rename = "rave")]
    Rave,
    #[serde(rename = "mirror_2")]
    MirrorTwo,
    #[serde(rename = "mirror_4")]
    MirrorFour,
    #[serde(rename = "light_leaks")]
    LightLeaks,
    #[serde(rename = "film")]
    Film,
    #[serde(rename = "grayscale")]
    Grayscale,
    #[serde(rename = "manga")]
    Manga,
    #[serde(rename = "toon")]
    Toon,
    /// Filters switched off entirely
    #[serde(rename = "off")]
    Off,
}

impl FilterType {
    /// Every filter, in catalogue order
    pub const ALL: [FilterType; 16] = [
        FilterType::Passthrough,
        FilterType::WavePool,
        FilterType::Plasma,
        FilterType::EmInterference,
        FilterType::Rgb,
        FilterType::Lego,
        FilterType::Chroma,
        FilterType::Rave,
        FilterType::MirrorTwo,
        FilterType::MirrorFour,
        FilterType::LightLeaks,
        FilterType::Film,
        FilterType::Grayscale,
        FilterType::Manga,
        FilterType::Toon,
        FilterType::Off,
    ];

    /// Key used in logs and on the command line (`None` for off)
    pub fn key(&self) -> Option<&'static str> {
        let key = match self {
            FilterType::Passthrough => "normal",
            FilterType::WavePool => "wave_pool",
            FilterType::Plasma => "plasma",
            FilterType::EmInterference => "em_interference",
            FilterType::Rgb => "rgb",
            FilterType::Lego => "lego",
            FilterType::Chroma => "chroma",
            FilterType::Rave => "rave",
            FilterType::MirrorTwo => "mirror_2",
            FilterType::MirrorFour => "mirror_4",
            FilterType::LightLeaks => "light_leaks",
            FilterType::Film => "film",
            FilterType::Grayscale => "grayscale",
            FilterType::Manga => "manga",
            FilterType::Toon => "toon",
            FilterType::Off => return None,
        };
        Some(key)
    }

    /// Parse from a key; "off" selects [`FilterType::Off`]
    pub fn from_key(key: &str) -> Option<Self> {
        if key == "off" {
            return Some(FilterType::Off);
        }
        Self::ALL.into_iter().find(|filter| filter.key() == Some(key))
    }

    /// Key or "off", for display
    pub fn name(&self) -> &'static str {
        self.key().unwrap_or("off")
    }

    /// True if the filter changes the image
    pub fn is_applied(&self) -> bool {
        !matches!(self, FilterType::Off | FilterType::Passthrough)
    }

    /// Effect selector in `effects.wgsl` (off renders as passthrough)
    pub fn shader_mode(&self) -> u32 {
        match self {
            FilterType::Off => 0,
            other => *other as u32,
        }
    }
}

impl std::fmt::Display for FilterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which implementation runs a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterBackend {
    /// Full-screen quad through a render pass, vertices transformed
    Legacy,
    /// Compute dispatch over the output, sampling through the inverse transform
    #[default]
    Compute,
}

impl FilterBackend {
    pub const ALL: [FilterBackend; 2] = [FilterBackend::Legacy, FilterBackend::Compute];

    pub fn display_name(&self) -> &'static str {
        match self {
            FilterBackend::Legacy => "legacy",
            FilterBackend::Compute => "compute",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.display_name() == name)
    }
}

/// Everything a stage renders with, fixed at construction
#[derive(Debug, Clone, Default)]
pub struct StageConfig {
    pub effect: FilterType,
    /// Composited over the effect after scaling to the output size
    pub overlay: Option<PixelBuffer>,
}

impl StageConfig {
    pub fn effect(effect: FilterType) -> Self {
        Self {
            effect,
            overlay: None,
        }
    }

    /// Passthrough stage that only blends `overlay` on top
    pub fn overlay(overlay: PixelBuffer) -> Self {
        Self {
            effect: FilterType::Passthrough,
            overlay: Some(overlay),
        }
    }

    /// Short description for logs
    pub fn label(&self) -> String {
        match &self.overlay {
            Some(_) => format!("{}+overlay", self.effect.name()),
            None => self.effect.name().to_string(),
        }
    }
}

/// Arguments to `prepare` besides the first sample's format
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageSetup {
    /// Transform applied to the source (identity when `None`)
    pub transform: Option<Transform>,
    /// Output size override (input size when `None` or empty)
    pub output_dimensions: Option<Dimensions>,
    /// Swap the output edges (portrait source)
    pub swap_dimensions: bool,
}

impl StageSetup {
    /// Output size a stage negotiates for an input of `input`
    pub fn resolve_output(&self, input: Dimensions) -> Dimensions {
        let output = self
            .output_dimensions
            .filter(|dims| !dims.is_empty())
            .unwrap_or(input);
        if self.swap_dimensions {
            output.swapped()
        } else {
            output
        }
    }
}

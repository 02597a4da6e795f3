// SPDX-License-Identifier: GPL-3.0-only

use crate::errors::{PipelineError, PipelineResult};
use crate::filters::{FilterBackend, FilterType};
use crate::geometry::ContentFit;
use crate::media::Dimensions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the user's config directory
const CONFIG_DIR: &str = "camera-pipeline";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Per-instance pipeline settings
///
/// These are read once when a pipeline is built; changing them requires a
/// new pipeline (or `Renderer::refresh_filter`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which backend executes the filter stages
    pub backend: FilterBackend,
    /// Effect applied by the chain's effect stage
    pub filter: FilterType,
    /// How the final output is fitted into the presentation target
    pub content_fit: ContentFit,
    /// Present in portrait (swaps landscape sources before fitting)
    pub portrait: bool,
    /// Presentation target width (None = keep the chain's output size)
    pub target_width: Option<u32>,
    /// Presentation target height (None = keep the chain's output size)
    pub target_height: Option<u32>,
    /// Overlay images composited on top of the effect, in order
    pub overlays: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: FilterBackend::default(),
            filter: FilterType::Passthrough,
            content_fit: ContentFit::default(), // Aspect fill, like a camera preview
            portrait: false,
            target_width: None,
            target_height: None,
            overlays: Vec::new(),
        }
    }
}

impl Config {
    /// Default location: `$XDG_CONFIG_HOME/camera-pipeline/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the config from the default location
    ///
    /// A missing file (or no config directory at all) yields the defaults.
    pub fn load() -> PipelineResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load the config from an explicit path
    pub fn load_from(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), backend = ?config.backend, filter = ?config.filter, "Loaded config");
        Ok(config)
    }

    /// Save the config to the default location
    pub fn save(&self) -> PipelineResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| PipelineError::Config("No config directory available".into()))?;
        self.save_to(&path)
    }

    /// Save the config to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> PipelineResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Presentation target, if both edges are configured and non-zero
    pub fn target_dimensions(&self) -> Option<Dimensions> {
        match (self.target_width, self.target_height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(Dimensions::new(width, height))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_requires_both_edges() {
        let mut config = Config::default();
        assert_eq!(config.target_dimensions(), None);

        config.target_width = Some(1080);
        assert_eq!(config.target_dimensions(), None);

        config.target_height = Some(1920);
        assert_eq!(config.target_dimensions(), Some(Dimensions::new(1080, 1920)));

        config.target_height = Some(0);
        assert_eq!(config.target_dimensions(), None);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{ "portrait": true }"#).unwrap();
        assert!(config.portrait);
        assert_eq!(config.filter, FilterType::Passthrough);
        assert!(config.overlays.is_empty());
    }
}

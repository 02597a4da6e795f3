// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the display hand-off treats a buffer that arrives while another is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DropPolicy {
    /// Keep the pending buffer, discard the new one
    #[default]
    DropNewest,
    /// Discard the pending buffer, keep the new one
    ReplacePending,
}

impl DropPolicy {
    /// Get all policy variants
    pub const ALL: [DropPolicy; 2] = [DropPolicy::DropNewest, DropPolicy::ReplacePending];

    /// Get display name for the policy
    pub fn display_name(&self) -> &'static str {
        match self {
            DropPolicy::DropNewest => "Drop newest",
            DropPolicy::ReplacePending => "Replace pending",
        }
    }
}

/// Buffer pool and texture cache constants
pub mod buffers {
    /// Buffers each stage may have outstanding at once
    ///
    /// Three absorbs one frame of GPU latency plus one frame held by the
    /// display and one frame being written.
    pub const RETAINED_BUFFER_COUNT: usize = 3;

    /// Bytes per pixel for the 32-bit BGRA layout
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Imports a cached texture may go unused before it is released
    pub const TEXTURE_CACHE_MAX_AGE: u64 = 1;

    /// Largest edge accepted for a pool buffer
    pub const MAX_DIMENSION: u32 = 8192;
}

/// GPU dispatch constants
pub mod gpu {
    /// Compute threadgroup edge (16x16 threads)
    pub const WORKGROUP_SIZE: u32 = 16;

    /// Row pitch alignment wgpu requires for texture to buffer copies
    pub const COPY_ROW_ALIGNMENT: u32 = 256;
}

/// Median-cut palette constants
pub mod palette {
    /// Significant bits kept per channel
    pub const SIGNAL_BITS: u32 = 5;

    /// Pixels with alpha below this are ignored
    pub const ALPHA_THRESHOLD: u8 = 125;

    /// Pixels with every channel above this count as white
    pub const WHITE_THRESHOLD: u8 = 250;

    /// Share of the palette produced by the population-sorted phase
    pub const FRACTION_BY_POPULATION: f64 = 0.75;

    /// Split iterations allowed per phase
    pub const MAX_ITERATIONS: usize = 1000;

    /// Smallest palette that can be requested
    pub const MIN_COLORS: usize = 2;

    /// Largest palette that can be requested
    pub const MAX_COLORS: usize = 256;

    /// Default sampling stride (1 = every pixel)
    pub const DEFAULT_QUALITY: usize = 10;

    /// White pixels are skipped unless asked otherwise
    pub const DEFAULT_IGNORE_WHITE: bool = true;

    /// Palette size used to pick a dominant color
    pub const DOMINANT_PALETTE_SIZE: usize = 5;
}

/// Preview demo timing constants
pub mod timing {
    use super::Duration;

    /// Synthetic camera frame interval (~60fps)
    pub const CAPTURE_FRAME_DURATION: Duration = Duration::from_millis(16);

    /// Display refresh interval (~30fps)
    pub const DISPLAY_FRAME_DURATION: Duration = Duration::from_millis(33);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_policy_default() {
        assert_eq!(DropPolicy::default(), DropPolicy::DropNewest);
    }

    #[test]
    fn test_pool_depth_absorbs_gpu_latency() {
        assert!(buffers::RETAINED_BUFFER_COUNT >= 3);
    }

    #[test]
    fn test_palette_bounds() {
        assert!(palette::MIN_COLORS < palette::MAX_COLORS);
        assert!(palette::DOMINANT_PALETTE_SIZE >= palette::MIN_COLORS);
    }
}

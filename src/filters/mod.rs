// SPDX-License-Identifier: GPL-3.0-only

//! Filter stages and chains
//!
//! A [`FilterStage`] turns one input pixel buffer into one output buffer.
//! Two backends implement it with the same external behaviour:
//!
//! - [`LegacyFilter`]: full-screen quad through a render pass
//! - [`ComputeFilter`]: 16x16 compute workgroups over the output
//!
//! [`FilterChain`] folds a frame through an ordered list of stages and is a
//! stage itself. Call sites build stages through [`StageFactory`] and never
//! name a backend type.

mod chain;
mod compute;
mod factory;
mod legacy;
pub mod overlay;
mod stage;
mod types;

pub use chain::FilterChain;
pub use compute::ComputeFilter;
pub use factory::{ChainFactory, StageFactory, create_chain, create_stage};
pub use legacy::LegacyFilter;
pub use types::{FilterBackend, FilterType, StageConfig, StageSetup, StageUniforms};

use crate::errors::PipelineResult;
use crate::media::{FormatDescription, MediaTime, PixelBuffer};

/// One GPU filter program plus its uniform state
pub trait FilterStage: Send {
    /// Name used in logs
    fn label(&self) -> &str;

    /// Negotiate the output format from the first sample
    ///
    /// Only the first successful call has an effect; later calls return
    /// `Ok(())` without changing anything. Errors are setup failures and
    /// leave the stage unprepared.
    fn prepare(&mut self, format: &FormatDescription, setup: &StageSetup) -> PipelineResult<()>;

    /// Output format, `None` until prepared
    fn output_format(&self) -> Option<FormatDescription>;

    /// Filter one frame
    ///
    /// `None` means "drop this frame"; the stage remains usable.
    fn process(&mut self, input: &PixelBuffer, time: MediaTime) -> Option<PixelBuffer>;

    /// Release GPU resources; safe to call repeatedly
    fn cleanup(&mut self);
}

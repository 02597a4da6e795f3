// SPDX-License-Identifier: MPL-2.0

//! Camera Pipeline - real-time GPU filtering of camera frames
//!
//! Takes a stream of time-stamped BGRA pixel buffers, runs them through a
//! chain of GPU filter stages and hands the results to a recorder and a
//! display. Frames that cannot be processed in time are dropped rather than
//! queued, so memory stays bounded by the stages' buffer pools.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`media`]: Pixel buffers, buffer pools, texture caches and frames
//! - [`gpu`]: Device creation and scoped context binding
//! - [`shaders`]: WGSL sources and GPU readback helpers
//! - [`filters`]: Filter stages on two backends, chains and the stage factory
//! - [`geometry`]: Transforms, track orientation and content fitting
//! - [`pipelines`]: Renderer, fit scaler and presentation sink
//! - [`palette`]: Median-cut color quantization
//! - [`backends`]: Capture loop threads and a synthetic camera
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let context = GpuContext::new_blocking("filters")?;
//! let factory = StageFactory::new(context, FilterBackend::Compute);
//! let mut chain = factory.create_chain(FilterType::Film, &[]);
//! chain.prepare(&frame.format(), &StageSetup::default())?;
//! let filtered = chain.process(&frame.buffer, frame.presentation_time);
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filters;
pub mod geometry;
pub mod gpu;
pub mod media;
pub mod palette;
pub mod pipelines;
pub mod shaders;

// Re-export commonly used types
pub use config::Config;
pub use constants::DropPolicy;
pub use errors::{FrameError, PipelineError, PipelineResult, SetupError};
pub use filters::{
    ChainFactory, FilterBackend, FilterChain, FilterStage, FilterType, StageConfig, StageFactory,
    StageSetup,
};
pub use geometry::{ContentFit, Orientation, Transform, compute_fit};
pub use gpu::GpuContext;
pub use media::{BufferPool, Dimensions, FormatDescription, Frame, MediaTime, PixelBuffer, PixelFormat};
pub use pipelines::{PresentationSink, Renderer, RendererDelegate, Scaler};

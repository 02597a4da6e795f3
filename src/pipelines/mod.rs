// SPDX-License-Identifier: MPL-2.0

//! Frame pipelines built on the filter stages
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Capture      │ ──▶ │  Renderer         │ ──▶ │  Delegate        │
//! │ (BGRA frame) │     │  - Filter chain   │     │  (every frame)   │
//! │              │     │  - Overlays       │     └──────────────────┘
//! │              │     │  - Orientation    │     ┌──────────────────┐
//! │              │     │                   │ ──▶ │ Presentation     │
//! └──────────────┘     └───────────────────┘     │ (newest frame)   │
//!                                                └──────────────────┘
//! ```
//!
//! # Design Principles
//!
//! 1. **Drop, don't queue**: a frame that cannot be processed or shown in
//!    time is discarded; memory stays bounded by the buffer pools
//! 2. **Format fixed by the first frame**: chains negotiate once and are
//!    rebuilt only when their configuration changes
//!
//! # Modules
//!
//! - [`presentation`]: One-slot display hand-off with a drop policy
//! - [`renderer`]: Chain owner for a live session
//! - [`scaler`]: Fit-to-target scaling stage

pub mod presentation;
pub mod renderer;
pub mod scaler;

pub use presentation::{PresentationSink, PresentationStats};
pub use renderer::{Renderer, RendererDelegate, RendererStats};
pub use scaler::Scaler;

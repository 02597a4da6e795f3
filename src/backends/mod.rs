// SPDX-License-Identifier: MPL-2.0

//! Frame sources
//!
//! # Modules
//!
//! - [`frame_loop`]: Named, optionally paced threads driving a source
//! - [`synthetic`]: Test-pattern camera with a bounded buffer pool

pub mod frame_loop;
pub mod synthetic;

pub use frame_loop::{CaptureLoopController, LoopAction};
pub use synthetic::{SyntheticSource, TestPattern};

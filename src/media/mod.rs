// SPDX-License-Identifier: MPL-2.0

//! Pixel buffers and the resources that back them
//!
//! # Buffers
//!
//! [`PixelBuffer`] is a fixed-size, fixed-format block of pixel memory.
//! [`BufferPool`] hands out a bounded number of them and fails fast when the
//! cap is reached; that failure is the pipeline's backpressure signal.
//!
//! # Textures
//!
//! [`TextureCache`] imports buffers as GPU textures for one stage and can be
//! flushed to hand idle buffers back to their pool.
//!
//! # Modules
//!
//! - [`format`]: Pixel formats, dimensions and negotiated format descriptions
//! - [`frame`]: Presentation times and input frames
//! - [`image_io`]: Loading and saving stills

mod buffer_pool;
pub mod format;
pub mod frame;
pub mod image_io;
mod pixel_buffer;
mod texture_cache;

pub use buffer_pool::BufferPool;
pub use format::{Dimensions, FormatDescription, PixelFormat};
pub use frame::{Frame, MediaTime};
pub use image_io::{load_image, save_image};
pub use pixel_buffer::PixelBuffer;
pub use texture_cache::{Texture, TextureCache, TextureRole};

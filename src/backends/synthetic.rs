// SPDX-License-Identifier: GPL-3.0-only
//! Synthetic camera
//!
//! Produces BGRA test-pattern frames from its own bounded pool, stamped with
//! `index / fps` presentation times. Stands in for a capture device in the
//! preview command and in tests.

use crate::errors::{PipelineError, PipelineResult};
use crate::geometry::Orientation;
use crate::media::{BufferPool, Dimensions, Frame, MediaTime, PixelBuffer, PixelFormat};
use tracing::trace;

/// Test pattern drawn into each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestPattern {
    /// Diagonal gradient that scrolls one pixel per frame
    #[default]
    Gradient,
    /// Eight vertical color bars
    Bars,
    /// One flat color per frame, cycling through the bars
    Flat,
}

const BARS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
    [0, 0, 0],
];

/// Frame source producing a test pattern at a fixed rate
pub struct SyntheticSource {
    pool: BufferPool,
    fps: i32,
    pattern: TestPattern,
    orientation: Orientation,
    index: u64,
}

impl SyntheticSource {
    /// Source of `dimensions` frames at `fps`, holding at most `max_buffers`
    /// undelivered or in-use frames
    pub fn new(
        dimensions: Dimensions,
        fps: u32,
        pattern: TestPattern,
        max_buffers: usize,
    ) -> PipelineResult<Self> {
        let fps = match i32::try_from(fps) {
            Ok(fps) if fps > 0 => fps,
            _ => return Err(PipelineError::Config(format!("invalid frame rate {}", fps))),
        };
        let pool = BufferPool::new(dimensions.width, dimensions.height, PixelFormat::Bgra8, max_buffers)?;
        Ok(Self {
            pool,
            fps,
            pattern,
            orientation: Orientation::Up,
            index: 0,
        })
    }

    /// Tag frames with a track orientation
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn dimensions(&self) -> Dimensions {
        self.pool.dimensions()
    }

    pub fn fps(&self) -> u32 {
        self.fps.unsigned_abs()
    }

    /// Frames produced so far
    pub fn frames_produced(&self) -> u64 {
        self.index
    }

    /// Produce the next frame
    ///
    /// Fails with a pool-exhausted frame error while every buffer is still
    /// held downstream; the frame index does not advance in that case.
    pub fn next_frame(&mut self) -> PipelineResult<Frame> {
        let buffer = self.pool.obtain()?;
        draw_pattern(&buffer, self.pattern, self.index);

        let time = MediaTime::new(self.index as i64, self.fps);
        trace!(index = self.index, time = %time, "Synthetic frame");
        self.index += 1;

        let frame = Frame::new(buffer, time);
        Ok(match self.orientation.transform() {
            Some(transform) => frame.with_transform(transform),
            None => frame,
        })
    }
}

fn draw_pattern(buffer: &PixelBuffer, pattern: TestPattern, index: u64) {
    let (width, height) = (buffer.width() as usize, buffer.height() as usize);
    let row = buffer.bytes_per_row();
    buffer.with_bytes_mut(|bytes| {
        for (y, line) in bytes.chunks_exact_mut(row).enumerate() {
            for (x, pixel) in line.chunks_exact_mut(4).enumerate() {
                let [r, g, b] = match pattern {
                    TestPattern::Gradient => {
                        let shifted = (x + index as usize) % width.max(1);
                        [
                            (shifted * 255 / width.max(1)) as u8,
                            (y * 255 / height.max(1)) as u8,
                            128,
                        ]
                    }
                    TestPattern::Bars => BARS[x * BARS.len() / width.max(1)],
                    TestPattern::Flat => BARS[index as usize % BARS.len()],
                };
                pixel.copy_from_slice(&[b, g, r, 255]);
            }
        }
    });
}

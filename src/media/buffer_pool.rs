// SPDX-License-Identifier: GPL-3.0-only

//! Bounded pool of same-format pixel buffers
//!
//! All slots are allocated up front. `obtain` hands out a slot and fails
//! fast with [`FrameError::PoolExhausted`] once `max_buffers` slots are
//! outstanding; it never grows. A slot comes back when the last
//! [`PixelBuffer`] handle to it is dropped.

use super::pixel_buffer::next_buffer_id;
use super::{Dimensions, FormatDescription, PixelBuffer, PixelFormat};
use crate::errors::{FrameError, PipelineResult, SetupError};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Handle to a pool; clones share the same slots
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

pub(crate) struct PoolShared {
    format: FormatDescription,
    max_buffers: usize,
    state: Mutex<PoolState>,
}

struct PoolState {
    free: Vec<(u64, Vec<u8>)>,
    outstanding: usize,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn recycle(&self, id: u64, data: Vec<u8>) {
        let mut state = self.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        state.free.push((id, data));
        trace!(id, outstanding = state.outstanding, "Buffer returned to pool");
    }
}

impl BufferPool {
    /// Create a pool of `max_buffers` buffers of one size and format
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        max_buffers: usize,
    ) -> PipelineResult<Self> {
        let dimensions = Dimensions::new(width, height);
        dimensions.validate()?;
        if max_buffers == 0 {
            return Err(SetupError::PoolAllocation("pool needs at least one buffer".into()).into());
        }

        let size = dimensions.area() * format.bytes_per_pixel();
        let mut free = Vec::new();
        free.try_reserve_exact(max_buffers)
            .map_err(|e| SetupError::PoolAllocation(e.to_string()))?;
        for _ in 0..max_buffers {
            let mut data = Vec::new();
            data.try_reserve_exact(size)
                .map_err(|e| SetupError::PoolAllocation(format!("{} bytes: {}", size, e)))?;
            data.resize(size, 0);
            free.push((next_buffer_id(), data));
        }

        debug!(
            width,
            height,
            format = %format,
            max_buffers,
            "Created buffer pool"
        );

        Ok(Self {
            shared: Arc::new(PoolShared {
                format: FormatDescription::new(dimensions, format),
                max_buffers,
                state: Mutex::new(PoolState {
                    free,
                    outstanding: 0,
                }),
            }),
        })
    }

    /// Hand out a free buffer, or fail if `max_buffers` are outstanding
    pub fn obtain(&self) -> PipelineResult<PixelBuffer> {
        let mut state = self.shared.lock();
        if state.outstanding >= self.shared.max_buffers {
            return Err(FrameError::PoolExhausted.into());
        }
        let Some((id, data)) = state.free.pop() else {
            return Err(FrameError::PoolExhausted.into());
        };
        state.outstanding += 1;
        drop(state);

        Ok(PixelBuffer::from_parts(
            id,
            self.shared.format.dimensions,
            self.shared.format.pixel_format,
            data,
            Some(Arc::downgrade(&self.shared)),
        ))
    }

    /// Format every buffer in this pool has
    pub fn format(&self) -> FormatDescription {
        self.shared.format
    }

    pub fn dimensions(&self) -> Dimensions {
        self.shared.format.dimensions
    }

    pub fn max_buffers(&self) -> usize {
        self.shared.max_buffers
    }

    /// Buffers currently handed out
    pub fn outstanding(&self) -> usize {
        self.shared.lock().outstanding
    }

    /// Buffers that `obtain` can still hand out
    pub fn available(&self) -> usize {
        self.shared.max_buffers - self.outstanding()
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("format", &self.shared.format)
            .field("max_buffers", &self.shared.max_buffers)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ids_are_reused() {
        let pool = BufferPool::new(4, 4, PixelFormat::Bgra8, 1).unwrap();
        let first = pool.obtain().unwrap();
        let id = first.id();
        drop(first);
        let second = pool.obtain().unwrap();
        assert_eq!(second.id(), id);
        assert!(second.is_pooled());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = BufferPool::new(4, 4, PixelFormat::Bgra8, 0).unwrap_err();
        assert!(matches!(err, crate::errors::PipelineError::Setup(_)));
    }

    #[test]
    fn test_buffer_outlives_pool() {
        let pool = BufferPool::new(2, 2, PixelFormat::Bgra8, 2).unwrap();
        let buffer = pool.obtain().unwrap();
        drop(pool);
        assert_eq!(buffer.dimensions(), Dimensions::new(2, 2));
        drop(buffer);
    }
}

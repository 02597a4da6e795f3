// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-size, fixed-format image memory shared between stages
//!
//! A [`PixelBuffer`] is a cheap handle (`Arc`) over one block of pixel
//! memory. Clones share the same memory. When the last handle to a pooled
//! buffer goes away the memory returns to its [`BufferPool`](super::BufferPool)
//! slot instead of being freed.

use super::buffer_pool::PoolShared;
use super::{Dimensions, PixelFormat};
use crate::errors::{FrameError, PipelineResult};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Identity shared by every buffer ever created, pooled or not
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_buffer_id() -> u64 {
    NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to one block of pixel memory
#[derive(Clone)]
pub struct PixelBuffer {
    inner: Arc<BufferStorage>,
}

struct BufferStorage {
    id: u64,
    dimensions: Dimensions,
    format: PixelFormat,
    data: RwLock<Vec<u8>>,
    pool: Option<Weak<PoolShared>>,
}

impl Drop for BufferStorage {
    fn drop(&mut self) {
        let Some(pool) = self.pool.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let data = match self.data.get_mut() {
            Ok(data) => std::mem::take(data),
            Err(poisoned) => std::mem::take(poisoned.into_inner()),
        };
        pool.recycle(self.id, data);
    }
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer outside any pool
    pub fn new(width: u32, height: u32, format: PixelFormat) -> PipelineResult<Self> {
        let dimensions = Dimensions::new(width, height);
        dimensions.validate()?;
        let data = vec![0u8; dimensions.area() * format.bytes_per_pixel()];
        Ok(Self::from_parts(next_buffer_id(), dimensions, format, data, None))
    }

    /// Wrap existing pixel bytes (tightly packed rows)
    pub fn from_bytes(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> PipelineResult<Self> {
        let dimensions = Dimensions::new(width, height);
        dimensions.validate()?;
        let expected = dimensions.area() * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(FrameError::ImportFailed(format!(
                "{} bytes for a {} {} buffer, expected {}",
                data.len(),
                dimensions,
                format,
                expected
            ))
            .into());
        }
        Ok(Self::from_parts(next_buffer_id(), dimensions, format, data, None))
    }

    pub(crate) fn from_parts(
        id: u64,
        dimensions: Dimensions,
        format: PixelFormat,
        data: Vec<u8>,
        pool: Option<Weak<PoolShared>>,
    ) -> Self {
        Self {
            inner: Arc::new(BufferStorage {
                id,
                dimensions,
                format,
                data: RwLock::new(data),
                pool,
            }),
        }
    }

    /// Stable identity of the underlying memory (pool slots keep their id)
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.inner.dimensions.height
    }

    pub fn dimensions(&self) -> Dimensions {
        self.inner.dimensions
    }

    pub fn format(&self) -> PixelFormat {
        self.inner.format
    }

    /// Tightly packed row length in bytes
    pub fn bytes_per_row(&self) -> usize {
        self.width() as usize * self.inner.format.bytes_per_pixel()
    }

    /// True if the buffer belongs to a pool
    pub fn is_pooled(&self) -> bool {
        self.inner.pool.is_some()
    }

    /// True if both handles refer to the same memory
    pub fn same_buffer(&self, other: &PixelBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this memory
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.inner
            .data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.inner
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Borrow the pixel bytes
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.read_guard())
    }

    /// Mutably borrow the pixel bytes (dimensions and format stay fixed)
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.write_guard())
    }

    /// Copy the pixel bytes out
    pub fn to_vec(&self) -> Vec<u8> {
        self.read_guard().clone()
    }

    /// Copy into a new unpooled buffer with the requested channel order
    pub fn converted(&self, format: PixelFormat) -> PipelineResult<PixelBuffer> {
        let mut data = self.to_vec();
        if format != self.format() {
            // BGRA <-> RGBA is the same swap in both directions
            for pixel in data.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
        }
        PixelBuffer::from_bytes(self.width(), self.height(), format, data)
    }
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.same_buffer(other)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("id", &self.id())
            .field("dimensions", &self.dimensions())
            .field("format", &self.format())
            .field("pooled", &self.is_pooled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(PixelBuffer::from_bytes(2, 2, PixelFormat::Bgra8, vec![0; 16]).is_ok());
        let err = PixelBuffer::from_bytes(2, 2, PixelFormat::Bgra8, vec![0; 15]).unwrap_err();
        assert!(err.is_frame_failure());
    }

    #[test]
    fn test_clones_share_memory() {
        let a = PixelBuffer::new(1, 1, PixelFormat::Bgra8).unwrap();
        let b = a.clone();
        b.with_bytes_mut(|bytes| bytes[0] = 42);
        assert_eq!(a.with_bytes(|bytes| bytes[0]), 42);
        assert!(a.same_buffer(&b));
        assert_eq!(a.handle_count(), 2);
    }

    #[test]
    fn test_converted_swaps_red_and_blue() {
        let bgra = PixelBuffer::from_bytes(1, 1, PixelFormat::Bgra8, vec![1, 2, 3, 4]).unwrap();
        let rgba = bgra.converted(PixelFormat::Rgba8).unwrap();
        assert_eq!(rgba.to_vec(), vec![3, 2, 1, 4]);
        assert_eq!(rgba.format(), PixelFormat::Rgba8);
        assert!(!rgba.same_buffer(&bgra));
    }
}

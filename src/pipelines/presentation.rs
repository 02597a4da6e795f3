// SPDX-License-Identifier: GPL-3.0-only

//! Presentation sink
//!
//! Decouples the producer's frame rate from the display's. At most one buffer
//! waits for the next draw; what happens to a buffer that arrives while one
//! is waiting is decided by the sink's [`DropPolicy`].

use crate::constants::DropPolicy;
use crate::media::PixelBuffer;
use std::sync::Mutex;
use tokio::sync::Notify;
use tracing::trace;

/// Counters since the sink was created or last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentationStats {
    /// Buffers passed to `display`
    pub submitted: u64,
    /// Buffers discarded without being drawn
    pub dropped: u64,
    /// Buffers handed to a draw
    pub drawn: u64,
}

#[derive(Default)]
struct SinkState {
    pending: Option<PixelBuffer>,
    stats: PresentationStats,
}

/// One-slot hand-off between a producer and a display
pub struct PresentationSink {
    policy: DropPolicy,
    state: Mutex<SinkState>,
    frame_ready: Notify,
}

impl PresentationSink {
    pub fn new(policy: DropPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(SinkState::default()),
            frame_ready: Notify::new(),
        }
    }

    pub fn policy(&self) -> DropPolicy {
        self.policy
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        // A panic while holding the lock cannot leave the slot inconsistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Offer `buffer` for presentation
    ///
    /// Returns `true` if the buffer is now the pending one. Under
    /// [`DropPolicy::DropNewest`] a buffer offered while another is pending
    /// is discarded; under [`DropPolicy::ReplacePending`] it replaces the
    /// pending buffer, which is discarded instead.
    pub fn display(&self, buffer: PixelBuffer) -> bool {
        let accepted = {
            let mut state = self.lock();
            state.stats.submitted += 1;
            match (&state.pending, self.policy) {
                (Some(_), DropPolicy::DropNewest) => {
                    state.stats.dropped += 1;
                    trace!(buffer = buffer.id(), "Display busy, dropping new frame");
                    false
                }
                (Some(_), DropPolicy::ReplacePending) => {
                    state.stats.dropped += 1;
                    state.pending = Some(buffer);
                    true
                }
                (None, _) => {
                    state.pending = Some(buffer);
                    true
                }
            }
        };
        if accepted {
            self.frame_ready.notify_one();
        }
        accepted
    }

    /// Take the pending buffer for drawing
    pub fn take_pending(&self) -> Option<PixelBuffer> {
        let mut state = self.lock();
        let buffer = state.pending.take();
        if buffer.is_some() {
            state.stats.drawn += 1;
        }
        buffer
    }

    /// Draw the pending buffer with `draw`, if there is one
    ///
    /// The slot is freed before `draw` runs, so the producer can offer the
    /// next frame while this one is being drawn.
    pub fn draw<R>(&self, draw: impl FnOnce(&PixelBuffer) -> R) -> Option<R> {
        self.take_pending().map(|buffer| draw(&buffer))
    }

    /// Wait until a buffer is pending and take it
    pub async fn wait_for_frame(&self) -> PixelBuffer {
        loop {
            let notified = self.frame_ready.notified();
            if let Some(buffer) = self.take_pending() {
                return buffer;
            }
            notified.await;
        }
    }

    /// Discard the pending buffer without drawing it
    pub fn reset(&self) {
        let mut state = self.lock();
        if state.pending.take().is_some() {
            state.stats.dropped += 1;
        }
    }

    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn stats(&self) -> PresentationStats {
        self.lock().stats
    }
}

impl Default for PresentationSink {
    fn default() -> Self {
        Self::new(DropPolicy::default())
    }
}

impl std::fmt::Debug for PresentationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationSink")
            .field("policy", &self.policy)
            .field("pending", &self.has_pending())
            .finish()
    }
}

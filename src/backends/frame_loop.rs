// SPDX-License-Identifier: GPL-3.0-only
//! Frame-paced capture threads
//!
//! A [`CaptureLoopController`] runs a per-frame closure on a named thread,
//! optionally pacing it to a fixed frame interval, until the closure asks to
//! stop or the controller is stopped or dropped.

use crate::errors::PipelineResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the per-frame closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Run the next frame
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running on its own thread
///
/// ```ignore
/// let mut controller = CaptureLoopController::start("capture", Some(interval), move |_| {
///     match source.next_frame() {
///         Ok(frame) => {
///             let _ = renderer.process_frame(&frame);
///             LoopAction::Continue
///         }
///         Err(_) => LoopAction::Stop,
///     }
/// })?;
///
/// // Later, stop the loop
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    name: String,
}

impl CaptureLoopController {
    /// Start `loop_fn` on a thread named `name`
    ///
    /// The closure receives the zero-based frame index. With an `interval`
    /// each iteration starts no earlier than one interval after the previous
    /// one; a slow iteration is not made up for.
    pub fn start<F>(name: &str, interval: Option<Duration>, mut loop_fn: F) -> PipelineResult<Self>
    where
        F: FnMut(u64) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_frames = Arc::clone(&frames);
        let thread_name = name.to_string();

        info!(name = %name, interval_ms = interval.map(|i| i.as_millis() as u64), "Starting capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %thread_name, "Capture loop thread started");
                let mut next_deadline = Instant::now();

                loop {
                    if thread_stop.load(Ordering::SeqCst) {
                        debug!(name = %thread_name, "Stop signal received");
                        break;
                    }

                    if let Some(interval) = interval {
                        let now = Instant::now();
                        if next_deadline > now {
                            thread::sleep(next_deadline - now);
                        }
                        next_deadline = next_deadline.max(now) + interval;
                    }

                    let index = thread_frames.fetch_add(1, Ordering::Relaxed);
                    if loop_fn(index) == LoopAction::Stop {
                        debug!(name = %thread_name, frames = index + 1, "Loop requested stop");
                        break;
                    }
                }

                info!(
                    name = %thread_name,
                    frames = thread_frames.load(Ordering::Relaxed),
                    "Capture loop thread exiting"
                );
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            frames,
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Frames started so far
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for capture loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_stops_itself() {
        let mut controller =
            CaptureLoopController::start("test-loop", None, |index| {
                if index >= 4 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            })
            .unwrap();
        controller.join();
        assert_eq!(controller.frames(), 5);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_from_controller() {
        let mut controller = CaptureLoopController::start(
            "test-paced",
            Some(Duration::from_millis(1)),
            |_| LoopAction::Continue,
        )
        .unwrap();
        thread::sleep(Duration::from_millis(20));
        controller.stop();
        assert!(controller.frames() > 0);
        assert!(!controller.is_running());
    }
}

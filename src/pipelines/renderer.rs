// SPDX-License-Identifier: GPL-3.0-only

//! Live renderer
//!
//! Owns the filter chain for one capture session. Frames arrive on the
//! capture thread through [`Renderer::process_frame`]; the chain is built and
//! prepared lazily from the first frame after any configuration change.
//! Processed buffers go to the delegate for recording and into a one-slot
//! display hand-off that always holds the newest frame.

use super::PresentationSink;
use crate::constants::DropPolicy;
use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::errors::PipelineResult;
use crate::filters::{ChainFactory, FilterChain, FilterStage, FilterType, StageSetup};
use crate::geometry::{Orientation, Transform};
use crate::media::{Dimensions, FormatDescription, Frame, MediaTime, PixelBuffer};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, trace, warn};

/// Receives the renderer's output
pub trait RendererDelegate: Send + Sync {
    /// Newest processed frame is waiting in the display hand-off
    fn ready_for_display(&self, buffer: &PixelBuffer);

    /// Every processed frame, in order (recording path)
    fn filtered_buffer_ready(&self, buffer: &PixelBuffer, time: MediaTime);

    /// A frame was dropped by the chain
    fn ran_out_of_buffers(&self);
}

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub processed: u64,
    pub dropped: u64,
    pub ignored: u64,
}

struct RendererState {
    chain: Option<FilterChain>,
    filter: FilterType,
    overlays: Vec<PixelBuffer>,
    media_transform: Option<Transform>,
    portrait: bool,
    output_dimensions: Option<Dimensions>,
}

impl RendererState {
    fn invalidate(&mut self) {
        if let Some(mut chain) = self.chain.take() {
            chain.cleanup();
        }
    }

    fn setup(&self, frame_transform: Option<Transform>) -> StageSetup {
        let transform = frame_transform.or(self.media_transform);
        let rotated = transform
            .map(|t| Orientation::from_transform(&t).is_portrait())
            .unwrap_or(false);
        StageSetup {
            transform,
            output_dimensions: self.output_dimensions,
            // An explicit output size already describes the final frame
            swap_dimensions: self.output_dimensions.is_none() && (self.portrait || rotated),
        }
    }
}

/// Filter chain owner for a live session
pub struct Renderer {
    factory: Arc<dyn ChainFactory>,
    state: Mutex<RendererState>,
    processing_image: AtomicBool,
    display: PresentationSink,
    delegate: Option<Arc<dyn RendererDelegate>>,
    processed: AtomicU64,
    dropped: AtomicU64,
    ignored: AtomicU64,
}

impl Renderer {
    pub fn new(factory: Arc<dyn ChainFactory>, filter: FilterType) -> Self {
        Self {
            factory,
            state: Mutex::new(RendererState {
                chain: None,
                filter,
                overlays: Vec::new(),
                media_transform: None,
                portrait: false,
                output_dimensions: None,
            }),
            processing_image: AtomicBool::new(false),
            display: PresentationSink::new(DropPolicy::ReplacePending),
            delegate: None,
            processed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
        }
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn RendererDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    fn lock(&self) -> MutexGuard<'_, RendererState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Filter one live frame
    ///
    /// Returns `Ok(None)` when the frame is dropped or ignored. An error means
    /// the chain could not be set up; it has been torn down and the next
    /// frame will try again with a fresh chain.
    pub fn process_frame(&self, frame: &Frame) -> PipelineResult<Option<PixelBuffer>> {
        if self.processing_image.load(Ordering::Acquire) {
            self.ignored.fetch_add(1, Ordering::Relaxed);
            trace!("Still image in progress, ignoring live frame");
            return Ok(None);
        }

        let output = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let setup = state.setup(frame.transform);
            let filter = state.filter;
            let chain = state
                .chain
                .get_or_insert_with(|| self.factory.create_chain(filter, &state.overlays));

            if !chain.is_prepared() {
                if let Err(e) = chain.prepare(&frame.format(), &setup) {
                    warn!(error = %e, filter = %filter, "Failed to prepare filter chain");
                    state.invalidate();
                    return Err(e);
                }
                info!(
                    filter = %filter,
                    stages = chain.len(),
                    input = %frame.buffer.dimensions(),
                    "Filter chain ready"
                );
            }
            chain.process(&frame.buffer, frame.presentation_time)
        };

        match output {
            Some(buffer) => {
                let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
                if processed % FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        processed,
                        dropped = self.dropped.load(Ordering::Relaxed),
                        "Renderer frame stats"
                    );
                }
                if let Some(delegate) = &self.delegate {
                    delegate.filtered_buffer_ready(&buffer, frame.presentation_time);
                }
                self.display.display(buffer.clone());
                Ok(Some(buffer))
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(time = %frame.presentation_time, "Frame dropped by filter chain");
                if let Some(delegate) = &self.delegate {
                    delegate.ran_out_of_buffers();
                }
                Ok(None)
            }
        }
    }

    /// Hand the newest processed frame to the delegate
    ///
    /// Called from the display side; returns `false` if nothing new was
    /// waiting.
    pub fn deliver_pending_display(&self) -> bool {
        match self.display.take_pending() {
            Some(buffer) => {
                if let Some(delegate) = &self.delegate {
                    delegate.ready_for_display(&buffer);
                }
                true
            }
            None => false,
        }
    }

    /// The display hand-off slot
    pub fn display(&self) -> &PresentationSink {
        &self.display
    }

    /// Filter one still image through a fresh chain
    ///
    /// Live frames are ignored while this runs.
    pub fn process_single_image(
        &self,
        buffer: &PixelBuffer,
        time: MediaTime,
    ) -> PipelineResult<Option<PixelBuffer>> {
        self.processing_image.store(true, Ordering::Release);
        let _done = ImageGuard(&self.processing_image);

        let (mut chain, setup) = {
            let state = self.lock();
            (
                self.factory.create_chain(state.filter, &state.overlays),
                state.setup(None),
            )
        };

        let result = chain
            .prepare(&FormatDescription::of(buffer), &setup)
            .map(|()| chain.process(buffer, time));
        chain.cleanup();

        if let Ok(None) = result {
            debug!(buffer = buffer.id(), "Still image dropped by filter chain");
        }
        result
    }

    /// Switch effect; the chain is rebuilt on the next frame
    pub fn refresh_filter(&self, filter: FilterType) {
        let mut state = self.lock();
        if state.filter == filter && state.chain.is_some() {
            return;
        }
        debug!(from = %state.filter, to = %filter, "Switching filter");
        state.filter = filter;
        state.invalidate();
    }

    pub fn filter(&self) -> FilterType {
        self.lock().filter
    }

    pub fn set_overlays(&self, overlays: Vec<PixelBuffer>) {
        let mut state = self.lock();
        state.overlays = overlays;
        state.invalidate();
    }

    /// Track transform of the source (`None` for upright)
    pub fn set_media_transform(&self, transform: Option<Transform>) {
        let mut state = self.lock();
        if state.media_transform != transform {
            state.media_transform = transform;
            state.invalidate();
        }
    }

    pub fn set_portrait(&self, portrait: bool) {
        let mut state = self.lock();
        if state.portrait != portrait {
            state.portrait = portrait;
            state.invalidate();
        }
    }

    /// Fix the size of processed frames, or `None` to follow the input
    ///
    /// An explicit size is used as given: portrait mode and rotated tracks
    /// no longer swap width and height, so pass the already-rotated size.
    pub fn set_output_dimensions(&self, dimensions: Option<Dimensions>) {
        let mut state = self.lock();
        if state.output_dimensions != dimensions {
            state.output_dimensions = dimensions;
            state.invalidate();
        }
    }

    /// Tear down the chain and drop any undelivered display frame
    pub fn reset(&self) {
        self.lock().invalidate();
        self.display.reset();
        debug!("Renderer reset");
    }

    /// True while a prepared chain is held
    pub fn is_ready(&self) -> bool {
        self.lock().chain.as_ref().is_some_and(|chain| chain.is_prepared())
    }

    pub fn stats(&self) -> RendererStats {
        RendererStats {
            processed: self.processed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.lock().invalidate();
    }
}

// Clears the still-image flag on every exit path
struct ImageGuard<'a>(&'a AtomicBool);

impl Drop for ImageGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

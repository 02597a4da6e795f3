// SPDX-License-Identifier: MPL-2.0

//! CPU stand-ins for GPU stages, shared by the integration tests

#![allow(dead_code)]

use camera_pipeline::errors::{PipelineResult, SetupError};
use camera_pipeline::filters::{ChainFactory, FilterChain, FilterStage, FilterType, StageSetup};
use camera_pipeline::geometry::ContentFit;
use camera_pipeline::pipelines::Scaler;
use camera_pipeline::{BufferPool, Dimensions, FormatDescription, MediaTime, PixelBuffer, PixelFormat};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What a mock stage did, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Prepare(String, StageSetup),
    Process(String),
    Cleanup(String),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Invert the color channels (same size) or fill white (resized)
    Invert,
    /// Drop every frame
    Drop,
    /// Fail to prepare
    FailPrepare,
}

/// Stage that runs on the CPU but negotiates formats like a GPU stage
pub struct MockStage {
    label: String,
    behaviour: Behaviour,
    log: EventLog,
    max_buffers: usize,
    pool: Option<BufferPool>,
}

impl MockStage {
    pub fn new(label: &str, behaviour: Behaviour, log: &EventLog) -> Self {
        Self {
            label: label.to_string(),
            behaviour,
            log: Arc::clone(log),
            max_buffers: 3,
            pool: None,
        }
    }

    pub fn boxed(label: &str, behaviour: Behaviour, log: &EventLog) -> Box<dyn FilterStage> {
        Box::new(Self::new(label, behaviour, log))
    }

    fn record(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl FilterStage for MockStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn prepare(&mut self, format: &FormatDescription, setup: &StageSetup) -> PipelineResult<()> {
        if self.pool.is_some() {
            return Ok(());
        }
        self.record(Event::Prepare(self.label.clone(), *setup));
        if self.behaviour == Behaviour::FailPrepare {
            return Err(SetupError::ShaderCompilation(format!("{} refused", self.label)).into());
        }
        let output = setup.resolve_output(format.dimensions);
        self.pool = Some(BufferPool::new(
            output.width,
            output.height,
            format.pixel_format,
            self.max_buffers,
        )?);
        Ok(())
    }

    fn output_format(&self) -> Option<FormatDescription> {
        self.pool.as_ref().map(|pool| pool.format())
    }

    fn process(&mut self, input: &PixelBuffer, _time: MediaTime) -> Option<PixelBuffer> {
        self.record(Event::Process(self.label.clone()));
        if self.behaviour == Behaviour::Drop {
            return None;
        }
        let output = self.pool.as_ref()?.obtain().ok()?;
        let source = input.to_vec();
        output.with_bytes_mut(|bytes| {
            if bytes.len() == source.len() {
                for (out, (index, value)) in bytes.iter_mut().zip(source.iter().enumerate()) {
                    *out = if index % 4 == 3 { *value } else { 255 - value };
                }
            } else {
                bytes.fill(255);
            }
        });
        Some(output)
    }

    fn cleanup(&mut self) {
        self.record(Event::Cleanup(self.label.clone()));
        self.pool = None;
    }
}

/// Chain factory building one mock stage per chain
pub struct MockFactory {
    pub behaviour: Mutex<Behaviour>,
    pub log: EventLog,
    pub chains_created: AtomicUsize,
}

impl MockFactory {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour: Mutex::new(behaviour),
            log: event_log(),
            chains_created: AtomicUsize::new(0),
        })
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn chains_created(&self) -> usize {
        self.chains_created.load(Ordering::SeqCst)
    }
}

impl ChainFactory for MockFactory {
    fn create_chain(&self, effect: FilterType, overlays: &[PixelBuffer]) -> FilterChain {
        self.chains_created.fetch_add(1, Ordering::SeqCst);
        let behaviour = *self.behaviour.lock().unwrap();
        let mut chain = FilterChain::default();
        chain.push(MockStage::boxed(effect.name(), behaviour, &self.log));
        for index in 0..overlays.len() {
            chain.push(MockStage::boxed(&format!("overlay{}", index), Behaviour::Invert, &self.log));
        }
        chain
    }

    fn create_scaler(
        &self,
        target: Dimensions,
        fit: ContentFit,
        portrait: bool,
    ) -> Box<dyn FilterStage> {
        let inner = MockStage::boxed("scaler", Behaviour::Invert, &self.log);
        Box::new(Scaler::new(inner, target, fit, portrait))
    }
}

/// Unpooled BGRA buffer filled with one pixel value
pub fn solid_buffer(width: u32, height: u32, pixel: [u8; 4]) -> PixelBuffer {
    let data = pixel.repeat((width * height) as usize);
    PixelBuffer::from_bytes(width, height, PixelFormat::Bgra8, data).unwrap()
}

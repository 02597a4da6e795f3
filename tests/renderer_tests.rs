// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the live renderer

mod common;

use camera_pipeline::geometry::Orientation;
use camera_pipeline::{
    Dimensions, FilterType, Frame, MediaTime, PixelBuffer, Renderer, RendererDelegate,
};
use common::{Behaviour, Event, MockFactory, events, solid_buffer};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    displayed: Mutex<Vec<u64>>,
    recorded: Mutex<Vec<MediaTime>>,
    out_of_buffers: Mutex<usize>,
}

impl RendererDelegate for Recorder {
    fn ready_for_display(&self, buffer: &PixelBuffer) {
        self.displayed.lock().unwrap().push(buffer.id());
    }

    fn filtered_buffer_ready(&self, _buffer: &PixelBuffer, time: MediaTime) {
        self.recorded.lock().unwrap().push(time);
    }

    fn ran_out_of_buffers(&self) {
        *self.out_of_buffers.lock().unwrap() += 1;
    }
}

fn frame(index: i64) -> Frame {
    Frame::new(solid_buffer(8, 4, [1, 2, 3, 255]), MediaTime::new(index, 30))
}

#[test]
fn test_chain_is_built_once_from_first_frame() {
    let factory = MockFactory::new(Behaviour::Invert);
    let renderer = Renderer::new(factory.clone(), FilterType::Film);
    assert!(!renderer.is_ready());

    for index in 0..3 {
        let output = renderer.process_frame(&frame(index)).unwrap().unwrap();
        assert_eq!(output.dimensions(), Dimensions::new(8, 4));
    }

    assert!(renderer.is_ready());
    assert_eq!(factory.chains_created(), 1);
    assert_eq!(renderer.stats().processed, 3);
}

#[test]
fn test_delegate_sees_every_frame_and_newest_display() {
    let factory = MockFactory::new(Behaviour::Invert);
    let recorder = Arc::new(Recorder::default());
    let renderer = Renderer::new(factory, FilterType::Passthrough).with_delegate(recorder.clone());

    let _first = renderer.process_frame(&frame(0)).unwrap().unwrap();
    let second = renderer.process_frame(&frame(1)).unwrap().unwrap();

    // The undrawn first frame was replaced by the second
    assert!(renderer.deliver_pending_display());
    assert!(!renderer.deliver_pending_display());
    assert_eq!(*recorder.displayed.lock().unwrap(), [second.id()]);
    assert_eq!(renderer.display().stats().dropped, 1);

    assert_eq!(
        *recorder.recorded.lock().unwrap(),
        [MediaTime::new(0, 30), MediaTime::new(1, 30)]
    );
}

#[test]
fn test_dropped_frames_are_reported() {
    let factory = MockFactory::new(Behaviour::Drop);
    let recorder = Arc::new(Recorder::default());
    let renderer = Renderer::new(factory, FilterType::Film).with_delegate(recorder.clone());

    assert_eq!(renderer.process_frame(&frame(0)).unwrap(), None);
    assert_eq!(*recorder.out_of_buffers.lock().unwrap(), 1);
    assert_eq!(renderer.stats().dropped, 1);
    assert!(!renderer.display().has_pending());
}

#[test]
fn test_setup_failure_retries_with_fresh_chain() {
    let factory = MockFactory::new(Behaviour::FailPrepare);
    let renderer = Renderer::new(factory.clone(), FilterType::Film);

    assert!(renderer.process_frame(&frame(0)).is_err());
    assert!(!renderer.is_ready());

    factory.set_behaviour(Behaviour::Invert);
    assert!(renderer.process_frame(&frame(1)).unwrap().is_some());
    assert_eq!(factory.chains_created(), 2);
}

#[test]
fn test_refresh_filter_rebuilds_chain() {
    let factory = MockFactory::new(Behaviour::Invert);
    let renderer = Renderer::new(factory.clone(), FilterType::Film);
    renderer.process_frame(&frame(0)).unwrap();

    renderer.refresh_filter(FilterType::Grayscale);
    assert_eq!(renderer.filter(), FilterType::Grayscale);
    assert!(!renderer.is_ready());
    assert!(events(&factory.log).contains(&Event::Cleanup("film".into())));

    renderer.process_frame(&frame(1)).unwrap();
    assert_eq!(factory.chains_created(), 2);
    assert!(events(&factory.log).contains(&Event::Process("grayscale".into())));
}

#[test]
fn test_portrait_swaps_output_without_explicit_size() {
    let factory = MockFactory::new(Behaviour::Invert);
    let renderer = Renderer::new(factory.clone(), FilterType::Passthrough);
    renderer.set_portrait(true);

    let output = renderer.process_frame(&frame(0)).unwrap().unwrap();
    assert_eq!(output.dimensions(), Dimensions::new(4, 8));

    // An explicit size wins over the portrait swap
    renderer.set_output_dimensions(Some(Dimensions::new(6, 2)));
    let output = renderer.process_frame(&frame(1)).unwrap().unwrap();
    assert_eq!(output.dimensions(), Dimensions::new(6, 2));
}

#[test]
fn test_rotated_frames_swap_output() {
    let factory = MockFactory::new(Behaviour::Invert);
    let renderer = Renderer::new(factory, FilterType::Passthrough);
    let rotated = frame(0).with_transform(Orientation::Right.transform().unwrap());

    let output = renderer.process_frame(&rotated).unwrap().unwrap();
    assert_eq!(output.dimensions(), Dimensions::new(4, 8));
}

#[test]
fn test_single_image_uses_its_own_chain() {
    let factory = MockFactory::new(Behaviour::Invert);
    let renderer = Renderer::new(factory.clone(), FilterType::Film);
    renderer.process_frame(&frame(0)).unwrap();

    let still = solid_buffer(3, 3, [0, 0, 0, 255]);
    let output = renderer
        .process_single_image(&still, MediaTime::ZERO)
        .unwrap()
        .unwrap();
    assert_eq!(output.dimensions(), Dimensions::new(3, 3));
    assert_eq!(output.with_bytes(|bytes| bytes[0]), 255);

    // The live chain survives the still image
    assert!(renderer.is_ready());
    assert_eq!(factory.chains_created(), 2);
    assert_eq!(renderer.stats().ignored, 0);
}

#[test]
fn test_reset_discards_pending_display() {
    let factory = MockFactory::new(Behaviour::Invert);
    let renderer = Renderer::new(factory, FilterType::Film);
    renderer.process_frame(&frame(0)).unwrap();
    assert!(renderer.display().has_pending());

    renderer.reset();
    assert!(!renderer.display().has_pending());
    assert!(!renderer.is_ready());
    assert!(!renderer.deliver_pending_display());
}

// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the presentation sink and the synthetic frame source

use camera_pipeline::backends::{CaptureLoopController, LoopAction, SyntheticSource, TestPattern};
use camera_pipeline::pipelines::PresentationStats;
use camera_pipeline::{Dimensions, DropPolicy, MediaTime, PixelBuffer, PixelFormat, PresentationSink};
use std::sync::Arc;
use std::time::Duration;

fn buffer() -> PixelBuffer {
    PixelBuffer::new(2, 2, PixelFormat::Bgra8).unwrap()
}

#[test]
fn test_drop_newest_keeps_slot_until_drawn() {
    let sink = PresentationSink::new(DropPolicy::DropNewest);
    let first = buffer();

    assert!(sink.display(first.clone()));
    for _ in 0..3 {
        assert!(!sink.display(buffer()));
    }
    assert!(sink.draw(|drawn| drawn.same_buffer(&first)).unwrap());

    // The slot is free again
    assert!(sink.display(buffer()));
    assert_eq!(
        sink.stats(),
        PresentationStats {
            submitted: 5,
            dropped: 3,
            drawn: 1
        }
    );
}

#[test]
fn test_replace_pending_keeps_newest() {
    let sink = PresentationSink::new(DropPolicy::ReplacePending);
    let last = buffer();

    sink.display(buffer());
    sink.display(buffer());
    assert!(sink.display(last.clone()));

    assert!(sink.take_pending().unwrap().same_buffer(&last));
    assert_eq!(sink.stats().dropped, 2);
    assert!(sink.take_pending().is_none());
}

#[test]
fn test_dropped_buffers_return_to_their_pool() {
    let mut source = SyntheticSource::new(Dimensions::new(4, 4), 30, TestPattern::Bars, 2).unwrap();
    let sink = PresentationSink::new(DropPolicy::DropNewest);

    sink.display(source.next_frame().unwrap().buffer);
    sink.display(source.next_frame().unwrap().buffer);

    // One buffer pending in the sink, the dropped one is free
    assert!(source.next_frame().is_ok());
    assert_eq!(source.frames_produced(), 3);
}

#[tokio::test]
async fn test_display_wakes_waiting_drawer() {
    let sink = Arc::new(PresentationSink::default());
    let producer = Arc::clone(&sink);

    let drawer = tokio::spawn(async move { sink.wait_for_frame().await.id() });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let frame = buffer();
    let id = frame.id();
    producer.display(frame);

    let drawn = tokio::time::timeout(Duration::from_secs(1), drawer)
        .await
        .expect("drawer should wake")
        .unwrap();
    assert_eq!(drawn, id);
}

#[test]
fn test_capture_loop_drives_source() {
    let sink = Arc::new(PresentationSink::new(DropPolicy::ReplacePending));
    let loop_sink = Arc::clone(&sink);
    let mut source =
        SyntheticSource::new(Dimensions::new(8, 8), 120, TestPattern::Gradient, 3).unwrap();

    let mut controller = CaptureLoopController::start("test-capture", None, move |index| {
        if index == 10 {
            return LoopAction::Stop;
        }
        if let Ok(frame) = source.next_frame() {
            assert_eq!(frame.presentation_time, MediaTime::new(index as i64, 120));
            loop_sink.display(frame.buffer);
        }
        LoopAction::Continue
    })
    .unwrap();
    controller.join();

    assert_eq!(controller.frames(), 11);
    let stats = sink.stats();
    assert_eq!(stats.submitted, 10);
    assert_eq!(stats.dropped, 9);
    assert!(sink.has_pending());
}

// SPDX-License-Identifier: MPL-2.0

//! GPU stage tests
//!
//! These need a GPU adapter and are skipped when none is available.

use camera_pipeline::backends::{SyntheticSource, TestPattern};
use camera_pipeline::filters::{FilterBackend, FilterType, StageConfig, StageSetup, create_chain, create_stage};
use camera_pipeline::media::{TextureCache, TextureRole};
use camera_pipeline::{
    BufferPool, Dimensions, FilterStage, FormatDescription, GpuContext, MediaTime, PixelBuffer, PixelFormat,
};
use std::sync::Arc;

fn context() -> Option<Arc<GpuContext>> {
    match GpuContext::new_blocking("gpu_stage_tests") {
        Ok(context) => Some(context),
        Err(e) => {
            println!("Skipping test (no GPU): {}", e);
            None
        }
    }
}

fn solid(width: u32, height: u32, bgra: [u8; 4]) -> PixelBuffer {
    PixelBuffer::from_bytes(width, height, PixelFormat::Bgra8, bgra.repeat((width * height) as usize))
        .unwrap()
}

fn assert_every_pixel_near(buffer: &PixelBuffer, expected: [u8; 4]) {
    buffer.with_bytes(|bytes| {
        for pixel in bytes.chunks_exact(4) {
            for (actual, expected) in pixel.iter().zip(expected) {
                assert!(
                    actual.abs_diff(expected) <= 1,
                    "pixel {:?}, expected {:?}",
                    pixel,
                    expected
                );
            }
        }
    });
}

#[test]
fn test_passthrough_preserves_pixels_on_both_backends() {
    let Some(context) = context() else {
        return;
    };
    let input = solid(32, 16, [40, 80, 160, 255]);

    for backend in FilterBackend::ALL {
        let mut stage = create_stage(&context, backend, StageConfig::effect(FilterType::Passthrough));
        stage.prepare(&FormatDescription::of(&input), &StageSetup::default()).unwrap();

        let output = stage
            .process(&input, MediaTime::ZERO)
            .unwrap_or_else(|| panic!("{} backend dropped the frame", backend.display_name()));
        assert_eq!(output.dimensions(), Dimensions::new(32, 16));
        assert_every_pixel_near(&output, [40, 80, 160, 255]);
        stage.cleanup();
    }
}

#[test]
fn test_mismatched_input_is_dropped() {
    let Some(context) = context() else {
        return;
    };
    for backend in FilterBackend::ALL {
        let mut stage = create_stage(&context, backend, StageConfig::effect(FilterType::Grayscale));
        stage
            .prepare(&FormatDescription::of(&solid(8, 8, [0; 4])), &StageSetup::default())
            .unwrap();

        assert!(stage.process(&solid(4, 4, [0; 4]), MediaTime::ZERO).is_none());
        // Still usable afterwards
        assert!(stage.process(&solid(8, 8, [0; 4]), MediaTime::ZERO).is_some());
    }
}

#[test]
fn test_chain_swaps_portrait_output() {
    let Some(context) = context() else {
        return;
    };
    let input = solid(16, 8, [0, 0, 255, 255]);
    let mut chain = create_chain(&context, FilterBackend::Compute, FilterType::Film, &[]);
    let setup = StageSetup {
        swap_dimensions: true,
        ..StageSetup::default()
    };

    chain.prepare(&FormatDescription::of(&input), &setup).unwrap();
    let output = chain.process(&input, MediaTime::from_seconds(0.5)).unwrap();
    assert_eq!(output.dimensions(), Dimensions::new(8, 16));
    chain.cleanup();
}

#[test]
fn test_sampled_cache_does_not_hold_input_buffers() {
    let Some(context) = context() else {
        return;
    };
    let pool = BufferPool::new(8, 8, PixelFormat::Bgra8, 2).unwrap();
    let mut cache = TextureCache::new(context, "input", TextureRole::Sampled);

    for _ in 0..2 {
        let buffer = pool.obtain().unwrap();
        let texture = cache.import_texture(&buffer, PixelFormat::Bgra8).unwrap();
        drop(texture);
    }
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.retained_buffers(), 0);
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn test_chain_keeps_running_on_two_buffer_source() {
    let Some(context) = context() else {
        return;
    };
    for backend in FilterBackend::ALL {
        let mut source =
            SyntheticSource::new(Dimensions::new(16, 8), 30, TestPattern::Gradient, 2).unwrap();
        let mut chain = create_chain(&context, backend, FilterType::Grayscale, &[]);

        for index in 0..6 {
            let frame = source
                .next_frame()
                .unwrap_or_else(|e| panic!("{} backend starved frame {}: {}", backend.display_name(), index, e));
            if index == 0 {
                chain.prepare(&frame.format(), &StageSetup::default()).unwrap();
            }
            let output = chain.process(&frame.buffer, frame.presentation_time);
            assert!(output.is_some());
        }
        assert_eq!(source.frames_produced(), 6);
        chain.cleanup();
    }
}

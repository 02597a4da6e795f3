// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use camera_pipeline::constants::{DropPolicy, buffers, gpu, palette};

#[test]
fn test_drop_policy_values() {
    assert_eq!(DropPolicy::ALL.len(), 2);
    assert_eq!(DropPolicy::default(), DropPolicy::DropNewest);
}

#[test]
fn test_drop_policy_display_names() {
    for policy in DropPolicy::ALL {
        assert!(
            !policy.display_name().is_empty(),
            "Policy {:?} should have a display name",
            policy
        );
    }
}

#[test]
fn test_buffer_constants() {
    assert_eq!(buffers::RETAINED_BUFFER_COUNT, 3);
    assert_eq!(buffers::BYTES_PER_PIXEL, 4);
    assert!(buffers::MAX_DIMENSION >= 4096);
}

#[test]
fn test_gpu_constants() {
    assert_eq!(gpu::WORKGROUP_SIZE, 16);
    assert_eq!(gpu::COPY_ROW_ALIGNMENT, 256);
}

#[test]
fn test_palette_constants() {
    assert_eq!(palette::SIGNAL_BITS, 5);
    assert_eq!(palette::ALPHA_THRESHOLD, 125);
    assert_eq!(palette::WHITE_THRESHOLD, 250);
    assert!(palette::MIN_COLORS < palette::MAX_COLORS);
    assert!(palette::FRACTION_BY_POPULATION > 0.0 && palette::FRACTION_BY_POPULATION < 1.0);
}

// SPDX-License-Identifier: GPL-3.0-only

//! Video track orientation
//!
//! Recorded tracks carry a 2D affine "preferred transform". Only the four
//! axis-aligned rotations are recognised; anything else is treated as
//! upright.

use super::Transform;
use std::f32::consts::{FRAC_PI_2, PI};

/// Orientation of a video track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Upright, no correction needed
    #[default]
    Up,
    /// Upside down
    Down,
    /// Rotated a quarter turn counter-clockwise (portrait)
    Left,
    /// Rotated a quarter turn clockwise (portrait)
    Right,
}

impl Orientation {
    /// Classify the rotation part `(a, b, c, d)` of a track transform
    pub fn from_affine(a: f32, b: f32, c: f32, d: f32) -> Self {
        let m = [a, b, c, d].map(|v| v.round() as i32);
        match m {
            [0, 1, -1, 0] => Orientation::Right,
            [0, -1, 1, 0] => Orientation::Left,
            [-1, 0, 0, -1] => Orientation::Down,
            _ => Orientation::Up,
        }
    }

    /// Classify a 4x4 transform by its XY rotation part
    pub fn from_transform(transform: &Transform) -> Self {
        Self::from_affine(
            transform.get(0, 0),
            transform.get(1, 0),
            transform.get(0, 1),
            transform.get(1, 1),
        )
    }

    /// Create orientation from a clockwise rotation in degrees (normalised to 0-360)
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Orientation::Right,
            180 => Orientation::Down,
            270 => Orientation::Left,
            _ => Orientation::Up,
        }
    }

    /// True if the track is displayed in portrait
    pub fn is_portrait(&self) -> bool {
        matches!(self, Orientation::Left | Orientation::Right)
    }

    /// Rotation that uprights the track, `None` when already upright
    pub fn transform(&self) -> Option<Transform> {
        match self {
            Orientation::Up => None,
            Orientation::Down => Some(Transform::z_rotation(PI)),
            Orientation::Left => Some(Transform::z_rotation(-FRAC_PI_2)),
            Orientation::Right => Some(Transform::z_rotation(FRAC_PI_2)),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Orientation::Up => "up",
            Orientation::Down => "down",
            Orientation::Left => "left",
            Orientation::Right => "right",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_affine() {
        assert_eq!(Orientation::from_affine(0.0, 1.0, -1.0, 0.0), Orientation::Right);
        assert_eq!(Orientation::from_affine(0.0, -1.0, 1.0, 0.0), Orientation::Left);
        assert_eq!(Orientation::from_affine(1.0, 0.0, 0.0, 1.0), Orientation::Up);
        assert_eq!(Orientation::from_affine(-1.0, 0.0, 0.0, -1.0), Orientation::Down);
        assert_eq!(Orientation::from_affine(0.5, 0.5, 0.5, 0.5), Orientation::Up);
    }

    #[test]
    fn test_portrait_and_transform() {
        assert!(Orientation::Right.is_portrait());
        assert!(Orientation::Left.is_portrait());
        assert!(!Orientation::Down.is_portrait());
        assert_eq!(Orientation::Up.transform(), None);
        assert!(Orientation::Right.transform().unwrap().swaps_axes());
    }

    #[test]
    fn test_from_transform_round_trips_rotation() {
        for orientation in [Orientation::Down, Orientation::Left, Orientation::Right] {
            let transform = orientation.transform().unwrap();
            assert_eq!(Orientation::from_transform(&transform), orientation);
        }
    }

    #[test]
    fn test_from_degrees() {
        assert_eq!(Orientation::from_degrees(90), Orientation::Right);
        assert_eq!(Orientation::from_degrees(-90), Orientation::Left);
        assert_eq!(Orientation::from_degrees(540), Orientation::Down);
        assert_eq!(Orientation::from_degrees(45), Orientation::Up);
    }
}

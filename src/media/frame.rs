// SPDX-License-Identifier: GPL-3.0-only

//! Time-stamped frames delivered by a capture or decode source

use super::{FormatDescription, PixelBuffer};
use crate::geometry::Transform;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Sub;

/// Rational presentation time (`value / timescale` seconds)
///
/// A timescale of zero is invalid and is treated as one.
#[derive(Debug, Clone, Copy)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
}

impl MediaTime {
    /// Time zero
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: 1,
    };

    /// Default timescale used by [`MediaTime::from_seconds`] (microseconds)
    pub const MICROSECONDS: i32 = 1_000_000;

    pub const fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Convert seconds to a microsecond-timescale time
    pub fn from_seconds(seconds: f64) -> Self {
        Self::new(
            (seconds * Self::MICROSECONDS as f64).round() as i64,
            Self::MICROSECONDS,
        )
    }

    fn effective_timescale(&self) -> i64 {
        if self.timescale == 0 {
            1
        } else {
            self.timescale as i64
        }
    }

    /// Time in seconds
    pub fn seconds(&self) -> f64 {
        self.value as f64 / self.effective_timescale() as f64
    }

    // (value, timescale) with a positive timescale
    fn normalized(&self) -> (i128, i128) {
        let timescale = self.effective_timescale() as i128;
        if timescale < 0 {
            (-(self.value as i128), -timescale)
        } else {
            (self.value as i128, timescale)
        }
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, lhs_scale) = self.normalized();
        let (rhs, rhs_scale) = other.normalized();
        (lhs * rhs_scale).cmp(&(rhs * lhs_scale))
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: MediaTime) -> MediaTime {
        if self.effective_timescale() == rhs.effective_timescale() {
            return MediaTime::new(self.value.saturating_sub(rhs.value), self.timescale);
        }
        MediaTime::from_seconds(self.seconds() - rhs.seconds())
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.seconds())
    }
}

/// One input sample: buffer, timestamp, format hint and optional transform
#[derive(Debug, Clone)]
pub struct Frame {
    pub buffer: PixelBuffer,
    pub presentation_time: MediaTime,
    /// Format the source claims; falls back to describing the buffer
    pub format_hint: Option<FormatDescription>,
    /// Per-frame orientation transform from the source
    pub transform: Option<Transform>,
}

impl Frame {
    pub fn new(buffer: PixelBuffer, presentation_time: MediaTime) -> Self {
        Self {
            buffer,
            presentation_time,
            format_hint: None,
            transform: None,
        }
    }

    /// Attach a source transform (e.g. track orientation)
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Format used to negotiate the chain on the first frame
    pub fn format(&self) -> FormatDescription {
        self.format_hint
            .unwrap_or_else(|| FormatDescription::of(&self.buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds() {
        assert_eq!(MediaTime::new(90, 30).seconds(), 3.0);
        assert_eq!(MediaTime::new(5, 0).seconds(), 5.0);
    }

    #[test]
    fn test_ordering_across_timescales() {
        assert_eq!(MediaTime::new(1, 2), MediaTime::new(500, 1000));
        assert!(MediaTime::new(1, 30) < MediaTime::new(1, 24));
        assert!(MediaTime::new(2, 1) > MediaTime::from_seconds(1.5));
    }

    #[test]
    fn test_subtraction() {
        let elapsed = MediaTime::new(45, 30) - MediaTime::new(15, 30);
        assert_eq!(elapsed.seconds(), 1.0);

        let mixed = MediaTime::new(3, 1) - MediaTime::new(500, 1000);
        assert!((mixed.seconds() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_subtraction_saturates() {
        let elapsed = MediaTime::new(i64::MAX, 30) - MediaTime::new(i64::MIN, 30);
        assert_eq!(elapsed.value, i64::MAX);
        assert_eq!(elapsed.timescale, 30);
    }
}

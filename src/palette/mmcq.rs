// SPDX-License-Identifier: MPL-2.0

//! Modified median cut quantization (MMCQ)
//!
//! Colors are reduced to 5 bits per channel and counted in a 32x32x32
//! histogram. The box spanning every counted color is split at the
//! population median of its widest channel, first picking boxes by
//! population, then by population times volume, until the requested number
//! of boxes exists or nothing more can be split. Each box's average color is
//! one palette entry.

use crate::constants::palette::{
    ALPHA_THRESHOLD, FRACTION_BY_POPULATION, MAX_COLORS, MAX_ITERATIONS, MIN_COLORS, SIGNAL_BITS,
    WHITE_THRESHOLD,
};
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

const RIGHT_SHIFT: u32 = 8 - SIGNAL_BITS;
const MULTIPLIER: u64 = 1 << RIGHT_SHIFT;
const HISTOGRAM_SIZE: usize = 1 << (3 * SIGNAL_BITS);
const VBOX_LENGTH: usize = 1 << SIGNAL_BITS;

/// An 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    // L1 distance
    fn distance(&self, other: &Color) -> u32 {
        self.r.abs_diff(other.r) as u32
            + self.g.abs_diff(other.g) as u32
            + self.b.abs_diff(other.b) as u32
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Red,
    Green,
    Blue,
}

/// Reduced-space index of a 5-bit color
#[inline]
fn color_index(r: usize, g: usize, b: usize) -> usize {
    (r << (2 * SIGNAL_BITS)) + (g << SIGNAL_BITS) + b
}

/// Pixel counts over the reduced color space
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: Arc<Vec<u32>>,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            bins: Arc::new(vec![0; HISTOGRAM_SIZE]),
        }
    }

    /// Count one 8-bit color
    pub fn add(&mut self, color: Color) {
        let index = color_index(
            (color.r >> RIGHT_SHIFT) as usize,
            (color.g >> RIGHT_SHIFT) as usize,
            (color.b >> RIGHT_SHIFT) as usize,
        );
        Arc::make_mut(&mut self.bins)[index] += 1;
    }

    fn get(&self, r: usize, g: usize, b: usize) -> u64 {
        self.bins[color_index(r, g, b)] as u64
    }

    /// Box spanning every counted color, `None` if nothing was counted
    pub fn bounding_box(&self) -> Option<VBox> {
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];
        let mut any = false;
        for (index, &count) in self.bins.iter().enumerate() {
            if count == 0 {
                continue;
            }
            any = true;
            let channels = [
                (index >> (2 * SIGNAL_BITS)) as u8,
                ((index >> SIGNAL_BITS) & (VBOX_LENGTH - 1)) as u8,
                (index & (VBOX_LENGTH - 1)) as u8,
            ];
            for c in 0..3 {
                min[c] = min[c].min(channels[c]);
                max[c] = max[c].max(channels[c]);
            }
        }
        any.then(|| VBox::new([min[0], max[0]], [min[1], max[1]], [min[2], max[2]], self.clone()))
    }

    /// Histogram of BGRA pixel bytes
    ///
    /// Every `quality`-th pixel is sampled. Pixels with alpha below the
    /// threshold are skipped, as are near-white pixels when `ignore_white`
    /// is set.
    pub fn from_pixels(pixels: &[u8], quality: usize, ignore_white: bool) -> Self {
        let mut histogram = Self::new();
        let bins = Arc::make_mut(&mut histogram.bins);
        for pixel in pixels.chunks_exact(4).step_by(quality.max(1)) {
            let (b, g, r, a) = (pixel[0], pixel[1], pixel[2], pixel[3]);
            if a < ALPHA_THRESHOLD {
                continue;
            }
            if ignore_white && r > WHITE_THRESHOLD && g > WHITE_THRESHOLD && b > WHITE_THRESHOLD {
                continue;
            }
            let index = color_index(
                (r >> RIGHT_SHIFT) as usize,
                (g >> RIGHT_SHIFT) as usize,
                (b >> RIGHT_SHIFT) as usize,
            );
            bins[index] += 1;
        }
        histogram
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Axis-aligned box in the reduced color space
///
/// Bounds are inclusive 5-bit channel values. Count, volume and average are
/// computed on first use and memoized; pass `force` to recompute.
#[derive(Clone)]
pub struct VBox {
    r: [u8; 2],
    g: [u8; 2],
    b: [u8; 2],
    histogram: Histogram,
    count: Cell<Option<u64>>,
    volume: Cell<Option<u64>>,
    average: Cell<Option<Color>>,
}

impl VBox {
    pub fn new(r: [u8; 2], g: [u8; 2], b: [u8; 2], histogram: Histogram) -> Self {
        Self {
            r,
            g,
            b,
            histogram,
            count: Cell::new(None),
            volume: Cell::new(None),
            average: Cell::new(None),
        }
    }

    fn bounds(&self, channel: Channel) -> [u8; 2] {
        match channel {
            Channel::Red => self.r,
            Channel::Green => self.g,
            Channel::Blue => self.b,
        }
    }

    // Copy with one channel's bounds replaced; memos start empty
    fn with_bounds(&self, channel: Channel, bounds: [u8; 2]) -> VBox {
        let (mut r, mut g, mut b) = (self.r, self.g, self.b);
        match channel {
            Channel::Red => r = bounds,
            Channel::Green => g = bounds,
            Channel::Blue => b = bounds,
        }
        VBox::new(r, g, b, self.histogram.clone())
    }

    fn range(bounds: [u8; 2]) -> std::ops::RangeInclusive<usize> {
        bounds[0] as usize..=bounds[1] as usize
    }

    fn cells(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        Self::range(self.r).flat_map(move |r| {
            Self::range(self.g)
                .flat_map(move |g| Self::range(self.b).map(move |b| (r, g, b)))
        })
    }

    /// Number of histogram cells inside the box
    pub fn volume(&self, force: bool) -> u64 {
        if let (Some(volume), false) = (self.volume.get(), force) {
            return volume;
        }
        let width = |bounds: [u8; 2]| (bounds[1] as u64 + 1).saturating_sub(bounds[0] as u64);
        let volume = width(self.r) * width(self.g) * width(self.b);
        self.volume.set(Some(volume));
        volume
    }

    /// Number of sampled pixels inside the box
    pub fn count(&self, force: bool) -> u64 {
        if let (Some(count), false) = (self.count.get(), force) {
            return count;
        }
        let count = self
            .cells()
            .map(|(r, g, b)| self.histogram.get(r, g, b))
            .sum();
        self.count.set(Some(count));
        count
    }

    /// Population-weighted mean color; the box centre when empty
    pub fn average(&self, force: bool) -> Color {
        if let (Some(average), false) = (self.average.get(), force) {
            return average;
        }

        let mut total = 0u64;
        let mut sums = [0u64; 3];
        for (r, g, b) in self.cells() {
            let hits = self.histogram.get(r, g, b);
            if hits == 0 {
                continue;
            }
            total += hits;
            // Each cell's contribution truncates separately
            for (sum, value) in sums.iter_mut().zip([r, g, b]) {
                *sum += (hits as f64 * (value as f64 + 0.5) * MULTIPLIER as f64) as u64;
            }
        }

        let average = if total > 0 {
            Color::new(
                (sums[0] / total).min(255) as u8,
                (sums[1] / total).min(255) as u8,
                (sums[2] / total).min(255) as u8,
            )
        } else {
            let centre =
                |bounds: [u8; 2]| (MULTIPLIER * (bounds[0] as u64 + bounds[1] as u64 + 1) / 2).min(255) as u8;
            Color::new(centre(self.r), centre(self.g), centre(self.b))
        };
        self.average.set(Some(average));
        average
    }

    fn widest_channel(&self) -> Channel {
        let width = |bounds: [u8; 2]| bounds[1].saturating_sub(bounds[0]);
        let (r, g, b) = (width(self.r), width(self.g), width(self.b));
        if r >= g && r >= b {
            Channel::Red
        } else if g >= b {
            Channel::Green
        } else {
            Channel::Blue
        }
    }

    fn product(&self) -> u64 {
        self.count(false) * self.volume(false)
    }
}

impl fmt::Debug for VBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VBox")
            .field("r", &self.r)
            .field("g", &self.g)
            .field("b", &self.b)
            .field("count", &self.count(false))
            .finish()
    }
}

fn compare_by_count(a: &VBox, b: &VBox) -> Ordering {
    a.count(false).cmp(&b.count(false))
}

fn compare_by_product(a: &VBox, b: &VBox) -> Ordering {
    if a.count(false) == b.count(false) {
        a.volume(false).cmp(&b.volume(false))
    } else {
        a.product().cmp(&b.product())
    }
}

/// Split `vbox` at the population median of its widest channel
///
/// Returns no boxes for an empty box and the box itself, unsplit, when it
/// holds a single pixel or a single histogram cell.
pub fn median_cut(vbox: &VBox) -> Vec<VBox> {
    let count = vbox.count(false);
    if count == 0 {
        return Vec::new();
    }
    if count == 1 || vbox.volume(false) == 1 {
        return vec![vbox.clone()];
    }

    let axis = vbox.widest_channel();
    let [lo, hi] = vbox.bounds(axis);

    // Cumulative population along the axis; -1 outside the box
    let mut partial = [-1i64; VBOX_LENGTH];
    let mut total = 0i64;
    for i in VBox::range([lo, hi]) {
        let plane = vbox.with_bounds(axis, [i as u8, i as u8]);
        total += plane.count(false) as i64;
        partial[i] = total;
    }
    let mut look_ahead = [-1i64; VBOX_LENGTH];
    for (ahead, &sum) in look_ahead.iter_mut().zip(partial.iter()) {
        if sum != -1 {
            *ahead = total - sum;
        }
    }

    cut(vbox, axis, &partial, &look_ahead, total)
}

fn cut(
    vbox: &VBox,
    axis: Channel,
    partial: &[i64; VBOX_LENGTH],
    look_ahead: &[i64; VBOX_LENGTH],
    total: i64,
) -> Vec<VBox> {
    let [lo, hi] = vbox.bounds(axis);
    let (lo, hi) = (lo as i64, hi as i64);

    let Some(i) = (lo..=hi).find(|&i| partial[i as usize] > total / 2) else {
        return vec![vbox.clone()];
    };

    let left = i - lo;
    let right = hi - i;
    let mut d2 = if left <= right {
        (hi - 1).min(i + right / 2)
    } else {
        lo.max(((i - 1) as f64 - left as f64 / 2.0) as i64)
    };

    // Avoid a zero-count first half
    while d2 < 0 || (d2 < hi && partial[d2 as usize] <= 0) {
        d2 += 1;
    }
    let mut count2 = look_ahead[d2 as usize];
    while count2 == 0 && d2 > 0 && partial[d2 as usize - 1] > 0 {
        d2 -= 1;
        count2 = look_ahead[d2 as usize];
    }
    // Both halves keep at least one cell
    let d2 = d2.clamp(lo, hi - 1) as u8;

    vec![
        vbox.with_bounds(axis, [lo as u8, d2]),
        vbox.with_bounds(axis, [d2 + 1, hi as u8]),
    ]
}

// Split boxes picked by `compare` until `target` boxes exist in total
fn iterate(
    queue: &mut Vec<VBox>,
    terminal: &mut Vec<VBox>,
    compare: fn(&VBox, &VBox) -> Ordering,
    target: usize,
) {
    for _ in 0..MAX_ITERATIONS {
        if queue.len() + terminal.len() >= target {
            return;
        }
        queue.sort_by(compare);
        let Some(vbox) = queue.pop() else {
            return;
        };
        let mut pieces = median_cut(&vbox);
        match pieces.len() {
            0 => {}
            1 => terminal.append(&mut pieces),
            _ => queue.append(&mut pieces),
        }
    }
}

/// Quantized palette: one box per color
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    vboxes: Vec<VBox>,
}

impl ColorMap {
    /// Average colors, most significant first
    pub fn palette(&self) -> Vec<Color> {
        self.vboxes.iter().map(|vbox| vbox.average(false)).collect()
    }

    /// Palette color closest to `color` (black for an empty map)
    pub fn nearest_color(&self, color: Color) -> Color {
        self.vboxes
            .iter()
            .map(|vbox| vbox.average(false))
            .min_by_key(|candidate| candidate.distance(&color))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.vboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vboxes.is_empty()
    }
}

/// Quantize BGRA pixel bytes to at most `max_colors` colors
///
/// Returns `None` for an empty pixel slice, a color count outside 2-256, or
/// an image with no usable pixels.
pub fn quantize(
    pixels: &[u8],
    quality: usize,
    ignore_white: bool,
    max_colors: usize,
) -> Option<ColorMap> {
    if pixels.is_empty() || !(MIN_COLORS..=MAX_COLORS).contains(&max_colors) {
        return None;
    }

    let histogram = Histogram::from_pixels(pixels, quality, ignore_white);
    let vbox = histogram.bounding_box()?;

    let mut queue = vec![vbox];
    let mut terminal = Vec::new();

    // First by population, then by population times volume
    let target = (FRACTION_BY_POPULATION * max_colors as f64).ceil() as usize;
    iterate(&mut queue, &mut terminal, compare_by_count, target);
    iterate(&mut queue, &mut terminal, compare_by_product, max_colors);

    let mut vboxes: Vec<VBox> = queue
        .into_iter()
        .chain(terminal)
        .filter(|vbox| vbox.count(false) > 0)
        .collect();
    vboxes.sort_by(|a, b| compare_by_product(b, a));

    Some(ColorMap { vboxes })
}

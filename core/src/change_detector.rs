//! Pixel-level change detection between two images.

use image::{DynamicImage, GenericImageView};

/// Fraction of pixels that differ between two images, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DiffRatio(f64);

impl DiffRatio {
    pub const NONE: DiffRatio = DiffRatio(0.0);
    pub const TOTAL: DiffRatio = DiffRatio(1.0);

    pub fn from_counts(changed: u64, total: u64) -> Self {
        if total == 0 {
            return Self::TOTAL;
        }
        DiffRatio(changed as f64 / total as f64)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn exceeds(self, threshold: f64) -> bool {
        self.0 > threshold
    }
}

impl core::fmt::Display for DiffRatio {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}%", self.0 * 100.0)
    }
}

/// Compares `current` against `previous`.
///
/// Images of different sizes count as entirely changed. Otherwise both are
/// normalised to 8-bit RGB and a pixel counts as changed when any channel
/// differs.
pub fn difference(current: &DynamicImage, previous: &DynamicImage) -> DiffRatio {
    if current.dimensions() != previous.dimensions() {
        return DiffRatio::TOTAL;
    }

    let current = current.to_rgb8();
    let previous = previous.to_rgb8();

    let changed = current
        .pixels()
        .zip(previous.pixels())
        .filter(|(a, b)| a.0.iter().zip(b.0.iter()).any(|(x, y)| x.abs_diff(*y) > 0))
        .count();

    let total = u64::from(current.width()) * u64::from(current.height());
    DiffRatio::from_counts(changed as u64, total)
}

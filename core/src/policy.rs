use crate::change_detector::DiffRatio;
use crate::display::RefreshMode;

pub const CHANGE_THRESHOLD: f64 = 0.015;
pub const FULL_REFRESH_EVERY: u32 = 3;

/// Decides whether a change is worth a refresh, and how to refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    threshold: f64,
    full_every: u32,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            threshold: CHANGE_THRESHOLD,
            full_every: FULL_REFRESH_EVERY,
        }
    }
}

impl RefreshPolicy {
    /// `full_every` of zero is treated as one (every refresh is full).
    pub fn new(threshold: f64, full_every: u32) -> Self {
        Self {
            threshold,
            full_every: full_every.max(1),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn full_every(&self) -> u32 {
        self.full_every
    }

    pub fn should_refresh(&self, diff: DiffRatio) -> bool {
        diff.exceeds(self.threshold)
    }

    /// Mode for the `update`-th refresh (1-based). The first refresh and every
    /// `full_every`-th after it are full, so ghosting is cleared periodically.
    pub fn mode_for(&self, update: u64) -> RefreshMode {
        if update.saturating_sub(1) % u64::from(self.full_every) == 0 {
            RefreshMode::Full
        } else {
            RefreshMode::Fast
        }
    }
}

//! Peak-hold meter for a single channel.
//!
//! Samples are folded into a hold value for a fixed window. When the
//! window elapses, the held maximum becomes the displayed value and a new
//! window starts from the current sample. A transient therefore shows for
//! at least one full window, then releases.
//!
//! Runs on the real-time thread: no allocation, no branches beyond the
//! window check.

/// Samples a peak is held before the window restarts.
pub const HOLD_WINDOW: u32 = 4096;

/// Smallest linear value converted to dB (about -130 dB).
pub const FLOOR_LINEAR: f32 = 3e-7;

/// `FLOOR_LINEAR` in dB, what a silent channel reports.
pub const FLOOR_DB: f32 = -130.457_57;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakDetector {
    hold: f32,
    count: u32,
    display: f32,
}

impl PeakDetector {
    pub fn new() -> Self {
        Self {
            hold: 0.0,
            count: 0,
            display: FLOOR_LINEAR,
        }
    }

    /// Fold one sample into the meter.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        let magnitude = sample.abs();
        if self.count < HOLD_WINDOW {
            self.hold = self.hold.max(magnitude);
            self.count += 1;
        } else {
            self.display = self.hold;
            self.hold = magnitude;
            self.count = 1;
        }
    }

    /// Fold a block of one channel's samples and return the meter in dB.
    pub fn update(&mut self, samples: &[f32]) -> f32 {
        for &sample in samples {
            self.push(sample);
        }
        self.meter_db()
    }

    /// Displayed peak as a linear amplitude.
    pub fn peak(&self) -> f32 {
        self.display
    }

    /// Displayed peak in dB, floored at `FLOOR_DB`.
    pub fn meter_db(&self) -> f32 {
        to_db(self.display)
    }

    /// Whether the displayed peak has reached full scale.
    pub fn is_clipping(&self) -> bool {
        self.display >= 1.0
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// `20 * log10(max(FLOOR_LINEAR, linear))`.
#[inline]
pub fn to_db(linear: f32) -> f32 {
    20.0 * linear.max(FLOOR_LINEAR).log10()
}

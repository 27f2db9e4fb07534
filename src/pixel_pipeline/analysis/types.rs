//! Analysis result types

/// Dark collection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationPhase {
    #[default]
    Idle,
    Collecting,
    Ready,
}

/// One tracked-pixel reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    /// Frame counter since the last reset
    pub index: u64,
    pub value: i32,
}

/// Unit-width histogram of the tracked pixel.
///
/// `bin_edges` has one more entry than `counts`; bin `i` covers
/// `[bin_edges[i], bin_edges[i + 1])`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub counts: Vec<u64>,
    pub bin_edges: Vec<i64>,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Display range for the image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContrastBounds {
    pub min: i64,
    pub max: i64,
}

impl ContrastBounds {
    /// Range used when auto-contrast is off.
    pub const MANUAL: ContrastBounds = ContrastBounds { min: 10_000, max: 12_000 };
    /// Fixed range for the noise map view.
    pub const NOISE_MAP: ContrastBounds = ContrastBounds { min: 0, max: 50 };

    /// `floor(mean - k*std)` to `ceil(mean + k*std)`.
    pub fn around(mean: f64, std: f64, k: f64) -> Self {
        Self {
            min: (mean - k * std).floor() as i64,
            max: (mean + k * std).ceil() as i64,
        }
    }
}

/// Row and column cuts through the tracked pixel. A disabled cut is a
/// single zero.
#[derive(Debug, Clone, PartialEq)]
pub struct LineProfiles {
    pub horizontal: Vec<f64>,
    pub vertical: Vec<f64>,
}

impl Default for LineProfiles {
    fn default() -> Self {
        Self {
            horizontal: vec![0.0],
            vertical: vec![0.0],
        }
    }
}

//! Streaming analysis module
//!
//! Rolling state kept across frames: the dark baseline, the noise window and
//! the tracked-pixel statistics.

mod calibration;
mod noise;
mod streaming_stats;
pub mod types;

pub use calibration::CalibrationStore;
pub use noise::NoiseTracker;
pub use streaming_stats::{StreamingStats, line_profiles};
pub use types::{CalibrationPhase, ContrastBounds, Histogram, LineProfiles, TimeSample};

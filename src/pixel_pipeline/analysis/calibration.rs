//! Dark frame collection and subtraction.

use ndarray::{Array2, Zip};
use tracing::{debug, info};

use crate::pixel_pipeline::analysis::types::CalibrationPhase;
use crate::pixel_pipeline::common::error::{PipelineError, Result};
use crate::pixel_pipeline::geometry::{NoiseMap, PixelMatrix};

/// Accumulates `requested` frames into a per-pixel dark baseline.
///
/// The running sum is kept in `i64` so long collections of 16-bit frames do
/// not overflow; the baseline is the element-wise mean.
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    shape: (usize, usize),
    sum: Array2<i64>,
    collected: usize,
    requested: usize,
    average: Option<NoiseMap>,
    phase: CalibrationPhase,
}

impl CalibrationStore {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            shape: (height, width),
            sum: Array2::zeros((height, width)),
            collected: 0,
            requested: 0,
            average: None,
            phase: CalibrationPhase::Idle,
        }
    }

    /// Starts a fresh collection of `count` frames, dropping any previous
    /// baseline.
    pub fn request_collection(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(PipelineError::InvalidConfig(
                "dark collection needs at least one frame".to_string(),
            ));
        }
        self.sum.fill(0);
        self.collected = 0;
        self.requested = count;
        self.average = None;
        self.phase = CalibrationPhase::Collecting;
        info!(count, "Dark collection started");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.sum.fill(0);
        self.collected = 0;
        self.average = None;
        self.phase = CalibrationPhase::Idle;
        debug!("Dark baseline cleared");
    }

    /// Feeds one raw frame; only counted while collecting.
    pub fn observe(&mut self, frame: &PixelMatrix) -> Result<CalibrationPhase> {
        if self.phase != CalibrationPhase::Collecting {
            return Ok(self.phase);
        }
        if frame.dim() != self.shape {
            let (height, width) = frame.dim();
            return Err(PipelineError::InvalidDimensions(width, height));
        }

        Zip::from(&mut self.sum)
            .and(frame)
            .for_each(|acc, &v| *acc += i64::from(v));
        self.collected += 1;

        if self.collected == self.requested {
            let n = self.collected as f64;
            self.average = Some(self.sum.mapv(|s| s as f64 / n));
            self.phase = CalibrationPhase::Ready;
            info!(frames = self.collected, "Dark baseline ready");
        }
        Ok(self.phase)
    }

    /// `frame - baseline`, rounded, once a baseline exists.
    pub fn subtract(&self, frame: &PixelMatrix) -> Option<PixelMatrix> {
        let average = self.average.as_ref().filter(|_| self.phase == CalibrationPhase::Ready)?;
        if average.dim() != frame.dim() {
            return None;
        }
        Some(Zip::from(frame).and(average).map_collect(|&v, &a| (f64::from(v) - a).round() as i32))
    }

    pub fn average(&self) -> Option<&NoiseMap> {
        self.average.as_ref()
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn collected_count(&self) -> usize {
        self.collected
    }

    pub fn requested_count(&self) -> usize {
        self.requested
    }

    pub fn is_ready(&self) -> bool {
        self.phase == CalibrationPhase::Ready
    }
}

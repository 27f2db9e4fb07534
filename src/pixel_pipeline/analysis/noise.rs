//! Per-pixel noise over a sliding window of frames.

use std::time::{Duration, Instant};

use ndarray::{Array2, Zip};
use tracing::trace;

use crate::pixel_pipeline::common::error::{PipelineError, Result};
use crate::pixel_pipeline::common::ring_buffer::RingBuffer;
use crate::pixel_pipeline::geometry::{NoiseMap, PixelMatrix};

/// Keeps the last `capacity` frames and a population standard deviation map
/// over them, recomputed at most once per `refresh_interval`.
///
/// Running sums are updated on every push and eviction so a refresh costs
/// one pass over the image, not over the window.
#[derive(Debug, Clone)]
pub struct NoiseTracker {
    shape: (usize, usize),
    window: RingBuffer<PixelMatrix>,
    sum: Array2<i64>,
    sum_sq: Array2<i128>,
    map: Option<NoiseMap>,
    refresh_interval: Duration,
    last_refresh: Option<Instant>,
}

impl NoiseTracker {
    pub fn new(height: usize, width: usize, capacity: usize, refresh_interval: Duration) -> Self {
        Self {
            shape: (height, width),
            window: RingBuffer::new(capacity),
            sum: Array2::zeros((height, width)),
            sum_sq: Array2::zeros((height, width)),
            map: None,
            refresh_interval,
            last_refresh: None,
        }
    }

    pub fn push(&mut self, frame: PixelMatrix) -> Result<()> {
        if frame.dim() != self.shape {
            let (height, width) = frame.dim();
            return Err(PipelineError::InvalidDimensions(width, height));
        }
        self.accumulate(&frame, 1);
        if let Some(evicted) = self.window.push(frame) {
            self.accumulate(&evicted, -1);
        }
        Ok(())
    }

    /// Recomputes the map if the window is non-empty and the interval has
    /// elapsed since the last recompute. Returns whether it ran.
    pub fn refresh_if_due(&mut self, now: Instant) -> bool {
        if self.window.is_empty() {
            return false;
        }
        let due = self
            .last_refresh
            .is_none_or(|last| now.saturating_duration_since(last) >= self.refresh_interval);
        if due {
            self.recompute();
            self.last_refresh = Some(now);
        }
        due
    }

    /// Unthrottled recompute; no-op on an empty window.
    pub fn recompute(&mut self) {
        let n = self.window.len() as i128;
        if n == 0 {
            return;
        }
        let denominator = (n * n) as f64;
        let map = Zip::from(&self.sum).and(&self.sum_sq).map_collect(|&s, &sq| {
            let s = i128::from(s);
            let variance = (n * sq - s * s) as f64 / denominator;
            variance.max(0.0).sqrt()
        });
        trace!(frames = n as u64, "Noise map recomputed");
        self.map = Some(map);
    }

    pub fn noise_map(&self) -> Option<&NoiseMap> {
        self.map.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.map.is_some()
    }

    /// Empties the window; the last map stays available.
    pub fn clear(&mut self) {
        self.window.clear();
        self.sum.fill(0);
        self.sum_sq.fill(0);
    }

    /// Changes the window length, dropping the oldest frames first.
    pub fn resize(&mut self, capacity: usize) {
        for dropped in self.window.resize(capacity) {
            self.accumulate(&dropped, -1);
        }
    }

    pub fn set_refresh_interval(&mut self, interval: Duration) {
        self.refresh_interval = interval;
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    fn accumulate(&mut self, frame: &PixelMatrix, sign: i64) {
        Zip::from(&mut self.sum)
            .and(&mut self.sum_sq)
            .and(frame)
            .for_each(|s, sq, &v| {
                let v = i64::from(v);
                *s += sign * v;
                *sq += i128::from(sign * v * v);
            });
    }
}

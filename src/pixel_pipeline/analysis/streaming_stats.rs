//! Tracked-pixel series, histogram and image-window statistics.

use ndarray::{ArrayView2, Axis, concatenate};

use crate::pixel_pipeline::analysis::types::{Histogram, LineProfiles, TimeSample};
use crate::pixel_pipeline::common::ring_buffer::RingBuffer;
use crate::pixel_pipeline::geometry::PixelMatrix;

/// Histogram range padding around the observed values.
const HISTOGRAM_MARGIN: i64 = 10;

#[derive(Debug, Clone)]
pub struct StreamingStats {
    time_series: RingBuffer<TimeSample>,
    histogram_window: RingBuffer<i32>,
    image_window: RingBuffer<PixelMatrix>,
    next_index: u64,
    tracked: Option<(usize, usize)>,
}

impl StreamingStats {
    pub fn new(time_series_len: usize, histogram_len: usize, image_window_len: usize) -> Self {
        Self {
            time_series: RingBuffer::new(time_series_len),
            histogram_window: RingBuffer::new(histogram_len),
            image_window: RingBuffer::new(image_window_len),
            next_index: 0,
            tracked: None,
        }
    }

    /// Points the series at `(row, col)`. Moving to a new pixel empties the
    /// series and the histogram window; returns whether that happened.
    pub fn track(&mut self, row: usize, col: usize) -> bool {
        if self.tracked == Some((row, col)) {
            return false;
        }
        let changed = self.tracked.is_some();
        self.tracked = Some((row, col));
        if changed {
            self.clear_series();
        }
        changed
    }

    pub fn tracked(&self) -> Option<(usize, usize)> {
        self.tracked
    }

    /// Appends the tracked pixel of `frame`; `None` when the coordinate is
    /// outside the frame. The time index advances either way.
    pub fn record(&mut self, frame: &PixelMatrix) -> Option<i32> {
        let index = self.next_index;
        self.next_index += 1;
        let (row, col) = self.tracked?;
        let value = *frame.get((row, col))?;
        self.time_series.push(TimeSample { index, value });
        self.histogram_window.push(value);
        Some(value)
    }

    pub fn push_image(&mut self, frame: PixelMatrix) {
        self.image_window.push(frame);
    }

    /// Unit bins over `[min - 10, max + 10)` of the histogram window.
    pub fn histogram(&self) -> Option<Histogram> {
        let min = i64::from(*self.histogram_window.iter().min()?);
        let max = i64::from(*self.histogram_window.iter().max()?);
        let first_edge = min - HISTOGRAM_MARGIN;
        let last_edge = max + HISTOGRAM_MARGIN - 1;

        let mut counts = vec![0u64; (last_edge - first_edge) as usize];
        for &value in self.histogram_window.iter() {
            counts[(i64::from(value) - first_edge) as usize] += 1;
        }
        Some(Histogram {
            counts,
            bin_edges: (first_edge..=last_edge).collect(),
        })
    }

    /// Mean and population standard deviation over every pixel of every
    /// frame in the image window.
    pub fn image_window_stats(&self) -> Option<(f64, f64)> {
        let frames: Vec<_> = self.image_window.iter().map(|frame| frame.view()).collect();
        let pixels = concatenate(Axis(0), &frames).ok()?.mapv(f64::from);
        let mean = pixels.mean()?;
        Some((mean, pixels.std(0.0)))
    }

    pub fn time_series(&self) -> impl ExactSizeIterator<Item = &TimeSample> {
        self.time_series.iter()
    }

    pub fn time_series_len(&self) -> usize {
        self.time_series.len()
    }

    pub fn histogram_window_len(&self) -> usize {
        self.histogram_window.len()
    }

    pub fn image_window_len(&self) -> usize {
        self.image_window.len()
    }

    pub fn clear_series(&mut self) {
        self.time_series.clear();
        self.histogram_window.clear();
    }

    pub fn clear_images(&mut self) {
        self.image_window.clear();
    }

    /// Empties the series and restarts the time index.
    pub fn reset(&mut self) {
        self.clear_series();
        self.next_index = 0;
    }

    pub fn resize_time_series(&mut self, len: usize) {
        self.time_series.resize(len);
    }

    pub fn resize_histogram_window(&mut self, len: usize) {
        self.histogram_window.resize(len);
    }

    pub fn resize_image_window(&mut self, len: usize) {
        self.image_window.resize(len);
    }
}

/// Row `row` and column `col` of `image`, each only when enabled and in
/// range.
pub fn line_profiles<T>(image: ArrayView2<'_, T>, row: usize, col: usize, horizontal: bool, vertical: bool) -> LineProfiles
where
    T: Copy + Into<f64>,
{
    let (height, width) = image.dim();
    let mut lines = LineProfiles::default();
    if horizontal && row < height {
        lines.horizontal = image.row(row).iter().map(|&v| v.into()).collect();
    }
    if vertical && col < width {
        lines.vertical = image.column(col).iter().map(|&v| v.into()).collect();
    }
    lines
}

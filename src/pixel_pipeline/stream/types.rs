//! Viewer configuration and per-frame output types

use std::time::Duration;

use crate::pixel_pipeline::analysis::{
    CalibrationPhase, ContrastBounds, Histogram, LineProfiles, TimeSample,
};
use crate::pixel_pipeline::common::error::{PipelineError, Result};
use crate::pixel_pipeline::geometry::{NoiseMap, PixelMatrix};

/// Runtime settings of one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Mask applied to descrambled pixels; `None` keeps the sensor's full depth
    pub pixel_bit_mask: Option<u32>,
    /// Fold the gain-range bit on sensors that carry one
    pub gain_msb: bool,
    /// Frames averaged per dark collection
    pub num_dark_requested: usize,
    /// Subtract the dark baseline once it is ready
    pub apply_dark: bool,
    /// Show the dark baseline instead of the frame
    pub show_dark: bool,
    /// Show the noise map instead of the frame once one exists
    pub show_noise_map: bool,
    pub auto_contrast: bool,
    pub plot_horizontal: bool,
    pub plot_vertical: bool,
    pub time_plot_max_len: usize,
    /// Tracked pixel row
    pub tracked_x: usize,
    /// Tracked pixel column
    pub tracked_y: usize,
    pub histogram_window_len: usize,
    pub image_window_len: usize,
    pub noise_window_len: usize,
    pub noise_refresh_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            pixel_bit_mask: None,
            gain_msb: true,
            num_dark_requested: 10,
            apply_dark: false,
            show_dark: false,
            show_noise_map: false,
            auto_contrast: false,
            plot_horizontal: false,
            plot_vertical: false,
            time_plot_max_len: 1000,
            tracked_x: 0,
            tracked_y: 0,
            histogram_window_len: 50_000,
            image_window_len: 30,
            noise_window_len: 1000,
            noise_refresh_interval: Duration::from_secs(1),
        }
    }
}

impl ViewerConfig {
    pub fn builder() -> ViewerConfigBuilder {
        ViewerConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_dark_requested == 0 {
            return Err(PipelineError::InvalidConfig(
                "num_dark_requested must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for ViewerConfig
#[derive(Default)]
pub struct ViewerConfigBuilder {
    pixel_bit_mask: Option<Option<u32>>,
    gain_msb: Option<bool>,
    num_dark_requested: Option<usize>,
    apply_dark: Option<bool>,
    show_dark: Option<bool>,
    show_noise_map: Option<bool>,
    auto_contrast: Option<bool>,
    plot_horizontal: Option<bool>,
    plot_vertical: Option<bool>,
    time_plot_max_len: Option<usize>,
    tracked_pixel: Option<(usize, usize)>,
    histogram_window_len: Option<usize>,
    image_window_len: Option<usize>,
    noise_window_len: Option<usize>,
    noise_refresh_interval: Option<Duration>,
}

impl ViewerConfigBuilder {
    pub fn pixel_bit_mask(mut self, mask: Option<u32>) -> Self {
        self.pixel_bit_mask = Some(mask);
        self
    }

    pub fn gain_msb(mut self, enable: bool) -> Self {
        self.gain_msb = Some(enable);
        self
    }

    pub fn num_dark_requested(mut self, count: usize) -> Self {
        self.num_dark_requested = Some(count);
        self
    }

    pub fn apply_dark(mut self, enable: bool) -> Self {
        self.apply_dark = Some(enable);
        self
    }

    pub fn show_dark(mut self, enable: bool) -> Self {
        self.show_dark = Some(enable);
        self
    }

    pub fn show_noise_map(mut self, enable: bool) -> Self {
        self.show_noise_map = Some(enable);
        self
    }

    pub fn auto_contrast(mut self, enable: bool) -> Self {
        self.auto_contrast = Some(enable);
        self
    }

    pub fn plot_horizontal(mut self, enable: bool) -> Self {
        self.plot_horizontal = Some(enable);
        self
    }

    pub fn plot_vertical(mut self, enable: bool) -> Self {
        self.plot_vertical = Some(enable);
        self
    }

    pub fn time_plot_max_len(mut self, len: usize) -> Self {
        self.time_plot_max_len = Some(len);
        self
    }

    /// Row and column of the tracked pixel.
    pub fn tracked_pixel(mut self, row: usize, col: usize) -> Self {
        self.tracked_pixel = Some((row, col));
        self
    }

    pub fn histogram_window_len(mut self, len: usize) -> Self {
        self.histogram_window_len = Some(len);
        self
    }

    pub fn image_window_len(mut self, len: usize) -> Self {
        self.image_window_len = Some(len);
        self
    }

    pub fn noise_window_len(mut self, len: usize) -> Self {
        self.noise_window_len = Some(len);
        self
    }

    pub fn noise_refresh_interval(mut self, interval: Duration) -> Self {
        self.noise_refresh_interval = Some(interval);
        self
    }

    pub fn build(self) -> ViewerConfig {
        let default = ViewerConfig::default();
        let (tracked_x, tracked_y) = self.tracked_pixel.unwrap_or((default.tracked_x, default.tracked_y));
        ViewerConfig {
            pixel_bit_mask: self.pixel_bit_mask.unwrap_or(default.pixel_bit_mask),
            gain_msb: self.gain_msb.unwrap_or(default.gain_msb),
            num_dark_requested: self.num_dark_requested.unwrap_or(default.num_dark_requested),
            apply_dark: self.apply_dark.unwrap_or(default.apply_dark),
            show_dark: self.show_dark.unwrap_or(default.show_dark),
            show_noise_map: self.show_noise_map.unwrap_or(default.show_noise_map),
            auto_contrast: self.auto_contrast.unwrap_or(default.auto_contrast),
            plot_horizontal: self.plot_horizontal.unwrap_or(default.plot_horizontal),
            plot_vertical: self.plot_vertical.unwrap_or(default.plot_vertical),
            time_plot_max_len: self.time_plot_max_len.unwrap_or(default.time_plot_max_len),
            tracked_x,
            tracked_y,
            histogram_window_len: self.histogram_window_len.unwrap_or(default.histogram_window_len),
            image_window_len: self.image_window_len.unwrap_or(default.image_window_len),
            noise_window_len: self.noise_window_len.unwrap_or(default.noise_window_len),
            noise_refresh_interval: self.noise_refresh_interval.unwrap_or(default.noise_refresh_interval),
        }
    }
}

/// What the image panel shows for a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameView {
    /// The descrambled frame, dark-subtracted when enabled
    Pixels(PixelMatrix),
    NoiseMap(NoiseMap),
    /// The dark baseline
    Dark(NoiseMap),
}

impl FrameView {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            FrameView::Pixels(m) => m.dim(),
            FrameView::NoiseMap(m) | FrameView::Dark(m) => m.dim(),
        }
    }

    pub fn as_pixels(&self) -> Option<&PixelMatrix> {
        match self {
            FrameView::Pixels(m) => Some(m),
            _ => None,
        }
    }
}

/// Everything a viewer needs to redraw after one frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub view: FrameView,
    /// Tracked pixel of this frame, if in range
    pub pixel_value: Option<i32>,
    pub histogram: Option<Histogram>,
    pub time_series: Vec<TimeSample>,
    pub contrast: ContrastBounds,
    pub lines: LineProfiles,
    pub noise_map_ready: bool,
    pub dark_phase: CalibrationPhase,
    pub descramble_error_count: u64,
}

/// Current fill of every rolling buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferLengths {
    pub time_series: usize,
    pub histogram: usize,
    pub images: usize,
    pub noise: usize,
}

impl BufferLengths {
    pub fn is_empty(&self) -> bool {
        *self == BufferLengths::default()
    }
}

use std::time::Instant;

use tracing::{debug, debug_span, info, instrument, warn};

use crate::pixel_pipeline::analysis::{
    CalibrationStore, ContrastBounds, LineProfiles, NoiseTracker, StreamingStats, line_profiles,
};
use crate::pixel_pipeline::common::error::{PipelineError, Result};
use crate::pixel_pipeline::descramble::{
    DescrambleOptions, FrameDescrambler, SensorDescrambler, SensorVariant,
};
use crate::pixel_pipeline::geometry::{PixelMatrix, RawFrame, SensorGeometry};
use crate::pixel_pipeline::stream::types::{BufferLengths, FrameOutput, FrameView, ViewerConfig};

/// Auto-contrast half-width in standard deviations.
const CONTRAST_SIGMAS: f64 = 2.0;
/// Dark-subtracted frames sit around zero with a narrow spread.
const CONTRAST_SIGMAS_DARK: f64 = 10.0;

/// Descrambles frames one at a time and keeps the rolling calibration and
/// statistics state of one sensor channel.
pub struct PixelStreamPipeline<D: FrameDescrambler = SensorDescrambler> {
    descrambler: D,
    config: ViewerConfig,
    calibration: CalibrationStore,
    noise: NoiseTracker,
    stats: StreamingStats,
    contrast: ContrastBounds,
    descramble_errors: u64,
    frames_processed: u64,
}

impl PixelStreamPipeline<SensorDescrambler> {
    pub fn new(variant: SensorVariant, config: ViewerConfig) -> Result<Self> {
        Self::with_custom(SensorDescrambler::new(variant)?, config)
    }
}

impl<D: FrameDescrambler> PixelStreamPipeline<D> {
    pub fn with_custom(descrambler: D, config: ViewerConfig) -> Result<Self> {
        config.validate()?;
        let (height, width) = descrambler.geometry().shape();

        let mut stats = StreamingStats::new(
            config.time_plot_max_len,
            config.histogram_window_len,
            config.image_window_len,
        );
        stats.track(config.tracked_x, config.tracked_y);

        info!(width, height, "Pixel stream pipeline initialized");
        Ok(Self {
            calibration: CalibrationStore::new(height, width),
            noise: NoiseTracker::new(height, width, config.noise_window_len, config.noise_refresh_interval),
            stats,
            descrambler,
            config,
            contrast: ContrastBounds::MANUAL,
            descramble_errors: 0,
            frames_processed: 0,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn geometry(&self) -> &SensorGeometry {
        self.descrambler.geometry()
    }

    pub fn calibration(&self) -> &CalibrationStore {
        &self.calibration
    }

    pub fn noise_tracker(&self) -> &NoiseTracker {
        &self.noise
    }

    pub fn stats(&self) -> &StreamingStats {
        &self.stats
    }

    pub fn contrast(&self) -> ContrastBounds {
        self.contrast
    }

    pub fn descramble_error_count(&self) -> u64 {
        self.descramble_errors
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn buffer_lengths(&self) -> BufferLengths {
        BufferLengths {
            time_series: self.stats.time_series_len(),
            histogram: self.stats.histogram_window_len(),
            images: self.stats.image_window_len(),
            noise: self.noise.len(),
        }
    }

    /// Applies a new configuration. Toggling dark subtraction empties every
    /// rolling buffer before the next frame; window lengths keep their
    /// newest entries.
    pub fn set_config(&mut self, config: ViewerConfig) -> Result<()> {
        config.validate()?;
        let old = std::mem::replace(&mut self.config, config);
        let new = &self.config;

        if old.apply_dark != new.apply_dark {
            self.stats.clear_series();
            self.stats.clear_images();
            self.noise.clear();
            debug!(apply_dark = new.apply_dark, "Dark subtraction toggled, buffers cleared");
        }
        if old.time_plot_max_len != new.time_plot_max_len {
            self.stats.resize_time_series(new.time_plot_max_len);
        }
        if old.histogram_window_len != new.histogram_window_len {
            self.stats.resize_histogram_window(new.histogram_window_len);
        }
        if old.image_window_len != new.image_window_len {
            self.stats.resize_image_window(new.image_window_len);
        }
        if old.noise_window_len != new.noise_window_len {
            self.noise.resize(new.noise_window_len);
        }
        if old.noise_refresh_interval != new.noise_refresh_interval {
            self.noise.set_refresh_interval(new.noise_refresh_interval);
        }
        self.stats.track(new.tracked_x, new.tracked_y);
        if !new.auto_contrast {
            self.contrast = ContrastBounds::MANUAL;
        }
        Ok(())
    }

    /// Starts collecting `num_dark_requested` frames into a new baseline.
    pub fn request_dark_collection(&mut self) -> Result<()> {
        self.calibration.request_collection(self.config.num_dark_requested)
    }

    pub fn clear_dark(&mut self) {
        self.calibration.clear();
    }

    /// Empties the time series, histogram and noise windows and restarts the
    /// time index.
    pub fn reset(&mut self) {
        self.stats.reset();
        self.noise.clear();
        info!("Time plot reset");
    }

    pub fn process(&mut self, frame: &RawFrame<'_>) -> Option<FrameOutput> {
        self.process_at(frame, Instant::now())
    }

    /// Runs one frame through every stage. Returns `None` only when the
    /// frame had to be discarded.
    #[instrument(level = "debug", skip_all, fields(frame = self.frames_processed, bytes = frame.len()))]
    pub fn process_at(&mut self, frame: &RawFrame<'_>, now: Instant) -> Option<FrameOutput> {
        self.frames_processed += 1;
        self.noise.refresh_if_due(now);

        let descrambled = {
            let _span = debug_span!("descramble").entered();
            self.descrambler.descramble(frame, &self.descramble_options())
        };
        let faulted = descrambled.fault.is_some();
        if let Some(fault) = &descrambled.fault {
            self.descramble_errors += 1;
            warn!(error = %fault, errors = self.descramble_errors, "Descramble error");
            if matches!(fault, PipelineError::MalformedChunk { .. }) {
                return None;
            }
        }
        let raw = descrambled.matrix;

        let image = {
            let _span = debug_span!("calibrate").entered();
            // faulted frames are zero-filled and never join the baseline
            if faulted {
                debug!("Faulted frame kept out of dark collection");
            } else if let Err(e) = self.calibration.observe(&raw) {
                warn!(error = %e, "Frame skipped by dark collection");
            }
            if self.config.apply_dark {
                self.calibration.subtract(&raw).unwrap_or(raw)
            } else {
                raw
            }
        };

        let (row, col) = (self.config.tracked_x, self.config.tracked_y);
        let pixel_value = {
            let _span = debug_span!("statistics").entered();
            if let Err(e) = self.noise.push(image.clone()) {
                warn!(error = %e, "Frame skipped by noise window");
            }
            let value = self.stats.record(&image);
            self.stats.push_image(image.clone());
            value
        };

        let lines = self.line_profiles_for(&image, row, col);
        let view = self.select_view(image);
        if self.config.auto_contrast {
            self.update_contrast(&view);
        }

        Some(FrameOutput {
            pixel_value,
            histogram: self.stats.histogram(),
            time_series: self.stats.time_series().copied().collect(),
            contrast: self.contrast,
            lines,
            noise_map_ready: self.noise.is_ready(),
            dark_phase: self.calibration.phase(),
            descramble_error_count: self.descramble_errors,
            view,
        })
    }

    fn descramble_options(&self) -> DescrambleOptions {
        DescrambleOptions {
            bit_mask: self
                .config
                .pixel_bit_mask
                .unwrap_or_else(|| self.descrambler.geometry().full_mask()),
            gain_msb: self.config.gain_msb,
        }
    }

    /// Lines are cut from the noise map while it is shown and from the frame
    /// otherwise, also when the dark baseline is on screen.
    fn line_profiles_for(&self, image: &PixelMatrix, row: usize, col: usize) -> LineProfiles {
        let (horizontal, vertical) = (self.config.plot_horizontal, self.config.plot_vertical);
        match self.noise.noise_map().filter(|_| self.config.show_noise_map) {
            Some(map) => line_profiles(map.view(), row, col, horizontal, vertical),
            None => line_profiles(image.view(), row, col, horizontal, vertical),
        }
    }

    /// Noise map first, then the dark baseline, then the frame itself; an
    /// overlay that does not exist yet falls through.
    fn select_view(&self, image: PixelMatrix) -> FrameView {
        if self.config.show_noise_map {
            if let Some(map) = self.noise.noise_map() {
                return FrameView::NoiseMap(map.clone());
            }
        }
        if self.config.show_dark {
            if let Some(dark) = self.calibration.average() {
                return FrameView::Dark(dark.clone());
            }
        }
        FrameView::Pixels(image)
    }

    fn update_contrast(&mut self, view: &FrameView) {
        let k = if self.config.apply_dark {
            CONTRAST_SIGMAS_DARK
        } else {
            CONTRAST_SIGMAS
        };
        let bounds = match view {
            FrameView::NoiseMap(_) => Some(ContrastBounds::NOISE_MAP),
            FrameView::Dark(dark) => dark
                .mean()
                .map(|mean| ContrastBounds::around(mean, dark.std(0.0), k)),
            FrameView::Pixels(_) => self
                .stats
                .image_window_stats()
                .map(|(mean, std)| ContrastBounds::around(mean, std, k)),
        };
        if let Some(bounds) = bounds {
            self.contrast = bounds;
        }
    }
}

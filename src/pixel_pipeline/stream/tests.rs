#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use ndarray::Array2;

    use crate::pixel_pipeline::analysis::{CalibrationPhase, ContrastBounds};
    use crate::pixel_pipeline::common::error::PipelineError;
    use crate::pixel_pipeline::descramble::{DescrambleOptions, Descrambled, FrameDescrambler, SensorVariant};
    use crate::pixel_pipeline::geometry::{RawFrame, SampleEncoding, SensorGeometry};
    use crate::pixel_pipeline::stream::pipeline::PixelStreamPipeline;
    use crate::pixel_pipeline::stream::types::{FrameOutput, FrameView, ViewerConfig};

    /// One byte per pixel, row-major. A leading 0xFF marks a corrupt chunk.
    struct MockDescrambler {
        geometry: SensorGeometry,
    }

    impl MockDescrambler {
        fn new() -> Self {
            Self {
                geometry: SensorGeometry {
                    width: 3,
                    height: 2,
                    bit_depth: 8,
                    header_bytes: 0,
                    trailer_bytes: 0,
                    encoding: SampleEncoding::Word16Le,
                    lane_count: 1,
                    clusters_per_lane: 1,
                    gain_bit_present: false,
                },
            }
        }
    }

    impl FrameDescrambler for MockDescrambler {
        fn geometry(&self) -> &SensorGeometry {
            &self.geometry
        }

        fn descramble(&self, frame: &RawFrame<'_>, _options: &DescrambleOptions) -> Descrambled {
            let bytes = frame.payload();
            if bytes.len() != self.geometry.pixel_count() {
                return Descrambled::faulted(
                    self.geometry.blank(),
                    PipelineError::FrameSizeMismatch {
                        expected: self.geometry.pixel_count(),
                        actual: bytes.len(),
                    },
                );
            }
            if bytes.first() == Some(&0xFF) {
                return Descrambled::faulted(self.geometry.blank(), PipelineError::MalformedChunk { len: 4 });
            }
            let values = bytes.iter().map(|&b| i32::from(b)).collect();
            Descrambled::clean(Array2::from_shape_vec(self.geometry.shape(), values).unwrap())
        }
    }

    fn mock_pipeline(config: ViewerConfig) -> PixelStreamPipeline<MockDescrambler> {
        PixelStreamPipeline::with_custom(MockDescrambler::new(), config).unwrap()
    }

    fn pixels(output: &FrameOutput) -> Vec<i32> {
        output.view.as_pixels().unwrap().iter().copied().collect()
    }

    /// A 10k2M frame whose word `k` carries `k`.
    fn hr10k2m_frame() -> Vec<u8> {
        let geometry = SensorVariant::EpixHr10k2M.geometry();
        let mut bytes = vec![0xA5u8; geometry.header_bytes];
        for word in 0..geometry.pixel_count() {
            bytes.extend_from_slice(&((word % 50_000) as u16).to_le_bytes());
        }
        bytes.extend_from_slice(&vec![0x5Au8; geometry.trailer_bytes]);
        bytes
    }

    #[test]
    fn test_config_builder() {
        let config = ViewerConfig::builder()
            .pixel_bit_mask(Some(0x0FFF))
            .gain_msb(false)
            .num_dark_requested(25)
            .auto_contrast(true)
            .tracked_pixel(3, 4)
            .time_plot_max_len(200)
            .noise_refresh_interval(Duration::from_millis(250))
            .build();

        assert_eq!(config.pixel_bit_mask, Some(0x0FFF));
        assert!(!config.gain_msb);
        assert_eq!(config.num_dark_requested, 25);
        assert!(config.auto_contrast);
        assert_eq!((config.tracked_x, config.tracked_y), (3, 4));
        assert_eq!(config.time_plot_max_len, 200);
        assert_eq!(config.noise_refresh_interval, Duration::from_millis(250));
        // untouched fields keep their defaults
        assert_eq!(config.histogram_window_len, 50_000);
        assert_eq!(config.image_window_len, 30);
        assert_eq!(config.noise_window_len, 1000);
        assert!(!config.apply_dark);
    }

    #[test]
    fn test_rejects_zero_dark_count() {
        let config = ViewerConfig::builder().num_dark_requested(0).build();
        let result = PixelStreamPipeline::with_custom(MockDescrambler::new(), config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));

        let mut pipeline = mock_pipeline(ViewerConfig::default());
        let bad = ViewerConfig { num_dark_requested: 0, ..ViewerConfig::default() };
        assert!(pipeline.set_config(bad).is_err());
        assert_eq!(pipeline.config().num_dark_requested, 10);
    }

    #[test]
    fn test_dark_collection_and_subtraction() {
        let config = ViewerConfig::builder().num_dark_requested(2).apply_dark(true).build();
        let mut pipeline = mock_pipeline(config);
        pipeline.request_dark_collection().unwrap();

        let out = pipeline.process(&RawFrame::new(&[10; 6])).unwrap();
        assert_eq!(out.dark_phase, CalibrationPhase::Collecting);
        assert_eq!(pixels(&out), vec![10; 6]);

        let out = pipeline.process(&RawFrame::new(&[20; 6])).unwrap();
        assert_eq!(out.dark_phase, CalibrationPhase::Ready);
        assert_eq!(pixels(&out), vec![5; 6]);

        let out = pipeline.process(&RawFrame::new(&[16, 15, 14, 15, 15, 15])).unwrap();
        assert_eq!(pixels(&out), vec![1, 0, -1, 0, 0, 0]);
        assert_eq!(pipeline.calibration().collected_count(), 2);

        pipeline.clear_dark();
        let out = pipeline.process(&RawFrame::new(&[16; 6])).unwrap();
        assert_eq!(out.dark_phase, CalibrationPhase::Idle);
        assert_eq!(pixels(&out), vec![16; 6]);
    }

    #[test]
    fn test_apply_dark_toggle_empties_buffers() {
        let mut pipeline = mock_pipeline(ViewerConfig::default());
        for value in 1..=3u8 {
            pipeline.process(&RawFrame::new(&[value; 6])).unwrap();
        }
        let lengths = pipeline.buffer_lengths();
        assert_eq!((lengths.time_series, lengths.histogram, lengths.images, lengths.noise), (3, 3, 3, 3));

        let toggled = ViewerConfig { apply_dark: true, ..pipeline.config().clone() };
        pipeline.set_config(toggled).unwrap();
        assert!(pipeline.buffer_lengths().is_empty());

        // same value again is not a toggle
        pipeline.process(&RawFrame::new(&[1; 6])).unwrap();
        pipeline.set_config(pipeline.config().clone()).unwrap();
        assert_eq!(pipeline.buffer_lengths().images, 1);
    }

    #[test]
    fn test_size_mismatch_flows_zero_frame() {
        let mut pipeline = mock_pipeline(ViewerConfig::default());
        let out = pipeline.process(&RawFrame::new(&[7; 5])).unwrap();
        assert_eq!(pixels(&out), vec![0; 6]);
        assert_eq!(out.pixel_value, Some(0));
        assert_eq!(out.descramble_error_count, 1);

        let out = pipeline.process(&RawFrame::new(&[7; 6])).unwrap();
        assert_eq!(out.descramble_error_count, 1);
        assert_eq!(out.pixel_value, Some(7));
    }

    #[test]
    fn test_malformed_chunk_discards_frame() {
        let mut pipeline = mock_pipeline(ViewerConfig::default());
        assert!(pipeline.process(&RawFrame::new(&[0xFF; 6])).is_none());
        assert_eq!(pipeline.descramble_error_count(), 1);
        assert!(pipeline.buffer_lengths().is_empty());
    }

    #[test]
    fn test_tracked_pixel_change_clears_series() {
        let config = ViewerConfig::builder().tracked_pixel(1, 2).build();
        let mut pipeline = mock_pipeline(config);
        for _ in 0..4 {
            let out = pipeline.process(&RawFrame::new(&[0, 1, 2, 3, 4, 5])).unwrap();
            assert_eq!(out.pixel_value, Some(5));
        }
        assert_eq!(pipeline.buffer_lengths().time_series, 4);

        let moved = ViewerConfig { tracked_x: 0, tracked_y: 0, ..pipeline.config().clone() };
        pipeline.set_config(moved).unwrap();
        let lengths = pipeline.buffer_lengths();
        assert_eq!((lengths.time_series, lengths.histogram), (0, 0));
        assert_eq!(lengths.images, 4);

        let out = pipeline.process(&RawFrame::new(&[9, 1, 2, 3, 4, 5])).unwrap();
        assert_eq!(out.time_series.len(), 1);
        assert_eq!(out.time_series[0].value, 9);
    }

    #[test]
    fn test_tracked_pixel_outside_frame() {
        let config = ViewerConfig::builder().tracked_pixel(5, 5).plot_horizontal(true).build();
        let mut pipeline = mock_pipeline(config);
        let out = pipeline.process(&RawFrame::new(&[1; 6])).unwrap();
        assert_eq!(out.pixel_value, None);
        assert!(out.histogram.is_none());
        assert_eq!(out.lines.horizontal, vec![0.0]);
    }

    #[test]
    fn test_histogram_counts_every_sample() {
        let mut pipeline = mock_pipeline(ViewerConfig::default());
        let mut last = None;
        for value in [50u8, 52, 52, 60, 49] {
            last = pipeline.process(&RawFrame::new(&[value, 0, 0, 0, 0, 0]));
        }
        let histogram = last.unwrap().histogram.unwrap();
        assert_eq!(histogram.total(), 5);
        assert_eq!(histogram.bin_edges[0], 39);
        assert_eq!(histogram.counts.len(), (60 - 49 + 19) as usize);
    }

    #[test]
    fn test_auto_contrast_brackets_mean() {
        let config = ViewerConfig::builder().auto_contrast(true).build();
        let mut pipeline = mock_pipeline(config);
        assert_eq!(pipeline.contrast(), ContrastBounds::MANUAL);

        let frames: [[u8; 6]; 3] = [[10, 20, 30, 40, 50, 60], [11, 19, 33, 41, 52, 58], [9, 9, 9, 9, 9, 9]];
        for frame in frames {
            let out = pipeline.process(&RawFrame::new(&frame)).unwrap();
            let (mean, std) = pipeline.stats().image_window_stats().unwrap();
            assert!(out.contrast.min as f64 <= mean && mean <= out.contrast.max as f64);
            assert_eq!(out.contrast, ContrastBounds::around(mean, std, 2.0));
        }

        let flat = ViewerConfig::builder().auto_contrast(true).image_window_len(1).build();
        let mut pipeline = mock_pipeline(flat);
        let out = pipeline.process(&RawFrame::new(&[7; 6])).unwrap();
        assert_eq!(out.contrast, ContrastBounds { min: 7, max: 7 });
    }

    #[test]
    fn test_auto_contrast_widens_under_dark_subtraction() {
        let config = ViewerConfig::builder()
            .auto_contrast(true)
            .apply_dark(true)
            .num_dark_requested(1)
            .image_window_len(1)
            .build();
        let mut pipeline = mock_pipeline(config);
        pipeline.request_dark_collection().unwrap();
        pipeline.process(&RawFrame::new(&[10; 6])).unwrap();

        let out = pipeline.process(&RawFrame::new(&[9, 11, 9, 11, 9, 11])).unwrap();
        // subtracted frame is +-1 around zero
        assert_eq!(out.contrast, ContrastBounds { min: -10, max: 10 });
    }

    #[test]
    fn test_noise_map_view() {
        let config = ViewerConfig::builder()
            .show_noise_map(true)
            .auto_contrast(true)
            .plot_horizontal(true)
            .build();
        let mut pipeline = mock_pipeline(config);
        let start = Instant::now();

        let out = pipeline.process_at(&RawFrame::new(&[1; 6]), start).unwrap();
        assert!(!out.noise_map_ready);
        assert!(matches!(out.view, FrameView::Pixels(_)));

        pipeline.process_at(&RawFrame::new(&[3; 6]), start).unwrap();
        let out = pipeline
            .process_at(&RawFrame::new(&[3; 6]), start + Duration::from_secs(1))
            .unwrap();
        assert!(out.noise_map_ready);
        assert_eq!(out.contrast, ContrastBounds::NOISE_MAP);
        match &out.view {
            FrameView::NoiseMap(map) => assert!(map.iter().all(|&s| (s - 1.0).abs() < 1e-12)),
            other => panic!("expected noise map view, got {:?}", other),
        }
        assert_eq!(out.lines.horizontal, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_show_dark_view() {
        let config = ViewerConfig::builder()
            .show_dark(true)
            .auto_contrast(true)
            .num_dark_requested(2)
            .build();
        let mut pipeline = mock_pipeline(config);

        let out = pipeline.process(&RawFrame::new(&[4; 6])).unwrap();
        assert!(matches!(out.view, FrameView::Pixels(_)));

        pipeline.request_dark_collection().unwrap();
        pipeline.process(&RawFrame::new(&[4; 6])).unwrap();
        let out = pipeline.process(&RawFrame::new(&[6; 6])).unwrap();
        match &out.view {
            FrameView::Dark(dark) => assert!(dark.iter().all(|&a| a == 5.0)),
            other => panic!("expected dark view, got {:?}", other),
        }
        assert_eq!(out.contrast, ContrastBounds { min: 5, max: 5 });
    }

    #[test]
    fn test_dark_view_keeps_lines_on_frame() {
        let config = ViewerConfig::builder()
            .show_dark(true)
            .plot_horizontal(true)
            .plot_vertical(true)
            .tracked_pixel(0, 1)
            .num_dark_requested(1)
            .build();
        let mut pipeline = mock_pipeline(config);
        pipeline.request_dark_collection().unwrap();
        pipeline.process(&RawFrame::new(&[5; 6])).unwrap();

        let out = pipeline.process(&RawFrame::new(&[100, 101, 102, 103, 104, 105])).unwrap();
        assert!(matches!(out.view, FrameView::Dark(_)));
        assert_eq!(out.lines.horizontal, vec![100.0, 101.0, 102.0]);
        assert_eq!(out.lines.vertical, vec![101.0, 104.0]);
    }

    #[test]
    fn test_faulted_frame_skips_dark_collection() {
        let config = ViewerConfig::builder().num_dark_requested(2).build();
        let mut pipeline = mock_pipeline(config);
        pipeline.request_dark_collection().unwrap();

        pipeline.process(&RawFrame::new(&[100; 6])).unwrap();
        let out = pipeline.process(&RawFrame::new(&[100; 5])).unwrap();
        assert_eq!(out.descramble_error_count, 1);
        assert_eq!(out.dark_phase, CalibrationPhase::Collecting);
        assert_eq!(pipeline.calibration().collected_count(), 1);

        let out = pipeline.process(&RawFrame::new(&[100; 6])).unwrap();
        assert_eq!(out.dark_phase, CalibrationPhase::Ready);
        let average = pipeline.calibration().average().unwrap();
        assert!(average.iter().all(|&a| a == 100.0));
    }

    #[test]
    fn test_line_profiles_follow_tracked_pixel() {
        let config = ViewerConfig::builder()
            .tracked_pixel(1, 2)
            .plot_horizontal(true)
            .plot_vertical(true)
            .build();
        let mut pipeline = mock_pipeline(config);
        let out = pipeline.process(&RawFrame::new(&[0, 1, 2, 3, 4, 5])).unwrap();
        assert_eq!(out.lines.horizontal, vec![3.0, 4.0, 5.0]);
        assert_eq!(out.lines.vertical, vec![2.0, 5.0]);
    }

    #[test]
    fn test_reset_restarts_time_index() {
        let mut pipeline = mock_pipeline(ViewerConfig::default());
        for _ in 0..3 {
            pipeline.process(&RawFrame::new(&[1; 6])).unwrap();
        }
        pipeline.reset();
        let lengths = pipeline.buffer_lengths();
        assert_eq!((lengths.time_series, lengths.histogram, lengths.noise), (0, 0, 0));

        let out = pipeline.process(&RawFrame::new(&[2; 6])).unwrap();
        assert_eq!(out.time_series[0].index, 0);
    }

    #[test]
    fn test_time_series_resize_keeps_newest() {
        let config = ViewerConfig::builder().time_plot_max_len(5).build();
        let mut pipeline = mock_pipeline(config);
        for value in 0..5u8 {
            pipeline.process(&RawFrame::new(&[value; 6])).unwrap();
        }
        let shorter = ViewerConfig { time_plot_max_len: 2, ..pipeline.config().clone() };
        pipeline.set_config(shorter).unwrap();

        let values: Vec<i32> = pipeline.stats().time_series().map(|s| s.value).collect();
        assert_eq!(values, vec![3, 4]);
    }

    #[test]
    fn test_end_to_end_hr10k2m() {
        let config = ViewerConfig::builder().tracked_pixel(2, 37).build();
        let mut pipeline = PixelStreamPipeline::new(SensorVariant::EpixHr10k2M, config).unwrap();
        let bytes = hr10k2m_frame();
        assert_eq!(bytes.len(), 110_640 * 2);

        let out = pipeline.process(&RawFrame::new(&bytes)).unwrap();
        assert_eq!(out.descramble_error_count, 0);
        assert_eq!(out.view.shape(), (144, 768));
        // bank 1, bank column 5, row 2
        assert_eq!(out.pixel_value, Some(((2 * 32 + 5) * 24 + 1) as i32));

        let image = out.view.as_pixels().unwrap();
        assert_eq!(image[[0, 0]], 0);
        assert_eq!(image[[0, 32]], 1);
        // lagging column 31 of bank 2 shows row 4's sample in row 5
        assert_eq!(image[[5, 2 * 32 + 31]], ((4 * 32 + 31) * 24 + 2) as i32);
    }

    #[test]
    fn test_real_sensor_size_mismatch_and_mask() {
        let config = ViewerConfig::builder().tracked_pixel(2, 37).pixel_bit_mask(Some(0xFF)).build();
        let mut pipeline = PixelStreamPipeline::new(SensorVariant::EpixHr10k2M, config).unwrap();
        let bytes = hr10k2m_frame();

        let out = pipeline.process(&RawFrame::new(&bytes[..bytes.len() - 1])).unwrap();
        assert_eq!(out.descramble_error_count, 1);
        assert!(out.view.as_pixels().unwrap().iter().all(|&v| v == 0));

        let out = pipeline.process(&RawFrame::new(&bytes)).unwrap();
        assert_eq!(out.pixel_value, Some(1657 & 0xFF));
        assert_eq!(pipeline.frames_processed(), 2);
    }
}

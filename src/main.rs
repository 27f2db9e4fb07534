use std::path::PathBuf;

use anyhow::{Context, bail};
use epix_stream_rs::logger;
use epix_stream_rs::pixel_pipeline::{
    CalibrationPhase, PixelStreamPipeline, RawFrame, SensorVariant, SnapshotConfig, SnapshotImage,
    StandardTiffWriter, ViewerConfig, save_snapshot,
};

use tracing::{info, warn};

const USAGE: &str = "usage: epix_stream_rs <variant> <frames.bin> [output_dir]";

fn main() -> anyhow::Result<()> {
    logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(variant), Some(input)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));

    let variant: SensorVariant = variant.parse().context(USAGE)?;
    info!("Replaying {} frames from {}", variant, input);

    let config = ViewerConfig::builder().auto_contrast(true).build();
    let mut pipeline = PixelStreamPipeline::new(variant, config)
        .with_context(|| format!("failed to set up pipeline for {}", variant))?;
    pipeline.request_dark_collection()?;

    let frame_len = pipeline.geometry().expected_byte_length();
    let data = std::fs::read(&input).with_context(|| format!("failed to read {}", input))?;
    if data.len() % frame_len != 0 {
        warn!(
            "{} trailing bytes do not form a whole {}-byte frame",
            data.len() % frame_len,
            frame_len
        );
    }

    let mut last = None;
    let mut discarded = 0usize;
    for chunk in data.chunks(frame_len) {
        match pipeline.process(&RawFrame::new(chunk)) {
            Some(output) => last = Some(output),
            None => discarded += 1,
        }
    }

    info!(
        frames = pipeline.frames_processed(),
        discarded,
        descramble_errors = pipeline.descramble_error_count(),
        "Replay finished"
    );

    let Some(output) = last else {
        warn!("No frame produced output, nothing to save");
        return Ok(());
    };
    if let Some(value) = output.pixel_value {
        info!(
            "Tracked pixel ({}, {}) = {}",
            pipeline.config().tracked_x,
            pipeline.config().tracked_y,
            value
        );
    }
    info!("Contrast range: {}..{}", output.contrast.min, output.contrast.max);

    let snapshot_config = SnapshotConfig::default();
    let view_path = output_dir.join(format!("{}_last.tiff", variant.name()));
    save_snapshot(&StandardTiffWriter, SnapshotImage::from(&output.view), &view_path, &snapshot_config)
        .context("failed to save last frame")?;

    if pipeline.calibration().phase() == CalibrationPhase::Ready {
        if let Some(dark) = pipeline.calibration().average() {
            let dark_path = output_dir.join(format!("{}_dark.tiff", variant.name()));
            save_snapshot(&StandardTiffWriter, SnapshotImage::Map(dark), &dark_path, &snapshot_config)
                .context("failed to save dark baseline")?;
        }
    } else {
        info!(
            "Dark baseline not saved: {} of {} frames collected",
            pipeline.calibration().collected_count(),
            pipeline.calibration().requested_count()
        );
    }

    Ok(())
}

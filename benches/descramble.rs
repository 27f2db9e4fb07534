use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use epix_stream_rs::pixel_pipeline::{
    DescrambleOptions, FrameDescrambler, PixelStreamPipeline, RawFrame, SensorDescrambler,
    SensorVariant, SnapshotConfig, SnapshotImage, SnapshotWriter, StandardTiffWriter,
    TiffCompression, ViewerConfig,
};
use std::io::Cursor;

fn generate_mock_frame(variant: SensorVariant) -> Vec<u8> {
    let len = variant.geometry().expected_byte_length();
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn benchmark_descramble_by_variant(c: &mut Criterion) {
    let mut group = c.benchmark_group("descramble_by_variant");

    for variant in SensorVariant::catalogue() {
        let frame = generate_mock_frame(variant);
        let descrambler = SensorDescrambler::new(variant).expect("catalogued variant");
        let options = DescrambleOptions::for_geometry(descrambler.geometry());

        group.bench_with_input(
            BenchmarkId::from_parameter(variant),
            &frame,
            |b, data| {
                b.iter(|| descrambler.descramble(&RawFrame::new(black_box(data)), &options));
            },
        );
    }

    group.finish();
}

fn benchmark_lane_map_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("lane_map_build");

    for variant in [SensorVariant::EpixHr10k2M, SensorVariant::EpixHrMv2, SensorVariant::SparkPixRt] {
        group.bench_function(variant.name(), |b| {
            b.iter(|| SensorDescrambler::new(black_box(variant)));
        });
    }

    group.finish();
}

fn benchmark_pipeline_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_process");
    let frame = generate_mock_frame(SensorVariant::EpixHr10k2M);

    group.bench_function("plain", |b| {
        let mut pipeline = PixelStreamPipeline::new(SensorVariant::EpixHr10k2M, ViewerConfig::default())
            .expect("pipeline");
        b.iter(|| pipeline.process(&RawFrame::new(black_box(&frame))));
    });

    group.bench_function("dark_and_auto_contrast", |b| {
        let config = ViewerConfig::builder()
            .apply_dark(true)
            .auto_contrast(true)
            .plot_horizontal(true)
            .plot_vertical(true)
            .num_dark_requested(5)
            .build();
        let mut pipeline = PixelStreamPipeline::new(SensorVariant::EpixHr10k2M, config).expect("pipeline");
        pipeline.request_dark_collection().expect("dark collection");
        b.iter(|| pipeline.process(&RawFrame::new(black_box(&frame))));
    });

    group.finish();
}

fn benchmark_snapshot_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_compression");
    let frame = generate_mock_frame(SensorVariant::EpixHr10k2M);
    let descrambler = SensorDescrambler::new(SensorVariant::EpixHr10k2M).expect("descrambler");
    let image = descrambler
        .descramble(&RawFrame::new(&frame), &DescrambleOptions::for_geometry(descrambler.geometry()))
        .matrix;

    let compressions = vec![
        (TiffCompression::None, "none"),
        (TiffCompression::Lzw, "lzw"),
        (TiffCompression::DeflateFast, "deflate_fast"),
    ];

    for (compression, label) in compressions {
        group.bench_function(label, |b| {
            let config = SnapshotConfig::builder().compression(compression).build();
            b.iter(|| {
                let mut output = Cursor::new(Vec::new());
                let _ = StandardTiffWriter.write_snapshot(SnapshotImage::Pixels(black_box(&image)), &mut output, &config);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_descramble_by_variant,
    benchmark_lane_map_build,
    benchmark_pipeline_process,
    benchmark_snapshot_compression
);
criterion_main!(benches);

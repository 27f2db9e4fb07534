//! Pixel stream pipeline module
//!
//! This module turns raw detector readout payloads into descrambled pixel
//! matrices and keeps the rolling calibration and statistics state a live
//! viewer displays, with separate modules for geometry, descrambling,
//! analysis, stream orchestration, and snapshot export.

pub mod common;
pub mod geometry;
pub mod descramble;
pub mod analysis;
pub mod stream;
pub mod snapshot;

pub use common::{
    PipelineError,
    Result,
    RingBuffer,
};

pub use geometry::{
    NoiseMap,
    PixelMatrix,
    RawFrame,
    SampleEncoding,
    SensorGeometry,
};

pub use descramble::{
    DescrambleOptions,
    Descrambled,
    FrameDescrambler,
    LaneMap,
    LaneMapPlan,
    PostPass,
    SensorDescrambler,
    SensorVariant,
};

pub use analysis::{
    CalibrationPhase,
    CalibrationStore,
    ContrastBounds,
    Histogram,
    LineProfiles,
    NoiseTracker,
    StreamingStats,
    TimeSample,
};

pub use stream::{
    BufferLengths,
    FrameOutput,
    FrameView,
    PixelStreamPipeline,
    ViewerConfig,
    ViewerConfigBuilder,
};

pub use snapshot::{
    SnapshotConfig,
    SnapshotConfigBuilder,
    SnapshotImage,
    SnapshotWriter,
    StandardTiffWriter,
    TiffCompression,
    save_snapshot,
};

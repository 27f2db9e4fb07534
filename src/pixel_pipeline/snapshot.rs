//! Snapshot export module
//!
//! Writes frames and float maps to TIFF files.

mod writer;
mod standard_tiff_writer;
pub mod types;

pub use writer::{SnapshotWriter, save_snapshot};
pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{SnapshotConfig, SnapshotConfigBuilder, SnapshotImage, TiffCompression};

//! Snapshot export configuration types

use crate::pixel_pipeline::geometry::{NoiseMap, PixelMatrix};
use crate::pixel_pipeline::stream::FrameView;

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Configuration for snapshot export
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Compression method to use
    pub compression: TiffCompression,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::DeflateBalanced,
        }
    }
}

impl SnapshotConfig {
    pub fn builder() -> SnapshotConfigBuilder {
        SnapshotConfigBuilder::default()
    }
}

/// Builder for SnapshotConfig
#[derive(Default)]
pub struct SnapshotConfigBuilder {
    compression: Option<TiffCompression>,
}

impl SnapshotConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn build(self) -> SnapshotConfig {
        let default = SnapshotConfig::default();
        SnapshotConfig {
            compression: self.compression.unwrap_or(default.compression),
        }
    }
}

/// Image handed to a snapshot writer: integer pixels or a float map.
#[derive(Debug, Clone, Copy)]
pub enum SnapshotImage<'a> {
    Pixels(&'a PixelMatrix),
    Map(&'a NoiseMap),
}

impl SnapshotImage<'_> {
    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        match self {
            SnapshotImage::Pixels(m) => m.dim(),
            SnapshotImage::Map(m) => m.dim(),
        }
    }
}

impl<'a> From<&'a FrameView> for SnapshotImage<'a> {
    fn from(view: &'a FrameView) -> Self {
        match view {
            FrameView::Pixels(m) => SnapshotImage::Pixels(m),
            FrameView::NoiseMap(m) | FrameView::Dark(m) => SnapshotImage::Map(m),
        }
    }
}

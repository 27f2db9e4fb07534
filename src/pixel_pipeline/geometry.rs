//! Sensor geometry and frame types shared by the descramblers and the
//! analysis stages.

use ndarray::Array2;

use crate::pixel_pipeline::common::error::{PipelineError, Result};

/// Descrambled image, `(height, width)`, signed so dark-subtracted frames fit.
pub type PixelMatrix = Array2<i32>;

/// Per-pixel floating point map (noise, dark average).
pub type NoiseMap = Array2<f64>;

/// How samples are laid out in the payload after the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// One little-endian 16-bit word per sample.
    Word16Le,
    /// 12-bit samples packed into fixed-size words carrying one sample per
    /// lane. The hardware sends lanes high-to-low, so the word's bytes are
    /// reversed before unpacking when `reverse_word` is set.
    Packed12 { word_bytes: usize, reverse_word: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorGeometry {
    /// Columns of the descrambled image
    pub width: usize,
    /// Rows of the descrambled image
    pub height: usize,
    /// Significant bits per pixel after gain folding
    pub bit_depth: u32,
    /// Bytes skipped before the first sample
    pub header_bytes: usize,
    /// Bytes after the last sample that belong to the frame but carry no pixels
    pub trailer_bytes: usize,
    pub encoding: SampleEncoding,
    /// Parallel readout lanes (banks for 16-bit families)
    pub lane_count: usize,
    /// Cluster replications stacked inside one lane
    pub clusters_per_lane: usize,
    /// Whether the sample LSB carries a gain-range flag
    pub gain_bit_present: bool,
}

impl SensorGeometry {
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Bytes between header and trailer.
    pub fn payload_bytes(&self) -> usize {
        match self.encoding {
            SampleEncoding::Word16Le => self.pixel_count() * 2,
            SampleEncoding::Packed12 { word_bytes, .. } => {
                (self.pixel_count() / self.lane_count) * word_bytes
            }
        }
    }

    pub fn expected_byte_length(&self) -> usize {
        self.header_bytes + self.payload_bytes() + self.trailer_bytes
    }

    /// Mask covering every significant bit.
    pub fn full_mask(&self) -> u32 {
        if self.bit_depth >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bit_depth) - 1
        }
    }

    /// All-zero matrix of the declared shape.
    pub fn blank(&self) -> PixelMatrix {
        Array2::zeros(self.shape())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::InvalidDimensions(self.width, self.height));
        }
        if self.lane_count == 0 || self.pixel_count() % self.lane_count != 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "{} pixels cannot be split across {} lanes",
                self.pixel_count(),
                self.lane_count
            )));
        }
        if let SampleEncoding::Packed12 { word_bytes, .. } = self.encoding {
            if word_bytes * 8 != self.lane_count * 12 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{}-byte words cannot carry {} 12-bit lanes",
                    word_bytes, self.lane_count
                )));
            }
        }
        if self.bit_depth == 0 {
            return Err(PipelineError::InvalidConfig("bit depth must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// One readout payload, borrowed for the duration of a `process` call.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    bytes: &'a [u8],
    declared_len: usize,
}

impl<'a> RawFrame<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            declared_len: bytes.len(),
        }
    }

    /// A frame whose transport reported `declared_len` payload bytes; a
    /// declaration longer than the buffer is truncated to what is present.
    pub fn with_declared_len(bytes: &'a [u8], declared_len: usize) -> Self {
        Self { bytes, declared_len }
    }

    pub fn declared_len(&self) -> usize {
        self.declared_len
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[..self.declared_len.min(self.bytes.len())]
    }

    pub fn len(&self) -> usize {
        self.payload().len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }
}

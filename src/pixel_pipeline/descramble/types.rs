//! Descrambling options and results

use crate::pixel_pipeline::common::error::PipelineError;
use crate::pixel_pipeline::geometry::{PixelMatrix, SensorGeometry};

/// Runtime knobs applied to every descrambled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescrambleOptions {
    /// Mask applied last; bits above the sensor depth are dropped anyway
    pub bit_mask: u32,
    /// Fold the gain-range LSB into the top of the 12-bit range, on sensors
    /// that carry one
    pub gain_msb: bool,
}

impl DescrambleOptions {
    /// Full-depth mask with gain folding enabled.
    pub fn for_geometry(geometry: &SensorGeometry) -> Self {
        Self {
            bit_mask: geometry.full_mask(),
            gain_msb: true,
        }
    }
}

/// A descrambled frame plus the recoverable fault that produced it, if any.
///
/// On a fault the matrix is all zeros with the geometry's shape, so the
/// stream keeps flowing.
#[derive(Debug)]
pub struct Descrambled {
    pub matrix: PixelMatrix,
    pub fault: Option<PipelineError>,
}

impl Descrambled {
    pub fn clean(matrix: PixelMatrix) -> Self {
        Self { matrix, fault: None }
    }

    pub fn faulted(matrix: PixelMatrix, fault: PipelineError) -> Self {
        Self {
            matrix,
            fault: Some(fault),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.fault.is_none()
    }
}

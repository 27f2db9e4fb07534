//! Shared descrambling path for every sensor family.

use tracing::{debug, trace};

use crate::pixel_pipeline::common::error::{PipelineError, Result};
use crate::pixel_pipeline::descramble::bit_unpack::{unpack12_into, unpack12_reversed_into};
use crate::pixel_pipeline::descramble::descrambler::FrameDescrambler;
use crate::pixel_pipeline::descramble::lane_map::LaneMap;
use crate::pixel_pipeline::descramble::post_pass::PostPass;
use crate::pixel_pipeline::descramble::types::{DescrambleOptions, Descrambled};
use crate::pixel_pipeline::descramble::variants::SensorVariant;
use crate::pixel_pipeline::geometry::{PixelMatrix, RawFrame, SampleEncoding, SensorGeometry};

/// Top of the 12-bit range the gain flag folds into.
const GAIN_FOLD_OFFSET: i32 = 2048;

/// Descrambler for one catalogued sensor family. The lane map is built and
/// verified once here and reused for every frame.
#[derive(Debug, Clone)]
pub struct SensorDescrambler {
    geometry: SensorGeometry,
    lane_map: LaneMap,
    post_pass: Option<PostPass>,
}

impl SensorDescrambler {
    pub fn new(variant: SensorVariant) -> Result<Self> {
        let geometry = variant.geometry();
        geometry.validate()?;
        let lane_map = LaneMap::build(&variant.plan(), &geometry)?;
        debug!(
            %variant,
            width = geometry.width,
            height = geometry.height,
            frame_bytes = geometry.expected_byte_length(),
            "Sensor descrambler ready"
        );
        Ok(Self {
            geometry,
            lane_map,
            post_pass: variant.post_pass(),
        })
    }

    pub fn lane_map(&self) -> &LaneMap {
        &self.lane_map
    }
}

impl FrameDescrambler for SensorDescrambler {
    fn geometry(&self) -> &SensorGeometry {
        &self.geometry
    }

    fn descramble(&self, frame: &RawFrame<'_>, options: &DescrambleOptions) -> Descrambled {
        descramble(&self.geometry, &self.lane_map, self.post_pass.as_ref(), frame, options)
    }
}

/// Turns one raw frame into a masked pixel matrix.
///
/// Never fails: a frame that cannot be decoded yields a zero matrix of the
/// geometry's shape together with the fault.
pub fn descramble(
    geometry: &SensorGeometry,
    lane_map: &LaneMap,
    post_pass: Option<&PostPass>,
    frame: &RawFrame<'_>,
    options: &DescrambleOptions,
) -> Descrambled {
    let expected = geometry.expected_byte_length();
    if frame.len() != expected {
        return Descrambled::faulted(
            geometry.blank(),
            PipelineError::FrameSizeMismatch { expected, actual: frame.len() },
        );
    }

    let start = geometry.header_bytes;
    let payload = &frame.payload()[start..start + geometry.payload_bytes()];
    trace!(payload_bytes = payload.len(), "Decoding payload");

    match decode_and_gather(geometry, lane_map, payload) {
        Ok(mut image) => {
            if geometry.gain_bit_present && options.gain_msb {
                image.mapv_inplace(fold_gain_bit);
            }
            if let Some(pass) = post_pass {
                pass.apply(&mut image);
            }
            let mask = options.bit_mask;
            image.mapv_inplace(|v| ((v as u32) & mask) as i32);
            Descrambled::clean(image)
        }
        Err(fault) => Descrambled::faulted(geometry.blank(), fault),
    }
}

fn decode_and_gather(geometry: &SensorGeometry, lane_map: &LaneMap, payload: &[u8]) -> Result<PixelMatrix> {
    let samples = decode_samples(geometry, payload)?;
    Ok(lane_map.gather(&samples)?.mapv(i32::from))
}

/// Samples in readout order: word by word, lane by lane within a word.
fn decode_samples(geometry: &SensorGeometry, payload: &[u8]) -> Result<Vec<u16>> {
    match geometry.encoding {
        SampleEncoding::Word16Le => Ok(payload
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()),
        SampleEncoding::Packed12 { word_bytes, reverse_word } => {
            let mut samples = Vec::with_capacity(geometry.pixel_count());
            for word in payload.chunks(word_bytes) {
                if reverse_word {
                    unpack12_reversed_into(word, &mut samples)?;
                } else {
                    unpack12_into(word, &mut samples)?;
                }
            }
            Ok(samples)
        }
    }
}

fn fold_gain_bit(v: i32) -> i32 {
    if v % 2 == 0 {
        v / 2
    } else {
        (v - 1) / 2 + GAIN_FOLD_OFFSET
    }
}

use crate::pixel_pipeline::descramble::types::{DescrambleOptions, Descrambled};
use crate::pixel_pipeline::geometry::{RawFrame, SensorGeometry};

pub trait FrameDescrambler {
    fn geometry(&self) -> &SensorGeometry;
    fn descramble(&self, frame: &RawFrame<'_>, options: &DescrambleOptions) -> Descrambled;
}

//! Frame descrambling module
//!
//! This module reinterprets raw, lane-multiplexed readout payloads as pixel
//! matrices. The per-family differences live in the variant catalogue; the
//! unpacking, lane map and masking steps are shared.

mod descrambler;
mod sensor_descrambler;
pub mod bit_unpack;
pub mod lane_map;
pub mod post_pass;
pub mod types;
pub mod variants;

pub use descrambler::FrameDescrambler;
pub use sensor_descrambler::{SensorDescrambler, descramble};
pub use lane_map::{LaneMap, LaneMapPlan};
pub use post_pass::PostPass;
pub use types::{DescrambleOptions, Descrambled};
pub use variants::SensorVariant;

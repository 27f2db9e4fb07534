mod pipeline;
mod types;

#[cfg(test)]
mod tests;

pub use pipeline::PixelStreamPipeline;
pub use types::{BufferLengths, FrameOutput, FrameView, ViewerConfig, ViewerConfigBuilder};

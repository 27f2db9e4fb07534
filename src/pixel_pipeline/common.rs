//! Common utilities module
//!
//! This module contains the error type and the bounded buffers shared across
//! the pipeline stages.

pub mod error;
pub mod ring_buffer;

pub use error::{PipelineError, Result};
pub use ring_buffer::RingBuffer;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    #[error("Malformed 12-bit chunk: {len} bytes is not a multiple of 3")]
    MalformedChunk { len: usize },

    #[error("Lane map invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode TIFF snapshot: {0}")]
    EncodeError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

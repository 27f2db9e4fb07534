//! 12-bit sample packing.
//!
//! Each 3-byte group `(b0, b1, b2)` carries two samples:
//! `v0 = (b0 << 4) | (b1 >> 4)` and `v1 = ((b1 & 0x0F) << 8) | b2`.

use crate::pixel_pipeline::common::error::{PipelineError, Result};

const GROUP_BYTES: usize = 3;

/// Unpacks `bytes` into `2 * len / 3` samples in `[0, 4095]`.
pub fn unpack12(bytes: &[u8]) -> Result<Vec<u16>> {
    let mut out = Vec::with_capacity(bytes.len() / GROUP_BYTES * 2);
    unpack12_into(bytes, &mut out)?;
    Ok(out)
}

/// Appends the unpacked samples of `bytes` to `out`.
///
/// Nothing is appended when the chunk is rejected.
pub fn unpack12_into(bytes: &[u8], out: &mut Vec<u16>) -> Result<()> {
    if bytes.len() % GROUP_BYTES != 0 {
        return Err(PipelineError::MalformedChunk { len: bytes.len() });
    }
    out.reserve(bytes.len() / GROUP_BYTES * 2);
    for group in bytes.chunks_exact(GROUP_BYTES) {
        let (b0, b1, b2) = (group[0] as u16, group[1] as u16, group[2] as u16);
        out.push((b0 << 4) | (b1 >> 4));
        out.push(((b1 & 0x0F) << 8) | b2);
    }
    Ok(())
}

/// Like [`unpack12_into`] for a chunk whose bytes arrive in reverse order,
/// without copying the chunk.
pub fn unpack12_reversed_into(bytes: &[u8], out: &mut Vec<u16>) -> Result<()> {
    if bytes.len() % GROUP_BYTES != 0 {
        return Err(PipelineError::MalformedChunk { len: bytes.len() });
    }
    let mut reversed = bytes.iter().rev().map(|&b| b as u16);
    while let (Some(b0), Some(b1), Some(b2)) = (reversed.next(), reversed.next(), reversed.next()) {
        out.push((b0 << 4) | (b1 >> 4));
        out.push(((b1 & 0x0F) << 8) | b2);
    }
    Ok(())
}

/// Inverse of [`unpack12`]. Values are truncated to 12 bits; an odd count is
/// padded with a zero sample.
pub fn pack12(values: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len().div_ceil(2) * GROUP_BYTES);
    for pair in values.chunks(2) {
        let v0 = pair[0] & 0x0FFF;
        let v1 = pair.get(1).copied().unwrap_or(0) & 0x0FFF;
        out.push((v0 >> 4) as u8);
        out.push((((v0 & 0x0F) << 4) | (v1 >> 8)) as u8);
        out.push((v1 & 0xFF) as u8);
    }
    out
}

use std::borrow::Cow;
use std::io::Write;

use ndarray::Array2;
use tiff::encoder::colortype::{ColorType, Gray64Float, GrayI32};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder};
use tracing::debug;

use crate::pixel_pipeline::common::error::{PipelineError, Result};
use crate::pixel_pipeline::snapshot::types::{SnapshotConfig, SnapshotImage, TiffCompression};
use crate::pixel_pipeline::snapshot::writer::SnapshotWriter;

/// Single-page grayscale TIFF: signed 32-bit for pixel frames, 64-bit float
/// for noise and dark maps.
pub struct StandardTiffWriter;

impl SnapshotWriter for StandardTiffWriter {
    fn write_snapshot(&self, image: SnapshotImage<'_>, output: &mut dyn Write, config: &SnapshotConfig) -> Result<()> {
        let (height, width) = image.shape();
        debug!("Encoding TIFF snapshot: {}x{}", width, height);

        let buffer = match image {
            SnapshotImage::Pixels(m) => encode::<GrayI32>(m, config)?,
            SnapshotImage::Map(m) => encode::<Gray64Float>(m, config)?,
        };
        output.write_all(&buffer)?;

        debug!("TIFF encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}

fn compression(config: &SnapshotConfig) -> Compression {
    match config.compression {
        TiffCompression::None => Compression::Uncompressed,
        TiffCompression::Lzw => Compression::Lzw,
        TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
        TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
        TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
    }
}

fn encode<C>(image: &Array2<C::Inner>, config: &SnapshotConfig) -> Result<Vec<u8>>
where
    C: ColorType,
    C::Inner: Copy,
    [C::Inner]: tiff::encoder::TiffValue,
{
    let (height, width) = image.dim();
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidDimensions(width, height));
    }
    let data: Cow<'_, [C::Inner]> = match image.as_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(image.iter().copied().collect()),
    };

    let mut buffer = Vec::new();
    TiffEncoder::new(std::io::Cursor::new(&mut buffer))
        .map_err(|e| PipelineError::EncodeError(e.to_string()))?
        .with_compression(compression(config))
        .write_image::<C>(width as u32, height as u32, &data)
        .map_err(|e| PipelineError::EncodeError(e.to_string()))?;
    Ok(buffer)
}

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::pixel_pipeline::common::error::{PipelineError, Result};
use crate::pixel_pipeline::snapshot::types::{SnapshotConfig, SnapshotImage};

pub trait SnapshotWriter {
    fn write_snapshot(&self, image: SnapshotImage<'_>, output: &mut dyn Write, config: &SnapshotConfig) -> Result<()>;
}

/// Writes `image` to a new file at `path`.
pub fn save_snapshot<W: SnapshotWriter + ?Sized, P: AsRef<Path>>(
    writer: &W,
    image: SnapshotImage<'_>,
    path: P,
    config: &SnapshotConfig,
) -> Result<()> {
    let path = path.as_ref();
    let mut file = {
        let _span = tracing::info_span!("create_snapshot_file").entered();
        std::fs::File::create(path)
            .map_err(|e| PipelineError::OutputWriteError(format!("{}: {}", path.display(), e)))?
    };
    writer.write_snapshot(image, &mut file, config)?;

    let (height, width) = image.shape();
    info!(output = %path.display(), width, height, "Snapshot written");
    Ok(())
}

//! Per-family corrections for readout defects, applied after the gather and
//! before masking.

use ndarray::{Axis, s};

use crate::pixel_pipeline::geometry::PixelMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostPass {
    /// Within every bank of `bank_width` columns, the listed columns arrive
    /// one row early: each row takes the value of the row above it. Row 0
    /// keeps its own value.
    ColumnLag {
        bank_width: usize,
        columns: &'static [usize],
    },
    /// The first and last row of every bank of `bank_height` rows are
    /// exchanged.
    BankRowSwap { bank_height: usize },
}

impl PostPass {
    pub fn apply(&self, image: &mut PixelMatrix) {
        match *self {
            PostPass::ColumnLag { bank_width, columns } => column_lag(image, bank_width, columns),
            PostPass::BankRowSwap { bank_height } => bank_row_swap(image, bank_height),
        }
    }
}

fn column_lag(image: &mut PixelMatrix, bank_width: usize, columns: &[usize]) {
    if bank_width == 0 {
        return;
    }
    let (height, width) = image.dim();
    if height < 2 {
        return;
    }
    for bank_start in (0..width).step_by(bank_width) {
        for &offset in columns.iter().filter(|&&c| c < bank_width) {
            let col = bank_start + offset;
            if col >= width {
                continue;
            }
            let mut column = image.column_mut(col);
            for row in (1..height).rev() {
                column[row] = column[row - 1];
            }
        }
    }
}

fn bank_row_swap(image: &mut PixelMatrix, bank_height: usize) {
    if bank_height < 2 {
        return;
    }
    let height = image.len_of(Axis(0));
    for bank_start in (0..height).step_by(bank_height) {
        let last = bank_start + bank_height - 1;
        if last >= height {
            break;
        }
        let (mut top, mut bottom) = image.multi_slice_mut((s![bank_start, ..], s![last, ..]));
        ndarray::Zip::from(&mut top)
            .and(&mut bottom)
            .for_each(|a, b| std::mem::swap(a, b));
    }
}

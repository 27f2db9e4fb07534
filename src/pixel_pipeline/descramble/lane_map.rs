//! Lane map construction.
//!
//! Every sensor family builds its destination-to-sample table with the same
//! four stages, only the constants differ:
//!
//! 1. a cluster tile from the sub-pixel interleave order,
//! 2. replication of that tile across the clusters of one lane,
//! 3. optional even/odd bit-plane interleave,
//! 4. placement of the per-lane blocks on the lane grid,
//!
//! followed by the fixed orientation of the physical sensor and, for the
//! super-row readouts, a row reordering. The resulting table is checked once
//! to be a permutation of `0..pixel_count`.

use ndarray::{Array2, ArrayView2, Axis, concatenate, s};
use tracing::debug;

use crate::pixel_pipeline::common::error::{PipelineError, Result};
use crate::pixel_pipeline::geometry::SensorGeometry;

/// Stage 1: sub-pixel order inside one cluster.
///
/// Sub-pixel `t` of group `g` lands at position `sub_pixel_map[t] + g * len`
/// and carries local sample `g + groups * t`. The cluster is then cut into
/// two super-pixel columns of `column_width` placed side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterTile {
    pub groups: usize,
    pub sub_pixel_map: &'static [usize],
    pub column_width: usize,
    pub mirror_second_column: bool,
}

impl ClusterTile {
    /// `pixels` consecutive samples laid out on a single row.
    pub const fn row(pixels: usize) -> Self {
        Self {
            groups: pixels,
            sub_pixel_map: &[0],
            column_width: pixels / 2,
            mirror_second_column: false,
        }
    }

    pub fn size(&self) -> usize {
        self.groups * self.sub_pixel_map.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stacking {
    Vertical,
    Horizontal,
}

/// How copy `n` of a block of `size` samples is offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stride {
    /// `local * count + n`
    Interleaved,
    /// `n * size + local`
    Blocked,
}

impl Stride {
    fn offset(self, local: usize, n: usize, count: usize, size: usize) -> usize {
        match self {
            Stride::Interleaved => local * count + n,
            Stride::Blocked => n * size + local,
        }
    }
}

/// Stage 2: copies of the cluster tile within one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replication {
    pub count: usize,
    pub stacking: Stacking,
    pub stride: Stride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneLayout {
    /// Plane blocks placed next to each other.
    SideBySide,
    /// Plane columns alternate, first plane on even columns.
    Alternating,
}

/// Stage 3: the two bit-planes read out per lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitPlanes {
    pub layout: PlaneLayout,
    pub stride: Stride,
    /// Put the odd plane first.
    pub swap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneOrder {
    RowMajor,
    ColumnMajor,
}

/// Stage 4: lane blocks on a `rows x cols` grid. Samples of all lanes are
/// word-interleaved in the payload: global index = `local * lanes + lane`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneGrid {
    pub lanes: usize,
    pub rows: usize,
    pub cols: usize,
    pub order: LaneOrder,
    pub reverse: bool,
    pub mirror_lane_columns: bool,
}

impl LaneGrid {
    pub const fn single_row(lanes: usize) -> Self {
        Self {
            lanes,
            rows: 1,
            cols: lanes,
            order: LaneOrder::RowMajor,
            reverse: false,
            mirror_lane_columns: false,
        }
    }

    fn lane_at(&self, grid_row: usize, grid_col: usize) -> usize {
        let lane = match self.order {
            LaneOrder::RowMajor => grid_row * self.cols + grid_col,
            LaneOrder::ColumnMajor => grid_col * self.rows + grid_row,
        };
        if self.reverse { self.lanes - 1 - lane } else { lane }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orientation {
    pub flip_rows: bool,
    pub flip_cols: bool,
}

/// Order in which whole readout rows land on the image. Both folded orders
/// need an even row count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowOrder {
    #[default]
    Sequential,
    /// Odd rows from the last upwards fill the top half, even rows from the
    /// first downwards the bottom half.
    FoldedOddEven,
    /// Row 0 then odd rows from 3 fill the top half, row 1 then even rows
    /// from 2 the bottom half.
    SplitOddEven,
}

impl RowOrder {
    /// Readout row shown at image row `row` of `height`.
    pub fn source_row(self, row: usize, height: usize) -> usize {
        let half = height / 2;
        match self {
            RowOrder::Sequential => row,
            RowOrder::FoldedOddEven if row < half => height - 1 - 2 * row,
            RowOrder::FoldedOddEven => 2 * (row - half),
            RowOrder::SplitOddEven if row == 0 => 0,
            RowOrder::SplitOddEven if row < half => 2 * row + 1,
            RowOrder::SplitOddEven if row == half => 1,
            RowOrder::SplitOddEven => 2 * (row - half),
        }
    }
}

/// Constants driving the four-stage builder for one sensor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneMapPlan {
    pub tile: ClusterTile,
    pub replication: Replication,
    pub bit_planes: Option<BitPlanes>,
    pub lanes: LaneGrid,
    pub orientation: Orientation,
    pub row_order: RowOrder,
}

/// Destination pixel (row-major) to decoded sample index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneMap {
    indices: Vec<usize>,
    height: usize,
    width: usize,
}

impl LaneMap {
    pub fn build(plan: &LaneMapPlan, geometry: &SensorGeometry) -> Result<Self> {
        if plan.lanes.lanes != geometry.lane_count {
            return Err(PipelineError::InvariantViolation(format!(
                "plan reads {} lanes but geometry declares {}",
                plan.lanes.lanes, geometry.lane_count
            )));
        }
        if plan.replication.count != geometry.clusters_per_lane {
            return Err(PipelineError::InvariantViolation(format!(
                "plan replicates {} clusters per lane but geometry declares {}",
                plan.replication.count, geometry.clusters_per_lane
            )));
        }

        let tile = cluster_tile(&plan.tile)?;
        let block = replicate(tile.view(), &plan.replication)?;
        let block = match &plan.bit_planes {
            Some(planes) => interleave_planes(block.view(), planes)?,
            None => block,
        };
        let mut table = assemble_lanes(block.view(), &plan.lanes)?;

        if plan.orientation.flip_rows {
            table.invert_axis(Axis(0));
        }
        if plan.orientation.flip_cols {
            table.invert_axis(Axis(1));
        }
        let table = reorder_rows(table, plan.row_order)?;

        let (height, width) = table.dim();
        if (height, width) != geometry.shape() {
            return Err(PipelineError::InvariantViolation(format!(
                "plan yields {}x{} but geometry declares {}x{}",
                height, width, geometry.height, geometry.width
            )));
        }

        let map = Self::from_indices(table.iter().copied().collect(), height, width)?;
        debug!(height, width, "Lane map built");
        Ok(map)
    }

    /// Wraps a precomputed table after checking it is a permutation.
    pub fn from_indices(indices: Vec<usize>, height: usize, width: usize) -> Result<Self> {
        if indices.len() != height * width {
            return Err(PipelineError::InvariantViolation(format!(
                "table has {} entries for a {}x{} image",
                indices.len(),
                height,
                width
            )));
        }
        verify_permutation(&indices)?;
        Ok(Self { indices, height, width })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Sample index feeding destination `(row, col)`.
    pub fn source_of(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.indices.get(row * self.width + col).copied()
    }

    /// `destination[i] = samples[map[i]]`, reshaped to the image.
    pub fn gather<T: Copy>(&self, samples: &[T]) -> Result<Array2<T>> {
        if samples.len() != self.indices.len() {
            return Err(PipelineError::InvariantViolation(format!(
                "{} decoded samples for a {}-entry lane map",
                samples.len(),
                self.indices.len()
            )));
        }
        let gathered: Vec<T> = self.indices.iter().map(|&i| samples[i]).collect();
        Array2::from_shape_vec((self.height, self.width), gathered)
            .map_err(|e| PipelineError::InvariantViolation(e.to_string()))
    }
}

fn verify_permutation(indices: &[usize]) -> Result<()> {
    let mut seen = vec![false; indices.len()];
    for (position, &index) in indices.iter().enumerate() {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(PipelineError::InvariantViolation(format!(
                    "sample {} mapped twice (second time at {})",
                    index, position
                )));
            }
            None => {
                return Err(PipelineError::InvariantViolation(format!(
                    "sample {} at {} is outside 0..{}",
                    index,
                    position,
                    indices.len()
                )));
            }
        }
    }
    Ok(())
}

fn reorder_rows(table: Array2<usize>, order: RowOrder) -> Result<Array2<usize>> {
    if order == RowOrder::Sequential {
        return Ok(table);
    }
    let height = table.nrows();
    if height < 2 || height % 2 != 0 {
        return Err(PipelineError::InvariantViolation(format!(
            "{:?} needs an even number of rows, got {}",
            order, height
        )));
    }
    let rows: Vec<usize> = (0..height).map(|row| order.source_row(row, height)).collect();
    Ok(table.select(Axis(0), &rows))
}

fn cluster_tile(tile: &ClusterTile) -> Result<Array2<usize>> {
    let group_len = tile.sub_pixel_map.len();
    let size = tile.size();
    if size == 0 || tile.column_width == 0 || size % (2 * tile.column_width) != 0 {
        return Err(PipelineError::InvariantViolation(format!(
            "a {}-pixel cluster cannot form two columns of width {}",
            size, tile.column_width
        )));
    }

    let mut local = vec![usize::MAX; size];
    for group in 0..tile.groups {
        for (t, &sub_pixel) in tile.sub_pixel_map.iter().enumerate() {
            if sub_pixel >= group_len {
                return Err(PipelineError::InvariantViolation(format!(
                    "sub-pixel position {} outside a group of {}",
                    sub_pixel, group_len
                )));
            }
            local[sub_pixel + group * group_len] = group + tile.groups * t;
        }
    }

    let half = size / 2;
    let rows = half / tile.column_width;
    let to_shape = |e: ndarray::ShapeError| PipelineError::InvariantViolation(e.to_string());
    let first = Array2::from_shape_vec((rows, tile.column_width), local[..half].to_vec())
        .map_err(to_shape)?;
    let mut second = Array2::from_shape_vec((rows, tile.column_width), local[half..].to_vec())
        .map_err(to_shape)?;
    if tile.mirror_second_column {
        second.invert_axis(Axis(1));
    }
    concatenate(Axis(1), &[first.view(), second.view()]).map_err(to_shape)
}

fn replicate(tile: ArrayView2<'_, usize>, replication: &Replication) -> Result<Array2<usize>> {
    if replication.count == 0 {
        return Err(PipelineError::InvariantViolation(
            "replication count must be non-zero".to_string(),
        ));
    }
    let size = tile.len();
    let copies: Vec<Array2<usize>> = (0..replication.count)
        .map(|n| {
            tile.mapv(|local| replication.stride.offset(local, n, replication.count, size))
        })
        .collect();
    let views: Vec<ArrayView2<'_, usize>> = copies.iter().map(|c| c.view()).collect();
    let axis = match replication.stacking {
        Stacking::Vertical => Axis(0),
        Stacking::Horizontal => Axis(1),
    };
    concatenate(axis, &views).map_err(|e| PipelineError::InvariantViolation(e.to_string()))
}

fn interleave_planes(block: ArrayView2<'_, usize>, planes: &BitPlanes) -> Result<Array2<usize>> {
    let size = block.len();
    let plane = |p: usize| block.mapv(|local| planes.stride.offset(local, p, 2, size));
    let (first, second) = if planes.swap {
        (plane(1), plane(0))
    } else {
        (plane(0), plane(1))
    };

    match planes.layout {
        PlaneLayout::SideBySide => concatenate(Axis(1), &[first.view(), second.view()])
            .map_err(|e| PipelineError::InvariantViolation(e.to_string())),
        PlaneLayout::Alternating => {
            let (rows, cols) = block.dim();
            let mut out = Array2::zeros((rows, cols * 2));
            out.slice_mut(s![.., 0..;2]).assign(&first);
            out.slice_mut(s![.., 1..;2]).assign(&second);
            Ok(out)
        }
    }
}

fn assemble_lanes(block: ArrayView2<'_, usize>, grid: &LaneGrid) -> Result<Array2<usize>> {
    if grid.lanes == 0 || grid.rows * grid.cols != grid.lanes {
        return Err(PipelineError::InvariantViolation(format!(
            "{} lanes do not fill a {}x{} grid",
            grid.lanes, grid.rows, grid.cols
        )));
    }
    let block = if grid.mirror_lane_columns {
        block.slice_move(s![.., ..;-1])
    } else {
        block
    };

    let (block_rows, block_cols) = block.dim();
    let mut out = Array2::zeros((block_rows * grid.rows, block_cols * grid.cols));
    for grid_row in 0..grid.rows {
        for grid_col in 0..grid.cols {
            let lane = grid.lane_at(grid_row, grid_col);
            let rows = grid_row * block_rows..(grid_row + 1) * block_rows;
            let cols = grid_col * block_cols..(grid_col + 1) * block_cols;
            out.slice_mut(s![rows, cols])
                .assign(&block.mapv(|local| local * grid.lanes + lane));
        }
    }
    Ok(out)
}

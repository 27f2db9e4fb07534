//! Sensor family catalogue.
//!
//! Each family is a geometry, a set of lane map constants and an optional
//! defect correction. Everything else in descrambling is shared.

use std::fmt;
use std::str::FromStr;

use crate::pixel_pipeline::common::error::PipelineError;
use crate::pixel_pipeline::descramble::lane_map::{
    BitPlanes, ClusterTile, LaneGrid, LaneMapPlan, LaneOrder, Orientation, PlaneLayout,
    Replication, RowOrder, Stacking, Stride,
};
use crate::pixel_pipeline::descramble::post_pass::PostPass;
use crate::pixel_pipeline::geometry::{SampleEncoding, SensorGeometry};

/// Clusters per lane on the 168-row UHR readout.
pub const UHR_DEFAULT_CLUSTERS: usize = 14;

const HR_BANK_WIDTH: usize = 32;
const HR_LAGGING_COLUMNS: &[usize] = &[30, 31];
const MV2_BANK_HEIGHT: usize = 48;
const UHR_SUB_PIXELS: &[usize] = &[0, 3, 6, 1, 4, 7, 2, 5, 8];
const UHR_LANES: usize = 16;
const UHR_WORD_BYTES: usize = 24;
const SPARKPIX_LANES: usize = 4;
const EPIX100_WIDTH: usize = 768;
const EPIX100A_ROWS: usize = 708;
const EPIX100P_ROWS: usize = 706;

const HR_HEADER_BYTES: usize = 48;
const HR_COMPACT_HEADER_BYTES: usize = 12;
// Lanes start straight after the header; frames carrying a leading filler
// word per lane are 48 bytes longer and do not match this geometry.
const UHR_HEADER_BYTES: usize = 16;
const UHR_TIMING_MESSAGE_BYTES: usize = 48;
// Packed families ship filler words ahead of the first sample
const UHR_MHZ_HEADER_BYTES: usize = 16 + UHR_WORD_BYTES;
const SPARKPIX_HEADER_BYTES: usize = 16 + 3 * 6;
const EPIX100_HEADER_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorVariant {
    /// 144x768, 24 banks of 32 columns, 16-bit words
    EpixHr10k2M,
    /// 146x192, 6 banks
    EpixHrSingle10kT,
    /// 144x384 plain raster
    EpixHrDuo10kT,
    /// 192x384, 24 banks of 48x64 with even/odd planes
    EpixHrMv2,
    /// 12-bit packed, 16 lanes, `12 * clusters` rows
    EpixUhr100kHz { clusters: usize, timing_header: bool },
    /// 56x64 MHz-mode readout of the UHR
    EpixUhrMhz,
    /// 48x48, 4 lanes
    SparkPixRt,
    /// 708x768, one 16-bit super-row per image row, odd rows folded on top
    Epix100a,
    /// 706x768, super-rows split into odd and even halves
    Epix100p,
}

impl SensorVariant {
    pub fn catalogue() -> [SensorVariant; 10] {
        [
            SensorVariant::EpixHr10k2M,
            SensorVariant::EpixHrSingle10kT,
            SensorVariant::EpixHrDuo10kT,
            SensorVariant::EpixHrMv2,
            SensorVariant::EpixUhr100kHz { clusters: UHR_DEFAULT_CLUSTERS, timing_header: false },
            SensorVariant::EpixUhr100kHz { clusters: UHR_DEFAULT_CLUSTERS, timing_header: true },
            SensorVariant::EpixUhrMhz,
            SensorVariant::SparkPixRt,
            SensorVariant::Epix100a,
            SensorVariant::Epix100p,
        ]
    }

    pub fn geometry(&self) -> SensorGeometry {
        match *self {
            SensorVariant::EpixHr10k2M => word16(144, 768, 24, HR_HEADER_BYTES, HR_HEADER_BYTES),
            SensorVariant::EpixHrSingle10kT => word16(146, 192, 6, HR_COMPACT_HEADER_BYTES, 0),
            SensorVariant::EpixHrDuo10kT => word16(144, 384, 1, HR_COMPACT_HEADER_BYTES, 0),
            SensorVariant::EpixHrMv2 => SensorGeometry {
                clusters_per_lane: MV2_BANK_HEIGHT,
                ..word16(192, 384, 24, HR_HEADER_BYTES, 0)
            },
            SensorVariant::EpixUhr100kHz { clusters, timing_header } => SensorGeometry {
                width: UHR_LANES * 12,
                height: clusters * 12,
                bit_depth: 12,
                header_bytes: if timing_header {
                    UHR_HEADER_BYTES + UHR_TIMING_MESSAGE_BYTES
                } else {
                    UHR_HEADER_BYTES
                },
                trailer_bytes: 0,
                encoding: SampleEncoding::Packed12 { word_bytes: UHR_WORD_BYTES, reverse_word: true },
                lane_count: UHR_LANES,
                clusters_per_lane: clusters,
                gain_bit_present: true,
            },
            SensorVariant::EpixUhrMhz => SensorGeometry {
                width: 64,
                height: 56,
                bit_depth: 12,
                header_bytes: UHR_MHZ_HEADER_BYTES,
                trailer_bytes: 0,
                encoding: SampleEncoding::Packed12 { word_bytes: UHR_WORD_BYTES, reverse_word: true },
                lane_count: UHR_LANES,
                clusters_per_lane: 14,
                gain_bit_present: false,
            },
            SensorVariant::SparkPixRt => SensorGeometry {
                width: 48,
                height: 48,
                bit_depth: 12,
                header_bytes: SPARKPIX_HEADER_BYTES,
                trailer_bytes: 0,
                encoding: SampleEncoding::Packed12 { word_bytes: 6, reverse_word: true },
                lane_count: SPARKPIX_LANES,
                clusters_per_lane: 8,
                gain_bit_present: true,
            },
            SensorVariant::Epix100a => word16(EPIX100A_ROWS, EPIX100_WIDTH, 1, EPIX100_HEADER_BYTES, 0),
            SensorVariant::Epix100p => word16(EPIX100P_ROWS, EPIX100_WIDTH, 1, EPIX100_HEADER_BYTES, 0),
        }
    }

    pub fn plan(&self) -> LaneMapPlan {
        match *self {
            SensorVariant::EpixHr10k2M => hr_banks(144, 24),
            SensorVariant::EpixHrSingle10kT => hr_banks(146, 6),
            SensorVariant::EpixHrDuo10kT => raster(144, 384, RowOrder::Sequential),
            SensorVariant::EpixHrMv2 => LaneMapPlan {
                tile: ClusterTile::row(HR_BANK_WIDTH),
                replication: Replication {
                    count: MV2_BANK_HEIGHT,
                    stacking: Stacking::Vertical,
                    stride: Stride::Blocked,
                },
                bit_planes: Some(BitPlanes {
                    layout: PlaneLayout::Alternating,
                    stride: Stride::Blocked,
                    swap: true,
                }),
                lanes: LaneGrid {
                    lanes: 24,
                    rows: 4,
                    cols: 6,
                    order: LaneOrder::ColumnMajor,
                    reverse: false,
                    mirror_lane_columns: false,
                },
                orientation: Orientation::default(),
                row_order: RowOrder::Sequential,
            },
            SensorVariant::EpixUhr100kHz { clusters, .. } => LaneMapPlan {
                tile: ClusterTile {
                    groups: 8,
                    sub_pixel_map: UHR_SUB_PIXELS,
                    column_width: 3,
                    mirror_second_column: true,
                },
                replication: Replication {
                    count: clusters,
                    stacking: Stacking::Vertical,
                    stride: Stride::Interleaved,
                },
                bit_planes: Some(BitPlanes {
                    layout: PlaneLayout::SideBySide,
                    stride: Stride::Interleaved,
                    swap: false,
                }),
                lanes: LaneGrid { mirror_lane_columns: true, ..LaneGrid::single_row(UHR_LANES) },
                orientation: Orientation { flip_rows: true, flip_cols: true },
                row_order: RowOrder::Sequential,
            },
            SensorVariant::EpixUhrMhz => LaneMapPlan {
                tile: ClusterTile {
                    groups: 8,
                    sub_pixel_map: &[0],
                    column_width: 1,
                    mirror_second_column: false,
                },
                replication: Replication { count: 14, stacking: Stacking::Vertical, stride: Stride::Interleaved },
                bit_planes: Some(BitPlanes {
                    layout: PlaneLayout::SideBySide,
                    stride: Stride::Interleaved,
                    swap: false,
                }),
                lanes: LaneGrid::single_row(UHR_LANES),
                orientation: Orientation { flip_rows: true, flip_cols: false },
                row_order: RowOrder::Sequential,
            },
            SensorVariant::SparkPixRt => LaneMapPlan {
                tile: ClusterTile {
                    groups: 72,
                    sub_pixel_map: &[0],
                    column_width: 3,
                    mirror_second_column: true,
                },
                replication: Replication { count: 8, stacking: Stacking::Horizontal, stride: Stride::Interleaved },
                bit_planes: None,
                lanes: LaneGrid {
                    lanes: SPARKPIX_LANES,
                    rows: SPARKPIX_LANES,
                    cols: 1,
                    order: LaneOrder::RowMajor,
                    reverse: true,
                    mirror_lane_columns: false,
                },
                orientation: Orientation { flip_rows: true, flip_cols: false },
                row_order: RowOrder::Sequential,
            },
            SensorVariant::Epix100a => raster(EPIX100A_ROWS, EPIX100_WIDTH, RowOrder::FoldedOddEven),
            SensorVariant::Epix100p => raster(EPIX100P_ROWS, EPIX100_WIDTH, RowOrder::SplitOddEven),
        }
    }

    pub fn post_pass(&self) -> Option<PostPass> {
        match self {
            SensorVariant::EpixHr10k2M | SensorVariant::EpixHrSingle10kT => Some(PostPass::ColumnLag {
                bank_width: HR_BANK_WIDTH,
                columns: HR_LAGGING_COLUMNS,
            }),
            SensorVariant::EpixHrMv2 => Some(PostPass::BankRowSwap { bank_height: MV2_BANK_HEIGHT }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorVariant::EpixHr10k2M => "epixhr10k2m",
            SensorVariant::EpixHrSingle10kT => "epixhrsingle10kt",
            SensorVariant::EpixHrDuo10kT => "epixhrduo10kt",
            SensorVariant::EpixHrMv2 => "epixhrmv2",
            SensorVariant::EpixUhr100kHz { timing_header: false, .. } => "epixuhr100khz",
            SensorVariant::EpixUhr100kHz { timing_header: true, .. } => "epixuhr100khz-timing",
            SensorVariant::EpixUhrMhz => "epixuhrmhz",
            SensorVariant::SparkPixRt => "sparkpixrt",
            SensorVariant::Epix100a => "epix100a",
            SensorVariant::Epix100p => "epix100p",
        }
    }
}

impl fmt::Display for SensorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorVariant::EpixUhr100kHz { clusters, .. } if *clusters != UHR_DEFAULT_CLUSTERS => {
                write!(f, "{}:{}", self.name(), clusters)
            }
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for SensorVariant {
    type Err = PipelineError;

    /// Accepts the names printed by `Display`; UHR names take an optional
    /// `:<clusters>` suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let (name, clusters) = match lowered.split_once(':') {
            Some((name, count)) => {
                let clusters = count.parse::<usize>().ok().filter(|&c| c > 0).ok_or_else(|| {
                    PipelineError::InvalidConfig(format!("invalid cluster count '{}'", count))
                })?;
                (name, Some(clusters))
            }
            None => (lowered.as_str(), None),
        };

        let variant = match name {
            "epixhr10k2m" => SensorVariant::EpixHr10k2M,
            "epixhrsingle10kt" => SensorVariant::EpixHrSingle10kT,
            "epixhrduo10kt" => SensorVariant::EpixHrDuo10kT,
            "epixhrmv2" => SensorVariant::EpixHrMv2,
            "epixuhr100khz" | "epixuhr100khz-timing" => SensorVariant::EpixUhr100kHz {
                clusters: clusters.unwrap_or(UHR_DEFAULT_CLUSTERS),
                timing_header: name.ends_with("-timing"),
            },
            "epixuhrmhz" => SensorVariant::EpixUhrMhz,
            "sparkpixrt" => SensorVariant::SparkPixRt,
            "epix100a" => SensorVariant::Epix100a,
            "epix100p" => SensorVariant::Epix100p,
            other => {
                return Err(PipelineError::InvalidConfig(format!("unknown sensor variant '{}'", other)));
            }
        };

        if clusters.is_some() && !matches!(variant, SensorVariant::EpixUhr100kHz { .. }) {
            return Err(PipelineError::InvalidConfig(format!(
                "'{}' does not take a cluster count",
                name
            )));
        }
        Ok(variant)
    }
}

fn word16(height: usize, width: usize, banks: usize, header: usize, trailer: usize) -> SensorGeometry {
    SensorGeometry {
        width,
        height,
        bit_depth: 16,
        header_bytes: header,
        trailer_bytes: trailer,
        encoding: SampleEncoding::Word16Le,
        lane_count: banks,
        clusters_per_lane: height,
        gain_bit_present: false,
    }
}

/// Banks of 32 columns, samples interleaved bank by bank.
fn hr_banks(rows: usize, banks: usize) -> LaneMapPlan {
    LaneMapPlan {
        tile: ClusterTile::row(HR_BANK_WIDTH),
        replication: Replication { count: rows, stacking: Stacking::Vertical, stride: Stride::Blocked },
        bit_planes: None,
        lanes: LaneGrid::single_row(banks),
        orientation: Orientation::default(),
        row_order: RowOrder::Sequential,
    }
}

/// Whole rows of `width` samples read one after another.
fn raster(rows: usize, width: usize, row_order: RowOrder) -> LaneMapPlan {
    LaneMapPlan {
        tile: ClusterTile::row(width),
        replication: Replication { count: rows, stacking: Stacking::Vertical, stride: Stride::Blocked },
        bit_planes: None,
        lanes: LaneGrid::single_row(1),
        orientation: Orientation::default(),
        row_order,
    }
}

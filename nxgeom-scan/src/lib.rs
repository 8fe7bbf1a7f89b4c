//! nxgeom-scan: Scan positions for NXmx collections.
//!
//! Expands bounded ranges and line/grid scans into explicit positions,
//! derives the oscillation and translation scans of a goniometer, and maps
//! fixed-target chip blocks onto goniometer start and end positions.
//!

pub mod chip;
pub mod error;
pub mod goniometer;
pub mod line;
pub mod range;

pub use chip::{
    block_id, compute_goniometer, fixed_target_scan, fullchip_blocks_conversion,
    fullchip_conversion_table, parse_chip_map, read_chip_map, BlockPositions, Chip, ChipAxes,
    ChipMap, ChipPositions,
};
pub use error::{Error, Result};
pub use goniometer::{
    DefinedScan, EventModeScan, Goniometer, GridScanOptions, ScanDirection, DEFAULT_OSC_AXIS,
};
pub use line::{calculate_scan_points, AxisPositions, Line, ScanPoints, ScanSpec};
pub use range::{linspace, round_to, scan_range, scan_range_from, ScanStep, MAX_SCAN_POINTS};

//! Fixed-target chip geometry and per-block goniometer positions.
//!
//! A chip is a grid of blocks, each holding a grid of windows. Blocks are
//! numbered from 1 along a snake: column `x` is walked in increasing `y` when
//! `x` is even and in decreasing `y` when odd, so for a 2x2 chip block 01 is
//! at (0, 0), 02 at (0, 1), 03 at (1, 1) and 04 at (1, 0). This is the
//! numbering chip map files are written in, not a row-major one. Windows
//! inside a block are visited in the same boustrophedon order.

use crate::error::{Error, Result};
use crate::goniometer::ScanDirection;
use crate::line::{calculate_scan_points, ScanPoints};
use crate::range::round_to;
use nxgeom_core::{Axis, AxisChain, TransformationType, ROOT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decimal places kept on computed chip positions.
pub const POSITION_DECIMALS: i32 = 3;

/// Fixed-target chip description.
///
/// Pairs are ordered (x, y).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chip {
    /// Chip description.
    pub name: String,
    /// Windows per block.
    pub num_steps: (usize, usize),
    /// Distance between window centres in millimetres.
    pub step_size: (f64, f64),
    /// Blocks on the chip.
    pub num_blocks: (usize, usize),
    /// Block pitch in millimetres.
    pub block_size: (f64, f64),
    /// Chip origin (x, y, z).
    pub start_pos: [f64; 3],
}

impl Default for Chip {
    fn default() -> Self {
        Self {
            name: "fastchip".into(),
            num_steps: (20, 20),
            step_size: (0.125, 0.125),
            num_blocks: (8, 8),
            block_size: (3.175, 3.175),
            start_pos: [0.0; 3],
        }
    }
}

impl Chip {
    /// Checks the chip has at least one block and one window.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for a zero count.
    pub fn validate(&self) -> Result<()> {
        if self.tot_blocks() == 0 || self.tot_windows_per_block() == 0 {
            return Err(Error::Configuration(format!(
                "chip '{}' needs at least one block and one window, got {:?} blocks of {:?} windows",
                self.name, self.num_blocks, self.num_steps
            )));
        }
        Ok(())
    }

    /// Number of blocks.
    #[must_use]
    pub fn tot_blocks(&self) -> usize {
        self.num_blocks.0 * self.num_blocks.1
    }

    /// Number of windows in one block.
    #[must_use]
    pub fn tot_windows_per_block(&self) -> usize {
        self.num_steps.0 * self.num_steps.1
    }

    /// Extent of the windows in one block.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn window_size(&self) -> (f64, f64) {
        (
            self.num_steps.0 as f64 * self.step_size.0,
            self.num_steps.1 as f64 * self.step_size.1,
        )
    }

    /// Extent of the chip.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn chip_size(&self) -> (f64, f64) {
        (
            self.num_blocks.0 as f64 * self.block_size.0,
            self.num_blocks.1 as f64 * self.block_size.1,
        )
    }
}

/// Identifier of a block number, zero-padded to two digits.
#[must_use]
pub fn block_id(number: usize) -> String {
    format!("{number:02}")
}

/// Block identifiers with their (x, y) grid coordinates, in block order.
#[must_use]
pub fn fullchip_conversion_table(chip: &Chip) -> Vec<(String, (usize, usize))> {
    let (nx, ny) = chip.num_blocks;
    let coords = (0..nx).flat_map(move |x| {
        let ys: Box<dyn Iterator<Item = usize>> = if x % 2 == 0 {
            Box::new(0..ny)
        } else {
            Box::new((0..ny).rev())
        };
        ys.map(move |y| (x, y))
    });
    coords
        .enumerate()
        .map(|(i, coord)| (block_id(i + 1), coord))
        .collect()
}

/// Blocks scanned in a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChipMap {
    /// Every block, in block order.
    FullChip,
    /// Listed blocks as (identifier, (x, y)), in map order.
    Blocks(Vec<(String, (usize, usize))>),
}

/// Resolves scanned block numbers to grid coordinates.
///
/// No list, or a list naming as many blocks as the chip has, means the full
/// chip.
///
/// # Errors
/// Returns [`Error::InvalidChipMap`] for a block number outside
/// `1..=x_blocks * y_blocks` or for a chip without blocks.
pub fn read_chip_map(blocks: Option<&[usize]>, x_blocks: usize, y_blocks: usize) -> Result<ChipMap> {
    let max_blocks = x_blocks * y_blocks;
    if max_blocks == 0 {
        return Err(Error::InvalidChipMap(format!(
            "chip of {x_blocks}x{y_blocks} blocks has no blocks"
        )));
    }
    let Some(blocks) = blocks else {
        return Ok(ChipMap::FullChip);
    };
    if blocks.len() == max_blocks {
        return Ok(ChipMap::FullChip);
    }

    // The snake walks columns of `y_blocks` blocks.
    let column = y_blocks;
    let mut resolved = Vec::with_capacity(blocks.len());
    for &b in blocks {
        if !(1..=max_blocks).contains(&b) {
            return Err(Error::InvalidChipMap(format!(
                "block {b} is outside 1..={max_blocks}"
            )));
        }
        let x = (b - 1) / column;
        let y = if x % 2 == 0 {
            b - (x * column + 1)
        } else {
            (x + 1) * column - b
        };
        resolved.push((block_id(b), (x, y)));
    }
    log::debug!("chip map selects blocks {:?}", resolved);
    Ok(ChipMap::Blocks(resolved))
}

/// Parses the text of a chip map file.
///
/// Each line reads `<nn>status <label> <flag>`, where `<nn>` is the block
/// number written with at least two digits; blocks whose last field is `1`
/// are returned, in file order. Blank lines are skipped.
///
/// # Errors
/// Returns [`Error::InvalidChipMap`] for a line whose block number or flag
/// cannot be read.
pub fn parse_chip_map(text: &str) -> Result<Vec<usize>> {
    let mut blocks = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bad_line = || Error::InvalidChipMap(format!("line {}: '{line}'", lineno + 1));
        let digits = line.find(|c: char| !c.is_ascii_digit()).unwrap_or(line.len());
        let number = line[..digits].parse::<usize>().map_err(|_| bad_line())?;
        match line.split_whitespace().last() {
            Some("1") => blocks.push(number),
            Some("0") => {}
            _ => return Err(bad_line()),
        }
    }
    Ok(blocks)
}

/// Re-keys values stored by block coordinate with block identifiers, in
/// block order. Coordinates missing from `values` are skipped.
#[must_use]
pub fn fullchip_blocks_conversion<T: Clone>(
    values: &[((usize, usize), T)],
    chip: &Chip,
) -> Vec<(String, T)> {
    fullchip_conversion_table(chip)
        .into_iter()
        .filter_map(|(id, coord)| {
            values
                .iter()
                .find(|(c, _)| *c == coord)
                .map(|(_, v)| (id, v.clone()))
        })
        .collect()
}

/// Axes moved across the chip.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChipAxes {
    /// Axis along the chip x direction (between block columns).
    pub x: String,
    /// Axis along the chip y direction (snaked within a block).
    pub y: String,
}

impl Default for ChipAxes {
    fn default() -> Self {
        Self {
            x: "sam_x".into(),
            y: "sam_y".into(),
        }
    }
}

/// Start and end goniometer positions of one block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlockPositions {
    /// Two-digit block identifier.
    pub id: String,
    /// Block (x, y) grid coordinate.
    pub coord: (usize, usize),
    /// Direction of travel along the y axis.
    pub direction: ScanDirection,
    /// Axis positions at the first window, ordered like the goniometer axes.
    pub start: Vec<f64>,
    /// Axis positions one window extent past the start, ordered like the
    /// goniometer axes.
    pub end: Vec<f64>,
}

/// Per-block positions for a chip collection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChipPositions {
    /// Goniometer axis names, in chain order.
    pub axes: Vec<String>,
    /// Scanned blocks, in collection order.
    pub blocks: Vec<BlockPositions>,
}

impl ChipPositions {
    /// Looks up a block by identifier.
    #[must_use]
    pub fn block(&self, id: &str) -> Option<&BlockPositions> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Index of the named axis in the position vectors.
    #[must_use]
    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|a| a == name)
    }

    /// Start position of `axis` in block `id`.
    #[must_use]
    pub fn start_of(&self, id: &str, axis: &str) -> Option<f64> {
        Some(self.block(id)?.start[self.axis_index(axis)?])
    }
}

/// Computes start and end positions of every scanned block.
///
/// Moving axes start at the chip origin plus the block pitch offset; odd
/// columns start from the far end of the block and travel backwards along
/// y. Axes that do not move keep their configured start position.
///
/// # Errors
/// Returns [`Error::AxisNotFound`] if either chip axis is not part of the
/// goniometer and [`Error::Configuration`] for a chip without windows.
#[allow(clippy::cast_precision_loss)]
pub fn compute_goniometer(
    chip: &Chip,
    goniometer: &AxisChain,
    axes: &ChipAxes,
    map: &ChipMap,
) -> Result<ChipPositions> {
    chip.validate()?;
    let ix = goniometer
        .position(&axes.x)
        .ok_or_else(|| Error::AxisNotFound(axes.x.clone()))?;
    let iy = goniometer
        .position(&axes.y)
        .ok_or_else(|| Error::AxisNotFound(axes.y.clone()))?;

    let blocks = match map {
        ChipMap::FullChip => fullchip_conversion_table(chip),
        ChipMap::Blocks(blocks) => blocks.clone(),
    };
    let defaults: Vec<f64> = goniometer.axes().iter().map(|a| a.start_pos).collect();
    let (x0, y0) = (chip.start_pos[0], chip.start_pos[1]);
    let (window_x, window_y) = chip.window_size();

    let positions = blocks
        .into_iter()
        .map(|(id, (x, y))| {
            let x_start = x0 + x as f64 * chip.block_size.0;
            let block_y = y0 + y as f64 * chip.block_size.1;
            let (direction, y_start) = if x % 2 == 0 {
                (ScanDirection::Positive, block_y)
            } else {
                let last_window = (chip.num_steps.1 - 1) as f64 * chip.step_size.1;
                (ScanDirection::Negative, block_y + last_window)
            };
            let mut start = defaults.clone();
            let mut end = defaults.clone();
            start[ix] = round_to(x_start, POSITION_DECIMALS);
            start[iy] = round_to(y_start, POSITION_DECIMALS);
            end[ix] = round_to(x_start + window_x, POSITION_DECIMALS);
            end[iy] = round_to(y_start + direction.sign() * window_y, POSITION_DECIMALS);
            BlockPositions {
                id,
                coord: (x, y),
                direction,
                start,
                end,
            }
        })
        .collect();

    Ok(ChipPositions {
        axes: goniometer.axes().iter().map(|a| a.name.clone()).collect(),
        blocks: positions,
    })
}

/// Window positions of a whole fixed-target collection.
///
/// Each block is scanned as a snaked grid with y as the outer axis, starting
/// from its [`BlockPositions`] and stepping by the chip step size, y
/// increments carrying the block's direction. Blocks are concatenated in
/// collection order and every position is repeated `n_exposures` times.
///
/// # Errors
/// Returns [`Error::Configuration`] for zero exposures plus anything
/// [`compute_goniometer`] rejects.
pub fn fixed_target_scan(
    chip: &Chip,
    goniometer: &AxisChain,
    axes: &ChipAxes,
    map: &ChipMap,
    n_exposures: usize,
) -> Result<ScanPoints> {
    if n_exposures == 0 {
        return Err(Error::Configuration(
            "each window needs at least one exposure".into(),
        ));
    }
    let positions = compute_goniometer(chip, goniometer, axes, map)?;
    let (ix, iy) = (
        positions.axis_index(&axes.x).unwrap_or_default(),
        positions.axis_index(&axes.y).unwrap_or_default(),
    );

    let mut scan = ScanPoints::default();
    for block in &positions.blocks {
        let y = Axis::new(axes.y.as_str(), ROOT, TransformationType::Translation, [0.0, 1.0, 0.0], block.start[iy])
            .with_scan(chip.step_size.1 * block.direction.sign(), chip.num_steps.1);
        let x = Axis::new(axes.x.as_str(), ROOT, TransformationType::Translation, [1.0, 0.0, 0.0], block.start[ix])
            .with_scan(chip.step_size.0, chip.num_steps.0);
        log::debug!(
            "block {}: {} from {}, {} from {}, direction {:?}",
            block.id,
            y.name,
            y.start_pos,
            x.name,
            x.start_pos,
            block.direction
        );
        scan.extend(&calculate_scan_points(&y, Some(&x), true, false, None)?)?;
    }
    scan.map_positions(|p| round_to(p, POSITION_DECIMALS));
    scan.repeat_each(n_exposures);
    Ok(scan)
}

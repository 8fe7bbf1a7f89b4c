//! Composite layout of planned fragments.
//!
//! A [`VirtualLayout`] places each fragment at an offset in one logical
//! dataset. It only describes the mapping; a [`LayoutSink`] materializes it.

use crate::error::{Error, Result};
use crate::planner::Fragment;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value of frames not backed by any fragment.
pub const FILL_VALUE: i64 = -1;

/// Element type of the frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DataType {
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    #[default]
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Signed 32-bit integer.
    Int32,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
}

impl DataType {
    /// Numpy-style name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Size of one element in bytes.
    #[must_use]
    pub fn size_bytes(self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uint8" | "u8" => Ok(Self::Uint8),
            "uint16" | "u16" => Ok(Self::Uint16),
            "uint32" | "u32" => Ok(Self::Uint32),
            "int32" | "i32" => Ok(Self::Int32),
            "float32" | "f32" => Ok(Self::Float32),
            "float64" | "f64" => Ok(Self::Float64),
            _ => Err(Error::UnknownDataType(s.to_string())),
        }
    }
}

/// A fragment placed in the logical dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutEntry {
    /// Source slice.
    pub fragment: Fragment,
    /// First destination frame.
    pub dest_start: usize,
}

impl LayoutEntry {
    /// One past the last destination frame.
    #[must_use]
    pub fn dest_end(&self) -> usize {
        self.dest_start + self.fragment.local_count
    }
}

/// Ordered fragment-to-destination mapping of one logical dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VirtualLayout {
    dtype: DataType,
    fill_value: i64,
    entries: Vec<LayoutEntry>,
    len: usize,
}

impl VirtualLayout {
    /// Element type.
    #[must_use]
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Value of unbacked frames.
    #[must_use]
    pub fn fill_value(&self) -> i64 {
        self.fill_value
    }

    /// Placed fragments, in destination order.
    #[must_use]
    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    /// Number of frames in the logical dataset.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the layout holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shape of the logical dataset for frames of `frame_shape`.
    #[must_use]
    pub fn shape(&self, frame_shape: &[usize]) -> Vec<usize> {
        std::iter::once(self.len)
            .chain(frame_shape.iter().copied())
            .collect()
    }

    /// Resolves a destination frame to its backing dataset and local frame.
    #[must_use]
    pub fn locate(&self, frame: usize) -> Option<(&str, usize)> {
        if frame >= self.len {
            return None;
        }
        let i = self.entries.partition_point(|e| e.dest_end() <= frame);
        let entry = self.entries.get(i)?;
        let local = entry.fragment.local_start + (frame - entry.dest_start);
        Some((entry.fragment.dataset.as_str(), local))
    }
}

/// Places fragments back to back, in order, in one logical dataset.
///
/// # Errors
/// Returns [`Error::EmptyLayout`] for no fragments and
/// [`Error::InvalidDataset`] for a fragment taking no frames.
pub fn layout(fragments: &[Fragment], dtype: DataType) -> Result<VirtualLayout> {
    if fragments.is_empty() {
        return Err(Error::EmptyLayout);
    }
    let mut entries = Vec::with_capacity(fragments.len());
    let mut dest = 0usize;
    for fragment in fragments {
        if fragment.local_count == 0 {
            return Err(Error::InvalidDataset(format!(
                "fragment of '{}' takes no frames",
                fragment.dataset
            )));
        }
        entries.push(LayoutEntry {
            fragment: fragment.clone(),
            dest_start: dest,
        });
        dest += fragment.local_count;
    }
    log::debug!("virtual layout of {dest} {dtype} frames from {} fragments", entries.len());
    Ok(VirtualLayout {
        dtype,
        fill_value: FILL_VALUE,
        entries,
        len: dest,
    })
}

/// Module size of a Jungfrau detector, (slow, fast) pixels.
pub const JUNGFRAU_MODULE_SIZE: [usize; 2] = [514, 1030];

/// Gap between stacked Jungfrau modules, (slow, fast) pixels.
pub const JUNGFRAU_GAP_SIZE: [usize; 2] = [38, 12];

/// Value of Jungfrau pixels not covered by a module (bit 31 set).
pub const JUNGFRAU_FILL_VALUE: i64 = 0x8000_0000;

/// One source dataset placed in the image plane of a tiled layout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tile {
    /// Source dataset name.
    pub source: String,
    /// Top-left pixel in the output image, (slow, fast).
    pub offset: [usize; 2],
    /// Source image size, (slow, fast).
    pub size: [usize; 2],
}

impl Tile {
    fn contains(&self, slow: usize, fast: usize) -> bool {
        (self.offset[0]..self.offset[0] + self.size[0]).contains(&slow)
            && (self.offset[1]..self.offset[1] + self.size[1]).contains(&fast)
    }
}

/// Frames of several sources placed side by side in every output image.
///
/// Every source holds the same frames; pixels between tiles take the fill
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TiledLayout {
    dtype: DataType,
    fill_value: i64,
    frames: usize,
    image_size: [usize; 2],
    tiles: Vec<Tile>,
}

impl TiledLayout {
    /// Element type.
    #[must_use]
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Value of pixels outside every tile.
    #[must_use]
    pub fn fill_value(&self) -> i64 {
        self.fill_value
    }

    /// Number of frames.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Placed sources.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Shape of the output dataset: frames, slow, fast.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        vec![self.frames, self.image_size[0], self.image_size[1]]
    }

    /// Size of the output dataset in bytes.
    #[must_use]
    pub fn nbytes(&self) -> usize {
        self.shape().iter().product::<usize>() * self.dtype.size_bytes()
    }

    /// Resolves an output pixel to its source and the pixel in that source.
    /// Pixels in a gap give `None`.
    #[must_use]
    pub fn locate(&self, slow: usize, fast: usize) -> Option<(&str, [usize; 2])> {
        self.tiles.iter().find(|t| t.contains(slow, fast)).map(|t| {
            (
                t.source.as_str(),
                [slow - t.offset[0], fast - t.offset[1]],
            )
        })
    }
}

/// Tiled layout of a Jungfrau 1M: two modules stacked along the slow axis
/// with a gap between them, the second source on top.
///
/// # Errors
/// Returns [`Error::InvalidDataset`] unless exactly two sources are given
/// and [`Error::EmptyLayout`] for zero frames.
pub fn jungfrau_layout(sources: &[&str], frames: usize, dtype: DataType) -> Result<TiledLayout> {
    let [lower, upper] = sources else {
        return Err(Error::InvalidDataset(format!(
            "a Jungfrau 1M layout takes 2 module datasets, got {}",
            sources.len()
        )));
    };
    if frames == 0 {
        return Err(Error::EmptyLayout);
    }
    let [mod_slow, mod_fast] = JUNGFRAU_MODULE_SIZE;
    let lower_row = mod_slow + JUNGFRAU_GAP_SIZE[0];
    let tiles = vec![
        Tile {
            source: (*upper).to_string(),
            offset: [0, 0],
            size: JUNGFRAU_MODULE_SIZE,
        },
        Tile {
            source: (*lower).to_string(),
            offset: [lower_row, 0],
            size: JUNGFRAU_MODULE_SIZE,
        },
    ];
    log::debug!("Jungfrau 1M layout of {frames} {dtype} frames from {upper} and {lower}");
    Ok(TiledLayout {
        dtype,
        fill_value: JUNGFRAU_FILL_VALUE,
        frames,
        image_size: [lower_row + mod_slow, mod_fast],
        tiles,
    })
}

/// Persistence collaborator that turns a layout into a real dataset.
pub trait LayoutSink {
    /// Error raised while materializing.
    type Error;

    /// Materializes `layout`.
    ///
    /// # Errors
    /// Implementation defined.
    fn materialize(&mut self, layout: &VirtualLayout) -> std::result::Result<(), Self::Error>;

    /// Materializes a tiled `layout`.
    ///
    /// # Errors
    /// Implementation defined.
    fn materialize_tiled(&mut self, layout: &TiledLayout)
        -> std::result::Result<(), Self::Error>;
}

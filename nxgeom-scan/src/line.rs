//! Declarative line and grid scans over named axes.

use crate::error::{Error, Result};
use crate::range::linspace;
use nxgeom_core::{Axis, TransformationType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Evenly spaced points along one axis, both ends included.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Line {
    /// Axis name.
    pub axis: String,
    /// First position.
    pub start: f64,
    /// Last position.
    pub stop: f64,
    /// Number of points.
    pub num: usize,
}

impl Line {
    /// Creates a line.
    pub fn new(axis: impl Into<String>, start: f64, stop: f64, num: usize) -> Self {
        Self {
            axis: axis.into(),
            start,
            stop,
            num,
        }
    }

    /// Line from an axis' start to end position over its scan steps.
    #[must_use]
    pub fn from_axis(axis: &Axis) -> Self {
        Self::new(axis.name.clone(), axis.start_pos, axis.end_pos(), axis.num_steps)
    }

    /// Expanded positions.
    #[must_use]
    pub fn positions(&self) -> Vec<f64> {
        linspace(self.start, self.stop, self.num)
    }

    fn check(&self) -> Result<()> {
        if self.num == 0 {
            return Err(Error::Configuration(format!(
                "line over '{}' needs at least one point",
                self.axis
            )));
        }
        Ok(())
    }
}

/// A one- or two-axis scan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScanSpec {
    /// Single axis.
    Line(Line),
    /// Outer axis steps once per full pass of the inner axis.
    Grid {
        /// Slow axis.
        outer: Line,
        /// Fast axis.
        inner: Line,
        /// Reverse the inner axis on every odd pass.
        snaked: bool,
    },
}

impl ScanSpec {
    /// Total number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Line(line) => line.num,
            Self::Grid { outer, inner, .. } => outer.num * inner.num,
        }
    }

    /// True if the scan has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expands the scan into per-axis positions.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if a line has no points or a grid
    /// uses the same axis twice.
    pub fn calculate(&self) -> Result<ScanPoints> {
        match self {
            Self::Line(line) => {
                line.check()?;
                Ok(ScanPoints::single(line.axis.clone(), line.positions()))
            }
            Self::Grid {
                outer,
                inner,
                snaked,
            } => {
                outer.check()?;
                inner.check()?;
                if outer.axis == inner.axis {
                    return Err(Error::Configuration(format!(
                        "grid uses axis '{}' twice",
                        outer.axis
                    )));
                }
                let outer_pos = outer.positions();
                let inner_pos = inner.positions();
                let total = outer_pos.len() * inner_pos.len();
                let mut slow = Vec::with_capacity(total);
                let mut fast = Vec::with_capacity(total);
                for (i, &o) in outer_pos.iter().enumerate() {
                    slow.extend(std::iter::repeat_n(o, inner_pos.len()));
                    if *snaked && i % 2 == 1 {
                        fast.extend(inner_pos.iter().rev());
                    } else {
                        fast.extend(inner_pos.iter());
                    }
                }
                Ok(ScanPoints {
                    axes: vec![
                        AxisPositions::new(outer.axis.clone(), slow),
                        AxisPositions::new(inner.axis.clone(), fast),
                    ],
                })
            }
        }
    }
}

/// Positions of one axis across a scan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisPositions {
    /// Axis name.
    pub axis: String,
    /// One position per scan point.
    pub positions: Vec<f64>,
}

impl AxisPositions {
    /// Creates a named position list.
    pub fn new(axis: impl Into<String>, positions: Vec<f64>) -> Self {
        Self {
            axis: axis.into(),
            positions,
        }
    }
}

/// Ordered per-axis positions of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ScanPoints {
    axes: Vec<AxisPositions>,
}

impl ScanPoints {
    /// Builds scan points from per-axis positions.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if no axes are given, an axis
    /// appears twice, or the position lists differ in length.
    pub fn new(axes: Vec<AxisPositions>) -> Result<Self> {
        let Some(first) = axes.first() else {
            return Err(Error::Configuration("scan has no axes".into()));
        };
        let len = first.positions.len();
        for (i, ax) in axes.iter().enumerate() {
            if ax.positions.len() != len {
                return Err(Error::Configuration(format!(
                    "scan axis '{}' has {} points, expected {len}",
                    ax.axis,
                    ax.positions.len()
                )));
            }
            if axes[..i].iter().any(|other| other.axis == ax.axis) {
                return Err(Error::Configuration(format!(
                    "scan axis '{}' given twice",
                    ax.axis
                )));
            }
        }
        Ok(Self { axes })
    }

    /// Points for a single axis.
    pub fn single(axis: impl Into<String>, positions: Vec<f64>) -> Self {
        Self {
            axes: vec![AxisPositions::new(axis, positions)],
        }
    }

    /// One axis held at `value` for `len` points.
    pub fn constant(axis: impl Into<String>, value: f64, len: usize) -> Self {
        Self::single(axis, vec![value; len])
    }

    /// Number of scan points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.axes.first().map_or(0, |ax| ax.positions.len())
    }

    /// True if there are no scan points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Axis names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|ax| ax.axis.as_str())
    }

    /// Positions of the named axis.
    #[must_use]
    pub fn get(&self, axis: &str) -> Option<&[f64]> {
        self.axes
            .iter()
            .find(|ax| ax.axis == axis)
            .map(|ax| ax.positions.as_slice())
    }

    /// Per-axis positions in order.
    #[must_use]
    pub fn axes(&self) -> &[AxisPositions] {
        &self.axes
    }

    /// Appends another scan over the same axes, point by point.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the axes differ.
    pub fn extend(&mut self, other: &Self) -> Result<()> {
        if self.axes.is_empty() {
            self.axes.clone_from(&other.axes);
            return Ok(());
        }
        if !self.names().eq(other.names()) {
            return Err(Error::Configuration(
                "cannot join scans over different axes".into(),
            ));
        }
        for (mine, theirs) in self.axes.iter_mut().zip(&other.axes) {
            mine.positions.extend_from_slice(&theirs.positions);
        }
        Ok(())
    }

    /// Applies `f` to every position.
    pub fn map_positions(&mut self, f: impl Fn(f64) -> f64) {
        for ax in &mut self.axes {
            for p in &mut ax.positions {
                *p = f(*p);
            }
        }
    }

    /// Repeats every point `n` times in place.
    pub fn repeat_each(&mut self, n: usize) {
        for ax in &mut self.axes {
            ax.positions = ax
                .positions
                .iter()
                .flat_map(|&p| std::iter::repeat_n(p, n))
                .collect();
        }
    }
}

/// Expands the scan described by one or two axes.
///
/// For a rotation the first axis is expanded over `tot_num_imgs` points when
/// given, else over its own `num_steps`; a still rotation repeats its start
/// position. Otherwise one axis gives a line and two a grid with `axis1` as
/// the outer axis.
///
/// # Errors
/// Returns [`Error::Configuration`] if an axis has the wrong transformation
/// type for the requested scan or there are no points to compute.
pub fn calculate_scan_points(
    axis1: &Axis,
    axis2: Option<&Axis>,
    snaked: bool,
    rotation: bool,
    tot_num_imgs: Option<usize>,
) -> Result<ScanPoints> {
    if rotation {
        check_kind(axis1, TransformationType::Rotation)?;
        let num = tot_num_imgs.unwrap_or(axis1.num_steps);
        let line = Line::new(axis1.name.clone(), axis1.start_pos, axis1.end_pos(), num);
        return ScanSpec::Line(line).calculate();
    }

    check_kind(axis1, TransformationType::Translation)?;
    let spec = match axis2 {
        None => ScanSpec::Line(Line::from_axis(axis1)),
        Some(axis2) => {
            check_kind(axis2, TransformationType::Translation)?;
            ScanSpec::Grid {
                outer: Line::from_axis(axis1),
                inner: Line::from_axis(axis2),
                snaked,
            }
        }
    };
    log::debug!("expanding {} point scan: {spec:?}", spec.len());
    spec.calculate()
}

fn check_kind(axis: &Axis, expected: TransformationType) -> Result<()> {
    if axis.kind != expected {
        return Err(Error::Configuration(format!(
            "wrong transformation type: a {} axis '{}' was passed for a {expected} scan",
            axis.kind, axis.name
        )));
    }
    Ok(())
}

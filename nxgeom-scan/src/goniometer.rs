//! Goniometer scan definition.
//!
//! A goniometer is a validated axis chain plus, optionally, the scan
//! positions recorded during the collection. Without recorded positions the
//! scan is derived from the axes' start positions, increments and step
//! counts.

use crate::error::{Error, Result};
use crate::line::{calculate_scan_points, ScanPoints};
use crate::range::round_to;
use nxgeom_core::{Axis, AxisChain, CoordinateConvention, TransformationType};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Oscillation axis used when no rotation axis moves.
pub const DEFAULT_OSC_AXIS: &str = "omega";

/// Direction of travel along the scan axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScanDirection {
    /// Increasing positions.
    #[default]
    Positive,
    /// Decreasing positions.
    Negative,
}

impl ScanDirection {
    /// `1.0` or `-1.0`.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

/// Options for a two-axis translation scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridScanOptions {
    /// Axis names as (outer, inner).
    pub axes_order: (String, String),
    /// Reverse the inner axis on every odd pass.
    pub snaked: bool,
}

/// Oscillation and optional translation scan of an image collection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DefinedScan {
    /// Rotation axis positions, one per image.
    pub oscillation: ScanPoints,
    /// Translation axis positions, one per image.
    pub grid: Option<ScanPoints>,
}

/// Rotation range of an event-mode collection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventModeScan {
    /// Rotation axis name.
    pub axis: String,
    /// Start and end position.
    pub range: (f64, f64),
    /// Translation scan, if one was recorded.
    pub grid: Option<ScanPoints>,
}

/// Sample goniometer.
#[derive(Debug, Clone, PartialEq)]
pub struct Goniometer {
    axes: AxisChain,
    scan: Option<ScanPoints>,
}

impl Goniometer {
    /// Creates a goniometer without recorded scan positions.
    #[must_use]
    pub fn new(axes: AxisChain) -> Self {
        Self { axes, scan: None }
    }

    /// Attaches recorded scan positions and updates the scanned axes from
    /// them: start position, increment (first difference of the distinct
    /// values, rounded to 3 decimals) and number of distinct values.
    ///
    /// # Errors
    /// Returns [`Error::AxisNotFound`] if the scan names an axis that is not
    /// part of the goniometer and [`Error::Configuration`] for an empty scan.
    pub fn with_scan(self, scan: ScanPoints) -> Result<Self> {
        if scan.is_empty() {
            return Err(Error::Configuration("recorded scan has no points".into()));
        }
        let mut axes = self.axes.into_axes();
        for recorded in scan.axes() {
            let axis = axes
                .iter_mut()
                .find(|ax| ax.name == recorded.axis)
                .ok_or_else(|| Error::AxisNotFound(recorded.axis.clone()))?;
            update_from_positions(axis, &recorded.positions);
        }
        Ok(Self {
            axes: AxisChain::new(axes)?,
            scan: Some(scan),
        })
    }

    /// Goniometer axes.
    #[must_use]
    pub fn axes(&self) -> &AxisChain {
        &self.axes
    }

    /// Recorded scan positions, if any.
    #[must_use]
    pub fn scan(&self) -> Option<&ScanPoints> {
        self.scan.as_ref()
    }

    /// Returns the goniometer with axes expressed in McStas.
    #[must_use]
    pub fn to_mcstas(&self, convention: &CoordinateConvention) -> Self {
        Self {
            axes: self.axes.to_mcstas(convention),
            scan: self.scan.clone(),
        }
    }

    /// Name of the oscillation axis.
    ///
    /// The moving rotation axis if there is one, else the only rotation
    /// axis, else [`DEFAULT_OSC_AXIS`].
    ///
    /// # Errors
    /// Returns a core error for an empty goniometer or more than one moving
    /// rotation axis.
    pub fn oscillation_axis(&self) -> Result<&str> {
        let mut rotations = self
            .axes
            .axes()
            .iter()
            .filter(|ax| ax.kind == TransformationType::Rotation);
        let default = match (rotations.next(), rotations.next()) {
            (Some(only), None) => only.name.as_str(),
            _ => DEFAULT_OSC_AXIS,
        };
        Ok(self.axes.scan_axis(Some(default))?.unwrap_or(default))
    }

    fn axis(&self, name: &str) -> Result<&Axis> {
        self.axes
            .get(name)
            .ok_or_else(|| Error::AxisNotFound(name.to_string()))
    }

    /// Defines the oscillation and translation scans of an image collection.
    ///
    /// Recorded positions are returned as they are. Otherwise the
    /// oscillation axis is expanded when no translation axis moves. For a
    /// line or grid, the oscillation axis is spread from its start to its end
    /// position over the translation points, so a still axis stays at its
    /// start position. `direction` flips the increment of a rotation or line
    /// scan.
    ///
    /// # Errors
    /// Returns [`Error::AxisNotFound`] for an axis named in `grid` or chosen
    /// as oscillation axis that is not in the goniometer, plus any scan
    /// calculation error.
    pub fn define_scan(
        &self,
        grid: Option<&GridScanOptions>,
        direction: ScanDirection,
    ) -> Result<DefinedScan> {
        if let Some(scan) = &self.scan {
            return self.define_from_recorded(scan);
        }

        let osc_axis = self.axis(self.oscillation_axis()?)?;
        let transl_names: Vec<&str> = match grid {
            Some(options) => vec![options.axes_order.0.as_str(), options.axes_order.1.as_str()],
            None => self.axes.grid_axes()?,
        };

        let transl = match transl_names.as_slice() {
            [] => {
                let mut axis = osc_axis.clone();
                axis.increment *= direction.sign();
                log::debug!("rotation scan on '{}': {axis}", axis.name);
                let oscillation = calculate_scan_points(&axis, None, true, true, None)?;
                return Ok(DefinedScan {
                    oscillation,
                    grid: None,
                });
            }
            [name] => {
                let mut axis = self.axis(name)?.clone();
                axis.increment *= direction.sign();
                calculate_scan_points(&axis, None, true, false, None)?
            }
            [outer, inner] => {
                let snaked = grid.is_none_or(|options| options.snaked);
                calculate_scan_points(
                    self.axis(outer)?,
                    Some(self.axis(inner)?),
                    snaked,
                    false,
                    None,
                )?
            }
            more => {
                return Err(Error::Configuration(format!(
                    "a translation scan takes one or two axes, got {}",
                    more.len()
                )))
            }
        };

        log::debug!(
            "translation scan of {} points, oscillation axis '{}' from {} to {}",
            transl.len(),
            osc_axis.name,
            osc_axis.start_pos,
            osc_axis.end_pos()
        );
        let oscillation = calculate_scan_points(osc_axis, None, true, true, Some(transl.len()))?;
        Ok(DefinedScan {
            oscillation,
            grid: Some(transl),
        })
    }

    fn define_from_recorded(&self, scan: &ScanPoints) -> Result<DefinedScan> {
        let first = scan
            .names()
            .next()
            .ok_or_else(|| Error::Configuration("recorded scan has no axes".into()))?;
        if self.axis(first)?.kind == TransformationType::Rotation {
            return Ok(DefinedScan {
                oscillation: scan.clone(),
                grid: None,
            });
        }
        let osc_axis = self.axis(self.oscillation_axis()?)?;
        Ok(DefinedScan {
            oscillation: ScanPoints::constant(osc_axis.name.clone(), osc_axis.start_pos, scan.len()),
            grid: Some(scan.clone()),
        })
    }

    /// Defines the rotation range of an event-mode collection.
    ///
    /// Only the start and end positions are recorded; `end_position`
    /// overrides the end computed from the oscillation axis.
    ///
    /// # Errors
    /// Returns [`Error::AxisNotFound`] if the oscillation axis is not in the
    /// goniometer.
    pub fn define_event_mode_scan(&self, end_position: Option<f64>) -> Result<EventModeScan> {
        if let Some(scan) = &self.scan {
            let first = scan
                .axes()
                .first()
                .ok_or_else(|| Error::Configuration("recorded scan has no axes".into()))?;
            if self.axis(&first.axis)?.kind == TransformationType::Rotation {
                let start = first.positions.first().copied().unwrap_or_default();
                let end = first.positions.last().copied().unwrap_or(start);
                return Ok(EventModeScan {
                    axis: first.axis.clone(),
                    range: (start, end_position.unwrap_or(end)),
                    grid: None,
                });
            }
            let osc_axis = self.axis(self.oscillation_axis()?)?;
            return Ok(EventModeScan {
                axis: osc_axis.name.clone(),
                range: (osc_axis.start_pos, osc_axis.start_pos),
                grid: Some(scan.clone()),
            });
        }

        let osc_axis = self.axis(self.oscillation_axis()?)?;
        Ok(EventModeScan {
            axis: osc_axis.name.clone(),
            range: (
                osc_axis.start_pos,
                end_position.unwrap_or_else(|| osc_axis.end_pos()),
            ),
            grid: None,
        })
    }

    /// Number of images in the collection.
    ///
    /// # Errors
    /// Returns any error [`Goniometer::define_scan`] would.
    pub fn number_of_scan_points(&self) -> Result<usize> {
        match &self.scan {
            Some(scan) => Ok(scan.len()),
            None => Ok(self.define_scan(None, ScanDirection::Positive)?.oscillation.len()),
        }
    }
}

impl fmt::Display for Goniometer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Goniometer information:")?;
        for axis in self.axes.axes() {
            writeln!(f, "\t{axis}")?;
        }
        if let Some(scan) = &self.scan {
            writeln!(f, "Scan axes: {}", scan.names().collect::<Vec<_>>().join(", "))?;
        }
        Ok(())
    }
}

/// Distinct values in collection order.
#[allow(clippy::float_cmp)]
fn distinct_in_order(positions: &[f64]) -> Vec<f64> {
    let mut distinct: Vec<f64> = Vec::new();
    for &p in positions {
        if !distinct.contains(&p) {
            distinct.push(p);
        }
    }
    distinct
}

#[allow(clippy::float_cmp)]
fn update_from_positions(axis: &mut Axis, positions: &[f64]) {
    let distinct = distinct_in_order(positions);
    let start = distinct[0];
    let increment = match distinct.as_slice() {
        [first, second, ..] => round_to(second - first, 3),
        _ => 0.0,
    };
    if axis.start_pos != start || axis.increment != increment {
        log::warn!(
            "recorded scan overrides axis '{}': start {} -> {start}, increment {} -> {increment}",
            axis.name,
            axis.start_pos,
            axis.increment
        );
    }
    axis.start_pos = start;
    axis.increment = increment;
    axis.num_steps = distinct.len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::AxisPositions;
    use approx::assert_relative_eq;
    use nxgeom_core::ROOT;

    fn i24_axes() -> Vec<Axis> {
        vec![
            Axis::new("omega", ROOT, TransformationType::Rotation, [0.0, 0.0, -1.0], 0.0),
            Axis::new("sam_z", "omega", TransformationType::Translation, [0.0, 0.0, 1.0], 0.0),
            Axis::new("sam_y", "sam_z", TransformationType::Translation, [0.0, 1.0, 0.0], 0.0),
            Axis::new("sam_x", "sam_y", TransformationType::Translation, [1.0, 0.0, 0.0], 0.0),
        ]
    }

    fn goniometer(axes: Vec<Axis>) -> Goniometer {
        Goniometer::new(AxisChain::new(axes).unwrap())
    }

    #[test]
    fn test_rotation_scan_from_axes() {
        let mut axes = i24_axes();
        axes[0] = axes[0].clone().with_scan(0.1, 10);
        let scan = goniometer(axes)
            .define_scan(None, ScanDirection::Positive)
            .unwrap();
        assert!(scan.grid.is_none());
        let omega = scan.oscillation.get("omega").unwrap();
        assert_eq!(omega.len(), 10);
        assert_relative_eq!(omega[9], 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_reverse_rotation_scan() {
        let mut axes = i24_axes();
        axes[0] = axes[0].clone().with_scan(0.1, 10);
        let scan = goniometer(axes)
            .define_scan(None, ScanDirection::Negative)
            .unwrap();
        let omega = scan.oscillation.get("omega").unwrap();
        assert_relative_eq!(omega[1], -0.1, epsilon = 1e-12);
        assert_relative_eq!(omega[9], -0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_scan_holds_oscillation_axis() {
        let mut axes = i24_axes();
        axes[2] = axes[2].clone().with_scan(0.1, 10);
        axes[3] = axes[3].clone().with_scan(0.1, 10);
        let scan = goniometer(axes)
            .define_scan(None, ScanDirection::Positive)
            .unwrap();
        assert_eq!(scan.oscillation.get("omega").unwrap(), &[0.0; 100]);
        let grid = scan.grid.unwrap();
        let sam_y = grid.get("sam_y").unwrap();
        assert_eq!(sam_y.len(), 100);
        assert_relative_eq!(sam_y[0], 0.0);
        assert_relative_eq!(sam_y[99], 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_scan_spreads_moving_rotation() {
        let mut axes = i24_axes();
        axes[0] = axes[0].clone().with_scan(1.0, 4);
        axes[2] = axes[2].clone().with_scan(0.1, 2);
        axes[3] = axes[3].clone().with_scan(0.1, 2);
        let scan = goniometer(axes)
            .define_scan(None, ScanDirection::Positive)
            .unwrap();
        let omega = scan.oscillation.get("omega").unwrap();
        assert_eq!(omega.len(), 4);
        for (got, want) in omega.iter().zip([0.0, 1.0, 2.0, 3.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        assert_eq!(scan.grid.unwrap().len(), 4);
    }

    #[test]
    fn test_grid_options_choose_order_and_snaking() {
        let mut axes = i24_axes();
        axes[2] = axes[2].clone().with_scan(0.1, 2);
        axes[3] = axes[3].clone().with_scan(0.2, 3);
        let options = GridScanOptions {
            axes_order: ("sam_x".into(), "sam_y".into()),
            snaked: false,
        };
        let scan = goniometer(axes)
            .define_scan(Some(&options), ScanDirection::Positive)
            .unwrap();
        let grid = scan.grid.unwrap();
        assert_eq!(grid.names().collect::<Vec<_>>(), vec!["sam_x", "sam_y"]);
        assert_eq!(grid.len(), 6);
        let sam_y = grid.get("sam_y").unwrap();
        assert_relative_eq!(sam_y[2], 0.0);
    }

    #[test]
    fn test_recorded_rotation_scan_updates_axis() {
        let scan = ScanPoints::single("omega", vec![10.0, 10.5, 11.0, 11.5]);
        let gonio = goniometer(i24_axes()).with_scan(scan.clone()).unwrap();
        let omega = gonio.axes().get("omega").unwrap();
        assert_relative_eq!(omega.start_pos, 10.0);
        assert_relative_eq!(omega.increment, 0.5);
        assert_eq!(omega.num_steps, 4);

        let defined = gonio.define_scan(None, ScanDirection::Positive).unwrap();
        assert_eq!(defined.oscillation, scan);
        assert!(defined.grid.is_none());
        assert_eq!(gonio.number_of_scan_points().unwrap(), 4);
    }

    #[test]
    fn test_recorded_reverse_scan_keeps_collection_order() {
        let scan = ScanPoints::single("omega", vec![5.0, 4.9, 4.8]);
        let gonio = goniometer(i24_axes()).with_scan(scan).unwrap();
        let omega = gonio.axes().get("omega").unwrap();
        assert_relative_eq!(omega.start_pos, 5.0);
        assert_relative_eq!(omega.increment, -0.1);
    }

    #[test]
    fn test_recorded_grid_scan() {
        let scan = ScanPoints::new(vec![
            AxisPositions::new("sam_y", vec![0.0, 0.0, 0.1, 0.1]),
            AxisPositions::new("sam_x", vec![0.0, 0.2, 0.2, 0.0]),
        ])
        .unwrap();
        let gonio = goniometer(i24_axes()).with_scan(scan).unwrap();
        let sam_x = gonio.axes().get("sam_x").unwrap();
        assert_eq!(sam_x.num_steps, 2);
        assert_relative_eq!(sam_x.increment, 0.2);

        let defined = gonio.define_scan(None, ScanDirection::Positive).unwrap();
        assert_eq!(defined.oscillation.get("omega").unwrap(), &[0.0; 4]);
        assert_eq!(defined.grid.unwrap().len(), 4);
    }

    #[test]
    fn test_recorded_scan_with_unknown_axis() {
        let scan = ScanPoints::single("kappa", vec![0.0, 1.0]);
        assert!(matches!(
            goniometer(i24_axes()).with_scan(scan),
            Err(Error::AxisNotFound(_))
        ));
    }

    #[test]
    fn test_event_mode_scan() {
        let mut axes = i24_axes();
        axes[0] = axes[0].clone().with_scan(0.1, 1800);
        let gonio = goniometer(axes);
        let event = gonio.define_event_mode_scan(None).unwrap();
        assert_eq!(event.axis, "omega");
        assert_relative_eq!(event.range.0, 0.0);
        assert_relative_eq!(event.range.1, 179.9, epsilon = 1e-9);

        let event = gonio.define_event_mode_scan(Some(90.0)).unwrap();
        assert_relative_eq!(event.range.1, 90.0);
    }

    #[test]
    fn test_oscillation_axis_defaults() {
        let gonio = goniometer(i24_axes());
        assert_eq!(gonio.oscillation_axis().unwrap(), "omega");

        let axes = vec![
            Axis::new("chi", ROOT, TransformationType::Rotation, [0.0, 0.0, -1.0], 0.0),
            Axis::new("phi", "chi", TransformationType::Rotation, [0.0, 0.0, -1.0], 0.0),
        ];
        let gonio = goniometer(axes);
        assert_eq!(gonio.oscillation_axis().unwrap(), "omega");
        assert!(matches!(
            gonio.define_scan(None, ScanDirection::Positive),
            Err(Error::AxisNotFound(_))
        ));
    }
}

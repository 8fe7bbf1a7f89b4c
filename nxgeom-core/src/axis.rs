//! Motion axes for goniometers and detectors.

use crate::error::{Error, Result};
use crate::point::Vector3;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name of the sentinel root every axis chain terminates at.
pub const ROOT: &str = ".";

/// Kind of transformation an axis applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TransformationType {
    /// Rotation about the axis vector, in degrees.
    Rotation,
    /// Translation along the axis vector, in millimetres.
    Translation,
}

impl TransformationType {
    /// Lowercase name used in NeXus `transformation_type` attributes.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rotation => "rotation",
            Self::Translation => "translation",
        }
    }

    /// Units of positions along an axis of this kind.
    #[must_use]
    pub fn units(self) -> &'static str {
        match self {
            Self::Rotation => "deg",
            Self::Translation => "mm",
        }
    }
}

impl fmt::Display for TransformationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rotation" => Ok(Self::Rotation),
            "translation" => Ok(Self::Translation),
            other => Err(Error::Configuration(format!(
                "unknown transformation type '{other}', expected rotation or translation"
            ))),
        }
    }
}

/// One motion degree of freedom in a kinematic chain.
///
/// `depends_on` is a name resolved through the owning chain, never a link to
/// another `Axis` value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Axis {
    /// Unique axis name.
    pub name: String,
    /// Name of the axis this one sits on, or [`ROOT`].
    pub depends_on: String,
    /// Rotation or translation.
    pub kind: TransformationType,
    /// Axis direction.
    pub vector: Vector3,
    /// Position at the first frame.
    pub start_pos: f64,
    /// Step per frame; zero for a static axis.
    pub increment: f64,
    /// Number of scan points.
    pub num_steps: usize,
    /// Offset of the axis origin.
    pub offset: Vector3,
}

impl Axis {
    /// Creates a static axis.
    pub fn new(
        name: impl Into<String>,
        depends_on: impl Into<String>,
        kind: TransformationType,
        vector: impl Into<Vector3>,
        start_pos: f64,
    ) -> Self {
        Self {
            name: name.into(),
            depends_on: depends_on.into(),
            kind,
            vector: vector.into(),
            start_pos,
            increment: 0.0,
            num_steps: 1,
            offset: Vector3::zero(),
        }
    }

    /// Sets the scan increment and number of steps.
    #[must_use]
    pub fn with_scan(mut self, increment: f64, num_steps: usize) -> Self {
        self.increment = increment;
        self.num_steps = num_steps;
        self
    }

    /// Sets the axis offset.
    #[must_use]
    pub fn with_offset(mut self, offset: impl Into<Vector3>) -> Self {
        self.offset = offset.into();
        self
    }

    /// Units of the axis positions: `deg` or `mm`.
    #[must_use]
    pub fn units(&self) -> &'static str {
        self.kind.units()
    }

    /// True when the axis moves during the collection.
    #[must_use]
    pub fn is_scan(&self) -> bool {
        self.increment != 0.0
    }

    /// True when the axis sits directly on the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.depends_on == ROOT
    }

    /// Position at the last scan point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn end_pos(&self) -> f64 {
        if !self.is_scan() {
            return self.start_pos;
        }
        let last = self.num_steps.saturating_sub(1) as f64;
        self.start_pos + self.increment * last
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} => {} on {}",
            self.name,
            self.start_pos,
            self.units(),
            self.kind,
            self.depends_on
        )
    }
}

/// Builds an axis from loosely typed configuration values.
///
/// # Errors
/// Returns [`Error::Configuration`] if `kind` is not a recognised
/// transformation type, the name is empty, or `num_steps` is zero.
pub fn build_axis(
    name: &str,
    depends_on: &str,
    kind: &str,
    vector: impl Into<Vector3>,
    start_pos: f64,
    increment: f64,
    num_steps: usize,
) -> Result<Axis> {
    let kind = kind.parse::<TransformationType>()?;
    if name.trim().is_empty() {
        return Err(Error::Configuration("axis name must not be empty".into()));
    }
    if num_steps == 0 {
        return Err(Error::Configuration(format!(
            "axis '{name}' must have at least one step"
        )));
    }
    Ok(Axis::new(name, depends_on, kind, vector, start_pos).with_scan(increment, num_steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_units_follow_kind() {
        let omega = Axis::new("omega", ROOT, TransformationType::Rotation, [0.0, 0.0, -1.0], -90.0);
        let sam_x = Axis::new("sam_x", "omega", TransformationType::Translation, (1.0, 0.0, 0.0), 0.0);
        assert_eq!(omega.units(), "deg");
        assert_eq!(sam_x.units(), "mm");
        assert!(omega.is_root());
        assert!(!sam_x.is_root());
    }

    #[test]
    fn test_axis_end_pos() {
        let still = Axis::new("omega", ROOT, TransformationType::Rotation, [0.0, 0.0, -1.0], -90.0);
        assert!(!still.is_scan());
        assert_relative_eq!(still.end_pos(), -90.0);

        let moving = Axis::new("sam_x", "omega", TransformationType::Translation, [1.0, 0.0, 0.0], 0.0)
            .with_scan(0.1, 11);
        assert!(moving.is_scan());
        assert_relative_eq!(moving.end_pos(), 1.0);
    }

    #[test]
    fn test_build_axis_parses_kind() {
        let axis = build_axis("phi", "omega", "Rotation", [0.0, 0.0, -1.0], 180.0, 0.0, 1).unwrap();
        assert_eq!(axis.kind, TransformationType::Rotation);
        assert_eq!(axis.vector, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_build_axis_rejects_unknown_kind() {
        let err = build_axis("phi", "omega", "wobble", [0.0, 0.0, 1.0], 0.0, 0.0, 1).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_build_axis_rejects_zero_steps() {
        let err = build_axis("phi", "omega", "rotation", [0.0, 0.0, 1.0], 0.0, 0.1, 0).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}

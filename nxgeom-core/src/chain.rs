//! Kinematic chains of axes and scan-axis identification.
//!
//! A chain is validated once at construction: every `depends_on` must name
//! another axis in the chain or the root, and following the dependencies from
//! any axis must reach the root in at most `len()` hops.

use crate::axis::{Axis, TransformationType, ROOT};
use crate::convention::CoordinateConvention;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Validated, root-terminated sequence of axes.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisChain {
    axes: Vec<Axis>,
    index: HashMap<String, usize>,
}

impl AxisChain {
    /// Builds and validates a chain.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for duplicate axis names and
    /// [`Error::Dependency`] for dangling or cyclic dependencies.
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        let index = build_index(&axes)?;
        check_dependencies(&axes, &index)?;
        log::debug!("validated axis chain of {} axes", axes.len());
        Ok(Self { axes, index })
    }

    /// Axes in insertion order.
    #[must_use]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Consumes the chain and returns its axes.
    #[must_use]
    pub fn into_axes(self) -> Vec<Axis> {
        self.axes
    }

    /// Number of axes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    /// True if the chain has no axes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Position of the named axis in insertion order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Looks up an axis by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Axis> {
        self.position(name).map(|i| &self.axes[i])
    }

    /// Names from `name` down to the root, starting with `name` itself.
    ///
    /// # Errors
    /// Returns [`Error::Dependency`] if `name` is not in the chain.
    pub fn dependency_path(&self, name: &str) -> Result<Vec<&str>> {
        let mut current = self
            .get(name)
            .ok_or_else(|| Error::Dependency(format!("axis '{name}' not found in chain")))?;
        let mut path = vec![current.name.as_str()];
        // Validated at construction, so this terminates.
        while !current.is_root() {
            current = &self.axes[self.index[current.depends_on.as_str()]];
            path.push(current.name.as_str());
        }
        Ok(path)
    }

    /// The rotation axis that moves during the collection.
    ///
    /// # Errors
    /// See [`identify_scan_axis`].
    pub fn scan_axis<'a>(&'a self, default: Option<&'a str>) -> Result<Option<&'a str>> {
        identify_scan_axis(&self.axes, default)
    }

    /// Translation axes that move during the collection.
    ///
    /// # Errors
    /// See [`identify_grid_axes`].
    pub fn grid_axes(&self) -> Result<Vec<&str>> {
        identify_grid_axes(&self.axes)
    }

    /// Returns a copy with every axis vector and offset expressed in McStas.
    #[must_use]
    pub fn to_mcstas(&self, convention: &CoordinateConvention) -> Self {
        let axes = self
            .axes
            .iter()
            .map(|axis| {
                let mut axis = axis.clone();
                axis.vector = convention.convert(&axis.vector);
                axis.offset = convention.convert(&axis.offset);
                axis
            })
            .collect();
        Self {
            axes,
            index: self.index.clone(),
        }
    }
}

fn build_index(axes: &[Axis]) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(axes.len());
    for (i, axis) in axes.iter().enumerate() {
        if axis.name == ROOT {
            return Err(Error::Configuration(format!(
                "'{ROOT}' is reserved for the chain root"
            )));
        }
        if index.insert(axis.name.clone(), i).is_some() {
            return Err(Error::Configuration(format!(
                "duplicate axis name '{}'",
                axis.name
            )));
        }
    }
    Ok(index)
}

fn check_dependencies(axes: &[Axis], index: &HashMap<String, usize>) -> Result<()> {
    for axis in axes {
        if axis.depends_on != ROOT && !index.contains_key(&axis.depends_on) {
            return Err(Error::Dependency(format!(
                "axis '{}' depends on unknown axis '{}'",
                axis.name, axis.depends_on
            )));
        }
    }

    for axis in axes {
        let mut current = axis;
        let mut hops = 0usize;
        while !current.is_root() {
            if hops == axes.len() {
                return Err(Error::Dependency(format!(
                    "axis '{}' does not reach '{ROOT}' within {} steps",
                    axis.name,
                    axes.len()
                )));
            }
            current = &axes[index[current.depends_on.as_str()]];
            hops += 1;
        }
    }
    Ok(())
}

/// Validates a set of axes as a root-terminated dependency tree.
///
/// # Errors
/// Returns [`Error::Dependency`] if a `depends_on` is neither the root nor
/// another axis in the set, or if the dependencies form a cycle.
pub fn validate_chain(axes: &[Axis]) -> Result<()> {
    let index = build_index(axes)?;
    check_dependencies(axes, &index)
}

/// Identifies the moving rotation axis.
///
/// Returns the unique rotation axis with a non-zero increment. With no
/// moving rotation axis the `default` name is returned, or `None` for a
/// still collection.
///
/// # Errors
/// Returns [`Error::Configuration`] for an empty axis list and
/// [`Error::AmbiguousScanAxis`] if more than one rotation axis moves.
pub fn identify_scan_axis<'a>(
    axes: &'a [Axis],
    default: Option<&'a str>,
) -> Result<Option<&'a str>> {
    if axes.is_empty() {
        return Err(Error::Configuration(
            "no axes passed, impossible to determine the rotation scan axis".into(),
        ));
    }
    let mut moving = axes
        .iter()
        .filter(|ax| ax.kind == TransformationType::Rotation && ax.is_scan());
    let Some(first) = moving.next() else {
        return Ok(default);
    };
    if let Some(second) = moving.next() {
        return Err(Error::AmbiguousScanAxis(format!(
            "rotation axes '{}' and '{}' both move",
            first.name, second.name
        )));
    }
    Ok(Some(first.name.as_str()))
}

/// Identifies the moving translation axes of a line or grid scan.
///
/// The result keeps chain order and holds at most two names.
///
/// # Errors
/// Returns [`Error::Configuration`] for an empty axis list or if more than
/// two translation axes move.
pub fn identify_grid_axes(axes: &[Axis]) -> Result<Vec<&str>> {
    if axes.is_empty() {
        return Err(Error::Configuration(
            "no axes passed, impossible to determine the translation scan".into(),
        ));
    }
    let grid: Vec<&str> = axes
        .iter()
        .filter(|ax| ax.kind == TransformationType::Translation && ax.is_scan())
        .map(|ax| ax.name.as_str())
        .collect();
    if grid.len() > 2 {
        return Err(Error::Configuration(format!(
            "at most two translation axes can move, found {}: {}",
            grid.len(),
            grid.join(", ")
        )));
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Vector3;

    fn i24_axes() -> Vec<Axis> {
        vec![
            Axis::new("omega", ROOT, TransformationType::Rotation, [0.0, 0.0, -1.0], 0.0),
            Axis::new("sam_z", "omega", TransformationType::Translation, [0.0, 0.0, 1.0], 0.0),
            Axis::new("sam_y", "sam_z", TransformationType::Translation, [0.0, 1.0, 0.0], 0.0),
            Axis::new("sam_x", "sam_y", TransformationType::Translation, [1.0, 0.0, 0.0], 0.0),
        ]
    }

    #[test]
    fn test_valid_chain_reaches_root() {
        let chain = AxisChain::new(i24_axes()).unwrap();
        for axis in chain.axes() {
            let path = chain.dependency_path(&axis.name).unwrap();
            assert!(path.len() <= chain.len());
            assert!(chain.get(path[path.len() - 1]).unwrap().is_root());
        }
        assert_eq!(
            chain.dependency_path("sam_x").unwrap(),
            vec!["sam_x", "sam_y", "sam_z", "omega"]
        );
    }

    #[test]
    fn test_dangling_dependency_is_rejected() {
        let mut axes = i24_axes();
        axes[1].depends_on = "kappa".into();
        assert!(matches!(validate_chain(&axes), Err(Error::Dependency(_))));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut axes = i24_axes();
        axes[0].depends_on = "sam_x".into();
        assert!(matches!(AxisChain::new(axes), Err(Error::Dependency(_))));
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let axes = vec![Axis::new(
            "phi",
            "phi",
            TransformationType::Rotation,
            [1.0, 0.0, 0.0],
            0.0,
        )];
        assert!(matches!(validate_chain(&axes), Err(Error::Dependency(_))));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut axes = i24_axes();
        axes[2].name = "sam_x".into();
        assert!(matches!(validate_chain(&axes), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_identify_scan_axis() {
        let axes = vec![
            Axis::new("chi", ROOT, TransformationType::Rotation, [0.0, 0.0, -1.0], -90.0)
                .with_scan(0.1, 100),
            Axis::new("phi", "chi", TransformationType::Rotation, [0.0, 0.0, -1.0], 180.0),
        ];
        assert_eq!(identify_scan_axis(&axes, None).unwrap(), Some("chi"));
    }

    #[test]
    fn test_identify_scan_axis_for_still_collection() {
        let axes = i24_axes();
        assert_eq!(identify_scan_axis(&axes, None).unwrap(), None);
        assert_eq!(
            identify_scan_axis(&axes, Some("omega")).unwrap(),
            Some("omega")
        );
    }

    #[test]
    fn test_identify_scan_axis_fails_for_two_moving_rotations() {
        let axes = vec![
            Axis::new("chi", ROOT, TransformationType::Rotation, [0.0, 0.0, -1.0], -90.0)
                .with_scan(0.1, 100),
            Axis::new("phi", "chi", TransformationType::Rotation, [0.0, 0.0, -1.0], 180.0)
                .with_scan(0.5, 50),
        ];
        assert!(matches!(
            identify_scan_axis(&axes, None),
            Err(Error::AmbiguousScanAxis(_))
        ));
    }

    #[test]
    fn test_identify_axes_fail_for_empty_list() {
        assert!(matches!(
            identify_scan_axis(&[], None),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(identify_grid_axes(&[]), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_identify_grid_axes() {
        let mut axes = i24_axes();
        assert!(identify_grid_axes(&axes).unwrap().is_empty());

        axes[2] = axes[2].clone().with_scan(0.1, 10);
        axes[3] = axes[3].clone().with_scan(0.2, 5);
        assert_eq!(identify_grid_axes(&axes).unwrap(), vec!["sam_y", "sam_x"]);

        axes[1] = axes[1].clone().with_scan(0.1, 2);
        assert!(matches!(
            identify_grid_axes(&axes),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_to_mcstas_converts_vectors_and_offsets() {
        let axes = vec![Axis::new(
            "omega",
            ROOT,
            TransformationType::Rotation,
            [1.0, 0.0, 0.0],
            0.0,
        )
        .with_offset([0.0, 0.0, 2.0])];
        let chain = AxisChain::new(axes).unwrap();
        let converted = chain.to_mcstas(&CoordinateConvention::ImgCif);
        assert_eq!(converted.axes()[0].vector, Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(converted.axes()[0].offset, Vector3::new(0.0, 0.0, -2.0));
        assert_eq!(converted.position("omega"), Some(0));
    }
}

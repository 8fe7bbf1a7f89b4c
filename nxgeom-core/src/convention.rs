//! Coordinate conventions and conversion to the NeXus McStas frame.

use crate::error::{Error, Result};
use crate::point::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance on unit length and orthogonality of a custom basis.
pub const BASIS_TOLERANCE: f64 = 1e-6;

/// Name of the canonical NeXus convention.
pub const MCSTAS: &str = "mcstas";

/// Name of the imgCIF/CBF convention.
pub const IMGCIF: &str = "imgcif";

/// User-defined coordinate frame: an origin and three orthonormal directions
/// expressed in McStas coordinates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordinateFrame {
    name: String,
    origin: Vector3,
    basis: [Vector3; 3],
}

impl CoordinateFrame {
    /// Creates a frame and checks its basis is orthonormal.
    ///
    /// # Errors
    /// Returns [`Error::MalformedBasis`] if any direction is not unit length
    /// or the directions are not mutually orthogonal within
    /// [`BASIS_TOLERANCE`].
    pub fn new(name: impl Into<String>, origin: Vector3, basis: [Vector3; 3]) -> Result<Self> {
        let name = name.into();
        for (label, v) in ["x", "y", "z"].iter().zip(basis.iter()) {
            let norm = v.norm();
            if (norm - 1.0).abs() > BASIS_TOLERANCE {
                return Err(Error::MalformedBasis(format!(
                    "{label} direction of '{name}' has length {norm}, expected 1"
                )));
            }
        }
        let pairs = [(0, 1, "x", "y"), (0, 2, "x", "z"), (1, 2, "y", "z")];
        for (i, j, a, b) in pairs {
            let dot = basis[i].dot(&basis[j]);
            if dot.abs() > BASIS_TOLERANCE {
                return Err(Error::MalformedBasis(format!(
                    "{a} and {b} directions of '{name}' are not orthogonal (dot = {dot})"
                )));
            }
        }
        Ok(Self {
            name,
            origin,
            basis,
        })
    }

    /// Convention name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame origin.
    #[must_use]
    pub fn origin(&self) -> Vector3 {
        self.origin
    }

    /// Basis directions (x, y, z).
    #[must_use]
    pub fn basis(&self) -> &[Vector3; 3] {
        &self.basis
    }

    /// Rotation taking vectors in this frame to McStas.
    #[must_use]
    pub fn matrix(&self) -> Matrix3 {
        Matrix3::from_rows(self.basis[0], self.basis[1], self.basis[2])
    }
}

/// Convention in which geometry vectors are supplied.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoordinateConvention {
    /// NeXus McStas, the output convention.
    #[default]
    McStas,
    /// imgCIF/CBF: x and z point the opposite way to McStas.
    ImgCif,
    /// Explicitly defined frame.
    Custom(CoordinateFrame),
}

impl CoordinateConvention {
    /// Resolves a convention by name, using `frame` for anything that is not
    /// built in.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if a custom name is given without a
    /// frame, or if the frame's name does not match.
    pub fn resolve(name: &str, frame: Option<CoordinateFrame>) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            MCSTAS => Ok(Self::McStas),
            IMGCIF => Ok(Self::ImgCif),
            _ => match frame {
                Some(frame) if frame.name() == name => Ok(Self::Custom(frame)),
                Some(frame) => Err(Error::Configuration(format!(
                    "coordinate frame '{name}' does not match the supplied basis convention '{}'",
                    frame.name()
                ))),
                None => Err(Error::Configuration(format!(
                    "coordinate frame '{name}' needs an origin and basis definition"
                ))),
            },
        }
    }

    /// Convention name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::McStas => MCSTAS,
            Self::ImgCif => IMGCIF,
            Self::Custom(frame) => frame.name(),
        }
    }

    /// Matrix taking vectors in this convention to McStas.
    #[must_use]
    pub fn matrix(&self) -> Matrix3 {
        match self {
            Self::McStas => Matrix3::identity(),
            Self::ImgCif => Matrix3::diagonal(-1.0, 1.0, -1.0),
            Self::Custom(frame) => frame.matrix(),
        }
    }

    /// Expresses `v` in McStas coordinates.
    #[must_use]
    pub fn convert(&self, v: &Vector3) -> Vector3 {
        match self {
            Self::McStas => *v,
            Self::ImgCif => Vector3::new(-v.x, v.y, -v.z),
            Self::Custom(frame) => frame.matrix().apply(v),
        }
    }
}

/// Expresses `v` in McStas coordinates.
#[must_use]
pub fn convert(v: &Vector3, convention: &CoordinateConvention) -> Vector3 {
    convention.convert(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [[f64; 3]; 4] = [
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.3, -2.5, 7.0],
        [-0.001, 1e6, -4.2],
    ];

    #[test]
    fn test_mcstas_is_identity() {
        for s in SAMPLES {
            let v = Vector3::from(s);
            assert_eq!(convert(&v, &CoordinateConvention::McStas), v);
        }
    }

    #[test]
    fn test_imgcif_basis_vectors() {
        let cif = CoordinateConvention::ImgCif;
        assert_eq!(
            cif.convert(&Vector3::new(1.0, 0.0, 0.0)),
            Vector3::new(-1.0, 0.0, 0.0)
        );
        assert_eq!(
            cif.convert(&Vector3::new(0.0, 1.0, 0.0)),
            Vector3::new(0.0, 1.0, 0.0)
        );
        assert_eq!(
            cif.convert(&Vector3::new(0.0, 0.0, 1.0)),
            Vector3::new(0.0, 0.0, -1.0)
        );
    }

    #[test]
    fn test_imgcif_is_self_inverse() {
        let cif = CoordinateConvention::ImgCif;
        for s in SAMPLES {
            let v = Vector3::from(s);
            assert_eq!(cif.convert(&cif.convert(&v)), v);
        }
        assert_eq!(cif.convert(&Vector3::from(SAMPLES[2])), cif.matrix().apply(&Vector3::from(SAMPLES[2])));
    }

    #[test]
    fn test_custom_frame_rotates_into_mcstas() {
        // x and y swapped, z flipped: a proper rotation about the x=y diagonal.
        let frame = CoordinateFrame::new(
            "swapped",
            Vector3::zero(),
            [
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, -1.0),
            ],
        )
        .unwrap();
        let conv = CoordinateConvention::resolve("swapped", Some(frame)).unwrap();
        assert_eq!(
            conv.convert(&Vector3::new(1.0, 2.0, 3.0)),
            Vector3::new(2.0, 1.0, -3.0)
        );
        assert_eq!(conv.name(), "swapped");
    }

    #[test]
    fn test_non_orthonormal_basis_is_rejected() {
        let err = CoordinateFrame::new(
            "bad",
            Vector3::zero(),
            [
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.5, 0.5, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedBasis(_)));

        let err = CoordinateFrame::new(
            "long",
            Vector3::zero(),
            [
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedBasis(_)));
    }

    #[test]
    fn test_unknown_convention_without_basis() {
        assert_eq!(
            CoordinateConvention::resolve("McStas", None).unwrap(),
            CoordinateConvention::McStas
        );
        assert!(matches!(
            CoordinateConvention::resolve("diffractometer", None),
            Err(Error::Configuration(_))
        ));
    }
}

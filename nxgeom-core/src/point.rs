//! Fixed-size 3-vectors and 3x3 matrices.

use std::ops::{Add, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction or offset in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[f64; 3]", into = "[f64; 3]"))]
pub struct Vector3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vector3 {
    /// Creates a new vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Euclidean length.
    #[inline]
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let n = self.norm();
        if !n.is_normal() {
            return None;
        }
        Some(*self * (1.0 / n))
    }

    /// Returns the components as an array.
    #[inline]
    #[must_use]
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<(f64, f64, f64)> for Vector3 {
    fn from(v: (f64, f64, f64)) -> Self {
        Self::new(v.0, v.1, v.2)
    }
}

impl From<Vector3> for [f64; 3] {
    fn from(v: Vector3) -> Self {
        v.to_array()
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Row-major 3x3 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Matrix3 {
    /// Matrix rows.
    pub rows: [[f64; 3]; 3],
}

impl Matrix3 {
    /// The identity matrix.
    #[must_use]
    pub const fn identity() -> Self {
        Self::diagonal(1.0, 1.0, 1.0)
    }

    /// A diagonal matrix.
    #[must_use]
    pub const fn diagonal(a: f64, b: f64, c: f64) -> Self {
        Self {
            rows: [[a, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, c]],
        }
    }

    /// Builds a matrix whose rows are the given vectors.
    #[must_use]
    pub fn from_rows(r0: Vector3, r1: Vector3, r2: Vector3) -> Self {
        Self {
            rows: [r0.to_array(), r1.to_array(), r2.to_array()],
        }
    }

    /// Returns row `i` as a vector.
    #[must_use]
    pub fn row(&self, i: usize) -> Vector3 {
        Vector3::from(self.rows[i])
    }

    /// Multiplies a column vector by this matrix.
    #[inline]
    #[must_use]
    pub fn apply(&self, v: &Vector3) -> Vector3 {
        Vector3::new(
            self.row(0).dot(v),
            self.row(1).dot(v),
            self.row(2).dot(v),
        )
    }

    /// Transposed matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let r = &self.rows;
        Self {
            rows: [
                [r[0][0], r[1][0], r[2][0]],
                [r[0][1], r[1][1], r[2][1]],
                [r[0][2], r[1][2], r[2][2]],
            ],
        }
    }

    /// Checks that the rows are unit length and mutually orthogonal.
    #[must_use]
    pub fn is_orthonormal(&self, tolerance: f64) -> bool {
        let rows = [self.row(0), self.row(1), self.row(2)];
        let unit = rows.iter().all(|r| (r.norm() - 1.0).abs() <= tolerance);
        let orthogonal = rows[0].dot(&rows[1]).abs() <= tolerance
            && rows[0].dot(&rows[2]).abs() <= tolerance
            && rows[1].dot(&rows[2]).abs() <= tolerance;
        unit && orthogonal
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Matrix3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let cols = rhs.transpose();
        let mut rows = [[0.0; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.row(i).dot(&cols.row(j));
            }
        }
        Self { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_arithmetic() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(-1.0, 0.5, 2.0);
        assert_eq!(a + b, Vector3::new(0.0, 2.5, 5.0));
        assert_eq!(a - b, Vector3::new(2.0, 1.5, 1.0));
        assert_eq!(-a, Vector3::new(-1.0, -2.0, -3.0));
        assert_relative_eq!(a.dot(&b), 6.0);
    }

    #[test]
    fn test_vector_normalized() {
        let v = Vector3::new(3.0, 0.0, 4.0);
        let n = v.normalized().unwrap();
        assert_relative_eq!(n.norm(), 1.0);
        assert_relative_eq!(n.x, 0.6);
        assert!(Vector3::zero().normalized().is_none());
    }

    #[test]
    fn test_cross_product_is_right_handed() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_matrix_apply_and_orthonormality() {
        let flip = Matrix3::diagonal(-1.0, 1.0, -1.0);
        let v = flip.apply(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(v, Vector3::new(-1.0, 2.0, -3.0));
        assert!(flip.is_orthonormal(1e-9));
        assert_eq!(flip * flip, Matrix3::identity());

        let skewed = Matrix3::from_rows(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        assert!(!skewed.is_orthonormal(1e-6));
    }
}

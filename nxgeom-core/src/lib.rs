//! nxgeom-core: Geometry primitives for NXmx diffraction metadata.
//!
//! This crate provides axes and kinematic chains, coordinate conventions
//! with conversion to the NeXus McStas frame, and detector descriptions.
//!

pub mod axis;
pub mod chain;
pub mod convention;
pub mod detector;
pub mod error;
pub mod point;

pub use axis::{build_axis, Axis, TransformationType, ROOT};
pub use chain::{identify_grid_axes, identify_scan_axis, validate_chain, AxisChain};
pub use convention::{convert, CoordinateConvention, CoordinateFrame};
pub use detector::{
    calculate_origin, Detector, DetectorKind, DetectorMode, DetectorModule, DetectorParams,
    OriginMode, SensorMaterial,
};
pub use error::{Error, Result};
pub use point::{Matrix3, Vector3};

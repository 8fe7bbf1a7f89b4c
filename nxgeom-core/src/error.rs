//! Error types for nxgeom-core.

use thiserror::Error;

/// Result type alias for geometry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for axis, convention and detector validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed axis kind, missing parameter or unresolved convention.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Axis chain does not terminate at the root or names an unknown axis.
    #[error("dependency error: {0}")]
    Dependency(String),

    /// More than one rotation axis moves, or none where one was required.
    #[error("ambiguous scan axis: {0}")]
    AmbiguousScanAxis(String),

    /// Custom coordinate basis is not orthonormal.
    #[error("malformed coordinate basis: {0}")]
    MalformedBasis(String),

    /// Detector description does not match any supported detector.
    #[error("unknown detector type: {0}")]
    UnknownDetector(String),
}

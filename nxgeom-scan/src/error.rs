//! Scan-specific error types.

use thiserror::Error;

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Scan-specific error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Inconsistent or missing scan parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A requested axis is not part of the goniometer.
    #[error("axis '{0}' not found in goniometer axes")]
    AxisNotFound(String),

    /// Chip map names a block that does not exist on the chip.
    #[error("invalid chip map: {0}")]
    InvalidChipMap(String),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] nxgeom_core::Error),
}

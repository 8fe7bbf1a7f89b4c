//! Virtual dataset error types.

use thiserror::Error;

/// Result type for virtual dataset planning.
pub type Result<T> = std::result::Result<T, Error>;

/// Virtual dataset error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Requested frames are not all backed by a dataset.
    #[error("frame range starting at {start} with {count} frames exceeds the {capacity} frames available")]
    OutOfRange {
        /// Requested first global frame.
        start: i64,
        /// Requested number of frames.
        count: usize,
        /// Total frames across all backing datasets.
        capacity: usize,
    },

    /// No fragments to lay out.
    #[error("cannot build a virtual layout from no fragments")]
    EmptyLayout,

    /// Malformed backing dataset or fragment.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// Unrecognised element type name.
    #[error("unknown data type: {0}")]
    UnknownDataType(String),
}

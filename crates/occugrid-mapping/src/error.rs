//! This module defines the error types used by the `occugrid-mapping` crate.

#![warn(missing_docs)]

use std::path::PathBuf;

/// Error type for mapping operations.
///
/// Out-of-range cell access is not an error: reads return
/// `None` and writes are dropped. Errors are reserved for invalid grid
/// shapes and for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// Error for invalid grid dimensions.
    /// Returned when a width or height would be zero, negative, or overflow.
    #[error("Invalid map dimensions: {0}")]
    InvalidDimensions(&'static str),
    /// The grid could not be written to `path`.
    #[error("Failed to record map to {}: {source}", path.display())]
    Record {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A recorded map file is malformed.
    #[error("Malformed map file at line {line}: {reason}")]
    Parse {
        /// One-based line number of the offending row.
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },
    /// Generic I/O failure while reading a recorded map.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

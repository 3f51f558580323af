//! Error types for the foundation layer.

use thiserror::Error;

/// Errors from property value construction and conversion.
#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    /// A conversion between property value variants failed.
    #[error("cannot convert {found} to {wanted}")]
    Conversion {
        /// The variant the caller asked for.
        wanted: &'static str,
        /// The variant actually held.
        found: &'static str,
    },

    /// A matrix was constructed with rows of unequal length.
    #[error("matrix is not rectangular: row {row} has {actual} cells, expected {expected}")]
    RaggedMatrix {
        /// Zero-based index of the offending row.
        row: usize,
        /// Cell count of the first row.
        expected: usize,
        /// Cell count of the offending row.
        actual: usize,
    },
}

/// Result alias for foundation type operations.
pub type TypeResult<T> = Result<T, TypeError>;

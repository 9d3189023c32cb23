//! Error types for the somgrid training engine.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for SOM operations.
#[derive(Error, Debug)]
pub enum SomError {
    /// A node was assembled without its coordinates or weights.
    #[error("Uninitialized state: {0}")]
    UninitializedState(String),

    /// Malformed construction or training parameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A vector did not have the dimensionality the grid expects.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The expected vector length.
        expected: usize,
        /// The length that was provided.
        actual: usize,
    },

    /// Multi-index or flat index addressing outside the topology.
    #[error("Index out of range: {index} >= {max}")]
    IndexOutOfRange {
        /// The index that was out of range.
        index: usize,
        /// The exclusive upper bound for this axis.
        max: usize,
    },

    /// A search was run on a grid without nodes.
    #[error("Grid has no nodes")]
    EmptyGrid,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Sample file could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Result type alias for SOM operations.
pub type Result<T> = std::result::Result<T, SomError>;

impl From<serde_json::Error> for SomError {
    fn from(err: serde_json::Error) -> Self {
        SomError::Serialization(err.to_string())
    }
}

impl SomError {
    /// Builds a [`SomError::DimensionMismatch`] unless the lengths agree.
    pub(crate) fn check_dim(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(SomError::DimensionMismatch { expected, actual })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dim() {
        assert!(SomError::check_dim(3, 3).is_ok());
        let err = SomError::check_dim(3, 2).unwrap_err();
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn test_index_out_of_range_message() {
        let err = SomError::IndexOutOfRange { index: 4, max: 3 };
        assert_eq!(err.to_string(), "Index out of range: 4 >= 3");
    }
}

//! Error types for vector math and linear solving.

use thiserror::Error;

/// Errors raised by the math layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    /// Vector too short to normalize.
    #[error("vector magnitude {0:e} is too small to unitize")]
    DegenerateVector(f64),

    /// Homogeneous point with a (near-)zero weight.
    #[error("homogeneous weight {0:e} is too close to zero")]
    ZeroWeight(f64),

    /// Zero row or vanishing pivot during LU decomposition.
    #[error("singular matrix: pivot {pivot:e} in column {column}")]
    SingularMatrix {
        /// Column being eliminated when the pivot vanished.
        column: usize,
        /// The offending pivot value.
        pivot: f64,
    },

    /// Tolerance values out of range or inconsistent.
    #[error("invalid tolerance: {0}")]
    InvalidTolerance(String),

    /// Matrix shapes do not agree.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Result type for math operations.
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::SingularMatrix {
            column: 2,
            pivot: 0.0,
        };
        assert!(format!("{err}").contains("column 2"));

        let err = MathError::DimensionMismatch("3x3 vs 4".into());
        assert_eq!(format!("{err}"), "dimension mismatch: 3x3 vs 4");
    }
}

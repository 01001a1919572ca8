//! Error types for plane and clipping routines.

use std::fmt;

use brl_kernel_math::MathError;
use thiserror::Error;

/// Why a set of planes has no single intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// The planes coincide (in either orientation).
    Coplanar,
    /// The planes are parallel but distinct.
    ParallelDistinct,
    /// The system has no unique solution point.
    NoPoint,
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Degeneracy::Coplanar => "planes are coplanar",
            Degeneracy::ParallelDistinct => "planes are parallel and distinct",
            Degeneracy::NoPoint => "planes do not meet in a single point",
        };
        f.write_str(s)
    }
}

/// Errors raised by the geometry layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeomError {
    /// Coincident or collinear construction points.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Parallel or degenerate planes.
    #[error("no unique intersection: {0}")]
    NoUniqueIntersection(Degeneracy),

    /// A plane whose normal is not unit length.
    #[error("plane normal is not unit length (|n|^2 = {0})")]
    NotUnitNormal(f64),

    /// Failure in the underlying math layer.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GeomError::NoUniqueIntersection(Degeneracy::ParallelDistinct);
        assert_eq!(
            format!("{err}"),
            "no unique intersection: planes are parallel and distinct"
        );
    }
}

//! Error types for spline construction and evaluation.

use brl_kernel_math::MathError;
use thiserror::Error;

/// Errors raised by the spline layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NurbError {
    /// Parameter lies outside the knot vector's valid domain.
    #[error("parameter {value} outside knot domain [{lo}, {hi}]")]
    ParameterOutOfRange {
        /// Requested parameter.
        value: f64,
        /// Lower end of the domain.
        lo: f64,
        /// Upper end of the domain.
        hi: f64,
    },

    /// Knot vector is decreasing, non-finite, or the wrong length.
    #[error("invalid knot vector: {0}")]
    InvalidKnotVector(String),

    /// Control point mesh does not match the declared sizes.
    #[error("invalid control mesh: {0}")]
    InvalidMesh(String),

    /// Order too low for the requested operation.
    #[error("order {order} is too low, need at least {required}")]
    InsufficientOrder {
        /// Order of the curve or surface direction.
        order: usize,
        /// Minimum order the operation needs.
        required: usize,
    },

    /// Epsilon or tessellation parameters out of range.
    #[error("invalid tolerance: {0}")]
    InvalidTolerance(String),

    /// Failure in the underlying math layer.
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Result type for spline operations.
pub type Result<T> = std::result::Result<T, NurbError>;

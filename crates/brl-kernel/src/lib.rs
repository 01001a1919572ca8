#![warn(missing_docs)]

//! Facade over the BRL-CAD NURBS and plane numeric core.
//!
//! Re-exports the math, spline and plane crates and adds a unified
//! [`Error`] plus the clamped step computation a tessellator needs.
//!
//! # Example
//!
//! ```
//! use brl_kernel::nurbs::{KnotVector, SurfaceNurb};
//! use brl_kernel::math::Point3;
//!
//! let kv = KnotVector::new(vec![0.0, 0.0, 1.0, 1.0]).unwrap();
//! let pts = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//! ];
//! let srf = SurfaceNurb::from_points([2, 2], kv.clone(), kv, [2, 2], &pts).unwrap();
//! let p = srf.point_at(0.5, 0.5).unwrap();
//! assert!((p.x - 0.5).abs() < 1e-12);
//!
//! // A flat patch needs no subdivision, so the step is the whole domain
//! assert_eq!(brl_kernel::surface_step(&srf, 0.01).unwrap(), 1.0);
//! ```

pub use brl_kernel_geom as geom;
pub use brl_kernel_math as math;
pub use brl_kernel_nurbs as nurbs;

use brl_kernel_geom::GeomError;
use brl_kernel_math::MathError;
use brl_kernel_nurbs::{par_edge, NurbError, SurfaceNurb};
use thiserror::Error;
use tracing::trace;

/// Any error from the numeric core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Vector math or linear solving.
    #[error(transparent)]
    Math(#[from] MathError),
    /// Spline construction or evaluation.
    #[error(transparent)]
    Nurb(#[from] NurbError),
    /// Plane construction or intersection.
    #[error(transparent)]
    Geom(#[from] GeomError),
}

/// Result type for the facade.
pub type Result<T> = std::result::Result<T, Error>;

/// Parametric step for tessellating `srf` within `epsilon`, clamped to
/// the larger side of its parameter domain.
///
/// [`par_edge`] reports an unbounded step for surfaces without
/// curvature; a single span covering the domain is the useful answer
/// there.
pub fn surface_step(srf: &SurfaceNurb, epsilon: f64) -> Result<f64> {
    let ((u_lo, u_hi), (v_lo, v_hi)) = srf.domain();
    let extent = (u_hi - u_lo).max(v_hi - v_lo);
    let step = par_edge(srf, epsilon)?;
    if step > extent {
        trace!(step, extent, "clamping tessellation step to the domain");
        return Ok(extent);
    }
    Ok(step)
}

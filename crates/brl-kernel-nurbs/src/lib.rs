#![warn(missing_docs)]

//! B-spline and NURBS evaluation for the BRL-CAD numeric core.
//!
//! Curves and tensor-product surfaces with homogeneous control points,
//! evaluated with the Cox-de Boor recursion. On top of evaluation the
//! crate provides the pieces a tessellator drives: derivatives, knot
//! insertion and splitting, flatness tests, and step-size budgets.
//!
//! # Key types
//!
//! - [`KnotVector`]: validated knots, span lookup, basis functions
//! - [`CurveNurb`]: B-spline / NURBS curve
//! - [`SurfaceNurb`]: tensor-product B-spline / NURBS surface
//! - [`FlatTest`]: outcome of the flatness test
//! - [`TessParams`]: subdivision configuration
//!
//! # Algorithms
//!
//! - **De Boor's algorithm** on a scratch copy of the affected control points
//! - **Boehm's algorithm** for knot insertion (refinement and splitting)
//! - **Second-derivative bounds** for tessellation step sizes
//! - **Global interpolation** through points via the LU solver

pub mod curve;
pub mod error;
pub mod flat;
pub mod interp;
pub mod knot;
pub mod surface;
pub mod tess;

pub use curve::{CurveNurb, PointType};
pub use error::{NurbError, Result};
pub use flat::{crv_flat, s_flat, s_flat_tol, FlatTest, DEGENERATE_CORNER_TOL};
pub use interp::{cinterp, sinterp};
pub use knot::{basis_eval, KnotVector, KNOT_SNAP_TOL};
pub use surface::{SplitDir, SurfaceNurb};
pub use tess::{cnurb_par_edge, par_edge, subdivide, TessParams};

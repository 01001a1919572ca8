#![warn(missing_docs)]

//! Plane geometry and segment clipping for the BRL-CAD numeric core.
//!
//! Independent of the spline code: these are the numeric helpers that
//! trimming and clipping logic calls directly.
//!
//! # Key types
//!
//! - [`Plane`]: unit-normal plane `n . x = d`
//! - [`RayPlane`]: five-way ray/plane outcome
//! - [`Coplanarity`], [`HalfspaceClass`]: plane/plane and plane/box relations

pub mod clip;
pub mod error;
pub mod plane;

pub use clip::{
    clip_code, clip_ray_to_box, clip_segment, CLIP_BOTTOM, CLIP_LEFT, CLIP_RIGHT, CLIP_TOP,
};
pub use error::{Degeneracy, GeomError, Result};
pub use plane::{
    coplanar, halfspace_class, intersect_2planes, intersect_planes, intersect_ray_plane,
    plane_from_3pts, point_from_3planes, pts_collinear, pts_distinct, Coplanarity,
    HalfspaceClass, Line3, Plane, RayPlane,
};

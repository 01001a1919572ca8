//! Plane construction, classification and intersection.
//!
//! A plane is `n . x = d` with unit normal `n`. The halfspace
//! `n . x < d` is "inside".

use brl_kernel_math::{
    distsq_line3_pt3, near_equal, solve, unitize, MathError, Point3, Tolerance, Transform, Vec3,
    SMALL_FASTF, SQRT_SMALL_FASTF,
};
use nalgebra::DMatrix;
use tracing::{debug, trace};

use crate::{Degeneracy, GeomError, Result};

/// A plane `normal . x = dist`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal; points out of the inside halfspace.
    pub normal: Vec3,
    /// Signed distance of the plane from the origin along `normal`.
    pub dist: f64,
}

impl Plane {
    /// Plane from a normal and offset, taken as given.
    pub fn new(normal: Vec3, dist: f64) -> Self {
        Self { normal, dist }
    }

    /// Plane through `p` with the given (not necessarily unit) normal.
    pub fn from_point_normal(p: &Point3, normal: &Vec3) -> Result<Self> {
        let n = unitize(normal)?;
        Ok(Self {
            normal: n,
            dist: n.dot(&p.coords),
        })
    }

    /// Plane `x = d`.
    pub fn x(d: f64) -> Self {
        Self::new(Vec3::x(), d)
    }

    /// Plane `y = d`.
    pub fn y(d: f64) -> Self {
        Self::new(Vec3::y(), d)
    }

    /// Plane `z = d`.
    pub fn z(d: f64) -> Self {
        Self::new(Vec3::z(), d)
    }

    /// Signed distance of `p` from the plane; negative inside.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.dist
    }

    /// Whether the normal has unit length (within `SMALL_FASTF` on its
    /// squared magnitude).
    pub fn is_unit(&self) -> bool {
        near_equal(self.normal.norm_squared(), 1.0, SMALL_FASTF)
    }

    /// Transform the plane by `t`.
    ///
    /// The normal goes through the inverse transpose of the linear part
    /// of `t` and the offset is recomputed from the transformed foot
    /// point `dist * normal`. A singular `t` is degenerate input.
    pub fn transformed(&self, t: &Transform) -> Result<Self> {
        let n = t.apply_normal(&self.normal).ok_or_else(|| {
            GeomError::DegenerateInput("plane transform is singular".into())
        })?;
        let normal = unitize(&n)?;
        let foot = t.apply_point(&Point3::from(self.normal * self.dist));
        Ok(Self {
            normal,
            dist: normal.dot(&foot.coords),
        })
    }
}

/// A parametric line `point + t * dir`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line3 {
    /// Start point.
    pub point: Point3,
    /// Unit direction.
    pub dir: Vec3,
}

/// Outcome of [`intersect_ray_plane`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayPlane {
    /// Ray crosses from outside to inside at `point + dist * dir`.
    Entering {
        /// Parametric distance along the ray direction.
        dist: f64,
    },
    /// Ray crosses from inside to outside at `point + dist * dir`.
    Leaving {
        /// Parametric distance along the ray direction.
        dist: f64,
    },
    /// Parallel to the plane, in the outside halfspace.
    ParallelOutside,
    /// Parallel to the plane, in the inside halfspace.
    ParallelInside,
    /// The ray lies in the plane.
    OnPlane,
}

impl RayPlane {
    /// Parametric hit distance, for the two crossing outcomes.
    pub fn dist(&self) -> Option<f64> {
        match *self {
            RayPlane::Entering { dist } | RayPlane::Leaving { dist } => Some(dist),
            _ => None,
        }
    }
}

/// Relation between two planes, from [`coplanar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coplanarity {
    /// The planes meet in a line.
    Intersecting,
    /// Parallel, different offsets.
    ParallelDistinct,
    /// Same plane, normals agree.
    Coplanar,
    /// Same plane, normals opposite.
    CoplanarOpposite,
}

/// Where an axis-aligned box lies relative to a plane's halfspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfspaceClass {
    /// Entirely on the inside.
    Inside,
    /// Entirely on the outside.
    Outside,
    /// Straddles or touches the plane.
    Overlapping,
}

/// True when no two of the points are within `tol.dist` of each other.
pub fn pts_distinct(a: &Point3, b: &Point3, c: &Point3, tol: &Tolerance) -> bool {
    (b - a).norm_squared() > tol.dist_sq
        && (c - a).norm_squared() > tol.dist_sq
        && (c - b).norm_squared() > tol.dist_sq
}

/// True when the vertex opposite the longest edge lies within
/// `tol.dist` of that edge's line.
pub fn pts_collinear(a: &Point3, b: &Point3, c: &Point3, tol: &Tolerance) -> bool {
    let ab = (b - a).norm();
    let bc = (c - b).norm();
    let ca = (a - c).norm();

    let dist_sq = if ab >= bc && ab >= ca {
        distsq_line3_pt3(a, &(b - a), c)
    } else if bc >= ca {
        distsq_line3_pt3(b, &(c - b), a)
    } else {
        distsq_line3_pt3(c, &(a - c), b)
    };
    dist_sq <= tol.dist_sq
}

/// Plane through three points, normal `(b - a) x (c - a)`.
///
/// Fails when two points are within `tol.dist` of each other or the
/// points are collinear.
pub fn plane_from_3pts(a: &Point3, b: &Point3, c: &Point3, tol: &Tolerance) -> Result<Plane> {
    if !pts_distinct(a, b, c, tol) {
        return Err(GeomError::DegenerateInput(
            "two of the three points coincide".into(),
        ));
    }

    let n = (b - a).cross(&(c - a));
    let mag = n.norm();
    if mag <= SMALL_FASTF {
        return Err(GeomError::DegenerateInput(
            "the three points are collinear".into(),
        ));
    }

    let normal = n / mag;
    Ok(Plane {
        normal,
        dist: normal.dot(&a.coords),
    })
}

/// The single point common to three planes (Cramer's rule).
pub fn point_from_3planes(a: &Plane, b: &Plane, c: &Plane) -> Result<Point3> {
    let bc = b.normal.cross(&c.normal);
    let det = a.normal.dot(&bc);
    if det.abs() < SQRT_SMALL_FASTF {
        trace!(det, "three planes have no unique point");
        return Err(GeomError::NoUniqueIntersection(Degeneracy::NoPoint));
    }

    let ac = a.normal.cross(&c.normal);
    let ab = a.normal.cross(&b.normal);
    let p = (bc * a.dist - ac * b.dist + ab * c.dist) / det;
    Ok(Point3::from(p))
}

/// Intersect the ray `point + t * dir` with `plane`.
///
/// `dir` need not be unit length; the returned distance is in units of
/// `dir`. A direction within `tol.perp` of perpendicular to the normal
/// counts as parallel, and the offset of `point` then decides between
/// the three parallel outcomes.
pub fn intersect_ray_plane(
    point: &Point3,
    dir: &Vec3,
    plane: &Plane,
    tol: &Tolerance,
) -> Result<RayPlane> {
    let norm_dist = plane.dist - plane.normal.dot(&point.coords);
    let slant = plane.normal.dot(dir);
    let dot = plane.normal.dot(&unitize(dir)?);

    if slant < -SMALL_FASTF && dot < -tol.perp {
        return Ok(RayPlane::Entering {
            dist: norm_dist / slant,
        });
    }
    if slant > SMALL_FASTF && dot > tol.perp {
        return Ok(RayPlane::Leaving {
            dist: norm_dist / slant,
        });
    }

    Ok(if norm_dist < -tol.dist {
        RayPlane::ParallelOutside
    } else if norm_dist > tol.dist {
        RayPlane::ParallelInside
    } else {
        RayPlane::OnPlane
    })
}

/// Classify two unit-normal planes as intersecting, parallel, or the
/// same plane.
pub fn coplanar(a: &Plane, b: &Plane, tol: &Tolerance) -> Result<Coplanarity> {
    for p in [a, b] {
        if !p.is_unit() {
            return Err(GeomError::NotUnitNormal(p.normal.norm_squared()));
        }
    }

    let dot = a.normal.dot(&b.normal);
    if tol.is_perp(dot) {
        return Ok(Coplanarity::Intersecting);
    }

    let target = if dot <= -SMALL_FASTF { -1.0 } else { 1.0 };
    if near_equal(dot, target, tol.perp) {
        let pt_a = Point3::from(a.normal * a.dist);
        let pt_b = Point3::from(b.normal * b.dist);
        if !tol.points_equal(&pt_a, &pt_b) {
            return Ok(Coplanarity::ParallelDistinct);
        }
        return Ok(if dot >= SMALL_FASTF {
            Coplanarity::Coplanar
        } else {
            Coplanarity::CoplanarOpposite
        });
    }

    Ok(Coplanarity::Intersecting)
}

/// Line of intersection of two planes.
///
/// The start point lies on the axis plane through `rpp_min` whose axis
/// best matches the line direction, and the direction is flipped to
/// point along that axis, so geometry above `rpp_min` is in front of
/// the start point.
pub fn intersect_2planes(a: &Plane, b: &Plane, rpp_min: &Point3, tol: &Tolerance) -> Result<Line3> {
    match coplanar(a, b, tol)? {
        Coplanarity::Intersecting => {}
        Coplanarity::Coplanar | Coplanarity::CoplanarOpposite => {
            return Err(GeomError::NoUniqueIntersection(Degeneracy::Coplanar));
        }
        Coplanarity::ParallelDistinct => {
            return Err(GeomError::NoUniqueIntersection(Degeneracy::ParallelDistinct));
        }
    }

    let mut dir = unitize(&a.normal.cross(&b.normal))?;
    let abs = dir.abs();

    let axis = if abs.x >= abs.y {
        if abs.x >= abs.z {
            0
        } else {
            2
        }
    } else if abs.y >= abs.z {
        1
    } else {
        2
    };
    let axis_plane = match axis {
        0 => Plane::x(rpp_min.x),
        1 => Plane::y(rpp_min.y),
        _ => Plane::z(rpp_min.z),
    };
    if dir[axis] < 0.0 {
        dir = -dir;
    }

    let point = point_from_3planes(&axis_plane, a, b)?;
    Ok(Line3 { point, dir })
}

/// Classify the box `[min, max]` against the halfspace of `plane`.
///
/// Corners within `tol.dist` of the plane count as overlapping.
pub fn halfspace_class(plane: &Plane, min: &Point3, max: &Point3, tol: &Tolerance) -> HalfspaceClass {
    let mut class: Option<HalfspaceClass> = None;
    for i in 0..8 {
        let corner = Point3::new(
            if i & 4 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 1 == 0 { min.z } else { max.z },
        );
        let d = plane.signed_distance(&corner);
        let here = if d < -tol.dist {
            HalfspaceClass::Inside
        } else if d > tol.dist {
            HalfspaceClass::Outside
        } else {
            return HalfspaceClass::Overlapping;
        };
        match class {
            Some(prev) if prev != here => return HalfspaceClass::Overlapping,
            _ => class = Some(here),
        }
    }
    class.unwrap_or(HalfspaceClass::Overlapping)
}

/// Point minimizing the summed squared distance to all `planes`.
///
/// When the planes meet in a single point, that point is returned.
/// Fewer than three independent normals leave the normal equations
/// singular, reported as [`Degeneracy::NoPoint`].
pub fn intersect_planes(planes: &[Plane]) -> Result<Point3> {
    let mut m = DMatrix::<f64>::zeros(3, 3);
    let mut rhs = DMatrix::<f64>::zeros(3, 1);
    for p in planes {
        let n = &p.normal;
        for i in 0..3 {
            for j in 0..3 {
                m[(i, j)] += n[i] * n[j];
            }
            rhs[(i, 0)] += n[i] * p.dist;
        }
    }

    match solve(m, rhs) {
        Ok(x) => Ok(Point3::new(x[(0, 0)], x[(1, 0)], x[(2, 0)])),
        Err(MathError::SingularMatrix { column, pivot }) => {
            debug!(planes = planes.len(), column, pivot, "plane normals do not span space");
            Err(GeomError::NoUniqueIntersection(Degeneracy::NoPoint))
        }
        Err(e) => Err(e.into()),
    }
}

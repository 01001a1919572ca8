#![warn(missing_docs)]

//! Math types for the BRL-CAD numeric core.
//!
//! Thin wrappers around nalgebra providing the fixed-size point and
//! vector types used by the spline and plane code, the shared epsilon
//! constants, the [`Tolerance`] bundle, affine [`Transform`]s and the
//! dense LU [`solve`] routine.

pub mod error;
pub mod solve;
pub mod tolerance;

pub use error::{MathError, Result};
pub use solve::{solve, LuFactors};
pub use tolerance::Tolerance;

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A homogeneous point `(x, y, z, w)`.
///
/// Represents the Euclidean point `(x/w, y/w, z/w)` when `w != 0`.
/// Non-rational results carry `w = 1`.
pub type HPoint = Vector4<f64>;

/// Generic "small" threshold below which a magnitude counts as zero.
pub const SMALL_FASTF: f64 = 1.0e-10;

/// Square root of [`SMALL_FASTF`], used for unitizing and determinant tests.
pub const SQRT_SMALL_FASTF: f64 = 1.0e-5;

/// Returns `true` if `v` is within [`SMALL_FASTF`] of zero.
#[inline]
pub fn near_zero(v: f64) -> bool {
    v.abs() <= SMALL_FASTF
}

/// Returns `true` if `a` and `b` differ by no more than `tol`.
#[inline]
pub fn near_equal(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// Scale `v` to unit length.
///
/// Fails when the magnitude is below [`SQRT_SMALL_FASTF`].
pub fn unitize(v: &Vec3) -> Result<Vec3> {
    let mag = v.norm();
    if mag < SQRT_SMALL_FASTF {
        return Err(MathError::DegenerateVector(mag));
    }
    Ok(v / mag)
}

/// Project a homogeneous point to Euclidean space by dividing through by `w`.
pub fn hdivide(h: &HPoint) -> Result<Point3> {
    if h.w.abs() <= SMALL_FASTF {
        return Err(MathError::ZeroWeight(h.w));
    }
    let inv = 1.0 / h.w;
    Ok(Point3::new(h.x * inv, h.y * inv, h.z * inv))
}

/// Distance from point `a` to the infinite line `pt + t * dir`.
///
/// `dir` need not have unit length. A zero-length direction, or a
/// squared distance at or below [`SMALL_FASTF`], yields 0.
pub fn dist_line3_pt3(pt: &Point3, dir: &Vec3, a: &Point3) -> f64 {
    let d = distsq_line3_pt3(pt, dir, a);
    if d == 0.0 {
        0.0
    } else {
        d.sqrt()
    }
}

/// Squared distance from point `a` to the infinite line `pt + t * dir`.
pub fn distsq_line3_pt3(pt: &Point3, dir: &Vec3, a: &Point3) -> f64 {
    let mag = dir.norm();
    if mag <= SMALL_FASTF {
        return 0.0;
    }
    let f = a - pt;
    let along = f.dot(dir) / mag;
    let d = f.norm_squared() - along * along;
    if d <= SMALL_FASTF {
        0.0
    } else {
        d
    }
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation about an axis through the origin by `angle` radians.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let rot = nalgebra::Rotation3::from_axis_angle(axis, angle);
        Self {
            matrix: rot.to_homogeneous(),
        }
    }

    /// Compose: `self` applied after `other` (matrix product `self * other`).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (translation is ignored).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a surface normal by the inverse transpose of the linear
    /// part. `None` when that part is singular. The result is not unitized.
    pub fn apply_normal(&self, n: &Vec3) -> Option<Vec3> {
        let m3 = self.matrix.fixed_view::<3, 3>(0, 0);
        m3.try_inverse().map(|inv| inv.transpose() * n)
    }

    /// Transform a homogeneous point, weight included.
    pub fn apply_hpoint(&self, h: &HPoint) -> HPoint {
        self.matrix * h
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_unitize() {
        let v = unitize(&Vec3::new(3.0, 0.0, 4.0)).unwrap();
        assert!((v.norm() - 1.0).abs() < 1e-12);
        assert!((v.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_unitize_rejects_tiny_vector() {
        let err = unitize(&Vec3::new(1e-7, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, MathError::DegenerateVector(_)));
    }

    #[test]
    fn test_hdivide() {
        let p = hdivide(&HPoint::new(2.0, 4.0, 6.0, 2.0)).unwrap();
        assert!((p - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
        assert!(matches!(
            hdivide(&HPoint::new(1.0, 1.0, 1.0, 0.0)),
            Err(MathError::ZeroWeight(_))
        ));
    }

    #[test]
    fn test_dist_line_point() {
        let pt = Point3::origin();
        let dir = Vec3::new(5.0, 0.0, 0.0);
        let d = dist_line3_pt3(&pt, &dir, &Point3::new(17.0, 3.0, 4.0));
        assert!((d - 5.0).abs() < 1e-12);
        let dsq = distsq_line3_pt3(&pt, &dir, &Point3::new(-2.0, 0.0, 2.0));
        assert!((dsq - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_dist_line_point_on_line() {
        let d = dist_line3_pt3(
            &Point3::new(1.0, 1.0, 1.0),
            &Vec3::new(1.0, 1.0, 1.0),
            &Point3::new(3.0, 3.0, 3.0),
        );
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_dist_line_zero_direction() {
        let d = dist_line3_pt3(&Point3::origin(), &Vec3::zeros(), &Point3::new(1.0, 0.0, 0.0));
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_translation_and_inverse() {
        let t = Transform::translation(1.0, 2.0, 3.0);
        let p = Point3::new(5.0, 6.0, 7.0);
        let moved = t.apply_point(&p);
        assert!((moved - Point3::new(6.0, 8.0, 10.0)).norm() < 1e-12);
        let back = t.inverse().unwrap().apply_point(&moved);
        assert!((back - p).norm() < 1e-12);
        // vectors ignore translation
        assert!((t.apply_vec(&Vec3::x()) - Vec3::x()).norm() < 1e-12);
    }

    #[test]
    fn test_rotation_about_axis() {
        let axis = Dir3::new_normalize(Vec3::z());
        let t = Transform::rotation_about_axis(&axis, PI / 2.0);
        let r = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!(r.x.abs() < 1e-12);
        assert!((r.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compose_applies_right_first() {
        let translate = Transform::translation(1.0, 0.0, 0.0);
        let scale = Transform::scale(2.0, 2.0, 2.0);
        let r = scale.then(&translate).apply_point(&Point3::origin());
        assert!((r.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_apply_hpoint_keeps_weight() {
        let t = Transform::translation(1.0, 0.0, 0.0);
        let h = t.apply_hpoint(&HPoint::new(2.0, 0.0, 0.0, 2.0));
        // (1,0,0) weighted by 2 moves to (2,0,0) weighted by 2
        assert!((h - HPoint::new(4.0, 0.0, 0.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_apply_normal_inverse_transpose() {
        let t = Transform::scale(2.0, 1.0, 1.0).then(&Transform::translation(5.0, 0.0, 0.0));
        let n = t.apply_normal(&Vec3::new(1.0, 1.0, 0.0)).unwrap();
        assert!((n - Vec3::new(0.5, 1.0, 0.0)).norm() < 1e-12);

        // stays perpendicular to transformed tangents
        let tangent = t.apply_vec(&Vec3::new(1.0, -1.0, 0.0));
        assert!(n.dot(&tangent).abs() < 1e-12);

        assert!(Transform::scale(0.0, 1.0, 1.0).apply_normal(&Vec3::x()).is_none());
    }
}

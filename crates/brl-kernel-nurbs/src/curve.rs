//! NURBS curves: evaluation, differentiation, knot insertion and splitting.
//!
//! Control points are stored as homogeneous [`HPoint`]s. Non-rational
//! curves keep `w = 1` on every point; rational curves store
//! `(w*x, w*y, w*z, w)` and are evaluated in homogeneous space, then
//! projected.

use brl_kernel_math::{hdivide, near_zero, HPoint, Point3, Transform};
use serde::{Deserialize, Serialize};

use crate::knot::KnotVector;
use crate::{NurbError, Result};

/// Largest order evaluated with a stack scratch buffer.
const STACK_ORDER: usize = 16;

/// Layout of the control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointType {
    /// Euclidean `(x, y, z)`, stored with `w = 1`.
    Xyz,
    /// Rational, stored homogeneous `(w*x, w*y, w*z, w)`.
    Xyzw,
}

impl PointType {
    /// Whether points carry a meaningful weight.
    pub fn is_rational(self) -> bool {
        matches!(self, PointType::Xyzw)
    }

    /// Number of meaningful coordinates per point.
    pub fn coords(self) -> usize {
        match self {
            PointType::Xyz => 3,
            PointType::Xyzw => 4,
        }
    }

    /// Project a stored control point to Euclidean space.
    pub fn to_euclidean(self, h: &HPoint) -> Result<Point3> {
        match self {
            PointType::Xyz => Ok(Point3::new(h.x, h.y, h.z)),
            PointType::Xyzw => Ok(hdivide(h)?),
        }
    }
}

/// A B-spline or NURBS curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveNurb {
    order: usize,
    knots: KnotVector,
    pt_type: PointType,
    ctl_points: Vec<HPoint>,
}

impl CurveNurb {
    /// Create a curve, checking that sizes and knots agree.
    ///
    /// Non-rational control points must carry `w = 1`.
    pub fn new(
        order: usize,
        knots: KnotVector,
        pt_type: PointType,
        ctl_points: Vec<HPoint>,
    ) -> Result<Self> {
        check_sizes(order, &knots, ctl_points.len())?;
        if pt_type == PointType::Xyz {
            if let Some(i) = ctl_points.iter().position(|p| p.w != 1.0) {
                return Err(NurbError::InvalidMesh(format!(
                    "non-rational control point {i} has weight {}",
                    ctl_points[i].w
                )));
            }
        }
        Ok(Self {
            order,
            knots,
            pt_type,
            ctl_points,
        })
    }

    /// Non-rational curve from Euclidean control points.
    pub fn from_points(order: usize, knots: KnotVector, points: &[Point3]) -> Result<Self> {
        let ctl = points.iter().map(|p| HPoint::new(p.x, p.y, p.z, 1.0)).collect();
        Self::new(order, knots, PointType::Xyz, ctl)
    }

    /// Rational curve from Euclidean control points and their weights.
    pub fn rational(
        order: usize,
        knots: KnotVector,
        points: &[Point3],
        weights: &[f64],
    ) -> Result<Self> {
        if points.len() != weights.len() {
            return Err(NurbError::InvalidMesh(format!(
                "{} points but {} weights",
                points.len(),
                weights.len()
            )));
        }
        let ctl = points
            .iter()
            .zip(weights)
            .map(|(p, &w)| HPoint::new(p.x * w, p.y * w, p.z * w, w))
            .collect();
        Self::new(order, knots, PointType::Xyzw, ctl)
    }

    /// Curve order (degree + 1).
    pub fn order(&self) -> usize {
        self.order
    }

    /// The knot vector.
    pub fn knots(&self) -> &KnotVector {
        &self.knots
    }

    /// Control point layout.
    pub fn point_type(&self) -> PointType {
        self.pt_type
    }

    /// Stored (homogeneous) control points.
    pub fn ctl_points(&self) -> &[HPoint] {
        &self.ctl_points
    }

    /// Parameter domain.
    pub fn domain(&self) -> (f64, f64) {
        let count = self.ctl_points.len();
        (self.knots[self.order - 1], self.knots[count])
    }

    /// Evaluate at `t`, returning the homogeneous point.
    pub fn eval(&self, t: f64) -> Result<HPoint> {
        let (span, t) = self.knots.knot_span(t, self.order)?;
        Ok(de_boor(
            &self.ctl_points,
            self.knots.as_slice(),
            span,
            self.order,
            t,
        ))
    }

    /// Evaluate at `t` and project to Euclidean space.
    pub fn point_at(&self, t: f64) -> Result<Point3> {
        let h = self.eval(t)?;
        self.pt_type.to_euclidean(&h)
    }

    /// Derivative curve (hodograph), one order lower.
    ///
    /// Rational curves are differentiated in homogeneous space.
    pub fn diff(&self) -> Result<Self> {
        if self.order < 2 {
            return Err(NurbError::InsufficientOrder {
                order: self.order,
                required: 2,
            });
        }
        let k = self.knots.as_slice();
        let order = self.order;
        let ctl_points = self
            .ctl_points
            .windows(2)
            .enumerate()
            .map(|(i, w)| hodograph(self.pt_type, &w[0], &w[1], order, k[i + order] - k[i + 1]))
            .collect();

        Ok(Self {
            order: order - 1,
            knots: KnotVector::new(k[1..k.len() - 1].to_vec())?,
            pt_type: self.pt_type,
            ctl_points,
        })
    }

    /// Insert one knot at `t` using Boehm's algorithm.
    ///
    /// Returns a new curve with one additional control point and the
    /// same shape.
    pub fn insert_knot(&self, t: f64) -> Result<Self> {
        let (span, t) = self.knots.knot_span(t, self.order)?;
        let (knots, ctl_points) = insert_knot_raw(
            self.knots.as_slice(),
            &self.ctl_points,
            self.order,
            span,
            t,
        );
        Ok(Self {
            order: self.order,
            knots: KnotVector::new(knots)?,
            pt_type: self.pt_type,
            ctl_points,
        })
    }

    /// Split at `value` into two independent curves.
    ///
    /// `value` must lie strictly inside the domain. The knot is raised to
    /// full multiplicity first, so the pieces meet exactly at the cut.
    pub fn split_at(&self, value: f64) -> Result<(Self, Self)> {
        let (lo, hi) = self.domain();
        if !(value > lo && value < hi) {
            return Err(NurbError::ParameterOutOfRange { value, lo, hi });
        }

        let mut refined = self.clone();
        for _ in self.knots.multiplicity(value)..self.order {
            refined = refined.insert_knot(value)?;
        }

        let k = refined.knots.as_slice();
        let s = k
            .iter()
            .position(|&x| near_zero(x - value))
            .ok_or_else(|| NurbError::InvalidKnotVector(format!("knot {value} lost during insertion")))?;

        let left = Self {
            order: self.order,
            knots: KnotVector::new(k[..s + self.order].to_vec())?,
            pt_type: self.pt_type,
            ctl_points: refined.ctl_points[..s].to_vec(),
        };
        let right = Self {
            order: self.order,
            knots: KnotVector::new(k[s..].to_vec())?,
            pt_type: self.pt_type,
            ctl_points: refined.ctl_points[s..].to_vec(),
        };
        Ok((left, right))
    }

    /// Axis-aligned bounds of the Euclidean control points.
    ///
    /// By the convex hull property the curve lies inside.
    pub fn bound(&self) -> Result<(Point3, Point3)> {
        bound_points(self.pt_type, &self.ctl_points)
    }

    /// Apply an affine transform to every control point.
    pub fn transform(&self, t: &Transform) -> Self {
        Self {
            ctl_points: self.ctl_points.iter().map(|p| t.apply_hpoint(p)).collect(),
            ..self.clone()
        }
    }
}

pub(crate) fn check_sizes(order: usize, knots: &KnotVector, count: usize) -> Result<()> {
    if order == 0 {
        return Err(NurbError::InsufficientOrder { order, required: 1 });
    }
    if count < order {
        return Err(NurbError::InvalidMesh(format!(
            "{count} control points cannot support order {order}"
        )));
    }
    if knots.len() != count + order {
        return Err(NurbError::InvalidKnotVector(format!(
            "expected {} knots for {count} points of order {order}, got {}",
            count + order,
            knots.len()
        )));
    }
    let (lo, hi) = knots.domain(order)?;
    if lo >= hi {
        return Err(NurbError::InvalidKnotVector(format!(
            "empty domain [{lo}, {hi}]"
        )));
    }
    Ok(())
}

/// Evaluate the span `span` of a control polygon at `t`.
///
/// Copies the `order` affected points into a scratch window and blends
/// it in place; `points` is never written.
pub(crate) fn de_boor(points: &[HPoint], knots: &[f64], span: usize, order: usize, t: f64) -> HPoint {
    let src = &points[span + 1 - order..=span];
    if order <= STACK_ORDER {
        let mut scratch = [HPoint::zeros(); STACK_ORDER];
        scratch[..order].copy_from_slice(src);
        blend(&mut scratch[..order], knots, span, order, t)
    } else {
        let mut scratch = src.to_vec();
        blend(&mut scratch, knots, span, order, t)
    }
}

/// Cox-de Boor blending of a scratch window.
///
/// `window[m]` holds control point `span + 1 - order + m`. Each level
/// blends points `j-1` and `j` for `j` descending, skipping zero-width
/// knot spans, then drops the order by one.
pub(crate) fn blend(window: &mut [HPoint], knots: &[f64], span: usize, order: usize, t: f64) -> HPoint {
    let first = span + 1 - order;
    for o in (2..=order).rev() {
        for j in ((span + 2 - o)..=span).rev() {
            let k1 = knots[j + o - 1];
            let k2 = knots[j];
            if near_zero(k1 - k2) {
                continue;
            }
            let m = j - first;
            window[m] = (window[m - 1] * (k1 - t) + window[m] * (t - k2)) / (k1 - k2);
        }
    }
    window[order - 1]
}

/// One hodograph control point `(order-1) * (b - a) / den`.
///
/// A zero-width span gives a zero vector. Non-rational points keep
/// `w = 1`.
pub(crate) fn hodograph(pt_type: PointType, a: &HPoint, b: &HPoint, order: usize, den: f64) -> HPoint {
    let scale = if near_zero(den) {
        0.0
    } else {
        (order - 1) as f64 / den
    };
    let mut q = (b - a) * scale;
    if pt_type == PointType::Xyz {
        q.w = 1.0;
    }
    q
}

/// Boehm insertion of `t` into span `span`. Returns the new knots and
/// control points.
pub(crate) fn insert_knot_raw(
    knots: &[f64],
    points: &[HPoint],
    order: usize,
    span: usize,
    t: f64,
) -> (Vec<f64>, Vec<HPoint>) {
    let p = order - 1;

    let mut new_knots = Vec::with_capacity(knots.len() + 1);
    new_knots.extend_from_slice(&knots[..=span]);
    new_knots.push(t);
    new_knots.extend_from_slice(&knots[span + 1..]);

    let mut new_pts = Vec::with_capacity(points.len() + 1);

    // Points before the affected range
    new_pts.extend_from_slice(&points[..=span - p]);

    // Affected points; knots[i + p] > knots[span] >= knots[i] here, so the
    // denominator is never zero
    for i in (span - p + 1)..=span {
        let alpha = (t - knots[i]) / (knots[i + p] - knots[i]);
        new_pts.push(points[i - 1] * (1.0 - alpha) + points[i] * alpha);
    }

    // Points after the affected range
    new_pts.extend_from_slice(&points[span..]);

    (new_knots, new_pts)
}

pub(crate) fn bound_points(pt_type: PointType, points: &[HPoint]) -> Result<(Point3, Point3)> {
    let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for h in points {
        let p = pt_type.to_euclidean(h)?;
        min = min.inf(&p);
        max = max.sup(&p);
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quadratic() -> CurveNurb {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(3.0, 2.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ];
        let knots = KnotVector::new(vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]).unwrap();
        CurveNurb::from_points(3, knots, &pts).unwrap()
    }

    fn quarter_circle() -> CurveNurb {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let pts = [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let knots = KnotVector::new(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        CurveNurb::rational(3, knots, &pts, &[1.0, s, 1.0]).unwrap()
    }

    #[test]
    fn test_line() {
        let pts = [Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)];
        let knots = KnotVector::new(vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let curve = CurveNurb::from_points(2, knots, &pts).unwrap();

        assert!((curve.point_at(0.0).unwrap().x - 0.0).abs() < 1e-10);
        assert!((curve.point_at(0.5).unwrap().x - 5.0).abs() < 1e-10);
        assert!((curve.point_at(1.0).unwrap().x - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_endpoints_interpolate() {
        let curve = quadratic();
        assert_relative_eq!(curve.point_at(0.0).unwrap(), Point3::origin(), epsilon = 1e-12);
        assert_relative_eq!(
            curve.point_at(1.0).unwrap(),
            Point3::new(4.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        let mid = curve.point_at(0.5).unwrap();
        assert!(mid.y > 0.0, "midpoint y should be positive: {}", mid.y);
    }

    #[test]
    fn test_eval_matches_basis_sum() {
        let curve = quadratic();
        for &t in &[0.1, 0.3, 0.5, 0.7, 0.95] {
            let mut expected = HPoint::zeros();
            for (i, p) in curve.ctl_points().iter().enumerate() {
                expected += p * crate::knot::basis_eval(curve.knots(), i, 3, t);
            }
            assert_relative_eq!(curve.eval(t).unwrap(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rational_circle() {
        let curve = quarter_circle();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let p = curve.point_at(t).unwrap();
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - 1.0).abs() < 1e-12, "radius at t={t}: {r}");
        }
    }

    #[test]
    fn test_new_rejects_bad_sizes() {
        let knots = KnotVector::new(vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let err = CurveNurb::from_points(3, knots.clone(), &[Point3::origin(); 2]).unwrap_err();
        assert!(matches!(err, NurbError::InvalidMesh(_)));

        let err = CurveNurb::from_points(2, knots.clone(), &[Point3::origin(); 3]).unwrap_err();
        assert!(matches!(err, NurbError::InvalidKnotVector(_)));

        let err = CurveNurb::new(
            2,
            knots,
            PointType::Xyz,
            vec![HPoint::new(0.0, 0.0, 0.0, 2.0), HPoint::new(1.0, 0.0, 0.0, 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, NurbError::InvalidMesh(_)));
    }

    #[test]
    fn test_eval_out_of_domain() {
        let curve = quadratic();
        assert!(matches!(
            curve.eval(1.5),
            Err(NurbError::ParameterOutOfRange { .. })
        ));
    }

    #[test]
    fn test_diff_of_quadratic_is_linear() {
        let curve = quadratic();
        let d = curve.diff().unwrap();
        assert_eq!(d.order(), 2);
        assert_eq!(d.ctl_points().len(), 3);
        assert_eq!(d.knots().as_slice(), &[0.0, 0.0, 0.5, 1.0, 1.0]);

        // Compare with a central difference
        let h = 1e-6;
        for &t in &[0.2, 0.4, 0.6, 0.8] {
            let fd = (curve.point_at(t + h).unwrap() - curve.point_at(t - h).unwrap()) / (2.0 * h);
            let an = d.point_at(t).unwrap().coords;
            assert!((fd - an).norm() < 1e-5, "t={t}: {fd:?} vs {an:?}");
        }
    }

    #[test]
    fn test_diff_order_one_fails() {
        let curve = quadratic().diff().unwrap().diff().unwrap();
        assert_eq!(curve.order(), 1);
        assert!(matches!(
            curve.diff(),
            Err(NurbError::InsufficientOrder { order: 1, required: 2 })
        ));
    }

    #[test]
    fn test_insert_knot_preserves_shape() {
        let curve = quadratic();
        let refined = curve.insert_knot(0.25).unwrap();
        assert_eq!(refined.ctl_points().len(), 5);
        assert_eq!(refined.knots().len(), 8);
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            assert_relative_eq!(
                curve.point_at(t).unwrap(),
                refined.point_at(t).unwrap(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_insert_knot_rational() {
        let curve = quarter_circle();
        let refined = curve.insert_knot(0.3).unwrap();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert_relative_eq!(
                curve.point_at(t).unwrap(),
                refined.point_at(t).unwrap(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_split_at() {
        let curve = quadratic();
        let (left, right) = curve.split_at(0.5).unwrap();
        assert_eq!(left.domain(), (0.0, 0.5));
        assert_eq!(right.domain(), (0.5, 1.0));

        let joint = curve.point_at(0.5).unwrap();
        assert_relative_eq!(left.point_at(0.5).unwrap(), joint, epsilon = 1e-12);
        assert_relative_eq!(right.point_at(0.5).unwrap(), joint, epsilon = 1e-12);
        assert_relative_eq!(
            left.point_at(0.2).unwrap(),
            curve.point_at(0.2).unwrap(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            right.point_at(0.8).unwrap(),
            curve.point_at(0.8).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_split_at_rejects_domain_end() {
        let curve = quadratic();
        assert!(curve.split_at(0.0).is_err());
        assert!(curve.split_at(1.0).is_err());
    }

    #[test]
    fn test_bound_contains_curve() {
        let curve = quadratic();
        let (min, max) = curve.bound().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(4.0, 2.0, 0.0));
        for i in 0..=10 {
            let p = curve.point_at(i as f64 / 10.0).unwrap();
            assert!(p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y);
        }
    }

    #[test]
    fn test_transform() {
        let curve = quarter_circle().transform(&Transform::translation(0.0, 0.0, 2.0));
        let p = curve.point_at(0.5).unwrap();
        assert!((p.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_high_order_uses_heap_scratch() {
        let n = 20;
        let pts: Vec<Point3> = (0..n).map(|i| Point3::new(i as f64, 1.0, 0.0)).collect();
        let knots = KnotVector::uniform_clamped(n, 0.0, 1.0, 0).unwrap();
        let curve = CurveNurb::from_points(n, knots, &pts).unwrap();
        // Bezier of evenly spaced collinear points is a linear parametrization
        let p = curve.point_at(0.25).unwrap();
        assert!((p.x - 0.25 * (n - 1) as f64).abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-12);
    }
}

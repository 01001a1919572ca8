//! Tensor-product NURBS surfaces.
//!
//! The control mesh is row-major with `s_size = [rows, cols]`. Moving
//! along a row changes `u`, so the `u` knot vector pairs with the
//! columns (`u.len() == cols + u_order`) and the `v` knot vector with
//! the rows (`v.len() == rows + v_order`).

use brl_kernel_math::{unitize, HPoint, Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};

use crate::curve::{blend, bound_points, check_sizes, de_boor, hodograph, CurveNurb, PointType};
use crate::knot::KnotVector;
use crate::{NurbError, Result};

/// Largest `v` order whose intermediate column lives on the stack.
const STACK_ORDER: usize = 16;

/// Parametric direction of a split or derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitDir {
    /// Along the rows: the `u` direction.
    #[default]
    Row,
    /// Along the columns: the `v` direction.
    Col,
}

impl SplitDir {
    /// The other direction.
    pub fn opposite(self) -> Self {
        match self {
            SplitDir::Row => SplitDir::Col,
            SplitDir::Col => SplitDir::Row,
        }
    }
}

/// A B-spline or NURBS surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceNurb {
    order: [usize; 2],
    u: KnotVector,
    v: KnotVector,
    s_size: [usize; 2],
    pt_type: PointType,
    ctl_points: Vec<HPoint>,
    split_dir: SplitDir,
}

impl SurfaceNurb {
    /// Create a surface. `order` is `[u_order, v_order]`, `s_size` is
    /// `[rows, cols]`, and `ctl_points` is row-major.
    pub fn new(
        order: [usize; 2],
        u: KnotVector,
        v: KnotVector,
        s_size: [usize; 2],
        pt_type: PointType,
        ctl_points: Vec<HPoint>,
    ) -> Result<Self> {
        let [rows, cols] = s_size;
        check_sizes(order[0], &u, cols)?;
        check_sizes(order[1], &v, rows)?;
        if ctl_points.len() != rows * cols {
            return Err(NurbError::InvalidMesh(format!(
                "expected {rows}x{cols} = {} control points, got {}",
                rows * cols,
                ctl_points.len()
            )));
        }
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
            u,
            v,
            s_size,
            pt_type,
            ctl_points,
            split_dir: SplitDir::default(),
        })
    }

    /// Non-rational surface from a row-major grid of Euclidean points.
    pub fn from_points(
        order: [usize; 2],
        u: KnotVector,
        v: KnotVector,
        s_size: [usize; 2],
        points: &[Point3],
    ) -> Result<Self> {
        let ctl = points.iter().map(|p| HPoint::new(p.x, p.y, p.z, 1.0)).collect();
        Self::new(order, u, v, s_size, PointType::Xyz, ctl)
    }

    /// `[u_order, v_order]`.
    pub fn order(&self) -> [usize; 2] {
        self.order
    }

    /// Knot vector in `u` (along a row).
    pub fn u_knots(&self) -> &KnotVector {
        &self.u
    }

    /// Knot vector in `v` (along a column).
    pub fn v_knots(&self) -> &KnotVector {
        &self.v
    }

    /// `[rows, cols]`.
    pub fn s_size(&self) -> [usize; 2] {
        self.s_size
    }

    /// Control point layout.
    pub fn point_type(&self) -> PointType {
        self.pt_type
    }

    /// Row-major homogeneous control points.
    pub fn ctl_points(&self) -> &[HPoint] {
        &self.ctl_points
    }

    /// Direction of the split that produced this patch.
    pub fn split_dir(&self) -> SplitDir {
        self.split_dir
    }

    /// Record the direction this patch was split along.
    pub fn with_split_dir(mut self, dir: SplitDir) -> Self {
        self.split_dir = dir;
        self
    }

    /// Domain as `((u_lo, u_hi), (v_lo, v_hi))`.
    pub fn domain(&self) -> ((f64, f64), (f64, f64)) {
        let [rows, cols] = self.s_size;
        let [uo, vo] = self.order;
        ((self.u[uo - 1], self.u[cols]), (self.v[vo - 1], self.v[rows]))
    }

    /// Control point at `(row, col)`.
    pub fn point(&self, row: usize, col: usize) -> &HPoint {
        &self.ctl_points[row * self.s_size[1] + col]
    }

    /// Evaluate at `(u, v)`, returning the homogeneous point.
    ///
    /// Each row of the mesh is evaluated at `u`, then the resulting
    /// column at `v`. Only the `v_order` rows inside the `v` span
    /// contribute, so only those are evaluated.
    pub fn eval(&self, u: f64, v: f64) -> Result<HPoint> {
        let [uo, vo] = self.order;
        let cols = self.s_size[1];
        let (u_span, u) = self.u.knot_span(u, uo)?;
        let (v_span, v) = self.v.knot_span(v, vo)?;
        let first_row = v_span + 1 - vo;

        let row_at = |r: usize| {
            let row = &self.ctl_points[r * cols..(r + 1) * cols];
            de_boor(row, self.u.as_slice(), u_span, uo, u)
        };

        if vo <= STACK_ORDER {
            let mut column = [HPoint::zeros(); STACK_ORDER];
            for (m, c) in column[..vo].iter_mut().enumerate() {
                *c = row_at(first_row + m);
            }
            Ok(blend(&mut column[..vo], self.v.as_slice(), v_span, vo, v))
        } else {
            let mut column: Vec<HPoint> = (0..vo).map(|m| row_at(first_row + m)).collect();
            Ok(blend(&mut column, self.v.as_slice(), v_span, vo, v))
        }
    }

    /// Evaluate at `(u, v)` and project to Euclidean space.
    pub fn point_at(&self, u: f64, v: f64) -> Result<Point3> {
        let h = self.eval(u, v)?;
        self.pt_type.to_euclidean(&h)
    }

    /// Partial derivative surface in `dir`, one order lower there.
    pub fn diff(&self, dir: SplitDir) -> Result<Self> {
        let [rows, cols] = self.s_size;
        let [uo, vo] = self.order;
        let pt_type = self.pt_type;

        match dir {
            SplitDir::Row => {
                if uo < 2 {
                    return Err(NurbError::InsufficientOrder {
                        order: uo,
                        required: 2,
                    });
                }
                let k = self.u.as_slice();
                let mut pts = Vec::with_capacity(rows * (cols - 1));
                for r in 0..rows {
                    for c in 0..cols - 1 {
                        pts.push(hodograph(
                            pt_type,
                            self.point(r, c),
                            self.point(r, c + 1),
                            uo,
                            k[c + uo] - k[c + 1],
                        ));
                    }
                }
                Ok(Self {
                    order: [uo - 1, vo],
                    u: KnotVector::new(k[1..k.len() - 1].to_vec())?,
                    v: self.v.clone(),
                    s_size: [rows, cols - 1],
                    pt_type,
                    ctl_points: pts,
                    split_dir: self.split_dir,
                })
            }
            SplitDir::Col => {
                if vo < 2 {
                    return Err(NurbError::InsufficientOrder {
                        order: vo,
                        required: 2,
                    });
                }
                let k = self.v.as_slice();
                let mut pts = Vec::with_capacity((rows - 1) * cols);
                for r in 0..rows - 1 {
                    for c in 0..cols {
                        pts.push(hodograph(
                            pt_type,
                            self.point(r, c),
                            self.point(r + 1, c),
                            vo,
                            k[r + vo] - k[r + 1],
                        ));
                    }
                }
                Ok(Self {
                    order: [uo, vo - 1],
                    u: self.u.clone(),
                    v: KnotVector::new(k[1..k.len() - 1].to_vec())?,
                    s_size: [rows - 1, cols],
                    pt_type,
                    ctl_points: pts,
                    split_dir: self.split_dir,
                })
            }
        }
    }

    /// Unit surface normal `S_u x S_v` at `(u, v)`.
    ///
    /// Rational surfaces use the quotient rule on the homogeneous
    /// partials. A vanishing cross product (e.g. at a pole) is reported
    /// as a degenerate vector.
    pub fn normal(&self, u: f64, v: f64) -> Result<Vec3> {
        let s = self.eval(u, v)?;
        let su = self.diff(SplitDir::Row)?.eval(u, v)?;
        let sv = self.diff(SplitDir::Col)?.eval(u, v)?;

        let (du, dv) = match self.pt_type {
            PointType::Xyz => (su.xyz(), sv.xyz()),
            // d(P/w) = (w dP - dw P) / w^2; the common w^2 factor does not
            // change the direction
            PointType::Xyzw => (su.xyz() * s.w - s.xyz() * su.w, sv.xyz() * s.w - s.xyz() * sv.w),
        };
        Ok(unitize(&du.cross(&dv))?)
    }

    /// Row `r` as a curve in `u`.
    pub fn row(&self, r: usize) -> Option<CurveNurb> {
        let [rows, cols] = self.s_size;
        if r >= rows {
            return None;
        }
        CurveNurb::new(
            self.order[0],
            self.u.clone(),
            self.pt_type,
            self.ctl_points[r * cols..(r + 1) * cols].to_vec(),
        )
        .ok()
    }

    /// Column `c` as a curve in `v`.
    pub fn column(&self, c: usize) -> Option<CurveNurb> {
        let [rows, cols] = self.s_size;
        if c >= cols {
            return None;
        }
        CurveNurb::new(
            self.order[1],
            self.v.clone(),
            self.pt_type,
            (0..rows).map(|r| *self.point(r, c)).collect(),
        )
        .ok()
    }

    /// The four corner control points:
    /// `[(0,0), (0,last_col), (last_row,0), (last_row,last_col)]`.
    pub fn corners(&self) -> [HPoint; 4] {
        let [rows, cols] = self.s_size;
        [
            *self.point(0, 0),
            *self.point(0, cols - 1),
            *self.point(rows - 1, 0),
            *self.point(rows - 1, cols - 1),
        ]
    }

    /// Split into two patches across `dir`.
    ///
    /// The cut is the middle knot of that direction when it lies strictly
    /// inside the domain, else the domain midpoint. Both children record
    /// `dir` as their split direction.
    pub fn split(&self, dir: SplitDir) -> Result<(Self, Self)> {
        let [rows, cols] = self.s_size;
        let ((u_lo, u_hi), (v_lo, v_hi)) = self.domain();
        let (kv, lo, hi, lines) = match dir {
            SplitDir::Row => (&self.u, u_lo, u_hi, rows),
            SplitDir::Col => (&self.v, v_lo, v_hi, cols),
        };

        let mid = kv[kv.len() / 2];
        let value = if mid > lo && mid < hi {
            mid
        } else {
            0.5 * (lo + hi)
        };

        let mut left_pts = Vec::new();
        let mut right_pts = Vec::new();
        let mut cut: Option<(KnotVector, KnotVector, usize, usize)> = None;

        for line in 0..lines {
            let curve = match dir {
                SplitDir::Row => self.row(line),
                SplitDir::Col => self.column(line),
            }
            .ok_or_else(|| NurbError::InvalidMesh(format!("missing line {line}")))?;
            let (l, r) = curve.split_at(value)?;
            left_pts.push(l.ctl_points().to_vec());
            right_pts.push(r.ctl_points().to_vec());
            if cut.is_none() {
                cut = Some((
                    l.knots().clone(),
                    r.knots().clone(),
                    l.ctl_points().len(),
                    r.ctl_points().len(),
                ));
            }
        }

        let (l_kv, r_kv, l_n, r_n) =
            cut.ok_or_else(|| NurbError::InvalidMesh("empty control mesh".into()))?;

        let (left, right) = match dir {
            SplitDir::Row => (
                Self {
                    u: l_kv,
                    s_size: [rows, l_n],
                    ctl_points: left_pts.concat(),
                    ..self.clone()
                },
                Self {
                    u: r_kv,
                    s_size: [rows, r_n],
                    ctl_points: right_pts.concat(),
                    ..self.clone()
                },
            ),
            // lines are columns here; transpose back to row-major
            SplitDir::Col => (
                Self {
                    v: l_kv,
                    s_size: [l_n, cols],
                    ctl_points: transpose(&left_pts, l_n),
                    ..self.clone()
                },
                Self {
                    v: r_kv,
                    s_size: [r_n, cols],
                    ctl_points: transpose(&right_pts, r_n),
                    ..self.clone()
                },
            ),
        };
        Ok((left.with_split_dir(dir), right.with_split_dir(dir)))
    }

    /// Axis-aligned bounds of the Euclidean control points.
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

/// Row-major mesh from a list of columns, each `rows` long.
fn transpose(columns: &[Vec<HPoint>], rows: usize) -> Vec<HPoint> {
    let mut out = Vec::with_capacity(rows * columns.len());
    for r in 0..rows {
        for col in columns {
            out.push(col[r]);
        }
    }
    out
}

//! Flatness tests that steer recursive surface subdivision.

use brl_kernel_math::{dist_line3_pt3, HPoint, Point3, SMALL_FASTF};
use tracing::trace;

use crate::curve::PointType;
use crate::surface::{SplitDir, SurfaceNurb};
use crate::Result;

/// Corner triangles whose cross product is shorter than this are
/// treated as degenerate, and the patch as flat.
pub const DEGENERATE_CORNER_TOL: f64 = 1.0e-4;

/// Outcome of one flatness test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatTest {
    /// Close enough to planar; stop subdividing.
    Flat,
    /// Split across the `u` direction.
    SplitRow,
    /// Split across the `v` direction.
    SplitCol,
}

impl FlatTest {
    /// Direction to split in, if any.
    pub fn split_dir(self) -> Option<SplitDir> {
        match self {
            FlatTest::Flat => None,
            FlatTest::SplitRow => Some(SplitDir::Row),
            FlatTest::SplitCol => Some(SplitDir::Col),
        }
    }
}

impl From<SplitDir> for FlatTest {
    fn from(dir: SplitDir) -> Self {
        match dir {
            SplitDir::Row => FlatTest::SplitRow,
            SplitDir::Col => FlatTest::SplitCol,
        }
    }
}

/// Largest distance of a control polygon's points from its chord.
///
/// The chord runs from the first point to the last point that does not
/// coincide with it, so trailing duplicates of the start are skipped.
/// A polygon whose points all coincide has deviation 0.
pub fn crv_flat(points: &[HPoint], pt_type: PointType) -> Result<f64> {
    let pts = points
        .iter()
        .map(|h| pt_type.to_euclidean(h))
        .collect::<Result<Vec<Point3>>>()?;

    let Some(p1) = pts.first() else {
        return Ok(0.0);
    };
    let Some(p2) = pts
        .iter()
        .rev()
        .find(|p| (*p - p1).norm_squared() > SMALL_FASTF)
    else {
        return Ok(0.0);
    };

    let dir = p2 - p1;
    Ok(pts
        .iter()
        .skip(1)
        .map(|p| dist_line3_pt3(p1, &dir, p))
        .fold(0.0, f64::max))
}

/// Flatness test with the default degenerate-corner tolerance.
pub fn s_flat(srf: &SurfaceNurb, epsilon: f64) -> Result<FlatTest> {
    s_flat_tol(srf, epsilon, DEGENERATE_CORNER_TOL)
}

/// Decide whether `srf` is flat within `epsilon`.
///
/// Rows and columns of the control mesh are tested first; if either
/// deviates from its chord by more than `epsilon` the direction with the
/// larger deviation is split. Otherwise the fourth corner is measured
/// against the plane of the other three. A corner triangle with cross
/// product below `corner_tol` counts as flat. A corner out of plane
/// splits opposite to the direction that produced `srf`.
pub fn s_flat_tol(srf: &SurfaceNurb, epsilon: f64, corner_tol: f64) -> Result<FlatTest> {
    let [rows, cols] = srf.s_size();
    let pt_type = srf.point_type();
    let mesh = srf.ctl_points();

    let mut max_row_dist = 0.0_f64;
    for row in mesh.chunks(cols) {
        max_row_dist = max_row_dist.max(crv_flat(row, pt_type)?);
    }

    let mut max_col_dist = 0.0_f64;
    let mut column = Vec::with_capacity(rows);
    for c in 0..cols {
        column.clear();
        column.extend((0..rows).map(|r| mesh[r * cols + c]));
        max_col_dist = max_col_dist.max(crv_flat(&column, pt_type)?);
    }

    let max_dist = max_row_dist.max(max_col_dist);
    if max_dist > epsilon {
        let result = if max_row_dist > max_col_dist {
            FlatTest::SplitRow
        } else {
            FlatTest::SplitCol
        };
        trace!(max_row_dist, max_col_dist, epsilon, ?result, "control mesh not flat");
        return Ok(result);
    }

    let [c1, c2, c3, c4] = srf.corners();
    let p1 = pt_type.to_euclidean(&c1)?;
    let p2 = pt_type.to_euclidean(&c2)?;
    let p3 = pt_type.to_euclidean(&c3)?;
    let p4 = pt_type.to_euclidean(&c4)?;

    let n = (p2 - p1).cross(&(p3 - p1));
    let mag = n.norm();
    if mag < corner_tol {
        trace!(mag, "degenerate corner triangle, treating as flat");
        return Ok(FlatTest::Flat);
    }

    let corner_dist = (n / mag).dot(&(p4 - p1)).abs();
    if corner_dist > epsilon {
        let result = FlatTest::from(srf.split_dir().opposite());
        trace!(corner_dist, epsilon, ?result, "corners not coplanar");
        return Ok(result);
    }

    Ok(FlatTest::Flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knot::KnotVector;

    fn h(x: f64, y: f64, z: f64) -> HPoint {
        HPoint::new(x, y, z, 1.0)
    }

    fn patch(order: [usize; 2], size: [usize; 2], f: impl Fn(f64, f64) -> f64) -> SurfaceNurb {
        let [rows, cols] = size;
        let u = KnotVector::uniform_clamped(order[0], 0.0, 1.0, cols - order[0]).unwrap();
        let v = KnotVector::uniform_clamped(order[1], 0.0, 1.0, rows - order[1]).unwrap();
        let mut pts = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = (c as f64, r as f64);
                pts.push(Point3::new(x, y, f(x, y)));
            }
        }
        SurfaceNurb::from_points(order, u, v, size, &pts).unwrap()
    }

    #[test]
    fn test_crv_flat_straight() {
        let pts = [h(0.0, 0.0, 0.0), h(1.0, 1.0, 0.0), h(2.0, 2.0, 0.0)];
        assert_eq!(crv_flat(&pts, PointType::Xyz).unwrap(), 0.0);
    }

    #[test]
    fn test_crv_flat_bump() {
        let pts = [h(0.0, 0.0, 0.0), h(1.0, 0.0, 3.0), h(2.0, 0.0, 0.0)];
        assert!((crv_flat(&pts, PointType::Xyz).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_crv_flat_skips_trailing_duplicates() {
        // Closed polygon: last point repeats the first
        let pts = [
            h(0.0, 0.0, 0.0),
            h(1.0, 1.0, 0.0),
            h(4.0, 0.0, 0.0),
            h(0.0, 0.0, 0.0),
        ];
        let d = crv_flat(&pts, PointType::Xyz).unwrap();
        assert!((d - 1.0).abs() < 1e-12, "deviation {d}");
    }

    #[test]
    fn test_crv_flat_all_coincident() {
        let pts = [h(1.0, 1.0, 1.0); 4];
        assert_eq!(crv_flat(&pts, PointType::Xyz).unwrap(), 0.0);
        assert_eq!(crv_flat(&[], PointType::Xyz).unwrap(), 0.0);
    }

    #[test]
    fn test_crv_flat_rational_projects() {
        // (1, 0, 2) stored with weight 2
        let pts = [
            HPoint::new(0.0, 0.0, 0.0, 1.0),
            HPoint::new(2.0, 0.0, 4.0, 2.0),
            HPoint::new(2.0, 0.0, 0.0, 1.0),
        ];
        assert!((crv_flat(&pts, PointType::Xyzw).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_plane() {
        let srf = patch([2, 2], [2, 2], |_, _| 0.0);
        assert_eq!(s_flat(&srf, 1e-9).unwrap(), FlatTest::Flat);
    }

    #[test]
    fn test_split_row_when_rows_bend() {
        // Bends along x (within rows) only
        let srf = patch([3, 2], [2, 3], |x, _| (x - 1.0).powi(2));
        assert_eq!(s_flat(&srf, 0.1).unwrap(), FlatTest::SplitRow);
        assert_eq!(s_flat(&srf, 10.0).unwrap(), FlatTest::Flat);
    }

    #[test]
    fn test_split_col_when_columns_bend() {
        let srf = patch([2, 3], [3, 2], |_, y| (y - 1.0).powi(2));
        assert_eq!(s_flat(&srf, 0.1).unwrap(), FlatTest::SplitCol);
    }

    #[test]
    fn test_twisted_corners_split_opposite() {
        // Hyperbolic paraboloid: every row and column is straight, but
        // the corners are not coplanar
        let srf = patch([2, 2], [2, 2], |x, y| x * y);
        assert_eq!(s_flat(&srf, 0.1).unwrap(), FlatTest::SplitCol);
        let srf = srf.with_split_dir(SplitDir::Col);
        assert_eq!(s_flat(&srf, 0.1).unwrap(), FlatTest::SplitRow);
        assert_eq!(s_flat(&srf, 2.0).unwrap(), FlatTest::Flat);
    }

    #[test]
    fn test_rational_corners_projected() {
        let kv = KnotVector::new(vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let weighted = |x: f64, y: f64, z: f64, w: f64| HPoint::new(w * x, w * y, w * z, w);

        // all four corners in z = 1 once divided through
        let flat = vec![
            weighted(0.0, 0.0, 1.0, 1.0),
            weighted(1.0, 0.0, 1.0, 3.0),
            weighted(0.0, 1.0, 1.0, 0.5),
            weighted(1.0, 1.0, 1.0, 2.0),
        ];
        let srf = SurfaceNurb::new([2, 2], kv.clone(), kv.clone(), [2, 2], PointType::Xyzw, flat)
            .unwrap();
        assert_eq!(s_flat(&srf, 1e-6).unwrap(), FlatTest::Flat);

        // lifting one corner to z = 2 breaks planarity
        let lifted = vec![
            weighted(0.0, 0.0, 1.0, 1.0),
            weighted(1.0, 0.0, 1.0, 3.0),
            weighted(0.0, 1.0, 1.0, 0.5),
            weighted(1.0, 1.0, 2.0, 2.0),
        ];
        let srf =
            SurfaceNurb::new([2, 2], kv.clone(), kv, [2, 2], PointType::Xyzw, lifted).unwrap();
        assert_eq!(s_flat(&srf, 0.1).unwrap(), FlatTest::SplitCol);
    }

    #[test]
    fn test_degenerate_corners_are_flat() {
        let kv = KnotVector::new(vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        // first row collapsed to a point, far corner lifted
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.5),
        ];
        let srf = SurfaceNurb::from_points([2, 2], kv.clone(), kv, [2, 2], &pts).unwrap();
        assert_eq!(s_flat(&srf, 0.01).unwrap(), FlatTest::Flat);
    }
}

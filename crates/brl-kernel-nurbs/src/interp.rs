//! Spline interpolation through given points.
//!
//! Knot vectors are clamped uniform on `[0, 1]` and the points are
//! matched at the node (Greville) parameters, so the interpolation
//! matrix is banded and non-singular.

use brl_kernel_math::{solve, LuFactors, Point3};
use nalgebra::DMatrix;
use tracing::debug;

use crate::curve::CurveNurb;
use crate::knot::{basis_eval, KnotVector};
use crate::surface::SurfaceNurb;
use crate::{NurbError, Result};

/// Node parameters: the average of `order - 1` consecutive interior knots.
fn nodes(kv: &KnotVector, order: usize, n: usize) -> Vec<f64> {
    let k = kv.as_slice();
    (0..n)
        .map(|i| k[i + 1..i + order].iter().sum::<f64>() / (order - 1) as f64)
        .collect()
}

/// Basis matrix `imat[i][j] = N_j(node_i)`.
///
/// Every basis function vanishes at the closing end of the domain, so
/// the last entry is set to 1 by hand.
fn interp_matrix(kv: &KnotVector, order: usize, n: usize) -> DMatrix<f64> {
    let nodes = nodes(kv, order, n);
    let mut imat = DMatrix::from_fn(n, n, |i, j| basis_eval(kv, j, order, nodes[i]));
    imat[(n - 1, n - 1)] = 1.0;
    imat
}

fn check_count(n: usize, order: usize) -> Result<()> {
    if order < 2 {
        return Err(NurbError::InsufficientOrder { order, required: 2 });
    }
    if n < order {
        return Err(NurbError::InvalidMesh(format!(
            "{n} points cannot be interpolated at order {order}"
        )));
    }
    Ok(())
}

/// Curve of the given order passing through `points` in sequence.
pub fn cinterp(points: &[Point3], order: usize) -> Result<CurveNurb> {
    let n = points.len();
    check_count(n, order)?;

    let kv = KnotVector::uniform_clamped(order, 0.0, 1.0, n - order)?;
    let imat = interp_matrix(&kv, order, n);
    let rhs = DMatrix::from_fn(n, 3, |i, c| points[i][c]);
    let ctl = solve(imat, rhs)?;

    let ctl_points: Vec<Point3> = (0..n)
        .map(|i| Point3::new(ctl[(i, 0)], ctl[(i, 1)], ctl[(i, 2)]))
        .collect();
    debug!(points = n, order, "interpolated curve");
    CurveNurb::from_points(order, kv, &ctl_points)
}

/// Surface through a row-major `rows x cols` grid of points, with the
/// same order in both directions.
///
/// All rows are interpolated in `u` with one multi-column solve, then
/// all columns of the result in `v` with a second one.
pub fn sinterp(grid: &[Point3], rows: usize, cols: usize, order: usize) -> Result<SurfaceNurb> {
    if grid.len() != rows * cols {
        return Err(NurbError::InvalidMesh(format!(
            "expected {rows}x{cols} = {} grid points, got {}",
            rows * cols,
            grid.len()
        )));
    }
    check_count(cols, order)?;
    check_count(rows, order)?;

    // u: unknowns are columns, right-hand sides are (row, coord) pairs
    let u = KnotVector::uniform_clamped(order, 0.0, 1.0, cols - order)?;
    let lu_u = LuFactors::decompose(interp_matrix(&u, order, cols))?;
    let rhs_u = DMatrix::from_fn(cols, 3 * rows, |c, j| grid[(j / 3) * cols + c][j % 3]);
    let row_ctl = lu_u.solve(&rhs_u)?;

    // v: unknowns are rows, right-hand sides are (col, coord) pairs
    let v = KnotVector::uniform_clamped(order, 0.0, 1.0, rows - order)?;
    let lu_v = LuFactors::decompose(interp_matrix(&v, order, rows))?;
    let rhs_v = DMatrix::from_fn(rows, 3 * cols, |r, j| row_ctl[(j / 3, 3 * r + j % 3)]);
    let ctl = lu_v.solve(&rhs_v)?;

    let mut pts = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            pts.push(Point3::new(
                ctl[(r, 3 * c)],
                ctl[(r, 3 * c + 1)],
                ctl[(r, 3 * c + 2)],
            ));
        }
    }
    debug!(rows, cols, order, "interpolated surface");
    SurfaceNurb::from_points([order, order], u, v, [rows, cols], &pts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nodes_are_greville() {
        let kv = KnotVector::uniform_clamped(3, 0.0, 1.0, 2).unwrap();
        // knots 0 0 0 1/3 2/3 1 1 1
        let n = nodes(&kv, 3, 5);
        let expected = [0.0, 1.0 / 6.0, 0.5, 5.0 / 6.0, 1.0];
        for (a, b) in n.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cinterp_passes_through_points() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.5),
            Point3::new(2.0, -1.0, 1.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(5.0, 3.0, -2.0),
        ];
        let crv = cinterp(&pts, 4).unwrap();
        let params = nodes(crv.knots(), 4, pts.len());
        for (p, &t) in pts.iter().zip(params.iter()) {
            assert_relative_eq!(crv.point_at(t).unwrap(), *p, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_cinterp_linear_is_polyline() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let crv = cinterp(&pts, 2).unwrap();
        for (a, b) in crv.ctl_points().iter().zip(pts.iter()) {
            assert!((a.xyz() - b.coords).norm() < 1e-12);
        }
    }

    #[test]
    fn test_cinterp_rejects_bad_input() {
        let pts = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(matches!(cinterp(&pts, 3), Err(NurbError::InvalidMesh(_))));
        assert!(matches!(
            cinterp(&pts, 1),
            Err(NurbError::InsufficientOrder { .. })
        ));
    }

    #[test]
    fn test_sinterp_passes_through_grid() {
        let (rows, cols) = (4, 5);
        let mut grid = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = (c as f64, r as f64);
                grid.push(Point3::new(x, y, (0.5 * x).sin() + 0.2 * x * y));
            }
        }
        let srf = sinterp(&grid, rows, cols, 3).unwrap();
        assert_eq!(srf.s_size(), [rows, cols]);

        let nu = nodes(srf.u_knots(), 3, cols);
        let nv = nodes(srf.v_knots(), 3, rows);
        for r in 0..rows {
            for c in 0..cols {
                assert_relative_eq!(
                    srf.point_at(nu[c], nv[r]).unwrap(),
                    grid[r * cols + c],
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_sinterp_size_mismatch() {
        let grid = vec![Point3::origin(); 5];
        assert!(matches!(
            sinterp(&grid, 2, 3, 2),
            Err(NurbError::InvalidMesh(_))
        ));
    }
}

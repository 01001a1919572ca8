//! Tessellation budgets and the bounded subdivision driver.
//!
//! The step sizes bound the parametric edge length of a flat
//! approximation using the largest second derivative over the control
//! mesh: a chord of length `h` over a curve with second derivative
//! bounded by `D` deviates by at most `D h^2 / 8`.

use brl_kernel_math::{HPoint, SMALL_FASTF};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::curve::CurveNurb;
use crate::flat::{s_flat_tol, FlatTest, DEGENERATE_CORNER_TOL};
use crate::surface::{SplitDir, SurfaceNurb};
use crate::{NurbError, Result};

/// Parameters for recursive subdivision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessParams {
    /// Maximum allowed deviation from the true surface.
    pub epsilon: f64,
    /// Maximum split depth before a patch is accepted as-is.
    pub max_depth: usize,
    /// Degenerate corner triangle threshold for the flatness test.
    pub corner_tol: f64,
}

impl Default for TessParams {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            max_depth: 16,
            corner_tol: DEGENERATE_CORNER_TOL,
        }
    }
}

impl TessParams {
    /// Check that both tolerances are positive and finite.
    pub fn validate(&self) -> Result<()> {
        check_epsilon(self.epsilon)?;
        if !(self.corner_tol > 0.0) || !self.corner_tol.is_finite() {
            return Err(NurbError::InvalidTolerance(format!(
                "corner_tol must be positive and finite, got {}",
                self.corner_tol
            )));
        }
        Ok(())
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn check_epsilon(epsilon: f64) -> Result<()> {
    if !(epsilon > 0.0) || !epsilon.is_finite() {
        return Err(NurbError::InvalidTolerance(format!(
            "epsilon must be positive and finite, got {epsilon}"
        )));
    }
    Ok(())
}

/// Largest Euclidean magnitude of the first three coordinates.
fn max_magnitude(points: &[HPoint]) -> f64 {
    points.iter().map(|p| p.xyz().norm()).fold(0.0, f64::max)
}

/// Largest parametric edge length keeping a flat approximation of `srf`
/// within `epsilon`.
///
/// Uses the maxima `d1`, `d2`, `d3` of `S_uu`, `S_uv` and `S_vv` over the
/// differentiated control meshes:
/// `step = 3 * sqrt(epsilon / (2 * (d1 + 2*d2 + d3)))`.
///
/// A direction of order 2 has a zero pure second derivative. Order 1 in
/// either direction is [`NurbError::InsufficientOrder`]. When every
/// second derivative vanishes (a bilinear patch, for instance) the step
/// is unbounded and `f64::INFINITY` is returned; callers clamp it.
pub fn par_edge(srf: &SurfaceNurb, epsilon: f64) -> Result<f64> {
    check_epsilon(epsilon)?;
    let [uo, vo] = srf.order();
    for order in [uo, vo] {
        if order < 2 {
            return Err(NurbError::InsufficientOrder { order, required: 2 });
        }
    }

    let su = srf.diff(SplitDir::Row)?;
    let d1 = if uo >= 3 {
        max_magnitude(su.diff(SplitDir::Row)?.ctl_points())
    } else {
        0.0
    };
    let d2 = max_magnitude(su.diff(SplitDir::Col)?.ctl_points());
    let d3 = if vo >= 3 {
        max_magnitude(srf.diff(SplitDir::Col)?.diff(SplitDir::Col)?.ctl_points())
    } else {
        0.0
    };

    let denom = 2.0 * d1 + 4.0 * d2 + 2.0 * d3;
    if denom <= SMALL_FASTF {
        debug!(d1, d2, d3, "second derivatives vanish, step is unbounded");
        return Ok(f64::INFINITY);
    }

    let step = 3.0 * (epsilon / denom).sqrt();
    trace!(d1, d2, d3, epsilon, step, "surface edge budget");
    Ok(step)
}

/// Largest parametric step keeping a polyline approximation of `crv`
/// within `epsilon`.
///
/// `None` when no subdivision is needed: the curve has order below 3,
/// every coordinate's second derivative is negligible, or `epsilon` is
/// not positive.
pub fn cnurb_par_edge(crv: &CurveNurb, epsilon: f64) -> Option<f64> {
    if crv.order() < 3 || !(epsilon > 0.0) {
        return None;
    }

    let d2 = crv.diff().ok()?.diff().ok()?;
    let ncoords = crv.point_type().coords();

    let mut der2 = [0.0_f64; 4];
    for p in d2.ctl_points() {
        for (j, d) in der2.iter_mut().enumerate().take(ncoords) {
            *d = d.max(p[j].abs());
        }
    }

    let root_n = (ncoords as f64).sqrt();
    let t = der2[..ncoords]
        .iter()
        .filter(|&&d| d > SMALL_FASTF)
        .map(|&d| (2.0 * epsilon / (root_n * d)).sqrt())
        .fold(f64::INFINITY, f64::min);

    if t.is_finite() {
        Some(t / 2.0)
    } else {
        None
    }
}

/// Recursively split `srf` until every patch passes the flatness test.
///
/// Patches still not flat at `max_depth` are kept as they are and a
/// warning is logged. Patches are returned in depth-first order.
pub fn subdivide(srf: &SurfaceNurb, params: &TessParams) -> Result<Vec<SurfaceNurb>> {
    params.validate()?;

    let mut done = Vec::new();
    let mut stack = vec![(srf.clone(), 0usize)];
    let mut capped = 0usize;

    while let Some((patch, depth)) = stack.pop() {
        let dir = match s_flat_tol(&patch, params.epsilon, params.corner_tol)? {
            FlatTest::Flat => {
                done.push(patch);
                continue;
            }
            FlatTest::SplitRow => SplitDir::Row,
            FlatTest::SplitCol => SplitDir::Col,
        };
        if depth >= params.max_depth {
            capped += 1;
            done.push(patch);
            continue;
        }
        let (left, right) = patch.split(dir)?;
        stack.push((right, depth + 1));
        stack.push((left, depth + 1));
    }

    if capped > 0 {
        warn!(
            capped,
            max_depth = params.max_depth,
            "subdivision hit the depth limit before patches were flat"
        );
    }
    debug!(patches = done.len(), "subdivision finished");
    Ok(done)
}

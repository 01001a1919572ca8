//! Knot vectors: validation, span lookup and basis functions.

use std::ops::Index;

use brl_kernel_math::near_zero;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{NurbError, Result};

/// Parameters within this distance of a domain end are snapped onto it
/// instead of being rejected.
pub const KNOT_SNAP_TOL: f64 = 1.0e-4;

/// A non-decreasing sequence of finite knot values.
///
/// The vector does not know the order or control point count it is used
/// with; those are supplied per call. For a curve of order `k` with `n`
/// control points the length is `n + k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnotVector {
    knots: Vec<f64>,
}

impl KnotVector {
    /// Validate and wrap a knot sequence.
    pub fn new(knots: Vec<f64>) -> Result<Self> {
        if knots.len() < 2 {
            return Err(NurbError::InvalidKnotVector(format!(
                "need at least 2 knots, got {}",
                knots.len()
            )));
        }
        if let Some(bad) = knots.iter().position(|k| !k.is_finite()) {
            return Err(NurbError::InvalidKnotVector(format!(
                "knot {bad} is not finite"
            )));
        }
        if let Some(i) = knots.windows(2).position(|w| w[1] < w[0]) {
            return Err(NurbError::InvalidKnotVector(format!(
                "knots decrease at index {}: {} > {}",
                i + 1,
                knots[i],
                knots[i + 1]
            )));
        }
        Ok(Self { knots })
    }

    /// Clamped knot vector with evenly spaced interior knots.
    ///
    /// `order` copies of `lower`, then `interior` knots splitting
    /// `(lower, upper)` into equal spans, then `order` copies of `upper`.
    /// A curve using it has `order + interior` control points.
    pub fn uniform_clamped(order: usize, lower: f64, upper: f64, interior: usize) -> Result<Self> {
        if order == 0 {
            return Err(NurbError::InsufficientOrder {
                order,
                required: 1,
            });
        }
        if !(upper > lower) {
            return Err(NurbError::InvalidKnotVector(format!(
                "empty interval [{lower}, {upper}]"
            )));
        }

        let mut knots = Vec::with_capacity(2 * order + interior);
        knots.extend(std::iter::repeat(lower).take(order));
        let step = (upper - lower) / (interior + 1) as f64;
        knots.extend((1..=interior).map(|i| lower + step * i as f64));
        knots.extend(std::iter::repeat(upper).take(order));
        Self::new(knots)
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.knots.len()
    }

    /// Always false for a validated vector; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// The raw knot values.
    pub fn as_slice(&self) -> &[f64] {
        &self.knots
    }

    /// Number of knots equal to `value` (within `SMALL_FASTF`).
    pub fn multiplicity(&self, value: f64) -> usize {
        self.knots.iter().filter(|&&k| near_zero(k - value)).count()
    }

    /// Number of control points this vector supports at `order`.
    ///
    /// Zero when the vector is too short for the order.
    pub fn count(&self, order: usize) -> usize {
        self.knots.len().saturating_sub(order)
    }

    /// Valid parameter domain `[knots[order-1], knots[count]]`.
    pub fn domain(&self, order: usize) -> Result<(f64, f64)> {
        let count = self.count(order);
        if order == 0 || count < order {
            return Err(NurbError::InvalidKnotVector(format!(
                "{} knots cannot support order {order}",
                self.knots.len()
            )));
        }
        Ok((self.knots[order - 1], self.knots[count]))
    }

    /// Span index `k` with `knots[k] <= value < knots[k+1]`.
    ///
    /// See [`KnotVector::knot_span`] for the snapping and upper-end rules.
    pub fn knot_index(&self, value: f64, order: usize) -> Result<usize> {
        self.knot_span(value, order).map(|(span, _)| span)
    }

    /// Span index plus the parameter actually used for evaluation.
    ///
    /// Values within [`KNOT_SNAP_TOL`] outside the domain are snapped
    /// onto the nearer end; anything further out is
    /// [`NurbError::ParameterOutOfRange`]. At the upper end the last
    /// non-empty span is returned so the closing point of the domain
    /// still evaluates.
    pub fn knot_span(&self, value: f64, order: usize) -> Result<(usize, f64)> {
        let (lo, hi) = self.domain(order)?;
        let count = self.count(order);

        if lo >= hi {
            return Err(NurbError::InvalidKnotVector(format!(
                "empty domain [{lo}, {hi}]"
            )));
        }

        let mut t = value;
        if t.is_nan() {
            return Err(NurbError::ParameterOutOfRange { value, lo, hi });
        }
        if t < lo {
            if lo - t > KNOT_SNAP_TOL {
                return Err(NurbError::ParameterOutOfRange { value, lo, hi });
            }
            trace!(value, lo, "snapping parameter to domain start");
            t = lo;
        } else if t > hi {
            if t - hi > KNOT_SNAP_TOL {
                return Err(NurbError::ParameterOutOfRange { value, lo, hi });
            }
            trace!(value, hi, "snapping parameter to domain end");
            t = hi;
        }

        if t >= hi {
            let mut span = count - 1;
            while span > order - 1 && self.knots[span] >= self.knots[span + 1] {
                span -= 1;
            }
            return Ok((span, t));
        }

        // knots[order-1] <= t < knots[count], so the result lies in
        // [order-1, count-1]
        let span = self.knots[..=count].partition_point(|&k| k <= t) - 1;
        Ok((span, t))
    }
}

impl Index<usize> for KnotVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.knots[i]
    }
}

/// Value of the B-spline basis function `N(interval, order)` at `mu`.
///
/// Cox-de Boor recursion. Supports are half-open, so every basis
/// function is zero at the very end of a clamped domain; callers that
/// sample there must patch the last entry themselves. Terms whose knot
/// span has zero width drop out. A basis function whose support runs
/// past the end of `kv` is 0.
pub fn basis_eval(kv: &KnotVector, interval: usize, order: usize, mu: f64) -> f64 {
    let k = kv.as_slice();
    if interval + order.max(1) >= k.len() {
        return 0.0;
    }
    if order <= 1 {
        return if k[interval] <= mu && mu < k[interval + 1] {
            1.0
        } else {
            0.0
        };
    }

    let mut value = 0.0;

    let den = k[interval + order - 1] - k[interval];
    if !near_zero(den) {
        value += (mu - k[interval]) * basis_eval(kv, interval, order - 1, mu) / den;
    }

    let den = k[interval + order] - k[interval + 1];
    if !near_zero(den) {
        value += (k[interval + order] - mu) * basis_eval(kv, interval + 1, order - 1, mu) / den;
    }

    value
}

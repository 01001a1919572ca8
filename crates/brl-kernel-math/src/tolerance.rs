//! Distance and angular tolerances shared by the geometry routines.

use serde::{Deserialize, Serialize};

use crate::{MathError, Point3, Result};

/// Default distance tolerance for coincident-point checks.
pub const DEFAULT_DIST_TOL: f64 = 0.005;

/// Default perpendicularity tolerance (cosine of the angle).
pub const DEFAULT_PERP_TOL: f64 = 1.0e-6;

/// Tolerance bundle for geometric comparisons.
///
/// `dist_sq` is kept equal to `dist * dist` and `para` to `1 - perp`
/// by every constructor in this module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Absolute distance tolerance.
    pub dist: f64,
    /// Square of `dist`.
    pub dist_sq: f64,
    /// Cosine threshold below which two directions count as perpendicular.
    pub perp: f64,
    /// `1 - perp`; cosines above this count as parallel.
    pub para: f64,
}

impl Tolerance {
    /// Default tolerances (`dist = 0.005`, `perp = 1e-6`).
    pub const DEFAULT: Self = Self {
        dist: DEFAULT_DIST_TOL,
        dist_sq: DEFAULT_DIST_TOL * DEFAULT_DIST_TOL,
        perp: DEFAULT_PERP_TOL,
        para: 1.0 - DEFAULT_PERP_TOL,
    };

    /// Build a tolerance from a distance and a perpendicularity threshold.
    pub fn new(dist: f64, perp: f64) -> Self {
        Self {
            dist,
            dist_sq: dist * dist,
            perp,
            para: 1.0 - perp,
        }
    }

    /// Check the derived fields and ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.dist >= 0.0) || !self.dist.is_finite() {
            return Err(MathError::InvalidTolerance(format!(
                "distance tolerance must be finite and >= 0, got {}",
                self.dist
            )));
        }
        if !(0.0..1.0).contains(&self.perp) {
            return Err(MathError::InvalidTolerance(format!(
                "perpendicular tolerance must lie in [0, 1), got {}",
                self.perp
            )));
        }
        if (self.dist_sq - self.dist * self.dist).abs() > 4.0 * f64::EPSILON * self.dist_sq.max(1.0)
            || (self.para + self.perp - 1.0).abs() > 4.0 * f64::EPSILON
        {
            return Err(MathError::InvalidTolerance(
                "dist_sq/para are inconsistent with dist/perp".into(),
            ));
        }
        Ok(())
    }

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (b - a).norm_squared() < self.dist_sq
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() <= self.dist
    }

    /// Check if a cosine means "perpendicular".
    pub fn is_perp(&self, dot: f64) -> bool {
        dot.abs() <= self.perp
    }

    /// Check if a cosine means "parallel" (either orientation).
    pub fn is_parallel(&self, dot: f64) -> bool {
        dot.abs() >= self.para
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

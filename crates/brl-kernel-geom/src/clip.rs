//! Line segment clipping against axis-aligned boxes.

use brl_kernel_math::{Point2, Point3, SQRT_SMALL_FASTF};

/// Outcode bit: left of the box (`x < min.x`).
pub const CLIP_LEFT: u8 = 0x1;
/// Outcode bit: right of the box (`x > max.x`).
pub const CLIP_RIGHT: u8 = 0x2;
/// Outcode bit: below the box (`y < min.y`).
pub const CLIP_BOTTOM: u8 = 0x4;
/// Outcode bit: above the box (`y > max.y`).
pub const CLIP_TOP: u8 = 0x8;

/// Cohen-Sutherland outcode of `(x, y)` against `[min, max]`.
pub fn clip_code(x: f64, y: f64, min: &Point2, max: &Point2) -> u8 {
    let mut code = 0;
    if x < min.x {
        code |= CLIP_LEFT;
    } else if x > max.x {
        code |= CLIP_RIGHT;
    }
    if y < min.y {
        code |= CLIP_BOTTOM;
    } else if y > max.y {
        code |= CLIP_TOP;
    }
    code
}

/// Clip the segment `p1 -> p2` to the box `[min, max]`.
///
/// Returns `false` when the segment lies entirely outside, leaving the
/// endpoints untouched. Otherwise the endpoints are moved onto the box
/// as needed and `true` is returned; `p1` remains the start.
///
/// Each pass clips the outside endpoint against one edge, tested left,
/// right, bottom, top, then recomputes its outcode. A corner-crossing
/// segment therefore lands on the first matching edge first.
pub fn clip_segment(p1: &mut Point2, p2: &mut Point2, min: &Point2, max: &Point2) -> bool {
    let mut a = *p1;
    let mut b = *p2;
    let mut code1 = clip_code(a.x, a.y, min, max);
    let mut code2 = clip_code(b.x, b.y, min, max);
    let mut swapped = false;

    while code1 != 0 || code2 != 0 {
        if code1 & code2 != 0 {
            return false;
        }

        // keep the outside point in `a`
        if code1 == 0 {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut code1, &mut code2);
            swapped = !swapped;
        }

        if code1 & CLIP_LEFT != 0 {
            a.y += (b.y - a.y) * (min.x - a.x) / (b.x - a.x);
            a.x = min.x;
        } else if code1 & CLIP_RIGHT != 0 {
            a.y += (b.y - a.y) * (max.x - a.x) / (b.x - a.x);
            a.x = max.x;
        } else if code1 & CLIP_BOTTOM != 0 {
            a.x += (b.x - a.x) * (min.y - a.y) / (b.y - a.y);
            a.y = min.y;
        } else if code1 & CLIP_TOP != 0 {
            a.x += (b.x - a.x) * (max.y - a.y) / (b.y - a.y);
            a.y = max.y;
        }

        code1 = clip_code(a.x, a.y, min, max);
    }

    if swapped {
        std::mem::swap(&mut a, &mut b);
    }
    *p1 = a;
    *p2 = b;
    true
}

/// Clip the segment `a -> b` to the box `[min, max]` with slab tests.
///
/// The parametric interval `[mindist, maxdist]` along `b - a` is
/// narrowed one axis at a time; an axis where the segment barely moves
/// is handled by a containment test on `a`. Returns `false` on a miss.
/// On a hit only the ends that actually leave the box are moved, so a
/// segment already inside is returned unchanged.
pub fn clip_ray_to_box(a: &mut Point3, b: &mut Point3, min: &Point3, max: &Point3) -> bool {
    let diff = *b - *a;
    let mut mindist = f64::NEG_INFINITY;
    let mut maxdist = f64::INFINITY;

    for i in 0..3 {
        let (pt, dir) = (a[i], diff[i]);
        if dir < -SQRT_SMALL_FASTF {
            let sv = (min[i] - pt) / dir;
            if sv < 0.0 {
                return false;
            }
            maxdist = maxdist.min(sv);
            mindist = mindist.max((max[i] - pt) / dir);
        } else if dir > SQRT_SMALL_FASTF {
            let st = (max[i] - pt) / dir;
            if st < 0.0 {
                return false;
            }
            maxdist = maxdist.min(st);
            mindist = mindist.max((min[i] - pt) / dir);
        } else if min[i] > pt || max[i] < pt {
            return false;
        }
    }

    if mindist >= maxdist || mindist > 1.0 || maxdist < 0.0 {
        return false;
    }

    // b first: it is computed from the unclipped a
    let start = *a;
    if maxdist < 1.0 {
        *b = start + diff * maxdist;
    }
    if mindist > 0.0 {
        *a = start + diff * mindist;
    }
    true
}

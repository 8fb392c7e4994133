//! Geometry predicates for the horizontal sweep.
//!
//! The sweep direction is horizontal: vertices are ordered by
//! `(y ascending, then x ascending)`, so "top" means smaller y. Segments
//! handed to the side predicates are always oriented upper end first.
//!
//! Orientation tests accumulate in f64; the input coordinates are f32 so
//! the widened cross products are exact enough for stable comparisons.

use crate::math::Point;

/// Relative threshold below which two slopes are considered identical
/// by the intersection calculator. Tunable.
pub(crate) const PARALLEL_EPSILON: f64 = 1e-6;

/// Absolute threshold below which a coordinate delta counts as zero when
/// the sweep snaps a drifted intersection onto a known vertex.
pub(crate) const NEAR_ZERO: f32 = 1e-6;

#[inline]
pub(crate) fn near_zero(v: f32) -> bool {
    v.abs() < NEAR_ZERO
}

/// `a <= b` in sweep order.
#[inline]
pub(crate) fn point_leq(a: Point, b: Point) -> bool {
    a.y < b.y || (a.y == b.y && a.x <= b.x)
}

/// `a < b` in sweep order.
#[inline]
pub(crate) fn point_le(a: Point, b: Point) -> bool {
    a.y < b.y || (a.y == b.y && a.x < b.x)
}

/// `a` is strictly above `b`.
#[inline]
pub(crate) fn in_top(a: Point, b: Point) -> bool {
    a.y < b.y
}

/// `a` is above `b` or at the same height.
#[inline]
pub(crate) fn in_top_or_horizontal(a: Point, b: Point) -> bool {
    a.y <= b.y
}

/// `a` is above `b`, or at the same height on its left.
#[inline]
pub(crate) fn in_top_or_hleft(a: Point, b: Point) -> bool {
    point_le(a, b)
}

/// `a` is above `b`, at the same height on its left, or equal to it.
#[inline]
pub(crate) fn in_top_or_hleft_or_eq(a: Point, b: Point) -> bool {
    point_leq(a, b)
}

/// Twice the signed area of the triangle `(a, b, c)`, widened to f64.
#[inline]
fn double_area(a: Point, b: Point, c: Point) -> f64 {
    let abx = b.x as f64 - a.x as f64;
    let aby = b.y as f64 - a.y as f64;
    let acx = c.x as f64 - a.x as f64;
    let acy = c.y as f64 - a.y as f64;
    abx * acy - aby * acx
}

/// Sign of the horizontal distance from `v` to the segment
/// `(upper, lower)` at height `v.y`: negative on the left, zero on the
/// segment, positive on the right.
#[inline]
pub(crate) fn to_segment_position_h(v: Point, upper: Point, lower: Point) -> f64 {
    double_area(upper, v, lower)
}

/// Sign of the vertical distance from `v` to the segment `(left, right)`
/// at abscissa `v.x`: negative above, zero on the segment, positive
/// below.
#[inline]
pub(crate) fn to_segment_position_v(v: Point, left: Point, right: Point) -> f64 {
    double_area(left, right, v)
}

/// `v` lies exactly on the segment `(upper, lower)` in the
/// sweep-perpendicular sense (horizontal distance is zero).
#[inline]
pub(crate) fn on_segment(v: Point, upper: Point, lower: Point) -> bool {
    to_segment_position_h(v, upper, lower) == 0.0
}

#[inline]
pub(crate) fn in_segment_left(v: Point, upper: Point, lower: Point) -> bool {
    to_segment_position_h(v, upper, lower) < 0.0
}

#[inline]
pub(crate) fn on_segment_or_left(v: Point, upper: Point, lower: Point) -> bool {
    to_segment_position_h(v, upper, lower) <= 0.0
}

#[inline]
pub(crate) fn in_segment_right(v: Point, upper: Point, lower: Point) -> bool {
    to_segment_position_h(v, upper, lower) > 0.0
}

#[inline]
pub(crate) fn on_segment_or_right(v: Point, upper: Point, lower: Point) -> bool {
    to_segment_position_h(v, upper, lower) >= 0.0
}

#[inline]
pub(crate) fn in_segment_top(v: Point, left: Point, right: Point) -> bool {
    to_segment_position_v(v, left, right) < 0.0
}

#[inline]
pub(crate) fn on_segment_or_top(v: Point, left: Point, right: Point) -> bool {
    to_segment_position_v(v, left, right) <= 0.0
}

#[inline]
pub(crate) fn in_segment_bottom(v: Point, left: Point, right: Point) -> bool {
    to_segment_position_v(v, left, right) > 0.0
}

#[inline]
pub(crate) fn on_segment_or_bottom(v: Point, left: Point, right: Point) -> bool {
    to_segment_position_v(v, left, right) >= 0.0
}

/// Signed horizontal distance from `v` to the segment `(upper, lower)`
/// at height `v.y`.
pub(crate) fn to_segment_distance_h(v: Point, upper: Point, lower: Point) -> f32 {
    let dy = lower.y - upper.y;
    if dy == 0.0 {
        return v.x - upper.x;
    }
    let t = (v.y - upper.y) / dy;
    v.x - (upper.x + (lower.x - upper.x) * t)
}

/// The three points turn counter-clockwise (as seen on screen, with y
/// pointing down).
///
/// The inside faces built by the sweep wind this way, so this is the
/// test the convex merger uses to accept a corner.
#[inline]
pub(crate) fn is_ccw(a: Point, b: Point, c: Point) -> bool {
    double_area(a, b, c) < 0.0
}

/// Outcome of the segment intersection calculator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum SegmentIntersection {
    /// A well-defined interior intersection.
    Point(Point),
    /// The slopes are too close to tell apart; the caller should fall
    /// back to the bottom-order fix instead.
    NearParallel,
    /// No intersection.
    None,
}

/// Computes the intersection of the segments `(org1, dst1)` and
/// `(org2, dst2)`.
///
/// The returned point is clamped into the intersection of the two
/// segments' bounding ranges so it cannot violate the sweep ordering
/// relative to either endpoint.
pub(crate) fn segment_intersection(
    org1: Point,
    dst1: Point,
    org2: Point,
    dst2: Point,
) -> SegmentIntersection {
    let d1x = dst1.x as f64 - org1.x as f64;
    let d1y = dst1.y as f64 - org1.y as f64;
    let d2x = dst2.x as f64 - org2.x as f64;
    let d2y = dst2.y as f64 - org2.y as f64;

    let denom = d1x * d2y - d1y * d2x;
    let magnitude = (d1x.abs() + d1y.abs()) * (d2x.abs() + d2y.abs());
    if denom.abs() <= PARALLEL_EPSILON * magnitude {
        return SegmentIntersection::NearParallel;
    }

    let wx = org2.x as f64 - org1.x as f64;
    let wy = org2.y as f64 - org1.y as f64;
    let t = (wx * d2y - wy * d2x) / denom;
    let s = (wx * d1y - wy * d1x) / denom;

    const SLACK: f64 = 1e-6;
    if t < -SLACK || t > 1.0 + SLACK || s < -SLACK || s > 1.0 + SLACK {
        return SegmentIntersection::None;
    }

    // The intersection of the bounding ranges is non-empty when the
    // segments really cross; drifted coordinates are pulled back in.
    let min_x = fmax(fmin(org1.x, dst1.x), fmin(org2.x, dst2.x));
    let max_x = fmin(fmax(org1.x, dst1.x), fmax(org2.x, dst2.x));
    let min_y = fmax(fmin(org1.y, dst1.y), fmin(org2.y, dst2.y));
    let max_y = fmin(fmax(org1.y, dst1.y), fmax(org2.y, dst2.y));
    if min_x > max_x || min_y > max_y {
        return SegmentIntersection::None;
    }

    let x = ((org1.x as f64 + d1x * t) as f32).max(min_x).min(max_x);
    let y = ((org1.y as f64 + d1y * t) as f32).max(min_y).min(max_y);
    SegmentIntersection::Point(Point::new(x, y))
}

#[inline]
fn fmin(a: f32, b: f32) -> f32 {
    if a < b {
        a
    } else {
        b
    }
}

#[inline]
fn fmax(a: f32, b: f32) -> f32 {
    if a > b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point;

    #[test]
    fn sweep_order() {
        assert!(point_le(point(0.0, 0.0), point(1.0, 0.0)));
        assert!(point_le(point(1.0, 0.0), point(0.0, 1.0)));
        assert!(point_leq(point(1.0, 1.0), point(1.0, 1.0)));
        assert!(!point_le(point(1.0, 1.0), point(1.0, 1.0)));
        assert!(in_top(point(5.0, 0.0), point(0.0, 1.0)));
        assert!(in_top_or_horizontal(point(5.0, 1.0), point(0.0, 1.0)));
    }

    #[test]
    fn segment_sides() {
        // A vertical segment from (0, 0) down to (0, 2).
        let upper = point(0.0, 0.0);
        let lower = point(0.0, 2.0);
        assert!(in_segment_left(point(-1.0, 1.0), upper, lower));
        assert!(in_segment_right(point(1.0, 1.0), upper, lower));
        assert!(on_segment(point(0.0, 1.0), upper, lower));
        assert!(on_segment_or_left(point(0.0, 1.0), upper, lower));
        assert!(on_segment_or_right(point(0.0, 1.0), upper, lower));
    }

    #[test]
    fn segment_vertical_sides() {
        let left = point(0.0, 0.0);
        let right = point(2.0, 0.0);
        assert!(in_segment_top(point(1.0, -1.0), left, right));
        assert!(in_segment_bottom(point(1.0, 1.0), left, right));
        assert!(on_segment_or_top(point(1.0, 0.0), left, right));
        assert!(on_segment_or_bottom(point(1.0, 0.0), left, right));
    }

    #[test]
    fn ccw_matches_inside_face_orientation() {
        // Left boundary of an inside face goes down, so a left-bottom
        // corner turns like this.
        assert!(is_ccw(point(0.0, 0.0), point(0.0, 1.0), point(1.0, 1.0)));
        assert!(!is_ccw(point(1.0, 1.0), point(0.0, 1.0), point(0.0, 0.0)));
    }

    #[test]
    fn horizontal_distance() {
        let upper = point(0.0, 0.0);
        let lower = point(2.0, 2.0);
        assert_eq!(to_segment_distance_h(point(3.0, 2.0), upper, lower), 1.0);
        assert_eq!(to_segment_distance_h(point(1.0, 1.0), upper, lower), 0.0);
    }

    #[test]
    fn intersection_general() {
        let result = segment_intersection(
            point(0.0, 1.0),
            point(1.0, 0.0),
            point(1.0, 1.0),
            point(0.0, 0.0),
        );
        assert_eq!(result, SegmentIntersection::Point(point(0.5, 0.5)));
    }

    #[test]
    fn intersection_near_parallel() {
        let result = segment_intersection(
            point(0.0, 0.0),
            point(0.0, 10.0),
            point(1.0, 0.0),
            point(1.0, 10.0),
        );
        assert_eq!(result, SegmentIntersection::NearParallel);
    }

    #[test]
    fn intersection_disjoint() {
        let result = segment_intersection(
            point(0.0, 0.0),
            point(1.0, 1.0),
            point(3.0, 0.0),
            point(2.0, 1.0),
        );
        assert_eq!(result, SegmentIntersection::None);
    }

    #[test]
    fn intersection_stays_in_both_ranges() {
        let result = segment_intersection(
            point(0.0, 4.0),
            point(2.0, 0.0),
            point(2.0, 4.0),
            point(0.0, 0.0),
        );
        match result {
            SegmentIntersection::Point(p) => {
                assert!(p.x >= 0.0 && p.x <= 2.0);
                assert!(p.y >= 0.0 && p.y <= 4.0);
            }
            _ => panic!("expected an intersection, got {:?}", result),
        }
    }
}

//! Dimension-generic adaptive subdivision of cubic beziers.
//!
//! The subdivision tracks the parametric t of each emitted vertex in a fixed
//! 30-bit range. Recursion stops either when the control points hug the chord
//! within the requested precision or when the t-span drops below bit
//! resolution, which bounds the depth unconditionally.

use crate::foundation::core::Point3D;
use crate::foundation::math::{lerp_point, lerp_point3};
use kurbo::Point;

/// Upper bound of the fixed-point t range.
pub(crate) const MAX_BEZIER_T: u32 = 0x3FFF_FFFF;

/// One vertex of the polyline approximation. `distance` and `t_value` are
/// cumulative and strictly monotone along the segment list.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Segment<P> {
    pub(crate) position: P,
    pub(crate) distance: f64,
    pub(crate) t_value: u32,
}

/// Point operations the subdivision needs, implemented per dimensionality.
pub(crate) trait CurvePoint: Copy {
    fn lerp(a: Self, b: Self, t: f64) -> Self;
    fn distance(a: Self, b: Self) -> f64;
    /// Signed-area / offset colinearity test against the chord `a -> b`.
    fn on_line(a: Self, b: Self, point: Self, precision: f64) -> bool;
    /// Chebyshev distance, used by the "too curvy" chord test.
    fn deviation_exceeds(a: Self, b: Self, precision: f64) -> bool;
}

impl CurvePoint for Point {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        lerp_point(a, b, t)
    }

    fn distance(a: Self, b: Self) -> f64 {
        a.distance(b)
    }

    fn on_line(a: Self, b: Self, point: Self, precision: f64) -> bool {
        let area = a.x * b.y + a.y * point.x + b.x * point.y
            - point.x * b.y
            - point.y * a.x
            - b.x * a.y;
        area.abs() < precision
    }

    fn deviation_exceeds(a: Self, b: Self, precision: f64) -> bool {
        (b.x - a.x).abs().max((b.y - a.y).abs()) > precision
    }
}

impl CurvePoint for Point3D {
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        lerp_point3(a, b, t)
    }

    fn distance(a: Self, b: Self) -> f64 {
        a.distance(b)
    }

    fn on_line(a: Self, b: Self, point: Self, precision: f64) -> bool {
        // Colinear iff the chord-to-point cross product vanishes.
        let u = (b.x - a.x, b.y - a.y, b.z - a.z);
        let v = (point.x - a.x, point.y - a.y, point.z - a.z);
        let cross = (
            u.1 * v.2 - u.2 * v.1,
            u.2 * v.0 - u.0 * v.2,
            u.0 * v.1 - u.1 * v.0,
        );
        cross.0.abs() < precision && cross.1.abs() < precision && cross.2.abs() < precision
    }

    fn deviation_exceeds(a: Self, b: Self, precision: f64) -> bool {
        (b.x - a.x)
            .abs()
            .max((b.y - a.y).abs())
            .max((b.z - a.z).abs())
            > precision
    }
}

fn t_span_big_enough(span: u32) -> bool {
    (span >> 10) != 0
}

/// Split the cubic at `t`, yielding the two sub-cubics `result[0..=3]` and
/// `result[3..=6]`.
fn split_cubic_at<P: CurvePoint>(points: &[P; 4], t: f64) -> [P; 7] {
    let p1 = P::lerp(points[0], points[1], t);
    let bc = P::lerp(points[1], points[2], t);
    let p5 = P::lerp(points[2], points[3], t);
    let p2 = P::lerp(p1, bc, t);
    let p4 = P::lerp(bc, p5, t);
    let mid = P::lerp(p2, p4, t);
    [points[0], p1, p2, mid, p4, p5, points[3]]
}

fn too_curvy<P: CurvePoint>(points: &[P; 4], precision: f64) -> bool {
    let pt1 = P::lerp(points[0], points[3], 1.0 / 3.0);
    let pt2 = P::lerp(points[0], points[3], 2.0 / 3.0);
    P::deviation_exceeds(points[1], pt1, precision) || P::deviation_exceeds(points[2], pt2, precision)
}

fn build_rec<P: CurvePoint>(
    points: &[P; 4],
    mut distance: f64,
    min_t: u32,
    max_t: u32,
    precision: f64,
    segments: &mut Vec<Segment<P>>,
) -> f64 {
    if t_span_big_enough(max_t - min_t) && too_curvy(points, precision) {
        let half_t = (min_t + max_t) >> 1;
        let halves = split_cubic_at(points, 0.5);
        let left: [P; 4] = [halves[0], halves[1], halves[2], halves[3]];
        let right: [P; 4] = [halves[3], halves[4], halves[5], halves[6]];
        distance = build_rec(&left, distance, min_t, half_t, precision, segments);
        distance = build_rec(&right, distance, half_t, max_t, precision, segments);
    } else {
        distance += P::distance(points[0], points[3]);
        segments.push(Segment {
            position: points[3],
            distance,
            t_value: max_t,
        });
    }
    distance
}

/// Build the polyline approximation for one cubic. Returns the segment list
/// (first entry is the start point at distance 0) and the total arc length.
pub(crate) fn build_segments<P: CurvePoint>(
    points: &[P; 4],
    precision: f64,
) -> (Vec<Segment<P>>, f64) {
    let mut segments = vec![Segment {
        position: points[0],
        distance: 0.0,
        t_value: 0,
    }];

    let colinear = P::on_line(points[0], points[3], points[1], precision)
        && P::on_line(points[0], points[3], points[2], precision);
    let length = if colinear {
        let length = P::distance(points[0], points[3]);
        segments.push(Segment {
            position: points[3],
            distance: length,
            t_value: MAX_BEZIER_T,
        });
        length
    } else {
        build_rec(points, 0.0, 0, MAX_BEZIER_T, precision, &mut segments)
    };
    (segments, length)
}

/// Locate the two segments bracketing `distance` and the interpolation
/// fraction between them.
pub(crate) fn find_segment_at_distance<P: CurvePoint>(
    segments: &[Segment<P>],
    distance: f64,
) -> (usize, usize, f64) {
    let mut start = 0;
    let mut end = segments.len() - 1;
    while end - start > 1 {
        let middle = (start + end) >> 1;
        if distance < segments[middle].distance {
            end = middle;
        } else {
            start = middle;
        }
    }
    let span = segments[end].distance - segments[start].distance;
    let fraction = if span == 0.0 {
        0.0
    } else {
        (distance - segments[start].distance) / span
    };
    (start, end, fraction)
}

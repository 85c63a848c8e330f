//! 2D cubic bezier evaluator, shared through the global weak cache.

use std::sync::{Arc, OnceLock};

use kurbo::Point;

use crate::bezier::curve::{self, MAX_BEZIER_T, Segment};
use crate::bezier::key::BezierKey;
use crate::bezier::shared_cache::SharedCache;
use crate::foundation::error::{StillframeError, StillframeResult};
use crate::foundation::math::lerp;

/// Arc-length parameterized polyline approximation of one 2D cubic bezier.
///
/// Instances are immutable and shared: [`BezierPath::build`] returns the same
/// `Arc` for geometrically indistinguishable curves at the same precision, as
/// long as at least one strong reference is alive.
#[derive(Debug)]
pub struct BezierPath {
    segments: Vec<Segment<Point>>,
    length: f64,
}

fn global_cache() -> &'static SharedCache<BezierKey, BezierPath> {
    static CACHE: OnceLock<SharedCache<BezierKey, BezierPath>> = OnceLock::new();
    CACHE.get_or_init(SharedCache::new)
}

pub(crate) fn validate_precision(precision: f64) -> StillframeResult<()> {
    if !(precision > 0.0) || !precision.is_finite() {
        return Err(StillframeError::invalid_argument(format!(
            "bezier precision must be finite and > 0, got {precision}"
        )));
    }
    Ok(())
}

impl BezierPath {
    /// Build (or fetch from the process-wide cache) the evaluator for the
    /// cubic `start, control1, control2, end` at `precision`.
    pub fn build(
        start: Point,
        control1: Point,
        control2: Point,
        end: Point,
        precision: f64,
    ) -> StillframeResult<Arc<Self>> {
        Self::build_in(global_cache(), start, control1, control2, end, precision)
    }

    /// Like [`BezierPath::build`] but against an explicit cache instance.
    pub fn build_in(
        cache: &SharedCache<BezierKey, BezierPath>,
        start: Point,
        control1: Point,
        control2: Point,
        end: Point,
        precision: f64,
    ) -> StillframeResult<Arc<Self>> {
        validate_precision(precision)?;
        let points = [start, control1, control2, end];
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(StillframeError::invalid_argument(
                "bezier control points must be finite",
            ));
        }

        let key = BezierKey::make(&points, precision);
        if let Some(existing) = cache.get(&key) {
            return Ok(existing);
        }

        // The lock is not held while subdividing; a racing builder for the
        // same key just constructs its own copy and the last insert wins.
        let (segments, length) = curve::build_segments(&points, precision);
        tracing::trace!(segments = segments.len(), length, "built bezier path");
        let path = Arc::new(Self { segments, length });
        cache.insert(key, &path);
        Ok(path)
    }

    /// Total arc length of the curve.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Number of polyline vertices (test instrumentation).
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Point at `percent` of the arc length, clamped to `[0, 1]`.
    pub fn position(&self, percent: f64) -> Point {
        if percent <= 0.0 {
            return self.segments[0].position;
        }
        if percent >= 1.0 {
            return self.segments[self.segments.len() - 1].position;
        }
        let (start, end, fraction) =
            curve::find_segment_at_distance(&self.segments, self.length * percent);
        curve::CurvePoint::lerp(
            self.segments[start].position,
            self.segments[end].position,
            fraction,
        )
    }

    /// Normalized parametric t at `percent` of the arc length.
    pub fn t(&self, percent: f64) -> f64 {
        if percent <= 0.0 {
            return 0.0;
        }
        if percent >= 1.0 {
            return 1.0;
        }
        let (start, end, fraction) =
            curve::find_segment_at_distance(&self.segments, self.length * percent);
        lerp(
            f64::from(self.segments[start].t_value),
            f64::from(self.segments[end].t_value),
            fraction,
        ) / f64::from(MAX_BEZIER_T)
    }

    /// For curves monotone in x (1D easing): the y value at `x`.
    pub fn y(&self, x: f64) -> f64 {
        let (start, end) = self.bracket(|p| p.x, x);
        let a = self.segments[start].position;
        let b = self.segments[end].position;
        let range = b.x - a.x;
        if range == 0.0 {
            return a.y;
        }
        lerp(a.y, b.y, (x - a.x) / range)
    }

    /// For curves monotone in y: the x value at `y`.
    pub fn x(&self, y: f64) -> f64 {
        let (start, end) = self.bracket(|p| p.y, y);
        let a = self.segments[start].position;
        let b = self.segments[end].position;
        let range = b.y - a.y;
        if range == 0.0 {
            return a.x;
        }
        lerp(a.x, b.x, (y - a.y) / range)
    }

    fn bracket(&self, axis: impl Fn(Point) -> f64, value: f64) -> (usize, usize) {
        let mut start = 0;
        let mut end = self.segments.len() - 1;
        while end - start > 1 {
            let middle = (start + end) >> 1;
            if value < axis(self.segments[middle].position) {
                end = middle;
            } else {
                start = middle;
            }
        }
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_ease() -> Arc<BezierPath> {
        BezierPath::build(
            Point::new(0.0, 0.0),
            Point::new(0.42, 0.0),
            Point::new(0.58, 1.0),
            Point::new(1.0, 1.0),
            0.005,
        )
        .unwrap()
    }

    #[test]
    fn invalid_precision_fails_fast() {
        let p = Point::new(0.0, 0.0);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = BezierPath::build(p, p, p, p, bad).unwrap_err();
            assert!(matches!(err, StillframeError::InvalidArgument(_)));
        }
    }

    #[test]
    fn non_finite_points_fail_fast() {
        let p = Point::new(0.0, 0.0);
        let err =
            BezierPath::build(p, Point::new(f64::NAN, 0.0), p, p, 0.005).unwrap_err();
        assert!(matches!(err, StillframeError::InvalidArgument(_)));
    }

    #[test]
    fn build_returns_cached_instance_while_alive() {
        let a = unit_ease();
        let b = unit_ease();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn colinear_fast_path_is_a_chord() {
        let path = BezierPath::build(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
            0.01,
        )
        .unwrap();
        assert_eq!(path.segment_count(), 2);
        let chord = Point::new(0.0, 0.0).distance(Point::new(3.0, 3.0));
        assert!((path.length() - chord).abs() < 0.01);
    }

    #[test]
    fn position_hits_endpoints_and_is_continuous() {
        let path = BezierPath::build(
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            0.005,
        )
        .unwrap();
        assert_eq!(path.position(0.0), Point::new(0.0, 0.0));
        assert_eq!(path.position(1.0), Point::new(1.0, 1.0));

        // Sweep across every internal segment boundary: adjacent samples must
        // stay close (no discontinuity at a distance boundary).
        let mut prev = path.position(0.0);
        let steps = 1000;
        for i in 1..=steps {
            let cur = path.position(i as f64 / steps as f64);
            assert!(prev.distance(cur) < 0.05, "jump at step {i}");
            prev = cur;
        }
    }

    #[test]
    fn t_is_monotone_in_percent() {
        let path = unit_ease();
        let mut prev = path.t(0.0);
        for i in 1..=100 {
            let cur = path.t(i as f64 / 100.0);
            assert!(cur >= prev);
            prev = cur;
        }
        assert_eq!(path.t(0.0), 0.0);
        assert_eq!(path.t(1.0), 1.0);
    }

    #[test]
    fn y_of_x_matches_easing_endpoints() {
        let path = unit_ease();
        assert!(path.y(0.0).abs() < 1e-6);
        assert!((path.y(1.0) - 1.0).abs() < 1e-6);
        let mid = path.y(0.5);
        assert!(mid > 0.4 && mid < 0.6);
        // x(y) inverts y(x) within tolerance on a monotone curve.
        assert!((path.x(mid) - 0.5).abs() < 0.01);
    }

    #[test]
    fn isolated_cache_rebuilds_after_all_strong_refs_drop() {
        let cache = SharedCache::new();
        let build = |cache: &SharedCache<_, _>| {
            BezierPath::build_in(
                cache,
                Point::new(0.0, 0.0),
                Point::new(0.1, 0.9),
                Point::new(0.9, 0.1),
                Point::new(1.0, 1.0),
                0.005,
            )
            .unwrap()
        };
        let first = build(&cache);
        let again = build(&cache);
        assert!(Arc::ptr_eq(&first, &again));

        drop(first);
        drop(again);
        let fresh = build(&cache);
        // All strong references were gone, so this is a new instance.
        assert_eq!(cache.len(), 1);
        let same = build(&cache);
        assert!(Arc::ptr_eq(&fresh, &same));
    }
}

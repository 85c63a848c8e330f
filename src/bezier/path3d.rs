//! 3D cubic bezier evaluator for spatial motion paths.

use std::sync::{Arc, OnceLock};

use crate::bezier::curve::{self, CurvePoint as _, MAX_BEZIER_T, Segment};
use crate::bezier::key::BezierKey3D;
use crate::bezier::path::validate_precision;
use crate::bezier::shared_cache::SharedCache;
use crate::foundation::core::Point3D;
use crate::foundation::error::{StillframeError, StillframeResult};
use crate::foundation::math::lerp;

/// Arc-length parameterized polyline approximation of one 3D cubic bezier.
///
/// Deduplicated through its own process-wide weak cache, independent of the
/// 2D easing cache.
#[derive(Debug)]
pub struct BezierPath3D {
    segments: Vec<Segment<Point3D>>,
    length: f64,
}

fn global_cache() -> &'static SharedCache<BezierKey3D, BezierPath3D> {
    static CACHE: OnceLock<SharedCache<BezierKey3D, BezierPath3D>> = OnceLock::new();
    CACHE.get_or_init(SharedCache::new)
}

impl BezierPath3D {
    /// Build (or fetch from the process-wide cache) the evaluator for the
    /// cubic `start, control1, control2, end` at `precision`.
    pub fn build(
        start: Point3D,
        control1: Point3D,
        control2: Point3D,
        end: Point3D,
        precision: f64,
    ) -> StillframeResult<Arc<Self>> {
        Self::build_in(global_cache(), start, control1, control2, end, precision)
    }

    /// Like [`BezierPath3D::build`] but against an explicit cache instance.
    pub fn build_in(
        cache: &SharedCache<BezierKey3D, BezierPath3D>,
        start: Point3D,
        control1: Point3D,
        control2: Point3D,
        end: Point3D,
        precision: f64,
    ) -> StillframeResult<Arc<Self>> {
        validate_precision(precision)?;
        let points = [start, control1, control2, end];
        if points
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite() || !p.z.is_finite())
        {
            return Err(StillframeError::invalid_argument(
                "bezier control points must be finite",
            ));
        }

        let key = BezierKey3D::make(&points, precision);
        if let Some(existing) = cache.get(&key) {
            return Ok(existing);
        }

        let (segments, length) = curve::build_segments(&points, precision);
        tracing::trace!(segments = segments.len(), length, "built 3d bezier path");
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
    pub fn position(&self, percent: f64) -> Point3D {
        if percent <= 0.0 {
            return self.segments[0].position;
        }
        if percent >= 1.0 {
            return self.segments[self.segments.len() - 1].position;
        }
        let (start, end, fraction) =
            curve::find_segment_at_distance(&self.segments, self.length * percent);
        Point3D::lerp(
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spatial_path_endpoints_are_exact() {
        let start = Point3D::new(0.0, 0.0, 0.0);
        let end = Point3D::new(10.0, 0.0, 4.0);
        let path = BezierPath3D::build(
            start,
            Point3D::new(0.0, 5.0, 0.0),
            Point3D::new(10.0, 5.0, 4.0),
            end,
            0.005,
        )
        .unwrap();
        assert_eq!(path.position(0.0), start);
        assert_eq!(path.position(1.0), end);
        assert!(path.length() >= start.distance(end));
    }

    #[test]
    fn colinear_3d_cubic_is_a_chord() {
        let path = BezierPath3D::build(
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 1.0, 1.0),
            Point3D::new(2.0, 2.0, 2.0),
            Point3D::new(3.0, 3.0, 3.0),
            0.01,
        )
        .unwrap();
        assert_eq!(path.segment_count(), 2);
        let chord = Point3D::new(0.0, 0.0, 0.0).distance(Point3D::new(3.0, 3.0, 3.0));
        assert!((path.length() - chord).abs() < 0.01);
    }

    #[test]
    fn shared_cache_dedupes_3d_builds() {
        let build = || {
            BezierPath3D::build(
                Point3D::new(0.0, 0.0, 0.0),
                Point3D::new(1.0, 4.0, 2.0),
                Point3D::new(3.0, 4.0, 2.0),
                Point3D::new(4.0, 0.0, 0.0),
                0.005,
            )
            .unwrap()
        };
        let a = build();
        let b = build();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn invalid_inputs_fail_fast() {
        let p = Point3D::default();
        assert!(matches!(
            BezierPath3D::build(p, p, p, p, -0.5).unwrap_err(),
            StillframeError::InvalidArgument(_)
        ));
        assert!(matches!(
            BezierPath3D::build(p, Point3D::new(0.0, f64::INFINITY, 0.0), p, p, 0.01).unwrap_err(),
            StillframeError::InvalidArgument(_)
        ));
    }
}

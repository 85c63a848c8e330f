//! Keyframed property evaluation.
//!
//! Temporal easing runs through the shared [`BezierPath`] cache; spatial 3D
//! interpolation runs through [`BezierPath3D`]. Both are therefore
//! deduplicated across every property in the document.

use kurbo::Point;

use crate::bezier::path::BezierPath;
use crate::bezier::path3d::BezierPath3D;
use crate::foundation::core::{Frame, Point3D, TimeRange};
use crate::foundation::error::{StillframeError, StillframeResult};
use crate::foundation::math;
use crate::timeline::ranges::{split_time_ranges_at, subtract_from_time_ranges};

/// Tolerance for easing and spatial-path polyline approximation.
pub(crate) const BEZIER_PRECISION: f64 = 0.005;

/// Value types a property can animate.
pub trait Lerp: Sized + Clone {
    /// Interpolate between `a` and `b` at `t` in `[0, 1]`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;

    /// Spatial interpolation along a motion path. The default ignores the
    /// tangents; `Point3D` overrides this with a shared bezier path.
    fn lerp_spatial(
        a: &Self,
        b: &Self,
        t: f64,
        _out_tangent: Option<Point3D>,
        _in_tangent: Option<Point3D>,
    ) -> Self {
        Self::lerp(a, b, t)
    }
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        math::lerp(*a, *b, t)
    }
}

impl Lerp for Point {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        math::lerp_point(*a, *b, t)
    }
}

impl Lerp for Point3D {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        math::lerp_point3(*a, *b, t)
    }

    fn lerp_spatial(
        a: &Self,
        b: &Self,
        t: f64,
        out_tangent: Option<Point3D>,
        in_tangent: Option<Point3D>,
    ) -> Self {
        let (Some(out_t), Some(in_t)) = (out_tangent, in_tangent) else {
            return Self::lerp(a, b, t);
        };
        let control1 = Point3D::new(a.x + out_t.x, a.y + out_t.y, a.z + out_t.z);
        let control2 = Point3D::new(b.x + in_t.x, b.y + in_t.y, b.z + in_t.z);
        match BezierPath3D::build(*a, control1, control2, *b, BEZIER_PRECISION) {
            Ok(path) => path.position(t),
            Err(_) => Self::lerp(a, b, t),
        }
    }
}

/// How a keyframe interpolates toward its end value.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Interpolation {
    /// Constant at the start value for the whole keyframe span.
    Hold,
    /// Straight linear interpolation.
    Linear,
    /// Cubic-bezier easing through the unit square; control points are the
    /// easing handles.
    Bezier {
        /// First easing handle.
        control1: Point,
        /// Second easing handle.
        control2: Point,
    },
}

/// One keyframe span `[start_frame, end_frame)` in the layer's timeline.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<T> {
    /// First frame of the span.
    pub start_frame: Frame,
    /// Frame at which `end_value` is reached (exclusive span end).
    pub end_frame: Frame,
    /// Value at `start_frame`.
    pub start_value: T,
    /// Value at `end_frame`.
    pub end_value: T,
    /// Temporal interpolation across the span.
    pub interpolation: Interpolation,
    /// Spatial out-tangent, relative to `start_value` (3D motion paths).
    pub spatial_out: Option<Point3D>,
    /// Spatial in-tangent, relative to `end_value` (3D motion paths).
    pub spatial_in: Option<Point3D>,
}

impl<T> Keyframe<T> {
    /// Plain temporal keyframe with no spatial tangents.
    pub fn new(
        start_frame: Frame,
        end_frame: Frame,
        start_value: T,
        end_value: T,
        interpolation: Interpolation,
    ) -> Self {
        Self {
            start_frame,
            end_frame,
            start_value,
            end_value,
            interpolation,
            spatial_out: None,
            spatial_in: None,
        }
    }
}

/// A value that is either constant or keyframed over the layer timeline.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Property<T> {
    /// A single value for all frames.
    Static(T),
    /// Keyframed values; keyframes are sorted and non-overlapping.
    Animated(Vec<Keyframe<T>>),
}

impl<T: Lerp> Property<T> {
    /// Build a keyframed property, validating keyframe ordering.
    pub fn animated(keyframes: Vec<Keyframe<T>>) -> StillframeResult<Self> {
        if keyframes.is_empty() {
            return Err(StillframeError::model(
                "animated property needs at least one keyframe",
            ));
        }
        for k in &keyframes {
            if k.start_frame >= k.end_frame {
                return Err(StillframeError::model(
                    "keyframe start_frame must be < end_frame",
                ));
            }
        }
        if !keyframes
            .windows(2)
            .all(|w| w[0].end_frame <= w[1].start_frame)
        {
            return Err(StillframeError::model("keyframes must not overlap"));
        }
        Ok(Self::Animated(keyframes))
    }

    /// Return `true` when the value can change over time.
    pub fn animatable(&self) -> bool {
        matches!(self, Self::Animated(_))
    }

    /// Sample the value at `frame` in the layer's own timeline.
    pub fn value_at(&self, frame: Frame) -> T {
        match self {
            Self::Static(value) => value.clone(),
            Self::Animated(keyframes) => sample_keyframes(keyframes, frame),
        }
    }

    /// Every distinct-candidate value this property can produce: the single
    /// static value, or each keyframe's start and end values.
    pub fn values(&self) -> Vec<&T> {
        match self {
            Self::Static(value) => vec![value],
            Self::Animated(keyframes) => {
                let mut out = Vec::with_capacity(keyframes.len() * 2);
                for k in keyframes {
                    out.push(&k.start_value);
                    out.push(&k.end_value);
                }
                out
            }
        }
    }
}

impl<T: Lerp> Property<T> {
    /// Remove from `ranges` every span during which this property varies.
    ///
    /// Hold keyframes keep their span covered but split it at both boundaries,
    /// so the constant stretches on either side of a value jump never share a
    /// representative frame. Interpolating keyframes are simply carved out;
    /// the value settles at `end_frame` and only the frames before it vary.
    pub fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        let Self::Animated(keyframes) = self else {
            return;
        };
        for k in keyframes {
            match k.interpolation {
                Interpolation::Hold => {
                    split_time_ranges_at(ranges, k.start_frame);
                    split_time_ranges_at(ranges, k.end_frame);
                }
                Interpolation::Linear | Interpolation::Bezier { .. } => {
                    subtract_from_time_ranges(ranges, k.start_frame, k.end_frame - 1);
                }
            }
        }
    }
}

fn sample_keyframes<T: Lerp>(keyframes: &[Keyframe<T>], frame: Frame) -> T {
    let first = &keyframes[0];
    if frame <= first.start_frame {
        return first.start_value.clone();
    }
    let last = &keyframes[keyframes.len() - 1];
    if frame >= last.end_frame {
        return last.end_value.clone();
    }

    let idx = keyframes.partition_point(|k| k.end_frame <= frame);
    let k = &keyframes[idx];
    if frame < k.start_frame {
        // Gap between keyframes: hold the previous end value.
        return keyframes[idx - 1].end_value.clone();
    }

    let progress = (frame - k.start_frame) as f64 / (k.end_frame - k.start_frame) as f64;
    match k.interpolation {
        Interpolation::Hold => k.start_value.clone(),
        Interpolation::Linear => {
            T::lerp_spatial(&k.start_value, &k.end_value, progress, k.spatial_out, k.spatial_in)
        }
        Interpolation::Bezier { control1, control2 } => {
            let eased = ease(control1, control2, progress);
            T::lerp_spatial(&k.start_value, &k.end_value, eased, k.spatial_out, k.spatial_in)
        }
    }
}

fn ease(control1: Point, control2: Point, progress: f64) -> f64 {
    match BezierPath::build(
        Point::new(0.0, 0.0),
        control1,
        control2,
        Point::new(1.0, 1.0),
        BEZIER_PRECISION,
    ) {
        Ok(path) => path.y(progress),
        Err(_) => {
            // Malformed handles from a decoded document degrade to linear.
            tracing::debug!("invalid easing handles, falling back to linear");
            progress
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyframed() -> Property<f64> {
        Property::animated(vec![Keyframe::new(
            0,
            10,
            0.0,
            10.0,
            Interpolation::Linear,
        )])
        .unwrap()
    }

    #[test]
    fn static_property_is_constant() {
        let p = Property::Static(4.0);
        assert!(!p.animatable());
        assert_eq!(p.value_at(-5), 4.0);
        assert_eq!(p.value_at(100), 4.0);
    }

    #[test]
    fn linear_keyframe_interpolates_and_clamps() {
        let p = keyframed();
        assert_eq!(p.value_at(-1), 0.0);
        assert_eq!(p.value_at(5), 5.0);
        assert_eq!(p.value_at(10), 10.0);
        assert_eq!(p.value_at(50), 10.0);
    }

    #[test]
    fn hold_keyframe_steps() {
        let p = Property::animated(vec![Keyframe::new(0, 10, 1.0, 2.0, Interpolation::Hold)])
            .unwrap();
        assert_eq!(p.value_at(9), 1.0);
        assert_eq!(p.value_at(10), 2.0);
    }

    #[test]
    fn gap_between_keyframes_holds_previous_end() {
        let p = Property::animated(vec![
            Keyframe::new(0, 5, 0.0, 5.0, Interpolation::Linear),
            Keyframe::new(10, 15, 8.0, 9.0, Interpolation::Linear),
        ])
        .unwrap();
        assert_eq!(p.value_at(7), 5.0);
        assert_eq!(p.value_at(10), 8.0);
    }

    #[test]
    fn bezier_easing_respects_endpoints() {
        let p = Property::animated(vec![Keyframe::new(
            0,
            10,
            0.0,
            10.0,
            Interpolation::Bezier {
                control1: Point::new(0.42, 0.0),
                control2: Point::new(0.58, 1.0),
            },
        )])
        .unwrap();
        assert_eq!(p.value_at(0), 0.0);
        assert_eq!(p.value_at(10), 10.0);
        let mid = p.value_at(5);
        assert!(mid > 3.0 && mid < 7.0);
    }

    #[test]
    fn spatial_tangents_bow_the_motion_path() {
        let mut k = Keyframe::new(
            0,
            10,
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(10.0, 0.0, 0.0),
            Interpolation::Linear,
        );
        k.spatial_out = Some(Point3D::new(0.0, 6.0, 0.0));
        k.spatial_in = Some(Point3D::new(0.0, 6.0, 0.0));
        let p = Property::animated(vec![k]).unwrap();
        let mid = p.value_at(5);
        // The path bows toward +y instead of running along the x axis.
        assert!(mid.y > 2.0);
    }

    #[test]
    fn exclude_varying_ranges_carves_interpolating_spans() {
        let p = Property::animated(vec![Keyframe::new(2, 6, 0.0, 5.0, Interpolation::Linear)])
            .unwrap();
        let mut ranges = vec![TimeRange { start: 0, end: 9 }];
        p.exclude_varying_ranges(&mut ranges);
        // Frames 2..=5 vary; the value settles at frame 6.
        assert_eq!(
            ranges,
            vec![TimeRange { start: 0, end: 1 }, TimeRange { start: 6, end: 9 }]
        );
    }

    #[test]
    fn exclude_varying_ranges_splits_at_hold_boundaries() {
        let p = Property::animated(vec![Keyframe::new(3, 7, 1.0, 2.0, Interpolation::Hold)])
            .unwrap();
        let mut ranges = vec![TimeRange { start: 0, end: 9 }];
        p.exclude_varying_ranges(&mut ranges);
        // Coverage is intact, but the jumps at frames 3 and 7 are boundaries.
        assert_eq!(
            ranges,
            vec![
                TimeRange { start: 0, end: 2 },
                TimeRange { start: 3, end: 6 },
                TimeRange { start: 7, end: 9 }
            ]
        );
    }

    #[test]
    fn overlapping_keyframes_are_rejected() {
        let result = Property::animated(vec![
            Keyframe::new(0, 6, 0.0, 1.0, Interpolation::Linear),
            Keyframe::new(4, 9, 1.0, 2.0, Interpolation::Linear),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn values_enumerates_keyframe_endpoints() {
        let p = keyframed();
        assert_eq!(p.values(), vec![&0.0, &10.0]);
        assert_eq!(Property::Static(3.0).values(), vec![&3.0]);
    }
}

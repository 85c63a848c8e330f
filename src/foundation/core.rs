use crate::foundation::error::{StillframeError, StillframeResult};

pub use kurbo::{Affine, BezPath, Point};

/// Signed frame index. Frame 0 is a layer's local start; negative values occur
/// while probing frames before a layer's in-point.
pub type Frame = i64;

/// Closed frame interval `[start, end]` with `start <= end`.
///
/// A sorted, non-overlapping sequence of `TimeRange` values is the canonical
/// representation of "spans where rendered output is invariant".
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Inclusive range start.
    pub start: Frame,
    /// Inclusive range end.
    pub end: Frame,
}

impl TimeRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: Frame, end: Frame) -> StillframeResult<Self> {
        if start > end {
            return Err(StillframeError::invalid_argument(
                "TimeRange start must be <= end",
            ));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range (always >= 1).
    pub fn duration(self) -> i64 {
        self.end - self.start + 1
    }

    /// Return `true` when `frame` is inside `[start, end]`.
    pub fn contains(self, frame: Frame) -> bool {
        self.start <= frame && frame <= self.end
    }

    /// Shift both bounds by `delta` frames.
    pub fn shift(self, delta: i64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
}

/// 3D point used by spatial motion paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point3D {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3D {
    /// Create a point from its coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_rejects_inverted_bounds() {
        assert!(TimeRange::new(5, 4).is_err());
        assert!(TimeRange::new(4, 4).is_ok());
    }

    #[test]
    fn time_range_duration_is_inclusive() {
        let r = TimeRange::new(2, 4).unwrap();
        assert_eq!(r.duration(), 3);
        assert!(r.contains(2));
        assert!(r.contains(4));
        assert!(!r.contains(5));
    }

    #[test]
    fn shift_moves_both_bounds() {
        let r = TimeRange::new(2, 4).unwrap().shift(-2);
        assert_eq!(r, TimeRange { start: 0, end: 2 });
    }
}

//! Cache keys derived from quantized control points.
//!
//! Two curves whose control points agree within the build tolerance quantize
//! to the same key and therefore share one cached evaluator. The reciprocal
//! precision is part of the key, so the same geometry at different tolerances
//! stays distinct.

use crate::foundation::core::Point3D;
use kurbo::Point;

fn quantize(value: f64, precision: f64) -> i64 {
    (value / precision).round() as i64
}

/// Key for a 2D cubic: 4 quantized control points plus quantized 1/precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BezierKey {
    values: [i64; 9],
}

impl BezierKey {
    /// Quantize `points` at `precision`. Callers must have validated
    /// `precision > 0` and finite coordinates.
    pub(crate) fn make(points: &[Point; 4], precision: f64) -> Self {
        let mut values = [0i64; 9];
        for (i, p) in points.iter().enumerate() {
            values[i * 2] = quantize(p.x, precision);
            values[i * 2 + 1] = quantize(p.y, precision);
        }
        values[8] = (1.0 / precision).round() as i64;
        Self { values }
    }
}

/// Key for a 3D cubic: 4 quantized control points plus quantized 1/precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BezierKey3D {
    values: [i64; 13],
}

impl BezierKey3D {
    pub(crate) fn make(points: &[Point3D; 4], precision: f64) -> Self {
        let mut values = [0i64; 13];
        for (i, p) in points.iter().enumerate() {
            values[i * 3] = quantize(p.x, precision);
            values[i * 3 + 1] = quantize(p.y, precision);
            values[i * 3 + 2] = quantize(p.z, precision);
        }
        values[12] = (1.0 / precision).round() as i64;
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indistinguishable_curves_share_a_key() {
        let a = [
            Point::new(0.0, 0.0),
            Point::new(0.25, 0.1),
            Point::new(0.75, 0.9),
            Point::new(1.0, 1.0),
        ];
        // Perturbations far below the tolerance quantize identically.
        let b = [
            Point::new(0.0001, 0.0),
            Point::new(0.25, 0.1001),
            Point::new(0.75, 0.9),
            Point::new(1.0, 0.9999),
        ];
        assert_eq!(BezierKey::make(&a, 0.005), BezierKey::make(&b, 0.005));
    }

    #[test]
    fn precision_is_part_of_the_key() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(0.25, 0.1),
            Point::new(0.75, 0.9),
            Point::new(1.0, 1.0),
        ];
        assert_ne!(BezierKey::make(&pts, 0.005), BezierKey::make(&pts, 0.01));
    }

    #[test]
    fn distinct_geometry_gets_distinct_keys() {
        let a = [
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 1.0, 0.0),
            Point3D::new(2.0, 1.0, 1.0),
            Point3D::new(3.0, 0.0, 1.0),
        ];
        let mut b = a;
        b[2].z = 5.0;
        assert_ne!(BezierKey3D::make(&a, 0.005), BezierKey3D::make(&b, 0.005));
    }
}

use super::ControlPoint;
use crate::math::{
    equidistant_points_along_curve, flatten, project_point_onto_curve, CubicBezier2d,
    ParametricCurve2d, Point2d, QuadraticBezier2d, Vector2d,
};
use crate::util::Interval;
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Spacing of the points used to re-parameterise a spline by arc length, in m.
const CURVE_SEGMENT_LEN: f64 = 0.5;

/// The centre line of a spline, parameterised by arc length.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplineCurve {
    scale: f64,
    length: f64,
    segments: Vec<QuadraticBezier2d>,
}

/// The result of sampling a [SplineCurve].
#[derive(Clone, Copy, Debug)]
pub struct CurveSample {
    /// The point on the centre line.
    pub pos: Point2d,
    /// The tangent unit vector of the centre line.
    pub tan: Vector2d,
}

/// Cubic spans between consecutive control points, parameterised by
/// `t` in `[0, n]` where `n` is the number of spans.
struct ControlPointChain {
    spans: Vec<CubicBezier2d>,
}

impl ControlPointChain {
    fn new(points: &[ControlPoint]) -> Self {
        let spans = points
            .windows(2)
            .map(|pair| {
                CubicBezier2d::from_headings(
                    flatten(pair[0].pos),
                    pair[0].heading,
                    flatten(pair[1].pos),
                    pair[1].heading,
                )
            })
            .collect();
        Self { spans }
    }

    fn span(&self, t: f64) -> (&CubicBezier2d, f64) {
        let idx = usize::min(t.max(0.0) as usize, self.spans.len() - 1);
        (&self.spans[idx], t - idx as f64)
    }
}

impl ParametricCurve2d for ControlPointChain {
    fn sample(&self, t: f64) -> Point2d {
        let (span, t) = self.span(t);
        span.sample(t)
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.spans.len() as f64)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let (span, t) = self.span(t);
        span.sample_dt(t)
    }
}

impl SplineCurve {
    /// Builds the curve through the given control points.
    ///
    /// Returns `None` if there are fewer than two control points or
    /// the resulting curve has no length.
    pub fn new(points: &[ControlPoint]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let chain = ControlPointChain::new(points);
        let (mut points, length) = equidistant_points_along_curve(&chain, CURVE_SEGMENT_LEN);
        if length < CURVE_SEGMENT_LEN * 0.01 || points.len() < 2 {
            return None;
        }

        // Ensure number of points are odd so they can be evenly divided among segments
        if points.len() % 2 == 0 {
            let p1 = points[points.len() - 2];
            let p2 = points[points.len() - 1];
            points.push(p2 + (p2 - p1));
        }

        let segments = points
            .windows(3)
            .step_by(2)
            .map(|points| {
                let (p1, p2, p3) = (points[0], points[1], points[2]);
                let mid = p1.midpoint(p3);
                let control = mid + (p2 - mid) * 2.0;
                QuadraticBezier2d::new(&[p1, control, p3])
            })
            .collect::<Vec<_>>();

        Some(Self {
            scale: 0.5 / CURVE_SEGMENT_LEN,
            length,
            segments,
        })
    }

    /// The length of the curve in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Samples the centre line at an arc-length offset.
    pub fn sample_centre(&self, pos: f64) -> CurveSample {
        let (segment, t) = self.sample_internal(pos);
        CurveSample {
            pos: segment.sample(t),
            tan: segment.sample_dt(t).normalize(),
        }
    }

    /// Finds the arc-length offset of the point on the curve nearest to `point`.
    pub fn nearest_offset(&self, point: Point2d) -> f64 {
        // Coarse search over the segment end points, then refine
        let guess = (0..=self.segments.len())
            .map(|i| f64::min(i as f64 / self.scale, self.length))
            .map(|pos| (pos, (self.sample(pos) - point).magnitude2()))
            .fold((0.0, f64::INFINITY), |a, b| if b.1 < a.1 { b } else { a })
            .0;
        project_point_onto_curve(self, point, 0.001, Some(guess))
            .unwrap_or(guess)
            .clamp(0.0, self.length)
    }

    fn sample_internal(&self, pos: f64) -> (&QuadraticBezier2d, f64) {
        let pos = pos * self.scale;
        let idx = usize::min(pos.max(0.0) as usize, self.segments.len() - 1);
        (&self.segments[idx], pos - idx as f64)
    }
}

impl ParametricCurve2d for SplineCurve {
    fn sample(&self, t: f64) -> Point2d {
        let (segment, t) = self.sample_internal(t);
        segment.sample(t)
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.length)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let (segment, t) = self.sample_internal(t);
        segment.sample_dt(t) * self.scale
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point3d;
    use assert_approx_eq::assert_approx_eq;

    fn straight(len: f64) -> SplineCurve {
        SplineCurve::new(&[
            ControlPoint::new(Point3d::new(0.0, 0.0, 0.0), 0.0),
            ControlPoint::new(Point3d::new(len, 0.0, 0.0), 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn curve_is_arclength_parameterised() {
        let curve = SplineCurve::new(&[
            ControlPoint::new(Point3d::new(10.0, 10.0, 0.0), 0.5),
            ControlPoint::new(Point3d::new(100.0, 45.0, 2.0), 0.1),
        ])
        .unwrap();

        let ts = (0..100)
            .map(|i| i as f64 * 0.01 * curve.length())
            .collect::<Vec<_>>();
        for ts in ts.windows(2) {
            let p1 = curve.sample_centre(ts[0]).pos;
            let p2 = curve.sample_centre(ts[1]).pos;
            assert_approx_eq!((p2 - p1).magnitude(), ts[1] - ts[0], 0.01);
        }
    }

    #[test]
    fn straight_curve_length_and_projection() {
        let curve = straight(100.0);
        assert_approx_eq!(curve.length(), 100.0, 0.01);
        assert_approx_eq!(curve.nearest_offset(Point2d::new(37.0, 5.0)), 37.0, 0.01);
        assert_approx_eq!(curve.nearest_offset(Point2d::new(-20.0, 0.0)), 0.0, 0.01);
        assert_approx_eq!(curve.nearest_offset(Point2d::new(130.0, -3.0)), curve.length(), 0.01);
    }

    #[test]
    fn degenerate_curves_are_rejected() {
        let p = ControlPoint::new(Point3d::new(5.0, 5.0, 0.0), 0.0);
        assert!(SplineCurve::new(&[p]).is_none());
        assert!(SplineCurve::new(&[p, p]).is_none());
    }
}

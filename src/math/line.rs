use super::{ParametricCurve2d, Point2d, Vector2d};
use crate::util::Interval;

/// A straight line segment.
#[derive(Clone, Copy, Debug)]
pub struct LineSegment2d {
    start: Point2d,
    end: Point2d,
}

impl LineSegment2d {
    pub fn from_ends(start: Point2d, end: Point2d) -> Self {
        Self { start, end }
    }
}

impl ParametricCurve2d for LineSegment2d {
    fn sample(&self, t: f64) -> Point2d {
        self.start + (self.end - self.start) * t
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, 1.0)
    }

    fn sample_dt(&self, _t: f64) -> Vector2d {
        self.end - self.start
    }
}

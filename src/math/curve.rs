use super::{Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A 2D curve sampled by a parameter `t` within [ParametricCurve2d::bounds].
pub trait ParametricCurve2d {
    fn sample(&self, t: f64) -> Point2d;

    /// The range of `t` covered by the curve.
    fn bounds(&self) -> Interval<f64>;

    /// The derivative of the curve with respect to `t`.
    fn sample_dt(&self, t: f64) -> Vector2d;
}

/// Finds the parameter of the point on a curve nearest to `point`.
///
/// Starts from `t0`, or the best of a handful of evenly spaced samples, and
/// refines it with Newton's method until a step is smaller than `max_error`.
/// A step leaving the curve is clamped to its nearest end. Returns `None` if
/// the curve is degenerate at the current guess or the search does not settle.
pub fn project_point_onto_curve(
    curve: &impl ParametricCurve2d,
    point: Point2d,
    max_error: f64,
    t0: Option<f64>,
) -> Option<f64> {
    let bounds = curve.bounds();
    let mut t = t0.unwrap_or_else(|| coarse_nearest(curve, point, 8));

    for _ in 0..64 {
        let tangent = curve.sample_dt(t);
        let speed2 = tangent.magnitude2();
        if speed2 < 1e-12 {
            return None;
        }
        let step = tangent.dot(point - curve.sample(t)) / speed2;
        t += step;
        if t < bounds.min || t > bounds.max {
            return Some(t.clamp(bounds.min, bounds.max));
        }
        if step.abs() < max_error {
            return Some(t);
        }
    }
    None
}

/// The best of `steps + 1` evenly spaced parameters as a start for refinement.
fn coarse_nearest(curve: &impl ParametricCurve2d, point: Point2d, steps: usize) -> f64 {
    let bounds = curve.bounds();
    let mut best = (bounds.min, f64::INFINITY);
    for i in 0..=steps {
        let t = bounds.lerp(i as f64 / steps as f64);
        let dist2 = (curve.sample(t) - point).magnitude2();
        if dist2 < best.1 {
            best = (t, dist2);
        }
    }
    best.0
}

/// Walks a curve in straight chords of length `dist`.
///
/// Returns the chord end points, starting at the start of the curve, and the
/// length of the resulting polyline. A final partial chord is stretched to
/// `dist` in the direction of the curve's end, so the last point may overshoot it.
pub fn equidistant_points_along_curve(
    curve: &impl ParametricCurve2d,
    dist: f64,
) -> (Vec<Point2d>, f64) {
    let bounds = curve.bounds();
    let end = curve.sample(bounds.max);
    let mut last = curve.sample(bounds.min);
    let mut t = bounds.min;
    let mut points = vec![last];

    while (end - last).magnitude() > dist {
        match next_chord(curve, last, Interval::new(t, bounds.max), dist) {
            Some((next_t, next)) => {
                points.push(next);
                (t, last) = (next_t, next);
            }
            None => break,
        }
    }

    let mut length = (points.len() - 1) as f64 * dist;
    let tail = end - last;
    let tail_len = tail.magnitude();
    if tail_len > 0.001 * dist {
        length += tail_len;
        points.push(last + tail.normalize_to(dist));
    }
    (points, length)
}

/// Searches `ts` for the point exactly `dist` away from `from`.
///
/// The point at `ts.max` must lie further than `dist` from `from`.
fn next_chord(
    curve: &impl ParametricCurve2d,
    from: Point2d,
    mut ts: Interval<f64>,
    dist: f64,
) -> Option<(f64, Point2d)> {
    let mut dists = Interval::new(0.0, (curve.sample(ts.max) - from).magnitude());
    for _ in 0..100 {
        let t = ts.lerp(dists.inv_lerp(dist));
        let point = curve.sample(t);
        let d = (point - from).magnitude();
        if (d - dist).abs() <= 0.01 * dist {
            return Some((t, point));
        }
        if d < dist {
            ts.min = t;
            dists.min = d;
        } else {
            ts.max = t;
            dists.max = d;
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::LineSegment2d;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn chords_along_short_lines_have_no_nans() {
        for i in 0..100 {
            let len = 0.1 * i as f64;
            let line =
                LineSegment2d::from_ends(Point2d::new(10.0, 10.0), Point2d::new(10.0 + len, 10.0));
            let (points, length) = equidistant_points_along_curve(&line, 0.5);
            assert_approx_eq!(length, len);
            assert!(points.iter().all(|p| !p.x.is_nan() && !p.y.is_nan()));
        }
    }

    #[test]
    fn chords_are_evenly_spaced() {
        let line = LineSegment2d::from_ends(Point2d::new(0.0, 0.0), Point2d::new(0.0, 10.0));
        let (points, length) = equidistant_points_along_curve(&line, 1.0);
        assert_approx_eq!(length, 10.0);
        for pair in points.windows(2) {
            assert_approx_eq!((pair[1] - pair[0]).magnitude(), 1.0, 0.02);
        }
    }

    #[test]
    fn projection_is_clamped_to_bounds() {
        let line = LineSegment2d::from_ends(Point2d::new(0.0, 0.0), Point2d::new(10.0, 0.0));
        let t = project_point_onto_curve(&line, Point2d::new(4.0, 3.0), 0.001, None).unwrap();
        assert_approx_eq!(t, 0.4);
        let t = project_point_onto_curve(&line, Point2d::new(25.0, 1.0), 0.001, None).unwrap();
        assert_approx_eq!(t, 1.0);
        let t = project_point_onto_curve(&line, Point2d::new(-5.0, 1.0), 0.001, None).unwrap();
        assert_approx_eq!(t, 0.0);
    }
}

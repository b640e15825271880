use super::curve::SplineCurve;
use super::LaneProfile;
use crate::math::{rot90, Aabb, Point2d};
use crate::util::Interval;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One cross-section of a ribbon.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RibbonSample {
    /// The arc-length offset of the sample.
    pub s: f64,
    pub centre: Point2d,
    pub left: Point2d,
    pub right: Point2d,
}

/// The left, right and centre boundary polylines of a spline, sampled at a
/// fixed arc-length step and widened by a lateral buffer.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ribbon {
    samples: Vec<RibbonSample>,
    bounds: Option<Aabb>,
}

impl Ribbon {
    /// Samples the ribbon of a curve.
    pub(crate) fn build(curve: &SplineCurve, lanes: &LaneProfile, step: f64, buffer: f64) -> Self {
        let length = curve.length();
        let left_width = lanes.width_left() + buffer;
        let right_width = lanes.width_right() + buffer;

        let count = (length / step).ceil() as usize;
        let samples = (0..=count)
            .map(|i| f64::min(i as f64 * step, length))
            .map(|s| {
                let sample = curve.sample_centre(s);
                let normal = rot90(sample.tan);
                RibbonSample {
                    s,
                    centre: sample.pos,
                    left: sample.pos + normal * left_width,
                    right: sample.pos - normal * right_width,
                }
            })
            .collect::<Vec<_>>();
        let bounds = Aabb::from_points(samples.iter().flat_map(|s| [s.left, s.right]));

        Self { samples, bounds }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[RibbonSample] {
        &self.samples
    }

    /// The bounding box of the whole ribbon.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn left(&self) -> impl Iterator<Item = Point2d> + '_ {
        self.samples.iter().map(|s| s.left)
    }

    pub fn right(&self) -> impl Iterator<Item = Point2d> + '_ {
        self.samples.iter().map(|s| s.right)
    }

    pub fn centre(&self) -> impl Iterator<Item = Point2d> + '_ {
        self.samples.iter().map(|s| s.centre)
    }

    /// The bounding box of the quad between each pair of consecutive samples.
    pub fn step_boxes(&self) -> impl Iterator<Item = Aabb> + '_ {
        self.samples.windows(2).filter_map(|pair| {
            Aabb::from_points([pair[0].left, pair[0].right, pair[1].left, pair[1].right])
        })
    }

    /// The samples covering an offset range, including the samples either side of it.
    pub fn slice(&self, range: Interval<f64>) -> &[RibbonSample] {
        let start = self
            .samples
            .partition_point(|s| s.s < range.min)
            .saturating_sub(1);
        let end = usize::min(
            self.samples.partition_point(|s| s.s <= range.max) + 1,
            self.samples.len(),
        );
        &self.samples[start..end.max(start)]
    }
}

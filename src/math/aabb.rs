use super::Point2d;
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in the XY plane.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    pub min: Point2d,
    pub max: Point2d,
}

impl Aabb {
    pub fn new(min: Point2d, max: Point2d) -> Self {
        Self { min, max }
    }

    /// The smallest box containing every point, or `None` if there are no points.
    pub fn from_points(points: impl IntoIterator<Item = Point2d>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |aabb, p| aabb.include(p)))
    }

    /// Grows the box to contain the point.
    pub fn include(self, p: Point2d) -> Self {
        Self {
            min: Point2d::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point2d::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    /// The smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        self.include(other.min).include(other.max)
    }

    /// Returns true if the boxes touch or overlap.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// The overlapping region of two boxes, if they intersect.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        self.intersects(other).then(|| Self {
            min: Point2d::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            max: Point2d::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        })
    }

    pub fn centre(&self) -> Point2d {
        self.min.midpoint(self.max)
    }

    /// The length of the box's diagonal.
    pub fn diagonal(&self) -> f64 {
        self.min.distance(self.max)
    }

    /// The four corners, counter-clockwise from `min`.
    pub fn corners(&self) -> [Point2d; 4] {
        [
            self.min,
            Point2d::new(self.max.x, self.min.y),
            self.max,
            Point2d::new(self.min.x, self.max.y),
        ]
    }
}

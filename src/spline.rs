use crate::config::EngineConfig;
use crate::error::TopologyError;
use crate::math::{Point2d, Point3d};
use crate::{JunctionId, RoadId, SplineId};
pub use curve::{CurveSample, SplineCurve};
pub use ribbon::{Ribbon, RibbonSample};
pub use segments::{
    ContactPoint, Road, RoadLink, Segment, SegmentEntry, SegmentKey, SegmentMap,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

mod curve;
mod ribbon;
pub(crate) mod segments;

/// A point the spline passes through.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlPoint {
    /// The world space position.
    pub pos: Point3d,
    /// The direction of travel in the XY plane, in radians from the x-axis.
    pub heading: f64,
}

impl ControlPoint {
    pub fn new(pos: Point3d, heading: f64) -> Self {
        Self { pos, heading }
    }
}

/// The lane widths on either side of a spline's centre line, innermost first.
///
/// Right lanes carry traffic in the direction of the spline.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneProfile {
    pub left: SmallVec<[f64; 4]>,
    pub right: SmallVec<[f64; 4]>,
}

impl LaneProfile {
    /// A profile with `count` lanes of `width` m on each side.
    pub fn symmetric(count: usize, width: f64) -> Self {
        let lanes = std::iter::repeat(width).take(count).collect::<SmallVec<_>>();
        Self {
            left: lanes.clone(),
            right: lanes,
        }
    }

    /// The total width of the left lanes in m.
    pub fn width_left(&self) -> f64 {
        self.left.iter().sum()
    }

    /// The total width of the right lanes in m.
    pub fn width_right(&self) -> f64 {
        self.right.iter().sum()
    }

    /// The total width of all lanes in m.
    pub fn total_width(&self) -> f64 {
        self.width_left() + self.width_right()
    }
}

/// A connection from one end of a spline to an end of another spline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplineLink {
    pub spline: SplineId,
    /// The end of `spline` the link attaches to.
    pub contact: ContactPoint,
}

/// The attributes of a spline.
pub struct SplineAttributes<'a> {
    /// The points the spline passes through, in order.
    pub control_points: &'a [ControlPoint],
    /// The lanes along the spline.
    pub lanes: LaneProfile,
}

/// A path through control points, partitioned into road and junction segments.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spline {
    /// The spline ID.
    id: SplineId,
    /// The points defining the shape of the spline.
    control_points: Vec<ControlPoint>,
    /// The lanes along the spline.
    lanes: LaneProfile,
    /// The arc-length parameterised centre line, if the spline is not degenerate.
    curve: Option<SplineCurve>,
    /// The boundary ribbon used for intersection detection.
    ribbon: Ribbon,
    /// The road and junction segments.
    segments: SegmentMap,
    /// The spline the start of this one connects to.
    predecessor: Option<SplineLink>,
    /// The spline the end of this one connects to.
    successor: Option<SplineLink>,
}

impl Spline {
    /// Creates a new spline consisting of a single road.
    pub(crate) fn new(
        id: SplineId,
        attribs: &SplineAttributes,
        road: RoadId,
        config: &EngineConfig,
    ) -> Self {
        let mut spline = Self {
            id,
            control_points: attribs.control_points.to_vec(),
            lanes: attribs.lanes.clone(),
            curve: None,
            ribbon: Ribbon::default(),
            segments: SegmentMap::new(0.0, Road::new(road)),
            predecessor: None,
            successor: None,
        };
        spline.rebuild_geometry(config);
        spline
    }

    pub fn id(&self) -> SplineId {
        self.id
    }

    /// Gets the length of the spline in m.
    pub fn length(&self) -> f64 {
        self.segments.length()
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    pub fn lanes(&self) -> &LaneProfile {
        &self.lanes
    }

    /// The centre line, or `None` for a degenerate spline.
    pub fn curve(&self) -> Option<&SplineCurve> {
        self.curve.as_ref()
    }

    pub fn ribbon(&self) -> &Ribbon {
        &self.ribbon
    }

    pub fn segments(&self) -> &SegmentMap {
        &self.segments
    }

    pub(crate) fn segments_mut(&mut self) -> &mut SegmentMap {
        &mut self.segments
    }

    pub fn predecessor(&self) -> Option<SplineLink> {
        self.predecessor
    }

    pub fn successor(&self) -> Option<SplineLink> {
        self.successor
    }

    /// Gets the external link at one end of the spline.
    pub fn end_link(&self, contact: ContactPoint) -> Option<SplineLink> {
        match contact {
            ContactPoint::Start => self.predecessor,
            ContactPoint::End => self.successor,
        }
    }

    pub(crate) fn set_end_link(&mut self, contact: ContactPoint, link: Option<SplineLink>) {
        match contact {
            ContactPoint::Start => self.predecessor = link,
            ContactPoint::End => self.successor = link,
        }
    }

    /// The splines this one's ends are linked to.
    pub fn linked_splines(&self) -> impl Iterator<Item = SplineId> + '_ {
        self.predecessor
            .iter()
            .chain(self.successor.iter())
            .map(|link| link.spline)
    }

    /// Gets the segment owning offset `s`.
    pub fn segment_at(&self, s: f64) -> Result<&SegmentEntry, TopologyError> {
        self.segments.segment_at(s)
    }

    /// Inserts a segment starting at `s`. Contiguity is the caller's responsibility.
    pub fn add_segment(&mut self, s: f64, segment: Segment) {
        self.segments.add_segment(s, segment);
    }

    /// Removes a segment. Contiguity is the caller's responsibility.
    pub fn remove_segment(&mut self, key: SegmentKey) -> Result<SegmentEntry, TopologyError> {
        self.segments
            .remove_segment(key)
            .ok_or(TopologyError::SegmentNotFound(self.id))
    }

    pub fn previous_segment(&self, key: SegmentKey) -> Option<&SegmentEntry> {
        self.segments.previous_segment(key)
    }

    pub fn next_segment(&self, key: SegmentKey) -> Option<&SegmentEntry> {
        self.segments.next_segment(key)
    }

    pub fn road_segments(&self) -> impl Iterator<Item = &Road> {
        self.segments.road_segments()
    }

    pub fn junction_segments(&self) -> impl Iterator<Item = JunctionId> + '_ {
        self.segments.junction_segments()
    }

    /// The ribbon samples along a segment.
    pub fn segment_ribbon(&self, key: SegmentKey) -> Option<&[RibbonSample]> {
        let range = self.segments.range_of(key)?;
        Some(self.ribbon.slice(range))
    }

    /// The segment at one end of the spline.
    pub fn boundary_segment(&self, contact: ContactPoint) -> Option<&SegmentEntry> {
        match contact {
            ContactPoint::Start => self.segments.get(0),
            ContactPoint::End => self.segments.get(self.segments.len().wrapping_sub(1)),
        }
    }

    /// The width of the left lanes at offset `s`, in m.
    pub fn width_left(&self, _s: f64) -> f64 {
        self.lanes.width_left()
    }

    /// The width of the right lanes at offset `s`, in m.
    pub fn width_right(&self, _s: f64) -> f64 {
        self.lanes.width_right()
    }

    /// The width of all lanes at offset `s`, in m.
    pub fn total_width(&self, s: f64) -> f64 {
        self.width_left(s) + self.width_right(s)
    }

    /// Projects a world point onto the spline, returning its arc-length offset.
    pub fn nearest_offset(&self, point: Point2d) -> f64 {
        self.curve
            .as_ref()
            .map(|curve| curve.nearest_offset(point))
            .unwrap_or(0.0)
    }

    /// Replaces the control points, rebuilding the curve and ribbon.
    pub(crate) fn set_control_points(&mut self, points: &[ControlPoint], config: &EngineConfig) {
        self.control_points = points.to_vec();
        self.rebuild_geometry(config);
    }

    /// Replaces the lanes, rebuilding the ribbon.
    pub(crate) fn set_lanes(&mut self, lanes: LaneProfile, config: &EngineConfig) {
        self.lanes = lanes;
        self.rebuild_geometry(config);
    }

    /// Rebuilds the curve and ribbon, rescaling segment offsets to the new length.
    pub(crate) fn rebuild_geometry(&mut self, config: &EngineConfig) {
        self.curve = SplineCurve::new(&self.control_points);
        self.ribbon = match &self.curve {
            Some(curve) => {
                Ribbon::build(curve, &self.lanes, config.ribbon_step, config.ribbon_buffer)
            }
            None => Ribbon::default(),
        };
        let length = self.curve.as_ref().map(|c| c.length()).unwrap_or(0.0);
        self.segments.rescale(length);
    }

    /// Sets the derived links of every road from the map order, using the
    /// given links for the start of the first road and the end of the last.
    pub(crate) fn relink(&mut self, start: Option<RoadLink>, end: Option<RoadLink>) {
        let neighbours = (0..self.segments.len())
            .map(|idx| {
                let link_to = |idx: usize, contact| {
                    self.segments.get(idx).map(|entry| match &entry.segment {
                        Segment::Road(road) => RoadLink::Road {
                            id: road.id,
                            contact,
                        },
                        Segment::Junction(id) => RoadLink::Junction(*id),
                    })
                };
                let prev = match idx {
                    0 => start,
                    _ => link_to(idx - 1, ContactPoint::End),
                };
                let next = match idx + 1 == self.segments.len() {
                    true => end,
                    false => link_to(idx + 1, ContactPoint::Start),
                };
                (prev, next)
            })
            .collect::<Vec<_>>();

        for (idx, (prev, next)) in neighbours.into_iter().enumerate() {
            if let Some(entry) = self.segments.get_mut(idx) {
                if let Segment::Road(road) = &mut entry.segment {
                    road.predecessor = prev;
                    road.successor = next;
                }
            }
        }
    }
}

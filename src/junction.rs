use crate::math::{Aabb, Point2d};
use crate::spline::{ContactPoint, LaneProfile, Segment, SegmentKey, Spline};
use crate::{JunctionId, RoadId, SplineId, SplineSet};
use itertools::iproduct;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// A node where several splines meet, joined by lane connections.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Junction {
    /// The junction ID.
    id: JunctionId,
    /// The splines that have a segment belonging to this junction.
    splines: BTreeSet<SplineId>,
    /// The lane connections through the junction.
    connections: Vec<LaneConnection>,
    /// The area covered by the junction.
    bounds: Aabb,
    /// The representative position of the junction.
    position: Point2d,
}

/// Connects a lane entering a junction to a lane leaving it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneConnection {
    /// The spline of the incoming road.
    pub incoming_spline: SplineId,
    /// The road traffic enters the junction from.
    pub incoming_road: RoadId,
    /// The end of the incoming road touching the junction.
    pub incoming_contact: ContactPoint,
    /// The spline of the outgoing road.
    pub outgoing_spline: SplineId,
    /// The road traffic leaves the junction on.
    pub outgoing_road: RoadId,
    /// The end of the outgoing road touching the junction.
    pub outgoing_contact: ContactPoint,
    /// The lane on the incoming road; positive ids are left lanes, negative right.
    pub from_lane: i32,
    /// The lane on the outgoing road.
    pub to_lane: i32,
}

/// A road touching a junction.
#[derive(Clone, Debug, PartialEq)]
pub struct JunctionLeg {
    pub spline: SplineId,
    pub road: RoadId,
    /// The end of the road touching the junction.
    pub contact: ContactPoint,
    /// Lanes carrying traffic into the junction.
    pub incoming: SmallVec<[i32; 4]>,
    /// Lanes carrying traffic out of the junction.
    pub outgoing: SmallVec<[i32; 4]>,
}

impl Junction {
    /// Creates a junction with no splines.
    pub(crate) fn new(id: JunctionId, bounds: Aabb, position: Point2d) -> Self {
        Self {
            id,
            splines: BTreeSet::new(),
            connections: vec![],
            bounds,
            position,
        }
    }

    pub fn id(&self) -> JunctionId {
        self.id
    }

    /// The participating splines, in ID order.
    pub fn splines(&self) -> &BTreeSet<SplineId> {
        &self.splines
    }

    pub fn contains_spline(&self, spline: SplineId) -> bool {
        self.splines.contains(&spline)
    }

    /// Adds a participating spline, returning false if it was already present.
    pub(crate) fn add_spline(&mut self, spline: SplineId) -> bool {
        self.splines.insert(spline)
    }

    pub(crate) fn remove_spline(&mut self, spline: SplineId) -> bool {
        self.splines.remove(&spline)
    }

    pub fn connections(&self) -> &[LaneConnection] {
        &self.connections
    }

    pub(crate) fn set_connections(&mut self, connections: Vec<LaneConnection>) {
        self.connections = connections;
    }

    pub(crate) fn clear_connections(&mut self) {
        self.connections.clear();
    }

    /// Drops every connection entering or leaving through the given spline.
    pub(crate) fn remove_connections_of(&mut self, spline: SplineId) {
        self.connections
            .retain(|c| c.incoming_spline != spline && c.outgoing_spline != spline);
    }

    /// The splines that have a road feeding traffic into the junction.
    pub fn incoming_splines(&self) -> BTreeSet<SplineId> {
        self.connections.iter().map(|c| c.incoming_spline).collect()
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn position(&self) -> Point2d {
        self.position
    }

    pub(crate) fn expand_bounds(&mut self, area: &Aabb) {
        self.bounds = self.bounds.union(area);
    }

    pub(crate) fn set_footprint(&mut self, bounds: Aabb, position: Point2d) {
        self.bounds = bounds;
        self.position = position;
    }
}

impl JunctionLeg {
    fn new(spline: &Spline, road: RoadId, contact: ContactPoint) -> Self {
        let LaneProfile { left, right } = spline.lanes();
        let left = (1..=left.len() as i32).collect::<SmallVec<_>>();
        let right = (1..=right.len() as i32).map(|i| -i).collect::<SmallVec<_>>();
        // Right lanes run along the spline, so they enter a junction at the end of a road
        let (incoming, outgoing) = match contact {
            ContactPoint::End => (right, left),
            ContactPoint::Start => (left, right),
        };
        Self {
            spline: spline.id(),
            road,
            contact,
            incoming,
            outgoing,
        }
    }
}

/// Finds the roads touching a junction.
///
/// These are the roads either side of the junction's segment on every
/// participating spline, plus roads linked to a spline end the junction covers.
pub fn junction_legs(junction: &Junction, splines: &SplineSet) -> Vec<JunctionLeg> {
    let mut legs: Vec<JunctionLeg> = vec![];

    for spline in junction.splines.iter().filter_map(|id| splines.get(*id)) {
        let segments = spline.segments();
        let Some(idx) = segments.position(SegmentKey::Junction(junction.id)) else {
            continue;
        };

        let before = idx.checked_sub(1).and_then(|idx| segments.get(idx));
        let after = segments.get(idx + 1);
        let sides = [
            (before, ContactPoint::End, ContactPoint::Start),
            (after, ContactPoint::Start, ContactPoint::End),
        ];

        for (entry, contact, spline_end) in sides {
            let leg = match entry {
                Some(entry) => match &entry.segment {
                    Segment::Road(road) => Some(JunctionLeg::new(spline, road.id(), contact)),
                    Segment::Junction(_) => None,
                },
                None => linked_leg(spline, spline_end, splines),
            };
            if let Some(leg) = leg {
                if !legs.iter().any(|l| l.road == leg.road && l.contact == leg.contact) {
                    legs.push(leg);
                }
            }
        }
    }

    legs
}

/// The road linked to one end of a spline, if that end is linked to a road.
fn linked_leg(spline: &Spline, end: ContactPoint, splines: &SplineSet) -> Option<JunctionLeg> {
    let link = spline.end_link(end)?;
    let other = splines.get(link.spline)?;
    match &other.boundary_segment(link.contact)?.segment {
        Segment::Road(road) => Some(JunctionLeg::new(other, road.id(), link.contact)),
        Segment::Junction(_) => None,
    }
}

/// Builds lane connections between every ordered pair of distinct legs,
/// pairing lanes by index.
pub fn derive_connections(legs: &[JunctionLeg]) -> Vec<LaneConnection> {
    iproduct!(legs, legs)
        .filter(|(from, to)| from != to)
        .flat_map(|(from, to)| {
            from.incoming
                .iter()
                .zip(to.outgoing.iter())
                .map(move |(from_lane, to_lane)| LaneConnection {
                    incoming_spline: from.spline,
                    incoming_road: from.road,
                    incoming_contact: from.contact,
                    outgoing_spline: to.spline,
                    outgoing_road: to.road,
                    outgoing_contact: to.contact,
                    from_lane: *from_lane,
                    to_lane: *to_lane,
                })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use slotmap::SlotMap;

    fn leg(spline: SplineId, road: RoadId, contact: ContactPoint, lanes: usize) -> JunctionLeg {
        let left = (1..=lanes as i32).collect::<SmallVec<_>>();
        let right = (1..=lanes as i32).map(|i| -i).collect::<SmallVec<_>>();
        let (incoming, outgoing) = match contact {
            ContactPoint::End => (right, left),
            ContactPoint::Start => (left, right),
        };
        JunctionLeg {
            spline,
            road,
            contact,
            incoming,
            outgoing,
        }
    }

    #[test]
    fn connections_pair_lanes_by_index() {
        let mut splines = SlotMap::<SplineId, ()>::with_key();
        let mut roads = SlotMap::<RoadId, ()>::with_key();
        let (a, b) = (splines.insert(()), splines.insert(()));
        let legs = [
            leg(a, roads.insert(()), ContactPoint::End, 2),
            leg(b, roads.insert(()), ContactPoint::Start, 1),
        ];

        let connections = derive_connections(&legs);
        // 2 -> 1 lanes gives one connection, 1 -> 2 lanes gives one connection
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].from_lane, -1);
        assert_eq!(connections[0].to_lane, -1);
        assert_eq!(connections[1].from_lane, 1);
        assert_eq!(connections[1].to_lane, 1);
    }

    #[test]
    fn removing_a_spline_drops_its_connections() {
        let mut splines = SlotMap::<SplineId, ()>::with_key();
        let mut roads = SlotMap::<RoadId, ()>::with_key();
        let mut junctions = SlotMap::<JunctionId, ()>::with_key();
        let (a, b, c) = (splines.insert(()), splines.insert(()), splines.insert(()));
        let legs = [
            leg(a, roads.insert(()), ContactPoint::End, 1),
            leg(b, roads.insert(()), ContactPoint::Start, 1),
            leg(c, roads.insert(()), ContactPoint::Start, 1),
        ];

        let area = Aabb::new(Point2d::new(0.0, 0.0), Point2d::new(1.0, 1.0));
        let mut junction = Junction::new(junctions.insert(()), area, area.centre());
        junction.set_connections(derive_connections(&legs));
        assert_eq!(junction.connections().len(), 6);
        assert_eq!(junction.incoming_splines().len(), 3);

        junction.remove_connections_of(c);
        assert_eq!(junction.connections().len(), 2);
        assert!(!junction.incoming_splines().contains(&c));
    }
}

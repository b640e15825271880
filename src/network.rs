use crate::config::EngineConfig;
use crate::error::TopologyError;
use crate::junction::Junction;
use crate::spline::{
    ContactPoint, ControlPoint, LaneProfile, RoadLink, Segment, Spline, SplineAttributes,
    SplineCurve, SplineLink,
};
use crate::{JunctionId, JunctionSet, RoadId, RoadRegistry, SplineId, SplineSet};
pub use reconcile::JunctionChanges;

mod reconcile;

/// A road network made of splines and the junctions joining them.
#[derive(Default)]
pub struct RoadNetwork {
    /// The engine parameters.
    config: EngineConfig,
    /// The splines in the network.
    splines: SplineSet,
    /// The spline owning each road segment.
    roads: RoadRegistry,
    /// The junctions in the network.
    junctions: JunctionSet,
    /// Debugging information from the previous reconciliation.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl RoadNetwork {
    /// Creates an empty network with the default parameters.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates an empty network with the given parameters.
    ///
    /// A ribbon step that is not positive is replaced; see [EngineConfig].
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config: config.sanitized(),
            ..Default::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adds a spline consisting of a single road.
    ///
    /// Junctions are not detected until [Self::detect_junctions] is called.
    pub fn add_spline(&mut self, attribs: &SplineAttributes) -> SplineId {
        let roads = &mut self.roads;
        let config = &self.config;
        self.splines.insert_with_key(|id| {
            let road = roads.insert(id);
            Spline::new(id, attribs, road, config)
        })
    }

    /// Removes a spline, disconnecting it from its junctions and unlinking its ends.
    pub fn remove_spline(&mut self, id: SplineId) -> Result<JunctionChanges, TopologyError> {
        let junctions = self.spline(id)?.junction_segments().collect::<Vec<_>>();
        let mut changes = JunctionChanges::default();
        for junction in junctions {
            self.disconnect(id, junction, &mut changes);
        }
        for contact in [ContactPoint::Start, ContactPoint::End] {
            self.clear_end_link(id, contact);
        }

        let spline = self
            .splines
            .remove(id)
            .ok_or(TopologyError::SplineNotFound(id))?;
        for road in spline.road_segments() {
            self.roads.remove(road.id());
        }
        changes.touched_splines.remove(&id);
        self.rebuild_connections(&changes);
        log::debug!("removed spline {:?}", id);

        Ok(changes)
    }

    /// Replaces the control points of a spline, rebuilding its geometry.
    ///
    /// Segment offsets are rescaled to the new length; call
    /// [Self::detect_junctions] afterwards to refit the junctions. If the new
    /// points give no curve, the spline is first spliced out of every junction
    /// so it is left with a single road.
    pub fn set_control_points(
        &mut self,
        id: SplineId,
        points: &[ControlPoint],
    ) -> Result<JunctionChanges, TopologyError> {
        let junctions = self.spline(id)?.junction_segments().collect::<Vec<_>>();
        let mut changes = JunctionChanges::default();
        if SplineCurve::new(points).is_none() && !junctions.is_empty() {
            log::debug!("spline {:?} collapsed, leaving its junctions", id);
            for junction in junctions {
                self.disconnect(id, junction, &mut changes);
            }
        }

        let config = self.config;
        self.spline_mut(id)?.set_control_points(points, &config);
        self.rebuild_connections(&changes);
        Ok(changes)
    }

    /// Replaces the lanes of a spline, rebuilding its geometry.
    pub fn set_lanes(&mut self, id: SplineId, lanes: LaneProfile) -> Result<(), TopologyError> {
        let config = self.config;
        self.spline_mut(id)?.set_lanes(lanes, &config);
        Ok(())
    }

    /// Links an end of spline `a` to an end of spline `b`, replacing any
    /// links those ends already had.
    ///
    /// Linked splines are never considered to intersect each other.
    pub fn link_splines(
        &mut self,
        a: SplineId,
        a_contact: ContactPoint,
        b: SplineId,
        b_contact: ContactPoint,
    ) -> Result<(), TopologyError> {
        self.spline(a)?;
        self.spline(b)?;
        if a == b && a_contact == b_contact {
            log::warn!("cannot link {:?} of spline {:?} to itself", a_contact, a);
            return Ok(());
        }

        self.clear_end_link(a, a_contact);
        self.clear_end_link(b, b_contact);
        let links = [
            (a, a_contact, SplineLink { spline: b, contact: b_contact }),
            (b, b_contact, SplineLink { spline: a, contact: a_contact }),
        ];
        for (id, contact, link) in links {
            self.spline_mut(id)?.set_end_link(contact, Some(link));
        }
        self.relink_with_neighbours(a);
        self.relink_with_neighbours(b);
        Ok(())
    }

    /// Removes every link between the ends of two splines.
    pub fn unlink_splines(&mut self, a: SplineId, b: SplineId) -> Result<(), TopologyError> {
        for contact in [ContactPoint::Start, ContactPoint::End] {
            if self.spline(a)?.end_link(contact).map(|link| link.spline) == Some(b) {
                self.clear_end_link(a, contact);
            }
        }
        Ok(())
    }

    pub fn get_spline(&self, id: SplineId) -> Option<&Spline> {
        self.splines.get(id)
    }

    pub fn get_junction(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.get(id)
    }

    /// Returns an iterator over all the splines in the network.
    pub fn iter_splines(&self) -> impl Iterator<Item = &Spline> {
        self.splines.values()
    }

    /// Returns an iterator over all the junctions in the network.
    pub fn iter_junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.values()
    }

    /// Returns an iterator over all the roads and the splines they lie on.
    pub fn iter_roads(&self) -> impl Iterator<Item = (RoadId, SplineId)> + '_ {
        self.roads.iter().map(|(road, spline)| (road, *spline))
    }

    /// The junctions a spline has a segment in, in order along the spline.
    pub fn junctions_of(&self, id: SplineId) -> Vec<JunctionId> {
        self.splines
            .get(id)
            .map(|spline| spline.junction_segments().collect())
            .unwrap_or_default()
    }

    /// Gets the spline a road lies on.
    pub fn road_spline(&self, road: RoadId) -> Option<SplineId> {
        self.roads.get(road).copied()
    }

    /// Deletes junctions no spline takes part in any more, returning their IDs.
    pub fn remove_empty_junctions(&mut self) -> Vec<JunctionId> {
        let empty = self
            .junctions
            .values()
            .filter(|junction| junction.splines().is_empty())
            .map(|junction| junction.id())
            .collect::<Vec<_>>();
        for id in &empty {
            self.junctions.remove(*id);
            log::debug!("removed empty junction {:?}", id);
        }
        empty
    }

    /// Splices a junction out of every spline it is on and deletes it.
    pub fn remove_junction(&mut self, id: JunctionId) -> Result<JunctionChanges, TopologyError> {
        let splines = self
            .junctions
            .get(id)
            .ok_or(TopologyError::JunctionNotFound(id))?
            .splines()
            .clone();
        let mut changes = JunctionChanges::default();
        for spline in splines {
            self.disconnect(spline, id, &mut changes);
        }
        self.junctions.remove(id);
        self.rebuild_connections(&changes);
        Ok(changes)
    }

    /// Gets debugging information from the previous reconciliation.
    #[cfg(feature = "debug")]
    pub fn take_debug(&mut self) -> serde_json::Value {
        std::mem::take(&mut self.debug)
    }

    fn spline(&self, id: SplineId) -> Result<&Spline, TopologyError> {
        self.splines.get(id).ok_or(TopologyError::SplineNotFound(id))
    }

    fn spline_mut(&mut self, id: SplineId) -> Result<&mut Spline, TopologyError> {
        self.splines
            .get_mut(id)
            .ok_or(TopologyError::SplineNotFound(id))
    }

    /// Removes the link at one end of a spline along with its counterpart.
    fn clear_end_link(&mut self, id: SplineId, contact: ContactPoint) {
        let Some(link) = self.splines.get(id).and_then(|s| s.end_link(contact)) else {
            return;
        };
        if let Some(spline) = self.splines.get_mut(id) {
            spline.set_end_link(contact, None);
        }
        if let Some(other) = self.splines.get_mut(link.spline) {
            if other.end_link(link.contact) == Some(SplineLink { spline: id, contact }) {
                other.set_end_link(link.contact, None);
            }
        }
        self.relink_with_neighbours(id);
        self.relink(link.spline);
    }

    /// Resolves the external link at one end of a spline to the segment it reaches.
    fn resolve_end_link(&self, spline: &Spline, contact: ContactPoint) -> Option<RoadLink> {
        let link = spline.end_link(contact)?;
        let entry = self.splines.get(link.spline)?.boundary_segment(link.contact)?;
        Some(match &entry.segment {
            Segment::Road(road) => RoadLink::Road {
                id: road.id(),
                contact: link.contact,
            },
            Segment::Junction(junction) => RoadLink::Junction(*junction),
        })
    }

    /// Recomputes the road links of a spline.
    fn relink(&mut self, id: SplineId) {
        let Some(spline) = self.splines.get(id) else {
            return;
        };
        let start = self.resolve_end_link(spline, ContactPoint::Start);
        let end = self.resolve_end_link(spline, ContactPoint::End);
        if let Some(spline) = self.splines.get_mut(id) {
            spline.relink(start, end);
        }
    }

    /// Recomputes the road links of a spline and the splines linked to it.
    fn relink_with_neighbours(&mut self, id: SplineId) {
        self.relink(id);
        let neighbours = self
            .splines
            .get(id)
            .map(|spline| spline.linked_splines().collect::<Vec<_>>())
            .unwrap_or_default();
        for neighbour in neighbours {
            self.relink(neighbour);
        }
    }
}

//! Keeps junctions consistent with spline geometry.

use super::RoadNetwork;
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::debug::debug_polyline;
use crate::error::TopologyError;
use crate::intersection::{
    find_intersections, get_groups, merge_overlapping_groups, IntersectionGroup,
};
use crate::junction::{derive_connections, junction_legs, Junction};
use crate::splice::{remove_junction, splice_junction};
use crate::spline::SegmentKey;
use crate::util::Interval;
use crate::{JunctionId, SplineId};
use cgmath::prelude::*;
use std::collections::BTreeSet;

/// The junction changes made by a reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JunctionChanges {
    /// Junctions that were created.
    pub created: Vec<JunctionId>,
    /// Existing junctions whose splines or footprint changed.
    pub updated: Vec<JunctionId>,
    /// Splines that were spliced out of a junction.
    pub disconnected: Vec<(JunctionId, SplineId)>,
    /// Splines whose segments changed.
    pub touched_splines: BTreeSet<SplineId>,
}

impl JunctionChanges {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.disconnected.is_empty()
            && self.touched_splines.is_empty()
    }

    fn mark_updated(&mut self, junction: JunctionId) {
        if !self.created.contains(&junction) && !self.updated.contains(&junction) {
            self.updated.push(junction);
        }
    }

    fn absorb(&mut self, other: JunctionChanges) {
        for junction in other.created {
            if !self.created.contains(&junction) {
                self.created.push(junction);
            }
        }
        for junction in other.updated {
            self.mark_updated(junction);
        }
        self.disconnected.extend(other.disconnected);
        self.touched_splines.extend(other.touched_splines);
    }
}

impl RoadNetwork {
    /// Brings the junctions of a spline in line with its current geometry.
    ///
    /// Junctions the spline no longer overlaps are spliced out of it. Every
    /// group of overlaps either updates the junction it matches or becomes a
    /// junction, reusing a nearby junction on one of its splines if possible.
    /// Lane connections of every affected junction are rebuilt from scratch.
    ///
    /// Other splines whose membership may have changed are not revisited;
    /// call this for each of them as well, or use [Self::reconcile].
    pub fn detect_junctions(&mut self, id: SplineId) -> Result<JunctionChanges, TopologyError> {
        let spline = self.spline(id)?;
        let existing = spline.junction_segments().collect::<Vec<_>>();
        debug_polyline("ribbon_left", spline.ribbon().left());
        debug_polyline("ribbon_right", spline.ribbon().right());

        let records = find_intersections(spline, self.splines.values(), &self.config);
        let groups = merge_overlapping_groups(get_groups(records, self.config.grouping_threshold));
        log::debug!(
            "spline {:?}: {} existing junctions, {} intersection groups",
            id,
            existing.len(),
            groups.len()
        );

        let mut changes = JunctionChanges::default();
        if groups.is_empty() {
            for junction in existing {
                self.disconnect(id, junction, &mut changes);
            }
        } else {
            for junction in existing {
                let matched = self.junctions.get(junction).map_or(false, |junction| {
                    groups
                        .iter()
                        .any(|group| group.matches_junction(junction, &self.config))
                });
                if !matched {
                    self.disconnect(id, junction, &mut changes);
                }
            }
            // Each junction takes at most one group
            let mut claimed = BTreeSet::new();
            for group in &groups {
                let junction = match self.matched_junction(id, group, &claimed) {
                    Some(junction) => {
                        self.update_junction(id, junction, group, &mut changes);
                        junction
                    }
                    None => self.connect_group(group, &claimed, &mut changes),
                };
                claimed.insert(junction);
            }
        }

        self.rebuild_connections(&changes);

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }

        Ok(changes)
    }

    /// Runs [Self::detect_junctions] on each spline in turn.
    ///
    /// A spline that cannot be reconciled is logged and skipped.
    pub fn reconcile(&mut self, ids: impl IntoIterator<Item = SplineId>) -> JunctionChanges {
        let mut changes = JunctionChanges::default();
        for id in ids {
            match self.detect_junctions(id) {
                Ok(spline_changes) => changes.absorb(spline_changes),
                Err(err) => log::warn!("skipping reconciliation of {:?}: {}", id, err),
            }
        }
        changes
    }

    /// The unclaimed junction on the spline that the group matches, if any.
    ///
    /// Junctions overlapping the group are preferred, then the nearest.
    fn matched_junction(
        &self,
        id: SplineId,
        group: &IntersectionGroup,
        claimed: &BTreeSet<JunctionId>,
    ) -> Option<JunctionId> {
        let position = group.representative_position();
        let rank = |junction: &Junction| {
            let apart = !group.bounds().intersects(&junction.bounds());
            (apart, position.distance(junction.position()))
        };
        self.splines
            .get(id)?
            .junction_segments()
            .filter(|junction| !claimed.contains(junction))
            .filter_map(|junction| self.junctions.get(junction))
            .filter(|junction| group.matches_junction(junction, &self.config))
            .min_by(|a, b| {
                let (a, b) = (rank(*a), rank(*b));
                a.0.cmp(&b.0).then(a.1.total_cmp(&b.1))
            })
            .map(|junction| junction.id())
    }

    /// Splices a junction out of a spline.
    pub(super) fn disconnect(
        &mut self,
        id: SplineId,
        junction_id: JunctionId,
        changes: &mut JunctionChanges,
    ) {
        log::debug!("disconnecting spline {:?} from junction {:?}", id, junction_id);
        if let Some(junction) = self.junctions.get_mut(junction_id) {
            junction.remove_spline(id);
            junction.remove_connections_of(id);
        }
        if let Some(spline) = self.splines.get_mut(id) {
            remove_junction(spline, &mut self.roads, junction_id);
        }
        self.relink_with_neighbours(id);
        changes.disconnected.push((junction_id, id));
        changes.touched_splines.insert(id);
    }

    /// Turns a group into a junction on all of its splines, returning the junction.
    fn connect_group(
        &mut self,
        group: &IntersectionGroup,
        claimed: &BTreeSet<JunctionId>,
        changes: &mut JunctionChanges,
    ) -> JunctionId {
        let position = group.representative_position();
        let reused = group.get_junctions(&self.splines, &self.junctions, claimed, &self.config);
        let junction_id = match reused.and_then(|id| self.junctions.get_mut(id)) {
            Some(junction) => {
                junction.expand_bounds(&group.bounds());
                log::debug!("reusing junction {:?} at {:?}", junction.id(), position);
                changes.mark_updated(junction.id());
                junction.id()
            }
            None => {
                let bounds = group.bounds();
                let id = self
                    .junctions
                    .insert_with_key(|id| Junction::new(id, bounds, position));
                log::debug!("created junction {:?} at {:?}", id, position);
                changes.created.push(id);
                id
            }
        };

        for section in group.spline_sections() {
            let range = if reused.is_some() {
                self.widen_to_existing(section.spline, junction_id, section.range)
            } else {
                section.range
            };
            self.splice_into(junction_id, section.spline, range, changes);
        }

        if let Some(junction) = self.junctions.get_mut(junction_id) {
            let bounds = junction.bounds();
            junction.set_footprint(bounds, position);
        }
        junction_id
    }

    /// Refits a junction the spline already takes part in to a group.
    fn update_junction(
        &mut self,
        id: SplineId,
        junction_id: JunctionId,
        group: &IntersectionGroup,
        changes: &mut JunctionChanges,
    ) {
        let Some(junction) = self.junctions.get_mut(junction_id) else {
            return;
        };
        junction.add_spline(id);
        junction.clear_connections();
        // Other splines of a shared junction also overlap splines outside the group
        let shared = junction.splines().len() > 2;
        log::debug!("updating junction {:?} from spline {:?}", junction_id, id);

        for section in group.spline_sections() {
            let range = if section.spline != id && shared {
                self.widen_to_existing(section.spline, junction_id, section.range)
            } else {
                section.range
            };
            self.splice_into(junction_id, section.spline, range, changes);
        }

        if let Some(junction) = self.junctions.get_mut(junction_id) {
            let bounds = if shared {
                junction.bounds().union(&group.bounds())
            } else {
                group.bounds()
            };
            junction.set_footprint(bounds, group.representative_position());
        }
        changes.mark_updated(junction_id);
    }

    /// Extends a range to cover the junction's current segment on the spline.
    fn widen_to_existing(
        &self,
        spline: SplineId,
        junction: JunctionId,
        range: Interval<f64>,
    ) -> Interval<f64> {
        self.splines
            .get(spline)
            .and_then(|spline| spline.segments().range_of(SegmentKey::Junction(junction)))
            .map_or(range, |existing| existing.union(&range))
    }

    /// Splices a junction into a spline, keeping the junction's spline set in step.
    fn splice_into(
        &mut self,
        junction: JunctionId,
        id: SplineId,
        range: Interval<f64>,
        changes: &mut JunctionChanges,
    ) {
        let Some(spline) = self.splines.get_mut(id) else {
            log::warn!("junction {:?} refers to missing spline {:?}", junction, id);
            return;
        };
        let spliced = splice_junction(spline, &mut self.roads, junction, range).is_some();
        if let Some(samples) = spline.segment_ribbon(SegmentKey::Junction(junction)) {
            debug_polyline("junction_segment", samples.iter().map(|sample| sample.centre));
        }
        if let Some(junction) = self.junctions.get_mut(junction) {
            if spliced {
                junction.add_spline(id);
            } else {
                junction.remove_spline(id);
            }
        }
        self.relink_with_neighbours(id);
        changes.touched_splines.insert(id);
    }

    /// Rebuilds the lane connections of every junction affected by the changes.
    pub(super) fn rebuild_connections(&mut self, changes: &JunctionChanges) {
        let affected = changes
            .touched_splines
            .iter()
            .filter_map(|id| self.splines.get(*id))
            .flat_map(|spline| spline.junction_segments())
            .chain(changes.disconnected.iter().map(|(junction, _)| *junction))
            .collect::<BTreeSet<_>>();

        for junction_id in affected {
            let Some(junction) = self.junctions.get(junction_id) else {
                continue;
            };
            let connections = derive_connections(&junction_legs(junction, &self.splines));
            log::trace!(
                "junction {:?} has {} lane connections",
                junction_id,
                connections.len()
            );
            if let Some(junction) = self.junctions.get_mut(junction_id) {
                junction.set_connections(connections);
            }
        }
    }
}

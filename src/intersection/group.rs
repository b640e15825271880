use super::{IntersectionKey, IntersectionRecord};
use crate::config::EngineConfig;
use crate::junction::Junction;
use crate::math::{Aabb, Point2d, Vector2d};
use crate::util::Interval;
use crate::{JunctionId, JunctionSet, SplineId, SplineSet};
use cgmath::prelude::*;
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

/// The offset range a junction should occupy on one spline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpliceSection {
    pub spline: SplineId,
    pub range: Interval<f64>,
}

/// A cluster of intersections forming the footprint of one junction.
#[derive(Clone, Debug)]
pub struct IntersectionGroup {
    /// The member intersections.
    intersections: BTreeMap<IntersectionKey, IntersectionRecord>,
    /// Every spline taking part in a member intersection.
    splines: BTreeSet<SplineId>,
    /// The union of the member intersection areas.
    bounds: Aabb,
    /// The cached centroid of the member positions; `None` means stale.
    position: Cell<Option<Point2d>>,
}

impl IntersectionGroup {
    /// Creates a group seeded with one intersection.
    pub fn new(seed: IntersectionRecord) -> Self {
        let mut group = Self {
            intersections: BTreeMap::new(),
            splines: BTreeSet::new(),
            bounds: seed.area(),
            position: Cell::new(None),
        };
        group.add_intersection(seed);
        group
    }

    /// Adds an intersection, suffixing its key if the key is already taken.
    ///
    /// The cached position is left as is; see [Self::invalidate_position].
    pub fn add_intersection(&mut self, record: IntersectionRecord) {
        let base = record.key();
        let key = (0..)
            .map(|suffix| base.with_suffix(suffix))
            .find(|key| !self.intersections.contains_key(key))
            .unwrap_or(base);
        self.bounds = self.bounds.union(&record.area());
        self.splines.extend(record.splines());
        self.intersections.insert(key, record);
    }

    /// Adds several intersections.
    pub fn add_intersections(&mut self, records: impl IntoIterator<Item = IntersectionRecord>) {
        for record in records {
            self.add_intersection(record);
        }
    }

    /// Absorbs every intersection of another group.
    pub fn merge(&mut self, other: IntersectionGroup) {
        self.add_intersections(other.intersections.into_values());
        self.invalidate_position();
    }

    pub fn intersections(&self) -> impl Iterator<Item = (&IntersectionKey, &IntersectionRecord)> {
        self.intersections.iter()
    }

    pub fn intersection_count(&self) -> usize {
        self.intersections.len()
    }

    /// The splines taking part in the group, in ID order.
    pub fn splines(&self) -> &BTreeSet<SplineId> {
        &self.splines
    }

    pub fn contains_spline(&self, spline: SplineId) -> bool {
        self.splines.contains(&spline)
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// The centroid of the member intersection positions.
    pub fn representative_position(&self) -> Point2d {
        if let Some(position) = self.position.get() {
            return position;
        }
        let sum = self
            .intersections
            .values()
            .fold(Vector2d::zero(), |acc, record| acc + record.position().to_vec());
        let position = Point2d::from_vec(sum / self.intersections.len() as f64);
        self.position.set(Some(position));
        position
    }

    /// Forces the representative position to be recomputed on next use.
    pub fn invalidate_position(&self) {
        self.position.set(None);
    }

    /// Recomputes the offsets of every member from the current spline geometry.
    pub fn recompute_offsets(&mut self, splines: &SplineSet, config: &EngineConfig) {
        for record in self.intersections.values_mut() {
            let [a, b] = record.splines();
            if let (Some(a), Some(b)) = (splines.get(a), splines.get(b)) {
                record.compute_offsets(a, b, config);
            }
        }
        self.invalidate_position();
    }

    /// The offset range covered on one spline by all member intersections.
    pub fn section_on(&self, spline: SplineId) -> Option<Interval<f64>> {
        self.intersections
            .values()
            .filter_map(|record| record.offset_on(spline))
            .reduce(|acc, range| acc.union(&range))
    }

    /// The splice range for every participating spline.
    pub fn spline_sections(&self) -> Vec<SpliceSection> {
        self.splines
            .iter()
            .filter_map(|spline| {
                self.section_on(*spline).map(|range| SpliceSection {
                    spline: *spline,
                    range,
                })
            })
            .collect()
    }

    /// The distance within which a junction is considered to belong to this group.
    pub fn match_distance(&self, config: &EngineConfig) -> f64 {
        config.match_distance(self.bounds.diagonal())
    }

    /// Whether the junction joins exactly this group's splines and lies close to it.
    pub fn matches_junction(&self, junction: &Junction, config: &EngineConfig) -> bool {
        if !junction.splines().iter().eq(self.splines.iter()) {
            return false;
        }
        self.bounds.intersects(&junction.bounds())
            || self.representative_position().distance(junction.position())
                <= self.match_distance(config)
    }

    /// Finds the existing junction on one of the group's splines that best fits the group.
    ///
    /// Junctions in `claimed` already belong to another group and are skipped.
    pub fn get_junctions(
        &self,
        splines: &SplineSet,
        junctions: &JunctionSet,
        claimed: &BTreeSet<JunctionId>,
        config: &EngineConfig,
    ) -> Option<JunctionId> {
        let candidates = self
            .splines
            .iter()
            .filter_map(|id| splines.get(*id))
            .flat_map(|spline| spline.junction_segments())
            .filter(|id| !claimed.contains(id))
            .collect::<BTreeSet<_>>();

        self.best_junction(candidates.into_iter().filter_map(|id| junctions.get(id)), config)
    }

    /// Picks the candidate junction the group should be merged into.
    ///
    /// A candidate must overlap the group, or lie within the match distance
    /// while joining no spline outside the group. Candidates are ranked by how
    /// many of their incoming splines belong to the group, then by distance.
    pub fn best_junction<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a Junction>,
        config: &EngineConfig,
    ) -> Option<JunctionId> {
        let position = self.representative_position();
        let radius = self.match_distance(config);

        candidates
            .into_iter()
            .filter(|junction| {
                self.bounds.intersects(&junction.bounds())
                    || (junction.splines().is_subset(&self.splines)
                        && position.distance(junction.position()) <= radius)
            })
            .map(|junction| {
                let shared = junction
                    .incoming_splines()
                    .intersection(&self.splines)
                    .count();
                (junction.id(), shared, position.distance(junction.position()))
            })
            .min_by(|a, b| b.1.cmp(&a.1).then(a.2.total_cmp(&b.2)))
            .map(|(id, _, _)| id)
    }
}

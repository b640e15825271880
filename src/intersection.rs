//! Detection of overlapping spline ribbons.

use crate::config::EngineConfig;
use crate::debug::debug_box;
use crate::math::{Aabb, Point2d};
use crate::spline::{Ribbon, Spline};
use crate::util::Interval;
use crate::SplineId;
pub use group::{IntersectionGroup, SpliceSection};
pub use grouping::{get_groups, merge_overlapping_groups};
use slotmap::Key;
use std::fmt;

mod group;
mod grouping;

/// Identifies the pair of splines an intersection belongs to.
///
/// Two intersections between the same pair of splines are told apart by `suffix`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionKey {
    splines: (SplineId, SplineId),
    suffix: u32,
}

impl IntersectionKey {
    /// The canonical key of a spline pair, independent of their order.
    pub fn new(a: SplineId, b: SplineId) -> Self {
        Self {
            splines: (a.min(b), a.max(b)),
            suffix: 0,
        }
    }

    /// The same pair with a collision suffix.
    pub fn with_suffix(self, suffix: u32) -> Self {
        Self { suffix, ..self }
    }

    pub fn splines(&self) -> (SplineId, SplineId) {
        self.splines
    }

    pub fn suffix(&self) -> u32 {
        self.suffix
    }
}

impl fmt::Display for IntersectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.splines;
        write!(f, "{:?}_{:?}", a.data(), b.data())?;
        if self.suffix > 0 {
            write!(f, "_{}", self.suffix)?;
        }
        Ok(())
    }
}

/// An overlap between the ribbons of two splines.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionRecord {
    /// The two splines, subject first.
    splines: [SplineId; 2],
    /// The overlapping area.
    area: Aabb,
    /// The representative position of the overlap.
    position: Point2d,
    /// The offset range on each spline covered by the other spline's footprint.
    offsets: Option<[Interval<f64>; 2]>,
}

impl IntersectionRecord {
    /// Creates a record without offsets.
    pub fn new(a: SplineId, b: SplineId, area: Aabb) -> Self {
        Self {
            splines: [a, b],
            area,
            position: area.centre(),
            offsets: None,
        }
    }

    pub fn key(&self) -> IntersectionKey {
        IntersectionKey::new(self.splines[0], self.splines[1])
    }

    pub fn splines(&self) -> [SplineId; 2] {
        self.splines
    }

    pub fn area(&self) -> Aabb {
        self.area
    }

    pub fn position(&self) -> Point2d {
        self.position
    }

    pub fn involves(&self, spline: SplineId) -> bool {
        self.splines.contains(&spline)
    }

    /// The offset range on the given spline, if offsets have been computed.
    pub fn offset_on(&self, spline: SplineId) -> Option<Interval<f64>> {
        let idx = self.splines.iter().position(|id| *id == spline)?;
        self.offsets.map(|offsets| offsets[idx])
    }

    /// Computes the offset ranges of the record on both of its splines.
    /// The splines must be given in the same order as the record's.
    pub fn compute_offsets(&mut self, a: &Spline, b: &Spline, config: &EngineConfig) {
        debug_assert_eq!([a.id(), b.id()], self.splines);
        self.offsets = Some([a, b].map(|spline| compute_offsets(&self.area, spline, config)));
    }
}

/// Finds where the ribbon of `spline` overlaps the ribbons of the candidates.
///
/// The spline itself and splines linked to either of its ends are skipped.
/// Returned records have their offsets computed.
pub fn find_intersections<'a>(
    spline: &Spline,
    candidates: impl IntoIterator<Item = &'a Spline>,
    config: &EngineConfig,
) -> Vec<IntersectionRecord> {
    candidates
        .into_iter()
        .filter(|other| other.id() != spline.id())
        .filter(|other| !are_linked(spline, other))
        .flat_map(|other| {
            sweep_ribbons(spline.ribbon(), other.ribbon())
                .into_iter()
                .map(move |area| {
                    debug_box("intersection", area);
                    let mut record = IntersectionRecord::new(spline.id(), other.id(), area);
                    record.compute_offsets(spline, other, config);
                    record
                })
        })
        .collect()
}

/// Whether either spline has an end linked to the other.
fn are_linked(a: &Spline, b: &Spline) -> bool {
    a.linked_splines().any(|id| id == b.id()) || b.linked_splines().any(|id| id == a.id())
}

/// Sweeps the steps of ribbon `a` against those of ribbon `b`, returning one
/// area per run of consecutive overlapping steps of `a`.
pub fn sweep_ribbons(a: &Ribbon, b: &Ribbon) -> Vec<Aabb> {
    let (Some(bounds_a), Some(bounds_b)) = (a.bounds(), b.bounds()) else {
        return vec![];
    };
    if a.len() < 2 || b.len() < 2 || !bounds_a.intersects(&bounds_b) {
        return vec![];
    }

    let boxes_b = b.step_boxes().collect::<Vec<_>>();
    let mut areas = vec![];
    let mut open: Option<Aabb> = None;

    for box_a in a.step_boxes() {
        let overlap = box_a
            .intersection(&bounds_b)
            .and_then(|_| {
                boxes_b
                    .iter()
                    .filter_map(|box_b| box_a.intersection(box_b))
                    .reduce(|acc, area| acc.union(&area))
            });
        match (overlap, open) {
            (Some(area), Some(run)) => open = Some(run.union(&area)),
            (Some(area), None) => open = Some(area),
            (None, Some(run)) => {
                log::trace!("ribbon overlap closed at {:?}", run.centre());
                areas.push(run);
                open = None;
            }
            (None, None) => {}
        }
    }
    areas.extend(open);

    areas
}

/// Projects an intersection area onto a spline, giving the offset range it covers.
///
/// The range is padded by `offset_buffer` and clamped to the spline. When a
/// bound is clamped onto an end of the spline, the opposite bound is pushed
/// out by `edge_extension` so that junctions at spline ends keep some depth.
pub fn compute_offsets(area: &Aabb, spline: &Spline, config: &EngineConfig) -> Interval<f64> {
    let length = spline.length();
    let (min, max) = area
        .corners()
        .into_iter()
        .map(|corner| spline.nearest_offset(corner))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), s| {
            (min.min(s), max.max(s))
        });
    let range = Interval::new(min, max)
        .expand(config.offset_buffer)
        .clamp_to(&Interval::new(0.0, length));

    let mut out = range;
    if range.min <= 0.0 {
        out.max = f64::min(range.max + config.edge_extension, length);
    }
    if range.max >= length {
        out.min = f64::max(range.min - config.edge_extension, 0.0);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point3d;
    use crate::spline::{ControlPoint, LaneProfile, SplineAttributes};
    use assert_approx_eq::assert_approx_eq;
    use slotmap::SlotMap;

    fn splines(lines: &[[(f64, f64); 2]]) -> SlotMap<SplineId, Spline> {
        let config = EngineConfig::default();
        let mut roads = SlotMap::<crate::RoadId, ()>::with_key();
        let mut splines = SlotMap::with_key();
        for [from, to] in lines {
            let heading = (to.1 - from.1).atan2(to.0 - from.0);
            let points = [
                ControlPoint::new(Point3d::new(from.0, from.1, 0.0), heading),
                ControlPoint::new(Point3d::new(to.0, to.1, 0.0), heading),
            ];
            let attribs = SplineAttributes {
                control_points: &points,
                lanes: LaneProfile::symmetric(1, 3.5),
            };
            let road = roads.insert(());
            splines.insert_with_key(|id| Spline::new(id, &attribs, road, &config));
        }
        splines
    }

    #[test]
    fn perpendicular_splines_intersect_once() {
        let splines = splines(&[[(0.0, 0.0), (100.0, 0.0)], [(50.0, -50.0), (50.0, 50.0)]]);
        let ids = splines.keys().collect::<Vec<_>>();
        let a = &splines[ids[0]];
        let records = find_intersections(a, splines.values(), &EngineConfig::default());

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_approx_eq!(record.position().x, 50.0, 0.1);
        assert_approx_eq!(record.position().y, 0.0, 0.1);

        let range = record.offset_on(ids[0]).unwrap();
        assert_approx_eq!(range.min, 43.5, 0.1);
        assert_approx_eq!(range.max, 56.5, 0.1);
        let range = record.offset_on(ids[1]).unwrap();
        assert_approx_eq!(range.min, 43.5, 0.1);
        assert_approx_eq!(range.max, 56.5, 0.1);
    }

    #[test]
    fn distant_splines_do_not_intersect() {
        let splines = splines(&[[(0.0, 0.0), (100.0, 0.0)], [(0.0, 40.0), (100.0, 40.0)]]);
        let a = splines.values().next().unwrap();
        assert!(find_intersections(a, splines.values(), &EngineConfig::default()).is_empty());
    }

    #[test]
    fn offsets_touching_an_end_are_extended() {
        // The second spline ends on the first one.
        let splines = splines(&[[(0.0, 0.0), (100.0, 0.0)], [(50.0, -50.0), (50.0, 0.0)]]);
        let ids = splines.keys().collect::<Vec<_>>();
        let records = find_intersections(&splines[ids[0]], splines.values(), &EngineConfig::default());
        assert_eq!(records.len(), 1);

        let length = splines[ids[1]].length();
        let range = records[0].offset_on(ids[1]).unwrap();
        assert_approx_eq!(range.max, length);
        // Footprint starts 4.5 m before the end, plus 2 m buffer and 5 m extension
        assert_approx_eq!(range.min, length - 11.5, 0.1);
    }

    #[test]
    fn group_sections_cover_member_offsets() {
        let config = EngineConfig::default();
        let splines = splines(&[[(0.0, 0.0), (100.0, 0.0)], [(50.0, -50.0), (50.0, 50.0)]]);
        let ids = splines.keys().collect::<Vec<_>>();
        let records = find_intersections(&splines[ids[0]], splines.values(), &config);

        let mut group = IntersectionGroup::new(records[0].clone());
        group.recompute_offsets(&splines, &config);
        let sections = group.spline_sections();
        assert_eq!(sections.len(), 2);
        for section in sections {
            assert_approx_eq!(section.range.min, 43.5, 0.1);
            assert_approx_eq!(section.range.max, 56.5, 0.1);
        }
    }

    #[test]
    fn degenerate_ribbons_yield_nothing() {
        assert!(sweep_ribbons(&Ribbon::default(), &Ribbon::default()).is_empty());
    }

    #[test]
    fn keys_are_order_independent() {
        let splines = splines(&[[(0.0, 0.0), (1.0, 0.0)], [(0.0, 1.0), (1.0, 1.0)]]);
        let ids = splines.keys().collect::<Vec<_>>();
        let key = IntersectionKey::new(ids[1], ids[0]);
        assert_eq!(key, IntersectionKey::new(ids[0], ids[1]));
        assert_ne!(key, key.with_suffix(1));
        assert!(key.with_suffix(2).to_string().ends_with("_2"));
    }
}

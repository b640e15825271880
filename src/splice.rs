//! Insertion and removal of junction segments in a spline's segment map.

use crate::spline::segments::EPSILON;
use crate::spline::{Road, Segment, SegmentKey, SegmentMap, Spline};
use crate::util::Interval;
use crate::{JunctionId, RoadRegistry};

/// Where a junction sits along a spline, which decides how it is spliced in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpliceKind {
    /// The junction covers the start of the spline.
    Start,
    /// The junction lies strictly inside the spline.
    Middle,
    /// The junction covers the end of the spline.
    End,
}

impl SpliceKind {
    /// Picks the splice for a range on a spline of the given length.
    pub fn for_range(range: Interval<f64>, length: f64) -> Self {
        if range.min <= EPSILON {
            SpliceKind::Start
        } else if range.max >= length - EPSILON {
            SpliceKind::End
        } else {
            SpliceKind::Middle
        }
    }
}

/// Splices a junction into a spline over the given offset range.
///
/// If the junction is already on the spline, its current segment is spliced
/// out first, which also removes the road cloned behind it by a previous
/// middle splice. The range is shrunk so it never overlaps another junction.
///
/// Returns the splice performed, or `None` if nothing of the range was left
/// to splice, in which case the junction is no longer on the spline.
/// Road links are not updated; the caller must relink the spline.
pub fn splice_junction(
    spline: &mut Spline,
    roads: &mut RoadRegistry,
    junction: JunctionId,
    range: Interval<f64>,
) -> Option<SpliceKind> {
    let updating = remove_junction(spline, roads, junction);

    let length = spline.length();
    let Some(range) = fit_range(spline.segments(), range) else {
        log::warn!(
            "junction {:?} has no room on spline {:?} for range {:?}",
            junction,
            spline.id(),
            range
        );
        return None;
    };

    let kind = SpliceKind::for_range(range, length);
    log::debug!(
        "{} junction {:?} on spline {:?} as {:?} over {:?}",
        if updating { "updating" } else { "inserting" },
        junction,
        spline.id(),
        kind,
        range
    );

    match kind {
        SpliceKind::Start => splice_start(spline, roads, junction, range.max),
        SpliceKind::Middle => splice_middle(spline, roads, junction, range),
        SpliceKind::End => splice_end(spline, roads, junction, range.min),
    }
    drop_empty_roads(spline, roads);
    debug_assert!(spline.segments().is_contiguous());

    Some(kind)
}

/// Removes a junction's segment from a spline, restoring contiguity.
///
/// The gap is covered by the road before the junction. If there is no such
/// road, the road after it is extended backwards, or a new road is created.
/// When roads remain on both sides they are merged into the first one.
///
/// Returns false if the junction was not on the spline.
pub fn remove_junction(spline: &mut Spline, roads: &mut RoadRegistry, junction: JunctionId) -> bool {
    let spline_id = spline.id();
    let map = spline.segments_mut();
    let Some(idx) = map.position(SegmentKey::Junction(junction)) else {
        return false;
    };
    let removed = map.remove_at(idx);

    let road_before = idx > 0 && is_road(map, idx - 1);
    let road_after = is_road(map, idx);

    match (road_before, road_after) {
        (true, true) => {
            let merged = map.remove_at(idx);
            unregister(roads, &merged.segment);
        }
        (true, false) => {}
        (false, true) => {
            if let Some(entry) = map.get_mut(idx) {
                entry.s = removed.s;
            }
        }
        (false, false) => {
            let road = roads.insert(spline_id);
            map.add_segment(removed.s, Segment::Road(Road::new(road)));
        }
    }

    true
}

/// Shrinks a range so it lies within the spline and does not overlap any junction.
fn fit_range(map: &SegmentMap, range: Interval<f64>) -> Option<Interval<f64>> {
    let mut range = range.clamp_to(&Interval::new(0.0, map.length()));
    let junctions = (0..map.len())
        .filter(|idx| !is_road(map, *idx))
        .map(|idx| map.range(idx))
        .collect::<Vec<_>>();

    for occupied in &junctions {
        if occupied.min <= range.min && range.min < occupied.max {
            range.min = occupied.max;
        }
    }
    for occupied in &junctions {
        if occupied.min >= range.min && occupied.min < range.max {
            range.max = occupied.min;
        }
    }

    (range.length() > EPSILON).then_some(range)
}

/// The junction occupies `[0, end)`; roads starting before `end` are shifted or removed.
fn splice_start(spline: &mut Spline, roads: &mut RoadRegistry, junction: JunctionId, end: f64) {
    carve(spline, roads, Interval::new(-EPSILON, end));
    spline
        .segments_mut()
        .add_segment(0.0, Segment::Junction(junction));
}

/// The junction occupies `[start, end)` inside a road.
///
/// The road is truncated at `start`. If it extended past `end`, a fresh
/// road is created to cover the rest of it.
fn splice_middle(
    spline: &mut Spline,
    roads: &mut RoadRegistry,
    junction: JunctionId,
    range: Interval<f64>,
) {
    let map = spline.segments();
    let Ok(idx) = map.index_at(range.min) else {
        return;
    };
    let owner_end = map.range(idx).max;
    let starts_at_end = map.iter().any(|entry| (entry.s - range.max).abs() <= EPSILON);

    if owner_end > range.max + EPSILON {
        if !starts_at_end {
            let clone = roads.insert(spline.id());
            spline
                .segments_mut()
                .add_segment(range.max, Segment::Road(Road::new(clone)));
        }
    } else {
        carve(spline, roads, Interval::new(range.min + EPSILON, range.max));
    }
    spline
        .segments_mut()
        .add_segment(range.min, Segment::Junction(junction));
}

/// The junction occupies `[start, length]`; every road after `start` is removed.
fn splice_end(spline: &mut Spline, roads: &mut RoadRegistry, junction: JunctionId, start: f64) {
    let length = spline.length();
    carve(spline, roads, Interval::new(start + EPSILON, length + EPSILON));
    spline
        .segments_mut()
        .add_segment(start, Segment::Junction(junction));
}

/// Clears roads starting inside `range`: roads ending inside it are removed,
/// a road extending past its end is shifted to start there.
fn carve(spline: &mut Spline, roads: &mut RoadRegistry, range: Interval<f64>) {
    let spline_id = spline.id();
    let map = spline.segments_mut();
    let mut idx = 0;
    while idx < map.len() {
        let span = map.range(idx);
        if !is_road(map, idx) || span.min < range.min || span.min >= range.max {
            idx += 1;
        } else if span.max <= range.max + EPSILON {
            let removed = map.remove_at(idx);
            log::trace!("detached {:?} from spline {:?}", removed.segment.key(), spline_id);
            unregister(roads, &removed.segment);
        } else {
            if let Some(entry) = map.get_mut(idx) {
                entry.s = range.max;
            }
            idx += 1;
        }
    }
}

/// Removes roads left with no length by a splice.
fn drop_empty_roads(spline: &mut Spline, roads: &mut RoadRegistry) {
    let map = spline.segments_mut();
    let mut idx = 0;
    while idx < map.len() {
        if is_road(map, idx) && map.len() > 1 && map.range(idx).length() <= EPSILON {
            let removed = map.remove_at(idx);
            unregister(roads, &removed.segment);
            if idx == 0 {
                if let Some(entry) = map.get_mut(0) {
                    entry.s = 0.0;
                }
            }
        } else {
            idx += 1;
        }
    }
}

fn is_road(map: &SegmentMap, idx: usize) -> bool {
    matches!(map.get(idx).map(|e| &e.segment), Some(Segment::Road(_)))
}

fn unregister(roads: &mut RoadRegistry, segment: &Segment) {
    if let Segment::Road(road) = segment {
        roads.remove(road.id());
    }
}

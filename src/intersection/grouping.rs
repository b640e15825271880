use super::{IntersectionGroup, IntersectionRecord};
use cgmath::prelude::*;

/// Clusters intersections into groups in a single greedy pass.
///
/// Each unprocessed intersection seeds a group, which then takes every other
/// unprocessed intersection within `threshold` of the group's position at the
/// time it was seeded. Membership is not transitive: an intersection close to
/// a later member but far from the seed starts or joins another group.
pub fn get_groups(intersections: Vec<IntersectionRecord>, threshold: f64) -> Vec<IntersectionGroup> {
    let mut pending = intersections.into_iter().map(Some).collect::<Vec<_>>();
    let mut groups = vec![];

    for idx in 0..pending.len() {
        let Some(seed) = pending[idx].take() else {
            continue;
        };
        let mut group = IntersectionGroup::new(seed);
        let position = group.representative_position();

        for slot in pending.iter_mut().skip(idx + 1) {
            let near = slot
                .as_ref()
                .map_or(false, |record| record.position().distance(position) <= threshold);
            if near {
                group.add_intersections(slot.take());
            }
        }

        group.invalidate_position();
        groups.push(group);
    }

    groups
}

/// Merges groups whose bounding areas intersect until no two groups overlap.
pub fn merge_overlapping_groups(mut groups: Vec<IntersectionGroup>) -> Vec<IntersectionGroup> {
    'outer: loop {
        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                if groups[i].bounds().intersects(&groups[j].bounds()) {
                    let other = groups.remove(j);
                    log::trace!(
                        "merging overlapping groups at {:?} and {:?}",
                        groups[i].representative_position(),
                        other.representative_position()
                    );
                    groups[i].merge(other);
                    continue 'outer;
                }
            }
        }
        return groups;
    }
}

//! Tests that detect junctions between splines in a road network.

use assert_approx_eq::assert_approx_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use road_junctions::{
    find_intersections, math::Point3d, ContactPoint, ControlPoint, LaneProfile, RoadLink,
    RoadNetwork, SplineAttributes, SplineId,
};

/// Adds a straight two-lane spline between two points.
fn add_line(network: &mut RoadNetwork, from: (f64, f64), to: (f64, f64)) -> SplineId {
    network.add_spline(&SplineAttributes {
        control_points: &line_points(from, to),
        lanes: LaneProfile::symmetric(1, 3.5),
    })
}

fn line_points(from: (f64, f64), to: (f64, f64)) -> [ControlPoint; 2] {
    let heading = (to.1 - from.1).atan2(to.0 - from.0);
    [
        ControlPoint::new(Point3d::new(from.0, from.1, 0.0), heading),
        ControlPoint::new(Point3d::new(to.0, to.1, 0.0), heading),
    ]
}

/// Two splines crossing at (50, 0).
fn crossing() -> (RoadNetwork, SplineId, SplineId) {
    let mut network = RoadNetwork::new();
    let a = add_line(&mut network, (0.0, 0.0), (100.0, 0.0));
    let b = add_line(&mut network, (50.0, -50.0), (50.0, 50.0));
    network.reconcile([a, b]);
    (network, a, b)
}

/// Checks that every offset along the spline belongs to exactly one segment.
fn assert_contiguous(network: &RoadNetwork, id: SplineId) {
    let spline = network.get_spline(id).unwrap();
    assert!(spline.segments().is_contiguous());
    for i in 0..=200 {
        let s = spline.length() * i as f64 / 200.0;
        assert!(spline.segment_at(s).is_ok(), "no segment at {}", s);
    }
}

#[test]
fn separate_splines_have_no_junction() {
    let mut network = RoadNetwork::new();
    let a = add_line(&mut network, (0.0, 0.0), (100.0, 0.0));
    let b = add_line(&mut network, (0.0, 30.0), (100.0, 30.0));

    let changes = network.reconcile([a, b]);
    assert!(changes.created.is_empty());
    assert_eq!(network.iter_junctions().count(), 0);
    assert_eq!(network.get_spline(a).unwrap().segments().len(), 1);
}

#[test]
fn crossing_splines_share_one_junction() {
    let (network, a, b) = crossing();

    assert_eq!(network.iter_junctions().count(), 1);
    let junction = network.iter_junctions().next().unwrap();
    assert_eq!(junction.splines().len(), 2);
    assert_eq!(network.junctions_of(a), vec![junction.id()]);
    assert_eq!(network.junctions_of(b), vec![junction.id()]);
    assert_approx_eq!(junction.position().x, 50.0, 0.5);
    assert_approx_eq!(junction.position().y, 0.0, 0.5);

    // Four legs with one lane each way, connected to every other leg
    assert_eq!(junction.connections().len(), 12);
}

#[test]
fn middle_splice_keeps_spline_contiguous() {
    let (network, a, _) = crossing();
    assert_contiguous(&network, a);

    let spline = network.get_spline(a).unwrap();
    assert_eq!(spline.junction_segments().count(), 1);
    assert_eq!(spline.road_segments().count(), 2);
    assert_eq!(network.iter_roads().filter(|(_, s)| *s == a).count(), 2);

    let roads = spline.road_segments().collect::<Vec<_>>();
    let junction = spline.junction_segments().next().unwrap();
    assert_eq!(
        roads[0].successor(),
        Some(RoadLink::Junction(junction))
    );
    assert_eq!(
        roads[1].predecessor(),
        Some(RoadLink::Junction(junction))
    );
}

#[test]
fn third_spline_joins_existing_junction() {
    let (mut network, a, b) = crossing();
    let c = add_line(&mut network, (10.0, -40.0), (90.0, 40.0));
    network.detect_junctions(c).unwrap();

    assert_eq!(network.iter_junctions().count(), 1);
    let junction = network.iter_junctions().next().unwrap();
    assert_eq!(junction.splines().iter().copied().collect::<Vec<_>>(), {
        let mut ids = vec![a, b, c];
        ids.sort();
        ids
    });
    for id in [a, b, c] {
        assert_eq!(network.junctions_of(id).len(), 1);
        assert_contiguous(&network, id);
    }
}

#[test]
fn detection_is_idempotent() {
    let (mut network, a, b) = crossing();
    let c = add_line(&mut network, (10.0, -40.0), (90.0, 40.0));
    network.reconcile([c, a, b]);

    let snapshot = |network: &RoadNetwork| {
        network
            .iter_junctions()
            .map(|j| (j.id(), j.splines().clone(), j.connections().len()))
            .collect::<Vec<_>>()
    };
    let before = snapshot(&network);
    let roads_before = network.iter_roads().count();

    for id in [a, b, c, a] {
        let changes = network.detect_junctions(id).unwrap();
        assert!(changes.created.is_empty());
        assert!(changes.disconnected.is_empty());
    }
    assert_eq!(snapshot(&network), before);
    assert_eq!(network.iter_roads().count(), roads_before);
}

#[test]
fn moving_a_spline_away_disconnects_it() {
    let (mut network, a, b) = crossing();
    let junction = network.junctions_of(a)[0];

    network
        .set_control_points(b, &line_points((300.0, -50.0), (300.0, 50.0)))
        .unwrap();
    let changes = network.detect_junctions(b).unwrap();
    assert_eq!(changes.disconnected, vec![(junction, b)]);
    assert!(network.junctions_of(b).is_empty());
    assert_eq!(network.get_spline(b).unwrap().segments().len(), 1);
    assert_contiguous(&network, b);

    // The junction stays on the other spline until it is reconciled too
    assert_eq!(network.junctions_of(a), vec![junction]);
    network.detect_junctions(a).unwrap();
    assert!(network.junctions_of(a).is_empty());
    assert_eq!(network.iter_roads().count(), 2);

    assert_eq!(network.get_junction(junction).unwrap().splines().len(), 0);
    assert_eq!(network.remove_empty_junctions(), vec![junction]);
    assert_eq!(network.iter_junctions().count(), 0);
}

#[test]
fn spline_ending_on_another_forms_end_junction() {
    let mut network = RoadNetwork::new();
    let a = add_line(&mut network, (0.0, 0.0), (100.0, 0.0));
    let b = add_line(&mut network, (50.0, -50.0), (50.0, 0.0));
    network.detect_junctions(b).unwrap();

    let spline = network.get_spline(b).unwrap();
    let last = spline.segments().iter().last().unwrap();
    assert!(last.segment.junction().is_some());
    assert_eq!(spline.road_segments().count(), 1);
    assert_contiguous(&network, a);
    assert_contiguous(&network, b);

    // Two legs on the through road and one on the branch
    let junction = network.iter_junctions().next().unwrap();
    assert_eq!(junction.connections().len(), 6);
}

#[test]
fn linked_splines_do_not_intersect() {
    let mut network = RoadNetwork::new();
    let a = add_line(&mut network, (0.0, 0.0), (50.0, 0.0));
    let b = add_line(&mut network, (45.0, 0.0), (100.0, 0.0));
    {
        let config = network.config();
        let spline = network.get_spline(a).unwrap();
        assert!(!find_intersections(spline, network.iter_splines(), config).is_empty());
    }

    network
        .link_splines(a, ContactPoint::End, b, ContactPoint::Start)
        .unwrap();
    network.reconcile([a, b]);
    assert_eq!(network.iter_junctions().count(), 0);
}

#[test]
fn wider_lanes_add_connections() {
    let (mut network, a, _) = crossing();
    network.set_lanes(a, LaneProfile::symmetric(2, 3.5)).unwrap();
    network.detect_junctions(a).unwrap();

    assert_eq!(network.iter_junctions().count(), 1);
    let junction = network.iter_junctions().next().unwrap();
    // Lanes pair up to the smaller lane count of each leg pair
    assert_eq!(junction.connections().len(), 14);
}

#[test]
fn removing_a_junction_restores_roads() {
    let (mut network, a, b) = crossing();
    let junction = network.junctions_of(a)[0];

    let changes = network.remove_junction(junction).unwrap();
    assert_eq!(changes.disconnected.len(), 2);
    assert!(network.get_junction(junction).is_none());
    for id in [a, b] {
        assert_eq!(network.get_spline(id).unwrap().segments().len(), 1);
    }
    assert_eq!(network.iter_roads().count(), 2);
}

#[test]
fn removing_a_spline_leaves_the_junction_to_the_others() {
    let (mut network, a, b) = crossing();
    let junction = network.junctions_of(a)[0];

    network.remove_spline(b).unwrap();
    let remaining = network.get_junction(junction).unwrap();
    assert_eq!(remaining.splines().iter().copied().collect::<Vec<_>>(), vec![a]);
    // Only the two legs on the remaining spline are left
    assert_eq!(remaining.connections().len(), 2);
}

#[test]
fn offset_ranges_stay_on_the_spline() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut network = RoadNetwork::new();
    let mut point = || (rng.gen_range(0.0..200.0), rng.gen_range(0.0..200.0));
    let ids = (0..12)
        .map(|_| {
            let (from, to) = (point(), point());
            add_line(&mut network, from, to)
        })
        .collect::<Vec<_>>();

    for id in &ids {
        let spline = network.get_spline(*id).unwrap();
        let records = find_intersections(spline, network.iter_splines(), network.config());
        for record in &records {
            for spline_id in record.splines() {
                let length = network.get_spline(spline_id).unwrap().length();
                let range = record.offset_on(spline_id).unwrap();
                assert!(0.0 <= range.min, "{:?} starts before the spline", range);
                assert!(range.min <= range.max, "{:?} is inverted", range);
                assert!(range.max <= length, "{:?} ends after {}", range, length);
            }
        }
    }

    network.reconcile(ids.iter().copied());
    for id in &ids {
        assert_contiguous(&network, *id);
    }
}

#[test]
fn separate_crossings_get_separate_junctions() {
    let mut network = RoadNetwork::new();
    let b = add_line(&mut network, (0.0, 0.0), (200.0, 0.0));
    let a = add_line(&mut network, (60.0, -50.0), (60.0, 50.0));
    let c = add_line(&mut network, (100.0, -50.0), (100.0, 50.0));
    network.reconcile([a, b, c]);

    assert_eq!(network.iter_junctions().count(), 2);
    for junction in network.iter_junctions() {
        assert_eq!(junction.splines().len(), 2);
        assert!(junction.contains_spline(b));
    }
    assert_eq!(network.junctions_of(b).len(), 2);
    assert_ne!(network.junctions_of(a), network.junctions_of(c));

    // The road between the crossings survives
    let spline = network.get_spline(b).unwrap();
    assert_eq!(spline.road_segments().count(), 3);
    assert!(spline.segment_at(80.0).unwrap().segment.junction().is_none());
    assert_contiguous(&network, b);
}

#[test]
fn collapsed_spline_rejoins_its_junction() {
    let (mut network, a, b) = crossing();
    let junction = network.junctions_of(a)[0];

    let point = ControlPoint::new(Point3d::new(0.0, 0.0, 0.0), 0.0);
    let changes = network.set_control_points(a, &[point]).unwrap();
    assert_eq!(changes.disconnected, vec![(junction, a)]);
    assert_eq!(network.get_spline(a).unwrap().segments().len(), 1);
    assert_eq!(network.iter_roads().filter(|(_, s)| *s == a).count(), 1);

    network
        .set_control_points(a, &line_points((0.0, 0.0), (100.0, 0.0)))
        .unwrap();
    assert_contiguous(&network, a);
    network.detect_junctions(a).unwrap();

    assert_eq!(network.iter_junctions().count(), 1);
    assert_eq!(network.junctions_of(a), vec![junction]);
    assert_contiguous(&network, a);
    assert_contiguous(&network, b);
    assert_eq!(network.get_junction(junction).unwrap().connections().len(), 12);
}

#[test]
fn collapsed_spline_with_two_junctions_recovers() {
    let mut network = RoadNetwork::new();
    let a = add_line(&mut network, (0.0, 0.0), (100.0, 0.0));
    let b = add_line(&mut network, (30.0, -50.0), (30.0, 50.0));
    let c = add_line(&mut network, (70.0, -50.0), (70.0, 50.0));
    network.reconcile([a, b, c]);
    assert_eq!(network.junctions_of(a).len(), 2);

    let point = ControlPoint::new(Point3d::new(0.0, 0.0, 0.0), 0.0);
    network.set_control_points(a, &[point]).unwrap();
    assert!(network.junctions_of(a).is_empty());

    network
        .set_control_points(a, &line_points((0.0, 0.0), (100.0, 0.0)))
        .unwrap();
    network.detect_junctions(a).unwrap();
    assert_eq!(network.junctions_of(a).len(), 2);
    assert_eq!(network.iter_junctions().count(), 2);
    for id in [a, b, c] {
        assert_contiguous(&network, id);
    }
}

#[test]
fn junction_at_a_linked_end_reaches_the_next_spline() {
    let mut network = RoadNetwork::new();
    let a = add_line(&mut network, (0.0, 0.0), (100.0, 0.0));
    let b = add_line(&mut network, (100.0, 0.0), (200.0, 0.0));
    let c = add_line(&mut network, (95.0, -50.0), (95.0, 50.0));
    network
        .link_splines(a, ContactPoint::End, b, ContactPoint::Start)
        .unwrap();
    network.reconcile([a, b, c]);

    assert_eq!(network.iter_junctions().count(), 1);
    let junction = network.junctions_of(a)[0];
    let last = network.get_spline(a).unwrap().segments().iter().last().unwrap();
    assert_eq!(last.segment.junction(), Some(junction));
    assert!(network.junctions_of(b).is_empty());

    let road = network
        .get_spline(b)
        .unwrap()
        .road_segments()
        .next()
        .unwrap()
        .clone();
    assert_eq!(road.predecessor(), Some(RoadLink::Junction(junction)));

    // Legs: the road before the junction on A, the linked road on B and both halves of C
    let connections = network.get_junction(junction).unwrap().connections();
    assert!(connections.iter().any(|c| c.incoming_road == road.id()));
    assert!(connections.iter().any(|c| c.outgoing_road == road.id()));
    assert_eq!(connections.len(), 12);
}

#[cfg(feature = "debug")]
#[test]
fn detection_records_debug_frame() {
    let (mut network, a, _) = crossing();
    network.detect_junctions(a).unwrap();
    let frame = network.take_debug();
    assert!(frame.as_array().map_or(false, |items| !items.is_empty()));
}

//! Spline topology and automatic junction detection for road network editors.
//!
//! A [RoadNetwork] owns splines, each partitioned into road and junction
//! segments. Whenever a spline's geometry changes, [RoadNetwork::detect_junctions]
//! finds where its ribbon overlaps other splines, groups the overlaps into
//! junction footprints and splices junction segments into every affected spline.

pub use cgmath;
pub use config::EngineConfig;
pub use error::TopologyError;
pub use intersection::{
    find_intersections, get_groups, merge_overlapping_groups, IntersectionGroup,
    IntersectionKey, IntersectionRecord, SpliceSection,
};
pub use junction::{Junction, JunctionLeg, LaneConnection};
pub use network::{JunctionChanges, RoadNetwork};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use splice::SpliceKind;
pub use spline::{
    ContactPoint, ControlPoint, CurveSample, LaneProfile, Ribbon, RibbonSample, Road, RoadLink,
    Segment, SegmentEntry, SegmentKey, SegmentMap, Spline, SplineAttributes, SplineCurve,
    SplineLink,
};
pub use util::Interval;

mod config;
mod debug;
mod error;
mod intersection;
mod junction;
pub mod math;
mod network;
mod splice;
mod spline;
mod util;

new_key_type! {
    /// Unique ID of a [Spline].
    pub struct SplineId;
    /// Unique ID of a [Road] segment.
    pub struct RoadId;
    /// Unique ID of a [Junction].
    pub struct JunctionId;
}

type SplineSet = SlotMap<SplineId, Spline>;
type JunctionSet = SlotMap<JunctionId, Junction>;
/// Maps every live road to the spline it lies on.
type RoadRegistry = SlotMap<RoadId, SplineId>;

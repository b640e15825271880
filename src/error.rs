use crate::{JunctionId, SplineId};

/// Errors raised by lookups that only fail when the network's invariants are broken.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    /// An arc-length offset outside `[0, length]` of a spline.
    #[error("offset {offset} is outside the spline bounds [0, {length}]")]
    InvalidOffset { offset: f64, length: f64 },

    /// The spline is not registered in the network.
    #[error("spline {0:?} not found")]
    SplineNotFound(SplineId),

    /// The junction is not registered in the network.
    #[error("junction {0:?} not found")]
    JunctionNotFound(JunctionId),

    /// The segment is not part of the spline's segment map.
    #[error("segment not found in spline {0:?}")]
    SegmentNotFound(SplineId),
}

//! Tunable parameters of the junction engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Arc-length spacing of ribbon samples, in m.
const RIBBON_STEP: f64 = 2.0;

/// Smallest ribbon step accepted from a user supplied configuration, in m.
const MIN_RIBBON_STEP: f64 = 0.1;

/// Lateral clearance added outside the outermost lane when building ribbons, in m.
const RIBBON_BUFFER: f64 = 1.0;

/// Padding added around a projected intersection area on each spline, in m.
const OFFSET_BUFFER: f64 = 2.0;

/// Extra length given to the opposite bound when an offset range touches a spline end, in m.
const EDGE_EXTENSION: f64 = 5.0;

/// Maximum distance between an intersection and a group's position for grouping, in m.
const GROUPING_THRESHOLD: f64 = 10.0;

/// Scale applied to a group's bounding diagonal when matching junctions.
const MATCH_DIAGONAL_FACTOR: f64 = 1.5;

/// Lower bound of the junction matching distance, in m.
const MATCH_MIN_DISTANCE: f64 = 50.0;

/// Parameters controlling intersection detection, grouping and junction matching.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Arc-length spacing of ribbon samples, in m.
    pub ribbon_step: f64,
    /// Lateral clearance added outside the outermost lane of a ribbon, in m.
    pub ribbon_buffer: f64,
    /// Padding added to each end of a computed offset range, in m.
    pub offset_buffer: f64,
    /// When an offset range is clamped onto a spline end, the opposite
    /// bound is pushed out by this much, in m.
    pub edge_extension: f64,
    /// Intersections closer than this to a group's position join the group, in m.
    pub grouping_threshold: f64,
    /// A junction matches a group if it lies within
    /// `max(diagonal * match_diagonal_factor, match_min_distance)` of it.
    pub match_diagonal_factor: f64,
    /// See `match_diagonal_factor`.
    pub match_min_distance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ribbon_step: RIBBON_STEP,
            ribbon_buffer: RIBBON_BUFFER,
            offset_buffer: OFFSET_BUFFER,
            edge_extension: EDGE_EXTENSION,
            grouping_threshold: GROUPING_THRESHOLD,
            match_diagonal_factor: MATCH_DIAGONAL_FACTOR,
            match_min_distance: MATCH_MIN_DISTANCE,
        }
    }
}

impl EngineConfig {
    /// The distance within which a junction is considered to belong to
    /// a group whose bounding area has the given diagonal.
    pub fn match_distance(&self, diagonal: f64) -> f64 {
        f64::max(diagonal * self.match_diagonal_factor, self.match_min_distance)
    }

    /// Replaces a ribbon step that would not give a finite number of samples.
    ///
    /// A non-positive or non-finite step falls back to the default, and a
    /// tiny one is raised to [MIN_RIBBON_STEP].
    pub(crate) fn sanitized(mut self) -> Self {
        let step = self.ribbon_step;
        if !step.is_finite() || step <= 0.0 {
            log::warn!("ribbon step {} is invalid, using {}", step, RIBBON_STEP);
            self.ribbon_step = RIBBON_STEP;
        } else if step < MIN_RIBBON_STEP {
            log::warn!("ribbon step {} is too small, using {}", step, MIN_RIBBON_STEP);
            self.ribbon_step = MIN_RIBBON_STEP;
        }
        self
    }
}

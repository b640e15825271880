//! The arc-length partition of a spline into road and junction segments.

use crate::error::TopologyError;
use crate::util::Interval;
use crate::{JunctionId, RoadId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Offsets closer than this are considered equal, in m.
pub(crate) const EPSILON: f64 = 1e-6;

/// Which end of a road a link attaches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContactPoint {
    Start,
    End,
}

/// The element on the other side of a road's predecessor or successor link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RoadLink {
    /// Another road, entered at the given end.
    Road { id: RoadId, contact: ContactPoint },
    /// A junction.
    Junction(JunctionId),
}

/// A stretch of ordinary road on a spline.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Road {
    /// The road ID.
    pub(crate) id: RoadId,
    /// What the start of the road connects to.
    pub(crate) predecessor: Option<RoadLink>,
    /// What the end of the road connects to.
    pub(crate) successor: Option<RoadLink>,
}

impl Road {
    /// Creates an unlinked road.
    pub(crate) fn new(id: RoadId) -> Self {
        Self {
            id,
            predecessor: None,
            successor: None,
        }
    }

    pub fn id(&self) -> RoadId {
        self.id
    }

    pub fn predecessor(&self) -> Option<RoadLink> {
        self.predecessor
    }

    pub fn successor(&self) -> Option<RoadLink> {
        self.successor
    }
}

/// A segment of a spline.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Segment {
    Road(Road),
    Junction(JunctionId),
}

/// Identifies a segment within a segment map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentKey {
    Road(RoadId),
    Junction(JunctionId),
}

impl Segment {
    pub fn key(&self) -> SegmentKey {
        match self {
            Segment::Road(road) => SegmentKey::Road(road.id),
            Segment::Junction(id) => SegmentKey::Junction(*id),
        }
    }

    pub fn as_road(&self) -> Option<&Road> {
        match self {
            Segment::Road(road) => Some(road),
            Segment::Junction(_) => None,
        }
    }

    pub fn junction(&self) -> Option<JunctionId> {
        match self {
            Segment::Road(_) => None,
            Segment::Junction(id) => Some(*id),
        }
    }
}

/// A segment together with the offset it starts at.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentEntry {
    /// The arc-length offset of the start of the segment.
    pub s: f64,
    pub segment: Segment,
}

/// Segments of a spline ordered by their start offset.
///
/// A segment ends where the next one starts, or at the end of the spline.
/// Mutations do not repair gaps; callers must restore contiguity themselves.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentMap {
    entries: Vec<SegmentEntry>,
    length: f64,
}

impl SegmentMap {
    /// Creates a map consisting of a single road.
    pub(crate) fn new(length: f64, road: Road) -> Self {
        Self {
            entries: vec![SegmentEntry {
                s: 0.0,
                segment: Segment::Road(road),
            }],
            length,
        }
    }

    /// The length of the spline the map covers.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Changes the covered length, scaling every offset proportionally.
    pub(crate) fn rescale(&mut self, length: f64) {
        let scale = if self.length > EPSILON {
            length / self.length
        } else {
            0.0
        };
        for entry in &mut self.entries {
            entry.s *= scale;
        }
        self.length = length;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentEntry> {
        self.entries.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&SegmentEntry> {
        self.entries.get(idx)
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> Option<&mut SegmentEntry> {
        self.entries.get_mut(idx)
    }

    /// The index of the segment owning offset `s`.
    pub fn index_at(&self, s: f64) -> Result<usize, TopologyError> {
        if !(0.0..=self.length).contains(&s) || self.entries.is_empty() {
            return Err(TopologyError::InvalidOffset {
                offset: s,
                length: self.length,
            });
        }
        let idx = self.entries.partition_point(|entry| entry.s <= s);
        Ok(idx.saturating_sub(1))
    }

    /// Gets the segment owning offset `s`.
    pub fn segment_at(&self, s: f64) -> Result<&SegmentEntry, TopologyError> {
        self.index_at(s).map(|idx| &self.entries[idx])
    }

    /// The offset range covered by the segment at `idx`.
    pub fn range(&self, idx: usize) -> Interval<f64> {
        let end = self
            .entries
            .get(idx + 1)
            .map(|entry| entry.s)
            .unwrap_or(self.length);
        Interval::new(self.entries[idx].s, end)
    }

    /// The index of the segment with the given key.
    pub fn position(&self, key: SegmentKey) -> Option<usize> {
        self.entries.iter().position(|entry| entry.segment.key() == key)
    }

    /// The offset range covered by the segment with the given key.
    pub fn range_of(&self, key: SegmentKey) -> Option<Interval<f64>> {
        self.position(key).map(|idx| self.range(idx))
    }

    /// Inserts a segment starting at `s`, returning its index.
    pub fn add_segment(&mut self, s: f64, segment: Segment) -> usize {
        let idx = self.entries.partition_point(|entry| entry.s <= s);
        self.entries.insert(idx, SegmentEntry { s, segment });
        idx
    }

    /// Removes the segment with the given key.
    pub fn remove_segment(&mut self, key: SegmentKey) -> Option<SegmentEntry> {
        let idx = self.position(key)?;
        Some(self.entries.remove(idx))
    }

    pub(crate) fn remove_at(&mut self, idx: usize) -> SegmentEntry {
        self.entries.remove(idx)
    }

    /// The segment before the one with the given key.
    pub fn previous_segment(&self, key: SegmentKey) -> Option<&SegmentEntry> {
        let idx = self.position(key)?;
        idx.checked_sub(1).and_then(|idx| self.entries.get(idx))
    }

    /// The segment after the one with the given key.
    pub fn next_segment(&self, key: SegmentKey) -> Option<&SegmentEntry> {
        let idx = self.position(key)?;
        self.entries.get(idx + 1)
    }

    pub fn road_segments(&self) -> impl Iterator<Item = &Road> {
        self.entries.iter().filter_map(|entry| entry.segment.as_road())
    }

    pub fn junction_segments(&self) -> impl Iterator<Item = JunctionId> + '_ {
        self.entries.iter().filter_map(|entry| entry.segment.junction())
    }

    pub fn contains_junction(&self, junction: JunctionId) -> bool {
        self.junction_segments().any(|id| id == junction)
    }

    /// Checks that the segments start at zero, are strictly ordered and
    /// each cover a non-empty range within the spline.
    pub fn is_contiguous(&self) -> bool {
        let Some(first) = self.entries.first() else {
            return false;
        };
        if first.s.abs() > EPSILON {
            return false;
        }
        if self.entries.len() == 1 {
            return true;
        }
        let ordered = self.entries.windows(2).all(|pair| pair[0].s < pair[1].s);
        let last = self.entries[self.entries.len() - 1].s;
        ordered && last < self.length
    }
}

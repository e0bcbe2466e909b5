use crate::types::segment::{Segment, SegmentId, SegmentPatch, clamp_duration, clamp_start};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The ordered segment collection of one project.
///
/// Every public write leaves the collection sorted ascending by `start` and
/// every stored segment normalized. Positions are therefore not stable across
/// writes; callers refer to segments by [`SegmentId`] and resolve a position
/// only when they need one for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Segment>", into = "Vec<Segment>")]
pub struct SegmentStore {
    segments: Vec<Segment>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from arbitrary input, normalizing each segment, giving
    /// duplicate ids a fresh identity and sorting the result.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let mut seen = HashSet::new();
        let segments = segments
            .into_iter()
            .map(|mut segment| {
                if !seen.insert(segment.id) {
                    segment.id = SegmentId::new();
                    seen.insert(segment.id);
                }
                segment.normalize();
                segment
            })
            .collect();
        let mut store = SegmentStore { segments };
        store.sort();
        store
    }

    pub fn add(&mut self, mut segment: Segment) -> SegmentId {
        segment.normalize();
        if self.get(segment.id).is_some() {
            segment.id = SegmentId::new();
        }
        let id = segment.id;
        self.segments.push(segment);
        self.sort();
        id
    }

    /// Applies `patch` to the segment with `id` and re-sorts. Returns false when
    /// no such segment exists.
    pub fn update(&mut self, id: SegmentId, patch: SegmentPatch) -> bool {
        let Some(segment) = self.get_mut(id) else {
            return false;
        };
        patch.apply_to(segment);
        self.sort();
        true
    }

    pub fn delete(&mut self, id: SegmentId) -> Option<Segment> {
        let index = self.position(id)?;
        Some(self.segments.remove(index))
    }

    /// Writes a new time range without re-sorting. Used while a pointer gesture
    /// is in flight; the gesture calls [`SegmentStore::sort`] when it ends.
    pub(crate) fn set_range_live(&mut self, id: SegmentId, start: f64, duration: f64) -> bool {
        match self.get_mut(id) {
            Some(segment) => {
                segment.start = clamp_start(start);
                segment.duration = clamp_duration(duration);
                true
            }
            None => false,
        }
    }

    pub fn sort(&mut self) {
        self.segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    pub fn is_sorted(&self) -> bool {
        self.segments.windows(2).all(|w| w[0].start <= w[1].start)
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id == id)
    }

    pub fn position(&self, id: SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id == id)
    }

    pub fn id_at(&self, index: usize) -> Option<SegmentId> {
        self.segments.get(index).map(|s| s.id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Latest end time of any segment, or 0 for an empty store.
    pub fn max_end(&self) -> f64 {
        self.segments.iter().map(Segment::end).fold(0.0, f64::max)
    }
}

impl From<Vec<Segment>> for SegmentStore {
    fn from(segments: Vec<Segment>) -> Self {
        SegmentStore::from_segments(segments)
    }
}

impl From<SegmentStore> for Vec<Segment> {
    fn from(store: SegmentStore) -> Self {
        store.segments
    }
}

impl<'a> IntoIterator for &'a SegmentStore {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

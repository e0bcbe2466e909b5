use crate::types::segment::SegmentId;
use std::collections::HashMap;

/// Which segment, if any, is playing in isolation, and the per-segment loop
/// preferences. Runtime only; never written to storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSelection {
    active: Option<SegmentId>,
    loop_flags: HashMap<SegmentId, bool>,
}

impl PlaybackSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<SegmentId> {
        self.active
    }

    pub fn is_active(&self, id: SegmentId) -> bool {
        self.active == Some(id)
    }

    pub(crate) fn set_active(&mut self, id: SegmentId) {
        self.active = Some(id);
    }

    pub(crate) fn clear_active(&mut self) -> Option<SegmentId> {
        self.active.take()
    }

    pub fn is_looping(&self, id: SegmentId) -> bool {
        self.loop_flags.get(&id).copied().unwrap_or(false)
    }

    pub fn set_looping(&mut self, id: SegmentId, looping: bool) {
        if looping {
            self.loop_flags.insert(id, true);
        } else {
            self.loop_flags.remove(&id);
        }
    }

    /// Flips the loop preference and returns the new value.
    pub fn toggle_loop(&mut self, id: SegmentId) -> bool {
        let looping = !self.is_looping(id);
        self.set_looping(id, looping);
        looping
    }

    /// Drops every trace of a removed segment. Returns true when it was the
    /// active one, in which case the caller must stop playback.
    pub fn forget(&mut self, id: SegmentId) -> bool {
        self.loop_flags.remove(&id);
        self.active == Some(id)
    }
}

use crate::ops::geometry::{GeometryMapper, MIN_SEGMENT_WIDTH_PX, SegmentRect};
use crate::ops::segment_store::SegmentStore;
use crate::types::segment::SegmentId;
use tracing::debug;

/// Which part of a segment the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTarget {
    Body,
    LeadingHandle,
    TrailingHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Moving,
    ResizingLeft,
    ResizingRight,
}

impl From<DragTarget> for DragMode {
    fn from(target: DragTarget) -> Self {
        match target {
            DragTarget::Body => DragMode::Moving,
            DragTarget::LeadingHandle => DragMode::ResizingLeft,
            DragTarget::TrailingHandle => DragMode::ResizingRight,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    segment: SegmentId,
    mode: DragMode,
    origin_x: f64,
    origin: SegmentRect,
    origin_start: f64,
    origin_duration: f64,
    live: SegmentRect,
}

/// Pointer gesture state machine for moving and resizing one segment.
///
/// The mode is chosen from the grabbed sub-target when the gesture starts and
/// stays fixed until it ends. Every pointer move writes the new range into the
/// store immediately; ordering is only restored when the gesture ends or is
/// cancelled.
#[derive(Debug, Default)]
pub struct DragController {
    gesture: Option<Gesture>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a gesture on `id`. Ignored (returns false) while another gesture
    /// is active or when the segment does not exist.
    pub fn begin(
        &mut self,
        id: SegmentId,
        target: DragTarget,
        pointer_x: f64,
        segments: &SegmentStore,
        mapper: &GeometryMapper,
    ) -> bool {
        if self.gesture.is_some() {
            return false;
        }
        let Some(segment) = segments.get(id) else {
            return false;
        };
        let origin = mapper.segment_rect(segment);
        let mode = DragMode::from(target);
        debug!("Drag {mode:?} started on segment {id}");
        self.gesture = Some(Gesture {
            segment: id,
            mode,
            origin_x: pointer_x,
            origin,
            origin_start: segment.start,
            origin_duration: segment.duration,
            live: origin,
        });
        true
    }

    /// Applies the pointer position to the dragged segment and returns the
    /// live pixel geometry to draw it with.
    pub fn drag_to(
        &mut self,
        pointer_x: f64,
        segments: &mut SegmentStore,
        mapper: &GeometryMapper,
    ) -> Option<SegmentRect> {
        let gesture = self.gesture.as_mut()?;
        let segment = segments.get(gesture.segment)?;
        let dx = pointer_x - gesture.origin_x;
        let origin = gesture.origin;

        let (live, start, duration) = match gesture.mode {
            DragMode::Moving => {
                let left = (origin.left + dx).max(0.0);
                let live = SegmentRect {
                    left,
                    width: origin.width,
                };
                (live, mapper.pixel_to_time(left), segment.duration)
            }
            DragMode::ResizingRight => {
                let width = (origin.width + dx).max(MIN_SEGMENT_WIDTH_PX);
                let live = SegmentRect {
                    left: origin.left,
                    width,
                };
                (live, segment.start, mapper.pixel_to_time(width))
            }
            DragMode::ResizingLeft => {
                let left = (origin.left + dx).max(0.0);
                let width = (origin.width + (origin.left - left)).max(MIN_SEGMENT_WIDTH_PX);
                let live = SegmentRect { left, width };
                (
                    live,
                    mapper.pixel_to_time(left),
                    mapper.pixel_to_time(width),
                )
            }
        };

        segments.set_range_live(gesture.segment, start, duration);
        gesture.live = live;
        Some(live)
    }

    /// Finishes the gesture and restores start ordering. Returns the segment
    /// that was edited so the caller can persist and re-render.
    pub fn end(&mut self, segments: &mut SegmentStore) -> Option<SegmentId> {
        let gesture = self.gesture.take()?;
        segments.sort();
        debug!("Drag {:?} ended on segment {}", gesture.mode, gesture.segment);
        Some(gesture.segment)
    }

    /// Abandons the gesture: the segment gets back the range it had when the
    /// gesture began and the store is sorted again. A no-op when idle.
    pub fn cancel(&mut self, segments: &mut SegmentStore) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        segments.set_range_live(gesture.segment, gesture.origin_start, gesture.origin_duration);
        segments.sort();
        debug!("Drag {:?} cancelled on segment {}", gesture.mode, gesture.segment);
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn mode(&self) -> Option<DragMode> {
        self.gesture.map(|g| g.mode)
    }

    pub fn active_segment(&self) -> Option<SegmentId> {
        self.gesture.map(|g| g.segment)
    }

    /// Geometry to draw `id` with while it is being dragged.
    pub fn live_rect(&self, id: SegmentId) -> Option<SegmentRect> {
        self.gesture
            .filter(|g| g.segment == id)
            .map(|g| g.live)
    }
}

use eframe::egui;

use crate::ops::drag::DragTarget;
use crate::ops::editor::Editor;
use crate::ops::geometry::SegmentRect;
use crate::types::segment::{Segment, SegmentId};
use crate::ui::to_color32;

pub const RULER_HEIGHT: f32 = 24.0;
pub const LANE_HEIGHT: f32 = 56.0;
pub const RESIZE_HANDLE_WIDTH: f32 = 6.0;
const SEGMENT_MARGIN: f32 = 8.0;
const MAJOR_TICK_SECS: u32 = 5;

/// Everything the timeline wants the editor to do this frame. Pointer
/// positions are in timeline pixels, measured from the ruler origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineEvent {
    Seek(f64),
    AddAt(f64),
    SegmentClicked(SegmentId),
    SegmentDoubleClicked(SegmentId),
    DragStarted {
        segment: SegmentId,
        target: DragTarget,
        x: f64,
    },
    DragMoved(f64),
    DragEnded,
}

/// Draws the ruler, the segment lane and the playhead from the editor's
/// current state. It never mutates the editor; it reports what happened.
pub struct TimelineWidget<'a> {
    editor: &'a Editor,
}

impl<'a> TimelineWidget<'a> {
    pub fn new(editor: &'a Editor) -> Self {
        Self { editor }
    }

    pub fn show(self, ui: &mut egui::Ui) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        let mapper = self.editor.mapper();
        let ruler_end = self.editor.ruler_end();
        let width = (mapper.timeline_width(ruler_end) as f32).max(ui.available_width());

        egui::ScrollArea::horizontal()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                let (rect, background) = ui.allocate_exact_size(
                    egui::vec2(width, RULER_HEIGHT + LANE_HEIGHT),
                    egui::Sense::click(),
                );
                let painter = ui.painter_at(rect);
                painter.rect_filled(rect, 0.0, ui.style().visuals.extreme_bg_color);

                let ruler_rect =
                    egui::Rect::from_min_size(rect.min, egui::vec2(width, RULER_HEIGHT));
                self.draw_ruler(&painter, ruler_rect, ruler_end);

                let lane_rect = egui::Rect::from_min_max(
                    rect.min + egui::vec2(0.0, RULER_HEIGHT),
                    rect.max,
                );
                painter.line_segment(
                    [lane_rect.left_top(), lane_rect.right_top()],
                    egui::Stroke::new(
                        1.0,
                        ui.style().visuals.widgets.noninteractive.bg_stroke.color,
                    ),
                );

                if let Some(pos) = background.interact_pointer_pos() {
                    let x = (pos.x - rect.left()) as f64;
                    if background.double_clicked() {
                        events.push(TimelineEvent::AddAt(x));
                    } else if background.clicked() {
                        events.push(TimelineEvent::Seek(x));
                    }
                }

                if let Some(segments) = self.editor.segments() {
                    for segment in segments.iter() {
                        let placed = self
                            .editor
                            .live_rect(segment.id)
                            .unwrap_or_else(|| mapper.segment_rect(segment));
                        self.segment(ui, &painter, lane_rect, segment, placed, &mut events);
                    }
                }

                let playhead_x = rect.left() + mapper.time_to_pixel(self.editor.playhead()) as f32;
                painter.line_segment(
                    [
                        egui::pos2(playhead_x, rect.top()),
                        egui::pos2(playhead_x, rect.bottom()),
                    ],
                    egui::Stroke::new(2.0, egui::Color32::RED),
                );
            });

        events
    }

    fn draw_ruler(&self, painter: &egui::Painter, rect: egui::Rect, ruler_end: f64) {
        let mapper = self.editor.mapper();
        for (second, major) in ruler_ticks(ruler_end) {
            let x = rect.left() + mapper.time_to_pixel(second as f64) as f32;
            let tick_height = if major { rect.height() * 0.6 } else { rect.height() * 0.25 };
            painter.line_segment(
                [
                    egui::pos2(x, rect.bottom() - tick_height),
                    egui::pos2(x, rect.bottom()),
                ],
                egui::Stroke::new(1.0, egui::Color32::GRAY),
            );
            if major {
                painter.text(
                    egui::pos2(x + 3.0, rect.top() + 2.0),
                    egui::Align2::LEFT_TOP,
                    format!("{second}s"),
                    egui::FontId::monospace(10.0),
                    egui::Color32::LIGHT_GRAY,
                );
            }
        }
    }

    fn segment(
        &self,
        ui: &mut egui::Ui,
        painter: &egui::Painter,
        lane: egui::Rect,
        segment: &Segment,
        placed: SegmentRect,
        events: &mut Vec<TimelineEvent>,
    ) {
        let seg_rect = egui::Rect::from_min_size(
            egui::pos2(lane.left() + placed.left as f32, lane.top() + SEGMENT_MARGIN),
            egui::vec2(placed.width as f32, lane.height() - 2.0 * SEGMENT_MARGIN),
        );
        let selection = self.editor.selection();
        let is_playing = selection.is_active(segment.id);

        painter.rect_filled(seg_rect, 4.0, to_color32(segment.color));
        let border = if is_playing {
            egui::Stroke::new(2.0, egui::Color32::WHITE)
        } else {
            egui::Stroke::new(1.0, egui::Color32::from_black_alpha(60))
        };
        painter.rect_stroke(seg_rect, 4.0, border, egui::StrokeKind::Inside);

        if seg_rect.width() > 40.0 {
            let mut label = segment.title.clone();
            if selection.is_looping(segment.id) {
                label.push_str(" ⟲");
            }
            painter
                .with_clip_rect(seg_rect.shrink(2.0))
                .text(
                    seg_rect.left_center() + egui::vec2(RESIZE_HANDLE_WIDTH + 2.0, 0.0),
                    egui::Align2::LEFT_CENTER,
                    label,
                    egui::FontId::proportional(12.0),
                    egui::Color32::BLACK,
                );
        }

        let body = ui.interact(
            seg_rect,
            egui::Id::new(("segment", segment.id)),
            egui::Sense::click_and_drag(),
        );
        let (leading, trailing) = handle_rects(seg_rect);
        let leading = ui
            .interact(
                leading,
                egui::Id::new(("segment_leading", segment.id)),
                egui::Sense::drag(),
            )
            .on_hover_cursor(egui::CursorIcon::ResizeHorizontal);
        let trailing = ui
            .interact(
                trailing,
                egui::Id::new(("segment_trailing", segment.id)),
                egui::Sense::drag(),
            )
            .on_hover_cursor(egui::CursorIcon::ResizeHorizontal);

        if body.double_clicked() {
            events.push(TimelineEvent::SegmentDoubleClicked(segment.id));
        } else if body.clicked() {
            events.push(TimelineEvent::SegmentClicked(segment.id));
        }

        for (response, target) in [
            (&body, DragTarget::Body),
            (&leading, DragTarget::LeadingHandle),
            (&trailing, DragTarget::TrailingHandle),
        ] {
            let pointer_x = response
                .interact_pointer_pos()
                .map(|pos| (pos.x - lane.left()) as f64);
            if response.drag_started() {
                if let Some(x) = pointer_x {
                    events.push(TimelineEvent::DragStarted {
                        segment: segment.id,
                        target,
                        x,
                    });
                }
            } else if response.dragged() {
                if let Some(x) = pointer_x {
                    events.push(TimelineEvent::DragMoved(x));
                }
            }
            if response.drag_stopped() {
                events.push(TimelineEvent::DragEnded);
            }
        }
    }
}

/// One tick per whole second from 0 to `ruler_end`, flagged major every
/// five seconds.
pub fn ruler_ticks(ruler_end: f64) -> impl Iterator<Item = (u32, bool)> {
    let last = if ruler_end.is_finite() && ruler_end > 0.0 {
        ruler_end.ceil() as u32
    } else {
        0
    };
    (0..=last).map(|s| (s, s % MAJOR_TICK_SECS == 0))
}

/// Grab zones at both ends of a segment. On very narrow segments the handles
/// shrink so the body keeps a grabbable middle third.
pub fn handle_rects(segment: egui::Rect) -> (egui::Rect, egui::Rect) {
    let width = RESIZE_HANDLE_WIDTH.min(segment.width() / 3.0);
    let leading = egui::Rect::from_min_max(
        segment.left_top(),
        egui::pos2(segment.left() + width, segment.bottom()),
    );
    let trailing = egui::Rect::from_min_max(
        egui::pos2(segment.right() - width, segment.top()),
        segment.right_bottom(),
    );
    (leading, trailing)
}

pub fn format_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0) as i32;
    let secs = seconds % 60.0;
    format!("{:02}:{:06.3}", minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ruler_has_a_tick_per_second() {
        let ticks: Vec<_> = ruler_ticks(30.0).collect();
        assert_eq!(ticks.len(), 31);
        assert_eq!(ticks[0], (0, true));
        assert_eq!(ticks[4], (4, false));
        assert_eq!(ticks[5], (5, true));
        assert_eq!(ticks.iter().filter(|(_, major)| *major).count(), 7);

        assert_eq!(ruler_ticks(30.2).last(), Some((31, false)));
        assert_eq!(ruler_ticks(f64::NAN).count(), 1);
    }

    #[test]
    fn test_handles_leave_room_for_the_body() {
        let wide = egui::Rect::from_min_size(egui::pos2(10.0, 0.0), egui::vec2(120.0, 40.0));
        let (leading, trailing) = handle_rects(wide);
        assert_eq!(leading.width(), RESIZE_HANDLE_WIDTH);
        assert_eq!(trailing.right(), wide.right());

        let narrow = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(9.0, 40.0));
        let (leading, trailing) = handle_rects(narrow);
        assert_eq!(leading.width(), 3.0);
        assert!(leading.right() < trailing.left());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00.000");
        assert_eq!(format_time(75.5), "01:15.500");
        assert_eq!(format_time(-2.0), "00:00.000");
    }
}

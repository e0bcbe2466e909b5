use eframe::egui;

use crate::ops::segment_store::SegmentStore;
use crate::types::playback_state::PlaybackSelection;
use crate::types::segment::{Segment, SegmentId};
use crate::ui::to_color32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentListEvent {
    TogglePlay(SegmentId),
    ToggleLoop(SegmentId),
    Go(SegmentId),
    Edit(SegmentId),
    Delete(SegmentId),
}

pub fn row_label(index: usize, segment: &Segment) -> String {
    format!("{}. {}", index + 1, segment.title)
}

pub fn loop_label(looping: bool) -> &'static str {
    if looping { "Loop ✓" } else { "Loop" }
}

/// One row per segment with its playback and edit controls, in start order.
pub fn segment_list(
    ui: &mut egui::Ui,
    segments: &SegmentStore,
    selection: &PlaybackSelection,
) -> Vec<SegmentListEvent> {
    let mut events = Vec::new();
    if segments.is_empty() {
        ui.label("No segments yet");
        return events;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false; 2])
        .show(ui, |ui| {
            for (index, segment) in segments.iter().enumerate() {
                let id = segment.id;
                ui.push_id(("segment_row", id), |ui| {
                    ui.horizontal(|ui| {
                        let (swatch, _) =
                            ui.allocate_exact_size(egui::vec2(10.0, 28.0), egui::Sense::hover());
                        ui.painter()
                            .rect_filled(swatch, 2.0, to_color32(segment.color));
                        ui.vertical(|ui| {
                            ui.strong(row_label(index, segment));
                            ui.label(
                                egui::RichText::new(segment.meta_label())
                                    .size(10.0)
                                    .color(egui::Color32::GRAY),
                            );
                        });
                    });
                    if !segment.remarks.is_empty() {
                        ui.label(egui::RichText::new(&segment.remarks).italics().size(10.0));
                    }
                    ui.horizontal(|ui| {
                        let play = if selection.is_active(id) { "Stop" } else { "Play" };
                        if ui.button(play).clicked() {
                            events.push(SegmentListEvent::TogglePlay(id));
                        }
                        if ui.button(loop_label(selection.is_looping(id))).clicked() {
                            events.push(SegmentListEvent::ToggleLoop(id));
                        }
                        if ui.button("Go").clicked() {
                            events.push(SegmentListEvent::Go(id));
                        }
                        if ui.button("Edit").clicked() {
                            events.push(SegmentListEvent::Edit(id));
                        }
                        if ui.button("✖").on_hover_text("Delete").clicked() {
                            events.push(SegmentListEvent::Delete(id));
                        }
                    });
                });
                ui.separator();
            }
        });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::segment::Rgb;

    #[test]
    fn test_row_labels() {
        let segment = Segment::new(6.2, 12.0, "Scene A", Rgb::FALLBACK);
        assert_eq!(row_label(1, &segment), "2. Scene A");
        assert_eq!(segment.meta_label(), "6.2s • 12s");
        assert_eq!(loop_label(true), "Loop ✓");
        assert_eq!(loop_label(false), "Loop");
    }
}

use eframe::egui;

use crate::types::segment::{
    MIN_DURATION, Rgb, Segment, SegmentId, SegmentPatch, clamp_duration, clamp_start,
};

const DEFAULT_DURATION: &str = "5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit(SegmentId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Save,
    Cancel,
}

/// The add/edit dialog. Fields are kept as typed text and only parsed on save,
/// so half-typed numbers do not fight the user.
#[derive(Debug, Clone)]
pub struct SegmentForm {
    mode: FormMode,
    pub start: String,
    pub duration: String,
    pub title: String,
    pub remarks: String,
    pub color: [u8; 3],
}

impl SegmentForm {
    pub fn for_add(start: f64) -> Self {
        SegmentForm {
            mode: FormMode::Add,
            start: format!("{start}"),
            duration: DEFAULT_DURATION.to_string(),
            title: String::new(),
            remarks: String::new(),
            color: Rgb::FALLBACK.to_array(),
        }
    }

    pub fn for_edit(segment: &Segment) -> Self {
        SegmentForm {
            mode: FormMode::Edit(segment.id),
            start: format!("{}", segment.start),
            duration: format!("{}", segment.duration),
            title: segment.title.clone(),
            remarks: segment.remarks.clone(),
            color: segment.color.to_array(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn parsed_start(&self) -> f64 {
        clamp_start(self.start.trim().parse().unwrap_or(0.0))
    }

    pub fn parsed_duration(&self) -> f64 {
        clamp_duration(self.duration.trim().parse().unwrap_or(MIN_DURATION))
    }

    /// A new segment built from the fields.
    pub fn to_segment(&self) -> Segment {
        Segment::new(
            self.parsed_start(),
            self.parsed_duration(),
            self.title.trim(),
            Rgb::from_array(self.color),
        )
        .with_remarks(self.remarks.clone())
    }

    /// Overwrites every editable field of the segment being edited.
    pub fn to_patch(&self) -> SegmentPatch {
        SegmentPatch::replace_with(&self.to_segment())
    }

    pub fn show(&mut self, ctx: &egui::Context) -> Option<FormAction> {
        let heading = match self.mode {
            FormMode::Add => "Add segment",
            FormMode::Edit(_) => "Edit segment",
        };
        let mut action = None;
        egui::Window::new(heading)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                egui::Grid::new("segment_form_grid")
                    .num_columns(2)
                    .spacing([8.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Start (s)");
                        ui.text_edit_singleline(&mut self.start);
                        ui.end_row();

                        ui.label("Duration (s)");
                        ui.text_edit_singleline(&mut self.duration);
                        ui.end_row();

                        ui.label("Title");
                        ui.text_edit_singleline(&mut self.title);
                        ui.end_row();

                        ui.label("Remarks");
                        ui.text_edit_multiline(&mut self.remarks);
                        ui.end_row();

                        ui.label("Colour");
                        ui.color_edit_button_srgb(&mut self.color);
                        ui.end_row();
                    });
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        action = Some(FormAction::Save);
                    }
                    if ui.button("Cancel").clicked() {
                        action = Some(FormAction::Cancel);
                    }
                });
            });
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            action = Some(FormAction::Cancel);
        }
        action
    }
}

use std::time::{Duration, Instant};

use eframe::egui;

use crate::ops::editor::Editor;
use crate::types::segment::SegmentId;
use crate::ui::segment_form::{FormAction, FormMode, SegmentForm};
use crate::ui::segment_list::{SegmentListEvent, segment_list};
use crate::ui::template_panel::{self, TemplatePanel};
use crate::ui::timeline_widget::{TimelineEvent, TimelineWidget};
use crate::ui::video_player::VideoPlayer;

/// Frame rate the preview is redrawn at while a video is loaded.
const PREVIEW_REPAINT: Duration = Duration::from_millis(33);
const SCALE_RANGE: std::ops::RangeInclusive<f64> = 10.0..=400.0;

pub struct CuelikeApp {
    editor: Editor,
    video_player: VideoPlayer,
    template_panel: TemplatePanel,
    segment_form: Option<SegmentForm>,
    confirm_delete: Option<(SegmentId, String)>,
    new_project_name: String,
}

impl CuelikeApp {
    pub fn new(editor: Editor) -> Self {
        Self {
            editor,
            video_player: VideoPlayer::new(),
            template_panel: TemplatePanel::new(),
            segment_form: None,
            confirm_delete: None,
            new_project_name: String::new(),
        }
    }

    fn project_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let current = self
                .editor
                .active_project()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "No project".to_string());
            let mut picked = None;
            egui::ComboBox::from_id_salt("project_select")
                .selected_text(current)
                .show_ui(ui, |ui| {
                    let active = self.editor.session().active_project_id();
                    for project in self.editor.projects() {
                        let selected = active == Some(project.id.as_str());
                        if ui.selectable_label(selected, &project.name).clicked() {
                            picked = Some(project.id.clone());
                        }
                    }
                });
            if let Some(id) = picked {
                self.editor.select_project(&id);
            }
            if let Some(project) = self.editor.active_project() {
                ui.label(egui::RichText::new(project.summary()).color(egui::Color32::GRAY));
            }

            ui.separator();
            ui.add(
                egui::TextEdit::singleline(&mut self.new_project_name)
                    .hint_text("Project name")
                    .desired_width(160.0),
            );
            if ui.button("New project").clicked()
                && self.editor.create_project(&self.new_project_name).is_some()
            {
                self.new_project_name.clear();
            }

            if let Some(status) = self.editor.status().map(str::to_string) {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("✖").clicked() {
                        self.editor.clear_status();
                    }
                    ui.label(status);
                });
            }
        });
    }

    fn segment_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Segments");
        if ui.button("Add segment").clicked() {
            self.segment_form = Some(SegmentForm::for_add(self.editor.default_start()));
        }
        ui.separator();
        let Some(segments) = self.editor.segments() else {
            ui.label("Create a project to add segments");
            return;
        };
        let events = segment_list(ui, segments, self.editor.selection());
        for event in events {
            self.apply_list_event(event);
        }
    }

    fn apply_list_event(&mut self, event: SegmentListEvent) {
        match event {
            SegmentListEvent::TogglePlay(id) => {
                self.editor.toggle_segment_playback(id, Instant::now());
            }
            SegmentListEvent::ToggleLoop(id) => {
                self.editor.toggle_loop(id);
            }
            SegmentListEvent::Go(id) => {
                self.editor.seek_to_segment(id);
            }
            SegmentListEvent::Edit(id) => self.open_edit_form(id),
            SegmentListEvent::Delete(id) => {
                let title = self
                    .editor
                    .segments()
                    .and_then(|s| s.get(id))
                    .map(|s| s.title.clone())
                    .unwrap_or_default();
                self.confirm_delete = Some((id, title));
            }
        }
    }

    fn open_edit_form(&mut self, id: SegmentId) {
        if let Some(segment) = self.editor.segments().and_then(|s| s.get(id)) {
            self.segment_form = Some(SegmentForm::for_edit(segment));
        }
    }

    fn timeline_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Zoom");
            let mut scale = self.editor.scale();
            let slider = egui::Slider::new(&mut scale, SCALE_RANGE)
                .suffix(" px/s")
                .logarithmic(true);
            if ui.add(slider).changed() {
                self.editor.set_scale(scale);
            }
        });
        let events = TimelineWidget::new(&self.editor).show(ui);
        for event in events {
            self.apply_timeline_event(event);
        }
    }

    fn apply_timeline_event(&mut self, event: TimelineEvent) {
        match event {
            TimelineEvent::Seek(x) => self.editor.seek_to_pixel(x),
            TimelineEvent::AddAt(x) => {
                self.segment_form = Some(SegmentForm::for_add(self.editor.time_at_pixel(x)));
            }
            TimelineEvent::SegmentClicked(id) => {
                self.editor.seek_to_segment(id);
            }
            TimelineEvent::SegmentDoubleClicked(id) => self.open_edit_form(id),
            TimelineEvent::DragStarted { segment, target, x } => {
                self.editor.begin_drag(segment, target, x);
            }
            TimelineEvent::DragMoved(x) => {
                self.editor.drag_to(x);
            }
            TimelineEvent::DragEnded => {
                self.editor.end_drag();
            }
        }
    }

    fn segment_form_window(&mut self, ctx: &egui::Context) {
        let Some(form) = &mut self.segment_form else {
            return;
        };
        match form.show(ctx) {
            Some(FormAction::Save) => {
                match form.mode() {
                    FormMode::Add => {
                        if self.editor.add_segment(form.to_segment()).is_none() {
                            self.editor.set_status("Create a project first");
                        }
                    }
                    FormMode::Edit(id) => {
                        self.editor.update_segment(id, form.to_patch());
                    }
                }
                self.segment_form = None;
            }
            Some(FormAction::Cancel) => self.segment_form = None,
            None => {}
        }
    }

    fn confirm_delete_window(&mut self, ctx: &egui::Context) {
        let Some((id, title)) = self.confirm_delete.clone() else {
            return;
        };
        egui::Window::new("Delete segment")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(format!("Delete \"{title}\"?"));
                ui.horizontal(|ui| {
                    if ui.button("Delete").clicked() {
                        self.editor.delete_segment(id);
                        self.confirm_delete = None;
                    }
                    if ui.button("Keep").clicked() {
                        self.confirm_delete = None;
                    }
                });
            });
    }
}

impl eframe::App for CuelikeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.editor.tick(now);
        self.video_player.update_texture(&mut self.editor, ctx);

        egui::TopBottomPanel::top("project_bar").show(ctx, |ui| self.project_bar(ui));

        egui::SidePanel::left("template_panel")
            .default_width(220.0)
            .show(ctx, |ui| {
                let events = self.template_panel.show(ui, self.editor.templates());
                for event in events {
                    template_panel::apply_event(&mut self.template_panel, &mut self.editor, event);
                }
            });

        egui::SidePanel::right("segment_panel")
            .default_width(280.0)
            .show(ctx, |ui| self.segment_panel(ui));

        egui::TopBottomPanel::bottom("timeline_panel")
            .resizable(true)
            .min_height(120.0)
            .show(ctx, |ui| self.timeline_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            self.video_player.show(ui, &mut self.editor);
        });

        self.segment_form_window(ctx);
        self.confirm_delete_window(ctx);

        let mut wait = self.editor.next_wakeup(Instant::now());
        if self.editor.is_source_ready() {
            wait = Some(wait.map_or(PREVIEW_REPAINT, |w| w.min(PREVIEW_REPAINT)));
        }
        if let Some(wait) = wait {
            ctx.request_repaint_after(wait);
        }
    }
}

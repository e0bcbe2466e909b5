use std::path::{Path, PathBuf};

use eframe::egui;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::write_atomic;
use crate::ops::editor::Editor;
use crate::ops::template_ops::TemplateImportError;
use crate::types::segment::Rgb;
use crate::types::template::Template;
use crate::ui::to_color32;

#[derive(Debug, Error)]
pub enum TemplateFileError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Import(#[from] TemplateImportError),
    #[error("Could not encode templates: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Appends the templates found in a JSON file. Returns how many were added.
pub fn import_file(editor: &mut Editor, path: &Path) -> Result<usize, TemplateFileError> {
    let json = std::fs::read_to_string(path).map_err(|source| TemplateFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(editor.import_templates(&json)?)
}

pub fn export_file(editor: &Editor, path: &Path) -> Result<(), TemplateFileError> {
    let json = editor.export_templates()?;
    write_atomic(path, json.as_bytes()).map_err(|source| TemplateFileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Exported templates to {}", path.display());
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateEvent {
    Use(String),
    Save {
        id: Option<String>,
        title: String,
        duration: f64,
        color: Rgb,
    },
    Delete(String),
    Move { from: usize, to: usize },
    Import(PathBuf),
    Export(PathBuf),
}

#[derive(Debug, Clone)]
struct TemplateForm {
    id: Option<String>,
    title: String,
    duration: String,
    color: [u8; 3],
    error: Option<String>,
}

impl TemplateForm {
    fn blank() -> Self {
        TemplateForm {
            id: None,
            title: String::new(),
            duration: "5".to_string(),
            color: Rgb::FALLBACK.to_array(),
            error: None,
        }
    }

    fn editing(template: &Template) -> Self {
        TemplateForm {
            id: Some(template.id.clone()),
            title: template.title.clone(),
            duration: format!("{}", template.duration),
            color: template.color.to_array(),
            error: None,
        }
    }

    /// Unparseable durations are passed on as NaN so validation rejects them.
    fn duration(&self) -> f64 {
        self.duration.trim().parse().unwrap_or(f64::NAN)
    }
}

/// Quick-add buttons for the template presets, plus the template editor.
#[derive(Debug, Default)]
pub struct TemplatePanel {
    form: Option<TemplateForm>,
    confirm_delete: Option<(String, String)>,
}

impl TemplatePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after the editor accepted a save.
    pub fn saved(&mut self) {
        self.form = None;
    }

    /// Keeps the form open with the validation message.
    pub fn rejected(&mut self, message: String) {
        if let Some(form) = &mut self.form {
            form.error = Some(message);
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, templates: &[Template]) -> Vec<TemplateEvent> {
        let mut events = Vec::new();
        ui.vertical(|ui| {
            ui.heading("Templates");
            ui.separator();

            for (index, template) in templates.iter().enumerate() {
                let row = ui
                    .horizontal(|ui| {
                        let drag_id = egui::Id::new(("template_drag", &template.id));
                        ui.dnd_drag_source(drag_id, index, |ui| {
                            ui.label("☰");
                        });
                        let label = egui::RichText::new(format!(
                            "{} ({}s)",
                            template.title, template.duration
                        ))
                        .color(egui::Color32::BLACK);
                        let button = egui::Button::new(label).fill(to_color32(template.color));
                        if ui.add(button).on_hover_text("Add at current time").clicked() {
                            events.push(TemplateEvent::Use(template.id.clone()));
                        }
                        if ui.small_button("✏").clicked() {
                            self.form = Some(TemplateForm::editing(template));
                        }
                        if ui.small_button("✖").clicked() {
                            self.confirm_delete =
                                Some((template.id.clone(), template.title.clone()));
                        }
                    })
                    .response;
                if let Some(from) = row.dnd_release_payload::<usize>() {
                    events.push(TemplateEvent::Move { from: *from, to: index });
                }
                if row.dnd_hover_payload::<usize>().is_some() {
                    ui.painter().hline(
                        row.rect.x_range(),
                        row.rect.top(),
                        egui::Stroke::new(2.0, egui::Color32::YELLOW),
                    );
                }
            }

            if let Some((id, title)) = self.confirm_delete.clone() {
                ui.horizontal(|ui| {
                    ui.label(format!("Delete template \"{title}\"?"));
                    if ui.button("Delete").clicked() {
                        events.push(TemplateEvent::Delete(id));
                        self.confirm_delete = None;
                    }
                    if ui.button("Keep").clicked() {
                        self.confirm_delete = None;
                    }
                });
            }

            ui.add_space(6.0);
            if ui.button("New template").clicked() {
                self.form = Some(TemplateForm::blank());
            }

            if let Some(form) = &mut self.form {
                ui.separator();
                let mut close = false;
                egui::Grid::new("template_form_grid")
                    .num_columns(2)
                    .show(ui, |ui| {
                        ui.label("Title");
                        ui.text_edit_singleline(&mut form.title);
                        ui.end_row();
                        ui.label("Duration (s)");
                        ui.text_edit_singleline(&mut form.duration);
                        ui.end_row();
                        ui.label("Colour");
                        ui.color_edit_button_srgb(&mut form.color);
                        ui.end_row();
                    });
                if let Some(error) = &form.error {
                    ui.colored_label(egui::Color32::LIGHT_RED, error);
                }
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        events.push(TemplateEvent::Save {
                            id: form.id.clone(),
                            title: form.title.clone(),
                            duration: form.duration(),
                            color: Rgb::from_array(form.color),
                        });
                    }
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                });
                if close {
                    self.form = None;
                }
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Import…").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("JSON", &["json"])
                        .pick_file()
                    {
                        events.push(TemplateEvent::Import(path));
                    }
                }
                if ui.button("Export…").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("JSON", &["json"])
                        .set_file_name("templates.json")
                        .save_file()
                    {
                        events.push(TemplateEvent::Export(path));
                    }
                }
            });
        });
        events
    }
}

/// Applies one panel event to the editor. Failures go to the status line.
pub fn apply_event(panel: &mut TemplatePanel, editor: &mut Editor, event: TemplateEvent) {
    match event {
        TemplateEvent::Use(id) => {
            editor.add_from_template(&id);
        }
        TemplateEvent::Save {
            id,
            title,
            duration,
            color,
        } => match editor.save_template(id.as_deref(), &title, duration, color) {
            Ok(_) => panel.saved(),
            Err(err) => panel.rejected(err.to_string()),
        },
        TemplateEvent::Delete(id) => {
            editor.delete_template(&id);
        }
        TemplateEvent::Move { from, to } => {
            editor.move_template(from, to);
        }
        TemplateEvent::Import(path) => {
            if let Err(err) = import_file(editor, &path) {
                warn!("Template import failed: {err}");
                editor.set_status(err.to_string());
            }
        }
        TemplateEvent::Export(path) => {
            if let Err(err) = export_file(editor, &path) {
                warn!("Template export failed: {err}");
                editor.set_status(err.to_string());
            }
        }
    }
}

use std::path::Path;

use eframe::egui;
use tracing::warn;

use crate::ops::editor::Editor;
use crate::renderer::gst_player::{GstLocalMedia, GstStreamPlayer, parse_stream_url, probe_duration};
use crate::renderer::time_source::{PlayerState, SourceKind, VideoFrame};
use crate::ui::timeline_widget::format_time;

const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mov", "mkv", "webm", "avi", "m4v"];

/// The preview panel: shows the latest decoded frame and the media transport.
#[derive(Default)]
pub struct VideoPlayer {
    pub texture: Option<egui::TextureHandle>,
    pub stream_url: String,
}

impl VideoPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads the newest frame, if the source produced one since last time.
    pub fn update_texture(&mut self, editor: &mut Editor, ctx: &egui::Context) {
        if let Some(frame) = editor.latest_frame() {
            self.upload(frame, ctx);
        }
    }

    fn upload(&mut self, frame: VideoFrame, ctx: &egui::Context) {
        let expected = frame.width as usize * frame.height as usize * 4;
        if frame.data.len() != expected {
            warn!(
                "Dropping frame: {} bytes for {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            );
            return;
        }
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [frame.width as usize, frame.height as usize],
            &frame.data,
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::default()),
            None => {
                self.texture =
                    Some(ctx.load_texture("video_frame", image, egui::TextureOptions::default()));
            }
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, editor: &mut Editor) {
        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                if ui.button("Open video").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Video", &VIDEO_EXTENSIONS)
                        .pick_file()
                    {
                        self.texture = None;
                        open_local(editor, &path);
                    }
                }
                ui.separator();
                ui.add(
                    egui::TextEdit::singleline(&mut self.stream_url)
                        .hint_text("rtsp://, http(s)://, rtmp://")
                        .desired_width(260.0),
                );
                if ui.button("Load stream").clicked() {
                    if load_stream(editor, &self.stream_url) {
                        self.texture = None;
                    }
                }
            });

            let available = ui.available_size() - egui::vec2(0.0, 32.0);
            match &self.texture {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(texture)
                            .maintain_aspect_ratio(true)
                            .max_size(available.max(egui::vec2(1.0, 1.0))),
                    );
                }
                None => {
                    let (rect, _) = ui.allocate_exact_size(
                        available.max(egui::vec2(160.0, 90.0)),
                        egui::Sense::hover(),
                    );
                    ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);
                    ui.painter().text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        source_caption(editor),
                        egui::FontId::proportional(14.0),
                        egui::Color32::GRAY,
                    );
                }
            }

            ui.horizontal(|ui| {
                if ui.button("▶ Play").clicked() {
                    editor.play();
                }
                if ui.button("⏸ Pause").clicked() {
                    editor.pause();
                }
                ui.label(format!("Time: {}", format_time(editor.playhead())));
                if let Some(duration) = editor.media_duration() {
                    ui.label(format!("/ {}", format_time(duration)));
                }
                if let Some(state) = editor.player_state() {
                    ui.label(state_label(state));
                }
            });
        });
    }
}

/// Opens a local file into the editor. Failures go to the status line.
pub fn open_local(editor: &mut Editor, path: &Path) {
    match GstLocalMedia::open(path) {
        Ok(media) => {
            let duration = probe_duration(path);
            let label = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            editor.load_local(Box::new(media), &label, duration);
        }
        Err(err) => {
            warn!("Could not open {}: {err}", path.display());
            editor.set_status(err.to_string());
        }
    }
}

/// Connects a stream player. An invalid address changes nothing but the
/// status line. Returns whether a player was loaded.
pub fn load_stream(editor: &mut Editor, input: &str) -> bool {
    let url = match parse_stream_url(input) {
        Ok(url) => url,
        Err(err) => {
            editor.set_status(err.to_string());
            return false;
        }
    };
    match GstStreamPlayer::connect(&url) {
        Ok(player) => {
            editor.load_stream(Box::new(player), url.as_str());
            true
        }
        Err(err) => {
            warn!("Could not connect to {url}: {err}");
            editor.set_status(err.to_string());
            false
        }
    }
}

fn source_caption(editor: &Editor) -> &'static str {
    match (editor.source_kind(), editor.is_source_ready()) {
        (SourceKind::Embedded, false) => "Connecting…",
        (_, true) => "Waiting for frames…",
        (SourceKind::Local, false) => "No video loaded",
    }
}

fn state_label(state: PlayerState) -> &'static str {
    match state {
        PlayerState::Unstarted => "unstarted",
        PlayerState::Playing => "playing",
        PlayerState::Paused => "paused",
        PlayerState::Buffering => "buffering",
        PlayerState::Ended => "ended",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::ops::editor::RenderHook;
    use crate::storage::MemoryStore;

    struct NoRender;

    impl RenderHook for NoRender {
        fn request_full_rerender(&self) {}
    }

    #[test]
    fn test_bad_stream_address_only_sets_status() {
        let mut editor = Editor::new(
            AppConfig::default(),
            None,
            Box::new(MemoryStore::new()),
            Box::new(NoRender),
        );
        assert!(!load_stream(&mut editor, "ftp://example.com/live"));
        assert!(editor.status().unwrap().contains("Unsupported stream scheme"));
        assert_eq!(editor.source_kind(), SourceKind::Local);

        assert!(!load_stream(&mut editor, "not a url"));
        assert!(editor.status().unwrap().starts_with("Not a valid URL"));
        assert_eq!(source_caption(&editor), "No video loaded");
    }
}

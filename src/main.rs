mod app_dirs;
mod config;
mod logging;
mod ops;
mod renderer;
mod storage;
mod types;
mod ui;

use gstreamer as gst;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::ops::editor::Editor;
use crate::storage::{JsonStore, MemoryStore, Persistence};
use crate::ui::app::CuelikeApp;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = gst::init() {
        warn!("GStreamer failed to initialise, video playback is unavailable: {err}");
    }

    let (config, config_path) = match config::config_path() {
        Ok(path) => config::load_session(&path),
        Err(err) => {
            warn!("No config location: {err}");
            (AppConfig::default(), None)
        }
    };

    let store: Box<dyn Persistence> = match JsonStore::in_app_dir() {
        Ok(store) => {
            info!("Storing projects in {}", store.dir().display());
            Box::new(store)
        }
        Err(err) => {
            warn!("Projects will not be saved this session: {err}");
            Box::new(MemoryStore::new())
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("cuelike")
            .with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        "cuelike",
        native_options,
        Box::new(move |cc| {
            let editor = Editor::new(config, config_path, store, Box::new(cc.egui_ctx.clone()));
            Ok(Box::new(CuelikeApp::new(editor)))
        }),
    )?;
    Ok(())
}

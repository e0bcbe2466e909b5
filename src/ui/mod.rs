pub mod app;
pub mod segment_form;
pub mod segment_list;
pub mod template_panel;
pub mod timeline_widget;
pub mod video_player;

use eframe::egui;

use crate::types::segment::Rgb;

pub fn to_color32(color: Rgb) -> egui::Color32 {
    let [r, g, b] = color.to_array();
    egui::Color32::from_rgb(r, g, b)
}

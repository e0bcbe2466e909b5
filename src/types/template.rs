use crate::types::segment::{Rgb, lenient_color};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_duration() -> f64 {
    5.0
}

/// A reusable (title, duration, colour) preset for quickly dropping a segment
/// at the current play time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default = "new_template_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "Rgb::fallback", deserialize_with = "lenient_color")]
    pub color: Rgb,
}

pub fn new_template_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Template {
    pub fn new(title: impl Into<String>, duration: f64, color: Rgb) -> Self {
        Template {
            id: new_template_id(),
            title: title.into(),
            duration,
            color,
        }
    }

    /// Presets offered when nothing has been stored yet.
    pub fn defaults() -> Vec<Template> {
        vec![
            Template {
                id: "t1".to_string(),
                title: "Intro".to_string(),
                duration: 5.0,
                color: Rgb::new(0xff, 0xd1, 0x66),
            },
            Template {
                id: "t2".to_string(),
                title: "Main".to_string(),
                duration: 12.0,
                color: Rgb::new(0x06, 0xd6, 0xa0),
            },
            Template {
                id: "t3".to_string(),
                title: "Outro".to_string(),
                duration: 6.0,
                color: Rgb::new(0x11, 0x8a, 0xb2),
            },
        ]
    }
}

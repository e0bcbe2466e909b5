use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Shortest duration a stored segment may have, in seconds.
pub const MIN_DURATION: f64 = 0.1;
/// Title given to segments committed without one.
pub const UNTITLED: &str = "(untitled)";

/// Stable identity of a segment, assigned once at creation.
///
/// Positions inside a project change on every re-sort, so anything that must
/// outlive a store mutation (loop flags, the active playback pointer, edit
/// targets) holds one of these instead of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// An sRGB colour stored as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Colour used whenever a segment or template has none.
    pub const FALLBACK: Rgb = Rgb::new(0x00, 0xcc, 0x88);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn fallback() -> Self {
        Self::FALLBACK
    }

    /// Parses `#rrggbb` or the short `#rgb` form. The leading `#` is optional.
    pub fn parse_hex(input: &str) -> Option<Rgb> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Rgb::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(Rgb::new(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_array([r, g, b]: [u8; 3]) -> Self {
        Rgb::new(r, g, b)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::parse_hex(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid colour {raw:?}")))
    }
}

/// Reads an optional colour string, replacing anything unparseable with the fallback.
pub(crate) fn lenient_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rgb, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(Rgb::parse_hex)
        .unwrap_or(Rgb::FALLBACK))
}

fn default_duration() -> f64 {
    5.0
}

/// A named, coloured time range on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub id: SegmentId,
    /// Start time in seconds.
    #[serde(default)]
    pub start: f64,
    /// Duration in seconds.
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default = "Rgb::fallback", deserialize_with = "lenient_color")]
    pub color: Rgb,
}

impl Segment {
    /// Builds a segment with a fresh id, applying the write-time clamps.
    pub fn new(start: f64, duration: f64, title: impl Into<String>, color: Rgb) -> Self {
        let mut segment = Segment {
            id: SegmentId::new(),
            start,
            duration,
            title: title.into(),
            remarks: String::new(),
            color,
        };
        segment.normalize();
        segment
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Clamps numeric fields into their valid range and fills in a missing title.
    ///
    /// Non-finite or negative starts become 0; non-finite durations or ones
    /// shorter than [`MIN_DURATION`] become [`MIN_DURATION`].
    pub fn normalize(&mut self) {
        self.start = clamp_start(self.start);
        self.duration = clamp_duration(self.duration);
        if self.title.trim().is_empty() {
            self.title = UNTITLED.to_string();
        }
    }

    /// Label shown in the `start • duration` meta line.
    pub fn meta_label(&self) -> String {
        format!("{}s • {}s", self.start, self.duration)
    }
}

pub fn clamp_start(start: f64) -> f64 {
    if start.is_finite() { start.max(0.0) } else { 0.0 }
}

pub fn clamp_duration(duration: f64) -> f64 {
    if duration.is_finite() {
        duration.max(MIN_DURATION)
    } else {
        MIN_DURATION
    }
}

/// Partial update for a segment. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentPatch {
    pub start: Option<f64>,
    pub duration: Option<f64>,
    pub title: Option<String>,
    pub remarks: Option<String>,
    pub color: Option<Rgb>,
}

impl SegmentPatch {
    /// A patch that overwrites every editable field with the values of `segment`.
    pub fn replace_with(segment: &Segment) -> Self {
        SegmentPatch {
            start: Some(segment.start),
            duration: Some(segment.duration),
            title: Some(segment.title.clone()),
            remarks: Some(segment.remarks.clone()),
            color: Some(segment.color),
        }
    }

    pub fn range(start: f64, duration: f64) -> Self {
        SegmentPatch {
            start: Some(start),
            duration: Some(duration),
            ..Default::default()
        }
    }

    pub fn apply_to(self, segment: &mut Segment) {
        if let Some(start) = self.start {
            segment.start = start;
        }
        if let Some(duration) = self.duration {
            segment.duration = duration;
        }
        if let Some(title) = self.title {
            segment.title = title;
        }
        if let Some(remarks) = self.remarks {
            segment.remarks = remarks;
        }
        if let Some(color) = self.color {
            segment.color = color;
        }
        segment.normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_segment_clamps_numbers() {
        let seg = Segment::new(-3.0, 0.0, "Intro", Rgb::FALLBACK);
        assert_eq!(seg.start, 0.0);
        assert_eq!(seg.duration, MIN_DURATION);

        let seg = Segment::new(f64::NAN, f64::INFINITY, "Intro", Rgb::FALLBACK);
        assert_eq!(seg.start, 0.0);
        assert_eq!(seg.duration, MIN_DURATION);
    }

    #[test]
    fn test_blank_title_becomes_placeholder() {
        let seg = Segment::new(1.0, 2.0, "   ", Rgb::FALLBACK);
        assert_eq!(seg.title, UNTITLED);
    }

    #[test]
    fn test_parse_hex_colours() {
        assert_eq!(Rgb::parse_hex("#ffd166"), Some(Rgb::new(0xff, 0xd1, 0x66)));
        assert_eq!(Rgb::parse_hex("06d6a0"), Some(Rgb::new(0x06, 0xd6, 0xa0)));
        assert_eq!(Rgb::parse_hex("#fff"), Some(Rgb::new(255, 255, 255)));
        assert_eq!(Rgb::parse_hex("#12345"), None);
        assert_eq!(Rgb::parse_hex("rebeccapurple"), None);
        assert_eq!(Rgb::new(0x11, 0x8a, 0xb2).to_hex(), "#118ab2");
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let seg: Segment = serde_json::from_str(r#"{"start": 6.2, "title": "Scene A"}"#).unwrap();
        assert_eq!(seg.start, 6.2);
        assert_eq!(seg.duration, 5.0);
        assert_eq!(seg.color, Rgb::FALLBACK);
        assert_eq!(seg.remarks, "");

        let seg: Segment =
            serde_json::from_str(r#"{"start": 1, "duration": 2, "color": "not a colour"}"#)
                .unwrap();
        assert_eq!(seg.color, Rgb::FALLBACK);
    }

    #[test]
    fn test_serialized_colour_is_hex_string() {
        let seg = Segment::new(0.0, 6.0, "Intro", Rgb::new(0xff, 0xd1, 0x66));
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["color"], "#ffd166");
        let back: Segment = serde_json::from_value(json).unwrap();
        assert_eq!(back, seg);
    }

    #[test]
    fn test_patch_applies_and_normalizes() {
        let mut seg = Segment::new(4.0, 3.0, "Main", Rgb::FALLBACK);
        SegmentPatch {
            duration: Some(-1.0),
            title: Some(String::new()),
            ..Default::default()
        }
        .apply_to(&mut seg);
        assert_eq!(seg.start, 4.0);
        assert_eq!(seg.duration, MIN_DURATION);
        assert_eq!(seg.title, UNTITLED);
    }

    #[test]
    fn test_meta_label_matches_display_format() {
        let seg = Segment::new(6.2, 12.0, "Scene A", Rgb::FALLBACK);
        assert_eq!(seg.meta_label(), "6.2s • 12s");
    }
}

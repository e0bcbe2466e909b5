use crate::types::segment::Segment;

/// Narrowest a segment is ever drawn, so very short segments stay grabbable.
/// Purely visual: it is never written back into a stored duration.
pub const MIN_SEGMENT_WIDTH_PX: f64 = 8.0;

/// The ruler always covers at least this many seconds.
pub const MIN_RULER_SECS: f64 = 30.0;
/// Empty space after the ruler end so there is room to add segments.
pub const TIMELINE_PADDING_PX: f64 = 200.0;

/// Horizontal placement of a segment on the timeline, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRect {
    pub left: f64,
    pub width: f64,
}

/// Converts between seconds and timeline pixels at a fixed scale.
///
/// Time values coming back from pixels are quantized to 0.1s, the same
/// resolution the segment form edits at. Negative inputs are the caller's
/// job to clamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryMapper {
    px_per_sec: f64,
}

impl GeometryMapper {
    pub fn new(px_per_sec: f64) -> Self {
        GeometryMapper { px_per_sec }
    }

    pub fn scale(&self) -> f64 {
        self.px_per_sec
    }

    pub fn time_to_pixel(&self, seconds: f64) -> f64 {
        seconds * self.px_per_sec
    }

    pub fn pixel_to_time(&self, px: f64) -> f64 {
        quantize(px / self.px_per_sec)
    }

    /// Unquantized pixel-to-time conversion, for seeking.
    pub fn pixel_to_time_exact(&self, px: f64) -> f64 {
        px / self.px_per_sec
    }

    pub fn rendered_width(&self, duration: f64) -> f64 {
        self.time_to_pixel(duration).max(MIN_SEGMENT_WIDTH_PX)
    }

    pub fn segment_rect(&self, segment: &Segment) -> SegmentRect {
        SegmentRect {
            left: self.time_to_pixel(segment.start),
            width: self.rendered_width(segment.duration),
        }
    }

    /// Full scrollable width of a timeline whose ruler ends at `ruler_end`.
    pub fn timeline_width(&self, ruler_end: f64) -> f64 {
        (ruler_end * self.px_per_sec).ceil() + TIMELINE_PADDING_PX
    }
}

/// Last second the ruler shows: the latest segment end or the media length,
/// whichever is later, but never less than [`MIN_RULER_SECS`].
pub fn ruler_end(max_segment_end: f64, media_duration: Option<f64>) -> f64 {
    let media = media_duration.filter(|d| d.is_finite()).unwrap_or(0.0);
    max_segment_end.max(media).max(MIN_RULER_SECS)
}

/// Rounds to the nearest tenth of a second.
pub fn quantize(seconds: f64) -> f64 {
    (seconds * 10.0).round() / 10.0
}

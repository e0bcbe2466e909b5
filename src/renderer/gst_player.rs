use std::cell::Cell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_pbutils as gst_pbutils;
use gstreamer_video as gst_video;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::renderer::time_source::{
    EmbeddedBackend, MediaElement, PlayerError, PlayerEvent, PlayerState, VideoFrame,
};

/// Schemes accepted by "Load stream".
pub const STREAM_SCHEMES: [&str; 4] = ["http", "https", "rtsp", "rtmp"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported stream scheme {0:?}; use http, https, rtsp or rtmp")]
    UnsupportedScheme(String),
    #[error("No such file: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("Cannot turn {} into a file URI", .0.display())]
    BadPath(PathBuf),
    #[error("GStreamer: {0}")]
    Gst(String),
}

/// Validates a user-entered stream address.
pub fn parse_stream_url(input: &str) -> Result<Url, SourceError> {
    let url = Url::parse(input.trim())?;
    if !STREAM_SCHEMES.contains(&url.scheme()) {
        return Err(SourceError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}

pub fn file_uri(path: &Path) -> Result<Url, SourceError> {
    if !path.is_file() {
        return Err(SourceError::MissingFile(path.to_path_buf()));
    }
    let absolute = path
        .canonicalize()
        .map_err(|_| SourceError::BadPath(path.to_path_buf()))?;
    Url::from_file_path(&absolute).map_err(|_| SourceError::BadPath(absolute))
}

/// Reads the media length with the discoverer. `None` when it cannot tell.
pub fn probe_duration(path: &Path) -> Option<f64> {
    let uri = file_uri(path).ok()?;
    let discoverer = match gst_pbutils::Discoverer::new(gst::ClockTime::from_seconds(5)) {
        Ok(discoverer) => discoverer,
        Err(err) => {
            warn!("Discoverer unavailable: {err}");
            return None;
        }
    };
    match discoverer.discover_uri(uri.as_str()) {
        Ok(info) => info.duration().map(clock_to_secs),
        Err(err) => {
            debug!("Could not probe {}: {err}", path.display());
            None
        }
    }
}

fn clock_to_secs(time: gst::ClockTime) -> f64 {
    time.nseconds() as f64 / 1_000_000_000.0
}

fn secs_to_clock(seconds: f64) -> gst::ClockTime {
    gst::ClockTime::from_nseconds((seconds.max(0.0) * 1_000_000_000.0) as u64)
}

/// Copies `rows` rows of `row_bytes` out of a buffer whose rows are `stride`
/// bytes apart, dropping the padding.
fn pack_rows(src: &[u8], stride: usize, row_bytes: usize, rows: usize) -> Option<Vec<u8>> {
    if stride < row_bytes {
        return None;
    }
    let mut data = Vec::with_capacity(row_bytes * rows);
    for row in 0..rows {
        let start = row * stride;
        data.extend_from_slice(src.get(start..start + row_bytes)?);
    }
    Some(data)
}

fn frame_from_sample(sample: &gst::Sample) -> Option<VideoFrame> {
    let info = gst_video::VideoInfo::from_caps(sample.caps()?).ok()?;
    let buffer = sample.buffer()?;
    let map = buffer.map_readable().ok()?;
    let stride = usize::try_from(*info.stride().first()?).ok()?;
    let row_bytes = info.width() as usize * 4;
    let data = pack_rows(map.as_slice(), stride, row_bytes, info.height() as usize)?;
    Some(VideoFrame {
        data,
        width: info.width(),
        height: info.height(),
    })
}

/// A `playbin` whose video ends in an RGBA app sink we pull frames from.
struct Playbin {
    playbin: gst::Element,
    sink: gst_app::AppSink,
}

impl Playbin {
    fn new(uri: &str) -> Result<Self, SourceError> {
        let caps = gst_video::VideoCapsBuilder::new()
            .format(gst_video::VideoFormat::Rgba)
            .build();
        let sink = gst_app::AppSink::builder()
            .caps(&caps)
            .max_buffers(1)
            .drop(true)
            .build();
        let playbin = gst::ElementFactory::make("playbin")
            .property("uri", uri)
            .property("video-sink", sink.clone())
            .build()
            .map_err(|err| SourceError::Gst(err.to_string()))?;
        Ok(Playbin { playbin, sink })
    }

    fn bus(&self) -> Result<gst::Bus, SourceError> {
        self.playbin
            .bus()
            .ok_or_else(|| SourceError::Gst("playbin has no bus".to_string()))
    }

    fn set_state(&self, state: gst::State, command: &'static str) -> Result<(), PlayerError> {
        self.playbin
            .set_state(state)
            .map(|_| ())
            .map_err(|err| PlayerError::Rejected {
                command,
                reason: err.to_string(),
            })
    }

    fn seek(&self, seconds: f64) -> Result<(), PlayerError> {
        self.playbin
            .seek_simple(
                gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
                secs_to_clock(seconds),
            )
            .map_err(|err| PlayerError::Rejected {
                command: "seek",
                reason: err.to_string(),
            })
    }

    fn position(&self) -> Option<f64> {
        self.playbin
            .query_position::<gst::ClockTime>()
            .map(clock_to_secs)
    }

    fn duration(&self) -> Option<f64> {
        self.playbin
            .query_duration::<gst::ClockTime>()
            .map(clock_to_secs)
    }

    fn pull_frame(&self) -> Option<VideoFrame> {
        let sample = self.sink.try_pull_sample(gst::ClockTime::ZERO)?;
        frame_from_sample(&sample)
    }

    fn shutdown(&self) {
        if let Err(err) = self.playbin.set_state(gst::State::Null) {
            debug!("Playbin shutdown failed: {err}");
        }
    }
}

impl Drop for Playbin {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A local video file played through GStreamer.
pub struct GstLocalMedia {
    player: Playbin,
    last_position: Cell<f64>,
}

impl GstLocalMedia {
    /// Opens and prerolls `path`. Playback starts on the first `play`.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let uri = file_uri(path)?;
        let player = Playbin::new(uri.as_str())?;
        player
            .playbin
            .set_state(gst::State::Paused)
            .map_err(|err| SourceError::Gst(err.to_string()))?;
        info!("Opened {}", path.display());
        Ok(GstLocalMedia {
            player,
            last_position: Cell::new(0.0),
        })
    }
}

impl MediaElement for GstLocalMedia {
    fn current_time(&self) -> f64 {
        if let Some(position) = self.player.position() {
            self.last_position.set(position);
        }
        self.last_position.get()
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<(), PlayerError> {
        self.player.seek(seconds)?;
        self.last_position.set(seconds);
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        self.player.set_state(gst::State::Playing, "play")
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.player.set_state(gst::State::Paused, "pause")
    }

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        self.player.pull_frame()
    }

    fn duration(&self) -> Option<f64> {
        self.player.duration()
    }
}

/// A network stream. Readiness and state changes arrive on the pipeline bus
/// and are translated into [`PlayerEvent`]s.
pub struct GstStreamPlayer {
    player: Playbin,
    bus: gst::Bus,
    pending: VecDeque<PlayerEvent>,
    ready: bool,
    destroyed: bool,
}

impl GstStreamPlayer {
    pub fn connect(url: &Url) -> Result<Self, SourceError> {
        let player = Playbin::new(url.as_str())?;
        let bus = player.bus()?;
        let mut pending = VecDeque::new();
        match player.playbin.set_state(gst::State::Paused) {
            // Live sources never preroll, so no AsyncDone will follow.
            Ok(gst::StateChangeSuccess::NoPreroll) => pending.push_back(PlayerEvent::Ready),
            Ok(_) => {}
            Err(err) => return Err(SourceError::Gst(err.to_string())),
        }
        info!("Connecting to {url}");
        Ok(GstStreamPlayer {
            player,
            bus,
            pending,
            ready: false,
            destroyed: false,
        })
    }

    fn check(&self) -> Result<(), PlayerError> {
        if self.destroyed {
            Err(PlayerError::Destroyed)
        } else if !self.ready {
            Err(PlayerError::NotReady)
        } else {
            Ok(())
        }
    }

    fn translate(&self, msg: &gst::Message) -> Option<PlayerEvent> {
        use gst::MessageView;

        match msg.view() {
            MessageView::AsyncDone(_) if !self.ready => Some(PlayerEvent::Ready),
            MessageView::StateChanged(change)
                if msg.src() == Some(self.player.playbin.upcast_ref::<gst::Object>()) =>
            {
                let state = match change.current() {
                    gst::State::Playing => PlayerState::Playing,
                    gst::State::Paused => PlayerState::Paused,
                    _ => PlayerState::Unstarted,
                };
                Some(PlayerEvent::StateChange(state))
            }
            MessageView::Buffering(buffering) if buffering.percent() < 100 => {
                Some(PlayerEvent::StateChange(PlayerState::Buffering))
            }
            MessageView::Eos(_) => Some(PlayerEvent::StateChange(PlayerState::Ended)),
            MessageView::Error(err) => {
                warn!("Stream error: {}", err.error());
                None
            }
            _ => None,
        }
    }
}

impl EmbeddedBackend for GstStreamPlayer {
    fn get_current_time(&self) -> Result<f64, PlayerError> {
        self.check()?;
        self.player
            .position()
            .ok_or_else(|| PlayerError::Backend("stream position unavailable".to_string()))
    }

    fn play_video(&mut self) -> Result<(), PlayerError> {
        if self.destroyed {
            return Err(PlayerError::Destroyed);
        }
        self.player.set_state(gst::State::Playing, "play")
    }

    fn pause_video(&mut self) -> Result<(), PlayerError> {
        if self.destroyed {
            return Err(PlayerError::Destroyed);
        }
        self.player.set_state(gst::State::Paused, "pause")
    }

    fn seek_to(&mut self, seconds: f64) -> Result<(), PlayerError> {
        self.check()?;
        self.player.seek(seconds)
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.player.shutdown();
            self.destroyed = true;
            self.pending.clear();
        }
    }

    fn poll_event(&mut self) -> Option<PlayerEvent> {
        if self.destroyed {
            return None;
        }
        let event = match self.pending.pop_front() {
            Some(event) => Some(event),
            None => loop {
                let msg = self.bus.pop()?;
                if let Some(event) = self.translate(&msg) {
                    break Some(event);
                }
            },
        };
        if event == Some(PlayerEvent::Ready) {
            self.ready = true;
        }
        event
    }

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        if self.check().is_err() {
            return None;
        }
        self.player.pull_frame()
    }

    fn duration(&self) -> Option<f64> {
        self.player.duration()
    }
}

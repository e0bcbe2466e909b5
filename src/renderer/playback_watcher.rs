use crate::ops::segment_store::SegmentStore;
use crate::renderer::ticker::{Deadline, Ticker};
use crate::renderer::time_source::TimeSource;
use crate::types::playback_state::PlaybackSelection;
use crate::types::segment::SegmentId;
use std::time::{Duration, Instant};
use tracing::debug;

/// How close to a segment's end counts as "reached", absorbing poll
/// coarseness and jitter in the player's reported time.
pub const END_TOLERANCE_SECS: f64 = 0.05;
pub const POLL_INTERVAL: Duration = Duration::from_millis(120);
/// Delay between the seek and the play command when a segment starts.
pub const PLAY_GRACE_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    pub grace_delay: Duration,
    pub end_tolerance: f64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            poll_interval: POLL_INTERVAL,
            grace_delay: PLAY_GRACE_DELAY,
            end_tolerance: END_TOLERANCE_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Stopped,
    Playing(SegmentId),
    /// Playing and has wrapped around to the start at least once.
    Looping(SegmentId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Nothing is playing in isolation.
    Idle,
    /// No poll was due, or the play command is still pending.
    Waiting,
    /// Polled; the segment has not reached its end. Carries the time read.
    Watching(f64),
    /// Reached the end with looping on; the source was sent back to the start.
    Looped(f64),
    /// Playback stopped, either at the end or because the segment is gone.
    Finished(f64),
}

/// Plays one segment in isolation and enforces its end boundary by polling
/// the time source.
///
/// The watcher owns the poll timer and the deferred play command; the
/// [`PlaybackSelection`] it is handed owns which segment is active and the
/// loop preferences.
#[derive(Debug, Default)]
pub struct PlaybackWatcher {
    config: WatcherConfig,
    poll: Option<Ticker>,
    pending_play: Option<Deadline>,
    looped: bool,
}

impl PlaybackWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        PlaybackWatcher {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> WatcherConfig {
        self.config
    }

    pub fn phase(&self, selection: &PlaybackSelection) -> WatchPhase {
        match selection.active() {
            None => WatchPhase::Stopped,
            Some(id) if self.looped => WatchPhase::Looping(id),
            Some(id) => WatchPhase::Playing(id),
        }
    }

    pub fn is_running(&self) -> bool {
        self.poll.is_some()
    }

    /// Starts isolated playback of `id`, stopping any other segment first.
    /// Returns false if the segment does not exist.
    pub fn start(
        &mut self,
        id: SegmentId,
        segments: &SegmentStore,
        selection: &mut PlaybackSelection,
        source: &mut TimeSource,
        now: Instant,
    ) -> bool {
        self.stop(selection, source);
        let Some(segment) = segments.get(id) else {
            return false;
        };
        debug!(
            "Segment playback {id} started at {}s for {}s",
            segment.start, segment.duration
        );
        source.seek(segment.start);
        self.pending_play = Some(Deadline::after(now, self.config.grace_delay));
        self.poll = Some(Ticker::start(now, self.config.poll_interval));
        self.looped = false;
        selection.set_active(id);
        true
    }

    /// Cancels the poll timer, pauses the source and clears the active
    /// segment. A no-op when nothing is playing.
    pub fn stop(&mut self, selection: &mut PlaybackSelection, source: &mut TimeSource) -> bool {
        let had_timer = self.poll.take().is_some();
        self.pending_play = None;
        self.looped = false;
        let active = selection.clear_active();
        if active.is_none() && !had_timer {
            return false;
        }
        source.pause();
        if let Some(id) = active {
            debug!("Segment playback {id} stopped");
        }
        true
    }

    pub fn tick(
        &mut self,
        now: Instant,
        segments: &SegmentStore,
        selection: &mut PlaybackSelection,
        source: &mut TimeSource,
    ) -> TickOutcome {
        let Some(id) = selection.active() else {
            self.poll = None;
            self.pending_play = None;
            return TickOutcome::Idle;
        };

        if self.pending_play.is_some_and(|deadline| deadline.is_due(now)) {
            self.pending_play = None;
            source.play();
        }

        let fired = match self.poll.as_mut() {
            Some(poll) => poll.fire(now),
            None => return TickOutcome::Idle,
        };
        if !fired || self.pending_play.is_some() {
            return TickOutcome::Waiting;
        }

        let Some(segment) = segments.get(id) else {
            let time = source.current_time();
            self.stop(selection, source);
            return TickOutcome::Finished(time);
        };

        let time = source.current_time();
        if time < segment.end() - self.config.end_tolerance {
            return TickOutcome::Watching(time);
        }
        if selection.is_looping(id) {
            source.seek(segment.start);
            self.looped = true;
            TickOutcome::Looped(segment.start)
        } else {
            self.stop(selection, source);
            TickOutcome::Finished(time)
        }
    }

    /// Time until the watcher next needs a tick, if it is running.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        let poll = self.poll.as_ref()?.time_until_due(now);
        Some(match self.pending_play {
            Some(deadline) => poll.min(deadline.time_until_due(now)),
            None => poll,
        })
    }
}

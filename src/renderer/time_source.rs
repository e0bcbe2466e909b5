use crate::renderer::ticker::Ticker;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Failures reported by a media backend. These never leave [`TimeSource`]:
/// they are logged and the command becomes a no-op.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("player is not ready yet")]
    NotReady,
    #[error("player was destroyed")]
    Destroyed,
    #[error("player rejected {command}: {reason}")]
    Rejected {
        command: &'static str,
        reason: String,
    },
    #[error("media backend failure: {0}")]
    Backend(String),
}

/// A decoded RGBA frame ready for upload as a texture.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A locally loaded media element with direct, synchronous time access.
pub trait MediaElement {
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64) -> Result<(), PlayerError>;
    fn play(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        None
    }

    fn duration(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Playing,
    Paused,
    Buffering,
    Ended,
}

/// Notifications an embedded player emits asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Ready,
    StateChange(PlayerState),
}

/// A remotely controlled player. Time queries are meaningful only after it
/// has emitted [`PlayerEvent::Ready`].
pub trait EmbeddedBackend {
    fn get_current_time(&self) -> Result<f64, PlayerError>;
    fn play_video(&mut self) -> Result<(), PlayerError>;
    fn pause_video(&mut self) -> Result<(), PlayerError>;
    fn seek_to(&mut self, seconds: f64) -> Result<(), PlayerError>;
    /// Releases every resource held by the player. Further commands fail.
    fn destroy(&mut self);
    /// Next pending notification, if any. Never blocks.
    fn poll_event(&mut self) -> Option<PlayerEvent>;

    fn latest_frame(&mut self) -> Option<VideoFrame> {
        None
    }

    fn duration(&self) -> Option<f64> {
        None
    }
}

#[derive(Default)]
pub struct LocalMedia {
    element: Option<Box<dyn MediaElement>>,
}

pub struct EmbeddedPlayer {
    backend: Box<dyn EmbeddedBackend>,
    ready: bool,
    destroyed: bool,
    state: PlayerState,
    poll: Option<Ticker>,
    poll_interval: Duration,
}

impl EmbeddedPlayer {
    fn new(backend: Box<dyn EmbeddedBackend>, poll_interval: Duration) -> Self {
        EmbeddedPlayer {
            backend,
            ready: false,
            destroyed: false,
            state: PlayerState::Unstarted,
            poll: None,
            poll_interval,
        }
    }

    fn start_poll(&mut self, now: Instant) {
        if self.poll.is_none() {
            debug!("Stream time poll started");
            self.poll = Some(Ticker::start(now, self.poll_interval));
        }
    }

    fn stop_poll(&mut self) {
        if self.poll.take().is_some() {
            debug!("Stream time poll stopped");
        }
    }

    fn destroy(&mut self) {
        self.stop_poll();
        if !self.destroyed {
            self.backend.destroy();
            self.destroyed = true;
            info!("Embedded player destroyed");
        }
        self.ready = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    Embedded,
}

/// What happened while pumping the source for one UI frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceUpdate {
    /// The embedded player reported ready during this pump.
    pub became_ready: bool,
    /// The stream poll fired and read this playback time.
    pub polled_time: Option<f64>,
}

/// The single playback clock the editor talks to, backed by either a local
/// media element or an embedded remote player.
///
/// `seek`, `play` and `pause` are best effort: backend failures are logged
/// and swallowed. `current_time` reads 0 while nothing usable is loaded.
pub enum TimeSource {
    LocalMedia(LocalMedia),
    EmbeddedPlayer(EmbeddedPlayer),
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource {
    /// A local source with nothing loaded.
    pub fn new() -> Self {
        TimeSource::LocalMedia(LocalMedia::default())
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            TimeSource::LocalMedia(_) => SourceKind::Local,
            TimeSource::EmbeddedPlayer(_) => SourceKind::Embedded,
        }
    }

    pub fn is_ready(&self) -> bool {
        match self {
            TimeSource::LocalMedia(local) => local.element.is_some(),
            TimeSource::EmbeddedPlayer(embedded) => embedded.ready,
        }
    }

    pub fn current_time(&self) -> f64 {
        match self {
            TimeSource::LocalMedia(local) => local
                .element
                .as_ref()
                .map(|element| element.current_time())
                .unwrap_or(0.0),
            TimeSource::EmbeddedPlayer(embedded) => {
                if !embedded.ready {
                    return 0.0;
                }
                match embedded.backend.get_current_time() {
                    Ok(seconds) => seconds,
                    Err(err) => {
                        warn!("Stream time unavailable: {err}");
                        0.0
                    }
                }
            }
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        let result = match self {
            TimeSource::LocalMedia(local) => match local.element.as_mut() {
                Some(element) => element.set_current_time(seconds),
                None => Ok(()),
            },
            TimeSource::EmbeddedPlayer(embedded) => embedded.backend.seek_to(seconds),
        };
        if let Err(err) = result {
            warn!("Seek to {seconds:.2}s failed: {err}");
        }
    }

    pub fn play(&mut self) {
        let result = match self {
            TimeSource::LocalMedia(local) => match local.element.as_mut() {
                Some(element) => element.play(),
                None => Ok(()),
            },
            TimeSource::EmbeddedPlayer(embedded) => embedded.backend.play_video(),
        };
        if let Err(err) = result {
            warn!("Play failed: {err}");
        }
    }

    pub fn pause(&mut self) {
        let result = match self {
            TimeSource::LocalMedia(local) => match local.element.as_mut() {
                Some(element) => element.pause(),
                None => Ok(()),
            },
            TimeSource::EmbeddedPlayer(embedded) => embedded.backend.pause_video(),
        };
        if let Err(err) = result {
            warn!("Pause failed: {err}");
        }
    }

    /// Switches to a local media element, tearing down whatever was active.
    pub fn load_local(&mut self, element: Box<dyn MediaElement>) {
        self.teardown();
        info!("Local media loaded");
        *self = TimeSource::LocalMedia(LocalMedia {
            element: Some(element),
        });
    }

    /// Switches to an embedded player, tearing down whatever was active. The
    /// new player is not ready until it reports so.
    pub fn load_embedded(&mut self, backend: Box<dyn EmbeddedBackend>, poll_interval: Duration) {
        self.teardown();
        info!("Embedded player created; waiting for ready");
        *self = TimeSource::EmbeddedPlayer(EmbeddedPlayer::new(backend, poll_interval));
    }

    /// Releases the active backend and leaves an empty local source behind.
    pub fn teardown(&mut self) {
        match self {
            TimeSource::LocalMedia(local) => {
                if let Some(mut element) = local.element.take() {
                    if let Err(err) = element.pause() {
                        debug!("Pause during teardown failed: {err}");
                    }
                }
            }
            TimeSource::EmbeddedPlayer(embedded) => embedded.destroy(),
        }
        *self = TimeSource::new();
    }

    /// Drains backend notifications and runs the stream poll timer.
    ///
    /// `isolated` is true while a single segment is playing under the
    /// playback watcher; the stream poll stays off then so only one timer
    /// drives the playhead.
    pub fn pump(&mut self, now: Instant, isolated: bool) -> SourceUpdate {
        let mut update = SourceUpdate::default();
        let TimeSource::EmbeddedPlayer(embedded) = self else {
            return update;
        };
        while let Some(event) = embedded.backend.poll_event() {
            match event {
                PlayerEvent::Ready => {
                    if !embedded.ready {
                        info!("Embedded player ready");
                        embedded.ready = true;
                        update.became_ready = true;
                    }
                }
                PlayerEvent::StateChange(state) => {
                    debug!("Embedded player state {state:?}");
                    embedded.state = state;
                    if state == PlayerState::Playing && !isolated {
                        embedded.start_poll(now);
                    } else {
                        embedded.stop_poll();
                    }
                }
            }
        }
        if isolated {
            embedded.stop_poll();
        }
        let fired = embedded
            .poll
            .as_mut()
            .map(|poll| poll.fire(now))
            .unwrap_or(false);
        if fired {
            update.polled_time = Some(self.current_time());
        }
        update
    }

    pub fn is_stream_polling(&self) -> bool {
        matches!(self, TimeSource::EmbeddedPlayer(embedded) if embedded.poll.is_some())
    }

    pub fn player_state(&self) -> Option<PlayerState> {
        match self {
            TimeSource::LocalMedia(_) => None,
            TimeSource::EmbeddedPlayer(embedded) => Some(embedded.state),
        }
    }

    /// Time until the stream poll next wants to run, if it is running.
    pub fn next_poll_in(&self, now: Instant) -> Option<Duration> {
        match self {
            TimeSource::EmbeddedPlayer(embedded) => {
                embedded.poll.as_ref().map(|poll| poll.time_until_due(now))
            }
            TimeSource::LocalMedia(_) => None,
        }
    }

    pub fn latest_frame(&mut self) -> Option<VideoFrame> {
        match self {
            TimeSource::LocalMedia(local) => local.element.as_mut()?.latest_frame(),
            TimeSource::EmbeddedPlayer(embedded) if embedded.ready => {
                embedded.backend.latest_frame()
            }
            TimeSource::EmbeddedPlayer(_) => None,
        }
    }

    pub fn media_duration(&self) -> Option<f64> {
        match self {
            TimeSource::LocalMedia(local) => local.element.as_ref()?.duration(),
            TimeSource::EmbeddedPlayer(embedded) => embedded.backend.duration(),
        }
    }
}

impl Drop for TimeSource {
    fn drop(&mut self) {
        if let TimeSource::EmbeddedPlayer(embedded) = self {
            embedded.destroy();
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Scriptable backends that record every command they receive.

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Seek(f64),
        Play,
        Pause,
        Destroy,
    }

    #[derive(Debug, Default)]
    pub struct FakeState {
        pub time: f64,
        pub calls: Vec<Call>,
        pub ready: bool,
        pub destroyed: bool,
        pub fail_commands: bool,
        pub events: VecDeque<PlayerEvent>,
    }

    impl FakeState {
        pub fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    pub type Shared = Rc<RefCell<FakeState>>;

    pub fn shared() -> Shared {
        Rc::new(RefCell::new(FakeState::default()))
    }

    pub struct FakeMedia(pub Shared);

    impl MediaElement for FakeMedia {
        fn current_time(&self) -> f64 {
            self.0.borrow().time
        }

        fn set_current_time(&mut self, seconds: f64) -> Result<(), PlayerError> {
            let mut state = self.0.borrow_mut();
            state.calls.push(Call::Seek(seconds));
            state.time = seconds;
            Ok(())
        }

        fn play(&mut self) -> Result<(), PlayerError> {
            let mut state = self.0.borrow_mut();
            state.calls.push(Call::Play);
            if state.fail_commands {
                return Err(PlayerError::Rejected {
                    command: "play",
                    reason: "autoplay blocked".to_string(),
                });
            }
            Ok(())
        }

        fn pause(&mut self) -> Result<(), PlayerError> {
            self.0.borrow_mut().calls.push(Call::Pause);
            Ok(())
        }
    }

    pub struct FakeStream(pub Shared);

    impl FakeStream {
        fn guard(&self) -> Result<(), PlayerError> {
            let state = self.0.borrow();
            if state.destroyed {
                Err(PlayerError::Destroyed)
            } else if !state.ready || state.fail_commands {
                Err(PlayerError::NotReady)
            } else {
                Ok(())
            }
        }
    }

    impl EmbeddedBackend for FakeStream {
        fn get_current_time(&self) -> Result<f64, PlayerError> {
            self.guard()?;
            Ok(self.0.borrow().time)
        }

        fn play_video(&mut self) -> Result<(), PlayerError> {
            self.0.borrow_mut().calls.push(Call::Play);
            self.guard()
        }

        fn pause_video(&mut self) -> Result<(), PlayerError> {
            self.0.borrow_mut().calls.push(Call::Pause);
            self.guard()
        }

        fn seek_to(&mut self, seconds: f64) -> Result<(), PlayerError> {
            self.0.borrow_mut().calls.push(Call::Seek(seconds));
            self.guard()?;
            self.0.borrow_mut().time = seconds;
            Ok(())
        }

        fn destroy(&mut self) {
            let mut state = self.0.borrow_mut();
            state.calls.push(Call::Destroy);
            state.destroyed = true;
        }

        fn poll_event(&mut self) -> Option<PlayerEvent> {
            self.0.borrow_mut().events.pop_front()
        }
    }
}

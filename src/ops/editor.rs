use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui;
use tracing::{info, warn};

use crate::config::{self, AppConfig};
use crate::ops::drag::{DragController, DragTarget};
use crate::ops::geometry::{self, GeometryMapper, SegmentRect, quantize};
use crate::ops::segment_store::SegmentStore;
use crate::ops::template_ops::{TemplateError, TemplateImportError, TemplateLibrary};
use crate::renderer::playback_watcher::{PlaybackWatcher, TickOutcome, WatchPhase};
use crate::renderer::time_source::{
    EmbeddedBackend, MediaElement, PlayerState, SourceKind, TimeSource, VideoFrame,
};
use crate::storage::Persistence;
use crate::types::playback_state::PlaybackSelection;
use crate::types::project::Project;
use crate::types::segment::{Rgb, Segment, SegmentId, SegmentPatch};
use crate::types::session::SessionState;
use crate::types::template::Template;

/// Name given to the project created on the fly when a template is used with
/// no project selected.
pub const UNTITLED_PROJECT: &str = "Untitled project";

/// Asks the view layer to redraw everything derived from the model.
pub trait RenderHook {
    fn request_full_rerender(&self);
}

impl RenderHook for egui::Context {
    fn request_full_rerender(&self) {
        self.request_repaint();
    }
}

/// The editor's controller: owns the session, the playback machinery and the
/// persistence collaborator, and is the only thing the UI mutates through.
///
/// Every committed change is saved and followed by a re-render request.
/// Persistence failures never roll back the in-memory model; they are logged
/// and surfaced through [`Editor::status`]. Data that failed to load is moved
/// aside by the store before anything is written over it.
pub struct Editor {
    session: SessionState,
    templates: TemplateLibrary,
    source: TimeSource,
    watcher: PlaybackWatcher,
    drag: DragController,
    config: AppConfig,
    config_path: Option<PathBuf>,
    store: Box<dyn Persistence>,
    render: Box<dyn RenderHook>,
    playhead: f64,
    probed_duration: Option<f64>,
    status: Option<String>,
    projects_unreadable: bool,
    templates_unreadable: bool,
}

impl Editor {
    pub fn new(
        config: AppConfig,
        config_path: Option<PathBuf>,
        store: Box<dyn Persistence>,
        render: Box<dyn RenderHook>,
    ) -> Self {
        let mut status = None;
        let mut projects_unreadable = false;
        let mut templates_unreadable = false;
        let projects = match store.load_projects() {
            Ok(projects) => projects.unwrap_or_default(),
            Err(err) => {
                warn!("Could not load projects: {err}");
                status = Some(err.to_string());
                projects_unreadable = true;
                Vec::new()
            }
        };
        let stored_templates = match store.load_templates() {
            Ok(templates) => templates,
            Err(err) => {
                warn!("Could not load templates: {err}");
                status = Some(err.to_string());
                templates_unreadable = true;
                None
            }
        };
        // Seeds are only written over files that loaded cleanly or were absent.
        let seed_projects = !projects_unreadable && projects.is_empty();
        let seed_templates =
            !templates_unreadable && stored_templates.as_ref().is_none_or(Vec::is_empty);

        let session = SessionState::init(projects, config.scale_px_per_sec);
        let templates = TemplateLibrary::from_stored(stored_templates);
        let watcher = PlaybackWatcher::new(config.playback.watcher());
        info!(
            "Editor started with {} projects and {} templates",
            session.projects.len(),
            templates.len()
        );

        let mut editor = Editor {
            session,
            templates,
            source: TimeSource::new(),
            watcher,
            drag: DragController::new(),
            config,
            config_path,
            store,
            render,
            playhead: 0.0,
            probed_duration: None,
            status,
            projects_unreadable,
            templates_unreadable,
        };
        if seed_projects {
            editor.persist_projects();
        }
        if seed_templates {
            editor.persist_templates();
        }
        editor
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn projects(&self) -> &[Project] {
        &self.session.projects
    }

    pub fn active_project(&self) -> Option<&Project> {
        self.session.active_project()
    }

    pub fn segments(&self) -> Option<&SegmentStore> {
        self.session.active_project().map(|p| &p.segments)
    }

    pub fn selection(&self) -> &PlaybackSelection {
        &self.session.selection
    }

    pub fn templates(&self) -> &[Template] {
        self.templates.all()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn mapper(&self) -> GeometryMapper {
        self.session.mapper()
    }

    pub fn scale(&self) -> f64 {
        self.session.scale()
    }

    /// Last playback time the editor observed, for the playhead and readout.
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    // ---- projects ----

    /// Creates a project and makes it active. A blank name does nothing.
    pub fn create_project(&mut self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.leave_project();
        let id = self.session.add_project(Project::new(name));
        info!("Created project {name:?}");
        self.commit_projects();
        Some(id)
    }

    pub fn select_project(&mut self, id: &str) -> bool {
        if self.session.active_project_id() == Some(id) {
            return true;
        }
        if !self.session.projects.iter().any(|p| p.id == id) {
            return false;
        }
        self.leave_project();
        self.session.set_active_project(id);
        self.request_rerender();
        true
    }

    fn leave_project(&mut self) {
        self.stop_segment();
        self.cancel_drag();
    }

    // ---- segments ----

    fn segments_mut(&mut self) -> Option<&mut SegmentStore> {
        self.session.active_project_mut().map(|p| &mut p.segments)
    }

    /// Start the add form suggests: the current time, to the tenth.
    pub fn default_start(&self) -> f64 {
        quantize(self.source.current_time())
    }

    pub fn add_segment(&mut self, segment: Segment) -> Option<SegmentId> {
        if self.session.active_project().is_none() {
            return None;
        }
        self.cancel_drag();
        let id = self.segments_mut()?.add(segment);
        self.commit_projects();
        Some(id)
    }

    pub fn update_segment(&mut self, id: SegmentId, patch: SegmentPatch) -> bool {
        if self.segments().and_then(|s| s.get(id)).is_none() {
            return false;
        }
        self.cancel_drag();
        let Some(segments) = self.segments_mut() else {
            return false;
        };
        if !segments.update(id, patch) {
            return false;
        }
        self.commit_projects();
        true
    }

    /// Removes a segment, stopping it first if it is the one playing.
    pub fn delete_segment(&mut self, id: SegmentId) -> bool {
        if self.segments().and_then(|s| s.get(id)).is_none() {
            return false;
        }
        self.cancel_drag();
        let Some(segments) = self.segments_mut() else {
            return false;
        };
        if segments.delete(id).is_none() {
            return false;
        }
        if self.session.selection.forget(id) {
            self.stop_segment();
        }
        self.commit_projects();
        true
    }

    /// Drops a segment built from `template_id` at the current time and seeks
    /// to it, creating a project first when none is active.
    pub fn add_from_template(&mut self, template_id: &str) -> Option<SegmentId> {
        let template = self.templates.get(template_id)?.clone();
        if self.session.active_project().is_none() {
            self.create_project(UNTITLED_PROJECT)?;
        }
        let start = self.default_start();
        let duration = if template.duration > 0.0 {
            template.duration
        } else {
            5.0
        };
        let id = self.add_segment(Segment::new(start, duration, template.title, template.color))?;
        self.seek(start);
        Some(id)
    }

    // ---- templates ----

    pub fn save_template(
        &mut self,
        id: Option<&str>,
        title: &str,
        duration: f64,
        color: Rgb,
    ) -> Result<String, TemplateError> {
        let id = self.templates.save(id, title, duration, color)?;
        self.commit_templates();
        Ok(id)
    }

    pub fn delete_template(&mut self, id: &str) -> bool {
        if self.templates.remove(id).is_none() {
            return false;
        }
        self.commit_templates();
        true
    }

    pub fn move_template(&mut self, from: usize, to: usize) -> bool {
        if !self.templates.move_template(from, to) {
            return false;
        }
        self.commit_templates();
        true
    }

    pub fn import_templates(&mut self, json: &str) -> Result<usize, TemplateImportError> {
        let count = self.templates.import_json(json)?;
        self.commit_templates();
        self.status = Some(format!("Imported {count} templates"));
        Ok(count)
    }

    pub fn export_templates(&self) -> Result<String, serde_json::Error> {
        self.templates.export_json()
    }

    // ---- playback ----

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn is_source_ready(&self) -> bool {
        self.source.is_ready()
    }

    pub fn player_state(&self) -> Option<PlayerState> {
        self.source.player_state()
    }

    pub fn latest_frame(&mut self) -> Option<VideoFrame> {
        self.source.latest_frame()
    }

    pub fn playback_phase(&self) -> WatchPhase {
        self.watcher.phase(&self.session.selection)
    }

    /// Media length as reported by the backend, or as probed on load.
    pub fn media_duration(&self) -> Option<f64> {
        self.source.media_duration().or(self.probed_duration)
    }

    pub fn ruler_end(&self) -> f64 {
        let max_end = self.segments().map(SegmentStore::max_end).unwrap_or(0.0);
        geometry::ruler_end(max_end, self.media_duration())
    }

    /// Plays `id` in isolation, or stops it if it is already the one playing.
    /// Returns whether the segment is now playing.
    pub fn toggle_segment_playback(&mut self, id: SegmentId, now: Instant) -> bool {
        if self.session.selection.is_active(id) {
            self.stop_segment();
            return false;
        }
        let (segments, selection) = self.session.playback_parts();
        let Some(segments) = segments else {
            return false;
        };
        let started = self.watcher.start(id, segments, selection, &mut self.source, now);
        if let Some(segment) = segments.get(id).filter(|_| started) {
            self.playhead = segment.start;
        }
        self.request_rerender();
        started
    }

    pub fn stop_segment(&mut self) -> bool {
        let stopped = self.watcher.stop(&mut self.session.selection, &mut self.source);
        if stopped {
            self.request_rerender();
        }
        stopped
    }

    pub fn toggle_loop(&mut self, id: SegmentId) -> bool {
        let looping = self.session.selection.toggle_loop(id);
        self.request_rerender();
        looping
    }

    pub fn seek(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        self.source.seek(seconds);
        self.playhead = seconds;
        self.request_rerender();
    }

    pub fn seek_to_segment(&mut self, id: SegmentId) -> bool {
        let Some(start) = self.segments().and_then(|s| s.get(id)).map(|s| s.start) else {
            return false;
        };
        self.seek(start);
        true
    }

    /// Click on empty timeline: seek to the exact time under the pointer.
    pub fn seek_to_pixel(&mut self, x: f64) {
        let seconds = self.mapper().pixel_to_time_exact(x);
        self.seek(seconds);
    }

    /// Time under the pointer at form resolution, for double-click adds.
    pub fn time_at_pixel(&self, x: f64) -> f64 {
        self.mapper().pixel_to_time(x.max(0.0))
    }

    pub fn play(&mut self) {
        self.source.play();
    }

    /// Pauses the whole video. Isolated segment playback ends with it.
    pub fn pause(&mut self) {
        if !self.stop_segment() {
            self.source.pause();
        }
    }

    // ---- drag ----

    pub fn begin_drag(&mut self, id: SegmentId, target: DragTarget, pointer_x: f64) -> bool {
        let mapper = self.session.mapper();
        let Some(project) = self.session.active_project() else {
            return false;
        };
        self.drag.begin(id, target, pointer_x, &project.segments, &mapper)
    }

    pub fn drag_to(&mut self, pointer_x: f64) -> Option<SegmentRect> {
        let mapper = self.session.mapper();
        let project = self.session.active_project_mut()?;
        let rect = self.drag.drag_to(pointer_x, &mut project.segments, &mapper)?;
        self.request_rerender();
        Some(rect)
    }

    pub fn end_drag(&mut self) -> Option<SegmentId> {
        let Some(project) = self.session.active_project_mut() else {
            self.cancel_drag();
            return None;
        };
        let id = self.drag.end(&mut project.segments)?;
        self.commit_projects();
        Some(id)
    }

    /// Abandons an in-flight gesture, putting its segment back where it was.
    /// Runs before every commit other than the gesture's own.
    fn cancel_drag(&mut self) {
        if !self.drag.is_active() {
            return;
        }
        match self.session.active_project_mut() {
            Some(project) => self.drag.cancel(&mut project.segments),
            None => self.drag.cancel(&mut SegmentStore::new()),
        }
    }

    pub fn live_rect(&self, id: SegmentId) -> Option<SegmentRect> {
        self.drag.live_rect(id)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_active()
    }

    // ---- view ----

    /// Changes the zoom and remembers it in the config file.
    pub fn set_scale(&mut self, px_per_sec: f64) -> bool {
        if !self.session.set_scale(px_per_sec) {
            return false;
        }
        self.config.scale_px_per_sec = self.session.scale();
        if let Some(path) = &self.config_path {
            if let Err(err) = config::save_to(&self.config, path) {
                warn!("Could not save scale: {err}");
                self.status = Some(err.to_string());
            }
        }
        self.request_rerender();
        true
    }

    // ---- media ----

    /// Replaces the time source with a local file and starts it playing.
    pub fn load_local(
        &mut self,
        element: Box<dyn MediaElement>,
        label: &str,
        probed_duration: Option<f64>,
    ) {
        self.leave_source();
        self.source.load_local(element);
        self.probed_duration = probed_duration;
        self.source.play();
        self.status = Some(format!("Loaded {label}"));
        self.request_rerender();
    }

    /// Replaces the time source with a stream player. It is not usable until
    /// the backend reports ready.
    pub fn load_stream(&mut self, backend: Box<dyn EmbeddedBackend>, label: &str) {
        self.leave_source();
        self.source
            .load_embedded(backend, self.config.playback.stream_poll_interval());
        self.probed_duration = None;
        self.status = Some(format!("Connecting to {label}"));
        self.request_rerender();
    }

    fn leave_source(&mut self) {
        self.stop_segment();
        self.playhead = 0.0;
    }

    // ---- timers ----

    /// Drives the stream poll, the play grace delay and the segment watcher.
    /// Call once per UI frame.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let isolated = self.session.selection.active().is_some();
        let update = self.source.pump(now, isolated);
        if update.became_ready {
            self.status = Some("Stream ready".to_string());
            self.request_rerender();
        }
        if let Some(seconds) = update.polled_time {
            self.playhead = seconds;
        }

        let empty = SegmentStore::new();
        let (segments, selection) = self.session.playback_parts();
        let outcome = self.watcher.tick(
            now,
            segments.unwrap_or(&empty),
            selection,
            &mut self.source,
        );
        match outcome {
            TickOutcome::Watching(seconds)
            | TickOutcome::Looped(seconds)
            | TickOutcome::Finished(seconds) => self.playhead = seconds,
            TickOutcome::Idle | TickOutcome::Waiting => {}
        }
        if self.source.kind() == SourceKind::Local && self.source.is_ready() {
            self.playhead = self.source.current_time();
        }
        if matches!(outcome, TickOutcome::Finished(_)) {
            self.request_rerender();
        }
        outcome
    }

    /// How long the UI may sleep before the next [`Editor::tick`] is needed.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        match (self.watcher.next_wakeup(now), self.source.next_poll_in(now)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ---- persistence ----

    fn commit_projects(&mut self) {
        self.persist_projects();
        self.request_rerender();
    }

    fn commit_templates(&mut self) {
        self.persist_templates();
        self.request_rerender();
    }

    fn persist_projects(&mut self) {
        if self.projects_unreadable {
            match self.store.set_aside_projects() {
                Ok(backup) => {
                    self.projects_unreadable = false;
                    if let Some(backup) = backup {
                        self.status = Some(format!("Unreadable projects kept in {}", backup.display()));
                    }
                }
                Err(err) => {
                    warn!("Not saving projects over unreadable data: {err}");
                    self.status = Some(err.to_string());
                    return;
                }
            }
        }
        if let Err(err) = self.store.save_projects(&self.session.projects) {
            warn!("Could not save projects: {err}");
            self.status = Some(err.to_string());
        }
    }

    fn persist_templates(&mut self) {
        if self.templates_unreadable {
            match self.store.set_aside_templates() {
                Ok(backup) => {
                    self.templates_unreadable = false;
                    if let Some(backup) = backup {
                        self.status = Some(format!("Unreadable templates kept in {}", backup.display()));
                    }
                }
                Err(err) => {
                    warn!("Not saving templates over unreadable data: {err}");
                    self.status = Some(err.to_string());
                    return;
                }
            }
        }
        if let Err(err) = self.store.save_templates(self.templates.all()) {
            warn!("Could not save templates: {err}");
            self.status = Some(err.to_string());
        }
    }

    fn request_rerender(&self) {
        self.render.request_full_rerender();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::time_source::PlayerEvent;
    use crate::renderer::time_source::fakes::{Call, FakeMedia, FakeStream, Shared, shared};
    use crate::app_dirs::AppFile;
    use crate::storage::{JsonStore, MemoryStore, StorageError};
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct CountingRender(Rc<Cell<usize>>);

    impl RenderHook for CountingRender {
        fn request_full_rerender(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    struct FailingStore;

    impl Persistence for FailingStore {
        fn load_projects(&self) -> Result<Option<Vec<Project>>, StorageError> {
            Ok(None)
        }
        fn save_projects(&mut self, _: &[Project]) -> Result<(), StorageError> {
            Err(StorageError::Write {
                path: "projects.json".into(),
                source: std::io::Error::other("disk full"),
            })
        }
        fn load_templates(&self) -> Result<Option<Vec<Template>>, StorageError> {
            Ok(None)
        }
        fn save_templates(&mut self, _: &[Template]) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct Rig {
        editor: Editor,
        store: MemoryStore,
        renders: CountingRender,
        media: Shared,
        t0: Instant,
    }

    impl Rig {
        fn new() -> Self {
            let store = MemoryStore::new();
            let renders = CountingRender::default();
            let mut editor = Editor::new(
                AppConfig::default(),
                None,
                Box::new(store.clone()),
                Box::new(renders.clone()),
            );
            let media = shared();
            editor.load_local(Box::new(FakeMedia(media.clone())), "clip.mp4", Some(120.0));
            media.borrow_mut().calls.clear();
            Rig {
                editor,
                store,
                renders,
                media,
                t0: Instant::now(),
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn segment_id(&self, title: &str) -> SegmentId {
            self.editor
                .segments()
                .unwrap()
                .iter()
                .find(|s| s.title == title)
                .map(|s| s.id)
                .unwrap()
        }

        fn count(&self, call: Call) -> usize {
            self.media.borrow().count(&call)
        }

        fn saved_demo(&self) -> Project {
            self.store
                .contents()
                .projects
                .as_ref()
                .and_then(|projects| projects.iter().find(|p| p.id == "demo").cloned())
                .unwrap()
        }
    }

    #[test]
    fn test_first_launch_seeds_and_saves_demo_data() {
        let rig = Rig::new();
        assert_eq!(rig.editor.active_project().unwrap().id, "demo");
        assert_eq!(rig.editor.templates().len(), 3);
        let contents = rig.store.contents();
        assert_eq!(contents.project_saves, 1);
        assert_eq!(contents.template_saves, 1);
    }

    #[test]
    fn test_add_segment_persists_and_rerenders() {
        let mut rig = Rig::new();
        let renders = rig.renders.0.get();
        let id = rig
            .editor
            .add_segment(Segment::new(3.0, 2.0, "Logo", Rgb::FALLBACK))
            .unwrap();
        assert_eq!(rig.editor.segments().unwrap().position(id), Some(1));
        assert_eq!(rig.store.contents().project_saves, 2);
        assert!(rig.renders.0.get() > renders);
    }

    #[test]
    fn test_delete_active_segment_stops_playback() {
        let mut rig = Rig::new();
        let scene = rig.segment_id("Scene A");
        rig.editor.toggle_loop(scene);
        assert!(rig.editor.toggle_segment_playback(scene, rig.t0));
        assert!(rig.editor.delete_segment(scene));
        assert_eq!(rig.editor.selection().active(), None);
        assert!(!rig.editor.selection().is_looping(scene));
        assert_eq!(rig.count(Call::Pause), 1);
        assert_eq!(rig.editor.tick(rig.at(500)), TickOutcome::Idle);
    }

    #[test]
    fn test_segment_playback_runs_to_end() {
        let mut rig = Rig::new();
        let intro = rig.segment_id("Intro");
        assert!(rig.editor.toggle_segment_playback(intro, rig.t0));
        assert_eq!(rig.editor.playback_phase(), WatchPhase::Playing(intro));
        rig.editor.tick(rig.at(150));
        assert_eq!(rig.count(Call::Play), 1);

        rig.media.borrow_mut().time = 5.96;
        assert_eq!(rig.editor.tick(rig.at(300)), TickOutcome::Finished(5.96));
        assert_eq!(rig.editor.playback_phase(), WatchPhase::Stopped);
        assert_eq!(rig.count(Call::Pause), 1);
        assert_eq!(rig.editor.playhead(), 5.96);
    }

    #[test]
    fn test_toggle_same_segment_stops_it() {
        let mut rig = Rig::new();
        let intro = rig.segment_id("Intro");
        assert!(rig.editor.toggle_segment_playback(intro, rig.t0));
        assert!(!rig.editor.toggle_segment_playback(intro, rig.at(50)));
        assert_eq!(rig.editor.selection().active(), None);
        assert_eq!(rig.editor.next_wakeup(rig.at(60)), None);
    }

    #[test]
    fn test_switching_project_stops_playback() {
        let mut rig = Rig::new();
        let intro = rig.segment_id("Intro");
        rig.editor.toggle_segment_playback(intro, rig.t0);
        let id = rig.editor.create_project("Second cut").unwrap();
        assert_eq!(rig.editor.active_project().unwrap().id, id);
        assert_eq!(rig.editor.selection().active(), None);
        assert!(rig.editor.segments().unwrap().is_empty());

        assert!(rig.editor.select_project("demo"));
        assert!(!rig.editor.select_project("nope"));
        assert_eq!(rig.editor.create_project("   "), None);
    }

    #[test]
    fn test_template_adds_at_current_time_and_seeks() {
        let mut rig = Rig::new();
        rig.media.borrow_mut().time = 41.26;
        let id = rig.editor.add_from_template("t2").unwrap();
        let segment = rig.editor.segments().unwrap().get(id).unwrap().clone();
        assert_eq!(segment.start, 41.3);
        assert_eq!(segment.duration, 12.0);
        assert_eq!(segment.title, "Main");
        assert_eq!(segment.color, Rgb::new(0x06, 0xd6, 0xa0));
        assert_eq!(rig.media.borrow().calls.last(), Some(&Call::Seek(41.3)));
        assert_eq!(rig.editor.playhead(), 41.3);
    }

    #[test]
    fn test_drag_commits_once_on_release() {
        let mut rig = Rig::new();
        let intro = rig.segment_id("Intro");
        let saves = rig.store.contents().project_saves;
        assert!(rig.editor.begin_drag(intro, DragTarget::Body, 10.0));
        rig.editor.drag_to(1510.0);
        rig.editor.drag_to(1570.0);
        assert_eq!(rig.store.contents().project_saves, saves);
        assert_eq!(rig.editor.end_drag(), Some(intro));
        assert_eq!(rig.store.contents().project_saves, saves + 1);
        let segments = rig.editor.segments().unwrap();
        assert_eq!(segments.get(intro).unwrap().start, 26.0);
        assert_eq!(segments.position(intro), Some(2));
    }

    #[test]
    fn test_timeline_clicks_map_through_scale() {
        let mut rig = Rig::new();
        assert!(rig.editor.set_scale(100.0));
        assert!(!rig.editor.set_scale(0.0));
        assert_eq!(rig.editor.config().scale_px_per_sec, 100.0);
        rig.editor.seek_to_pixel(1234.0);
        assert_eq!(rig.editor.playhead(), 12.34);
        assert_eq!(rig.editor.time_at_pixel(1234.0), 12.3);
        rig.editor.seek_to_pixel(-50.0);
        assert_eq!(rig.editor.playhead(), 0.0);
    }

    #[test]
    fn test_ruler_uses_probed_media_length() {
        let rig = Rig::new();
        assert_eq!(rig.editor.ruler_end(), 120.0);
    }

    #[test]
    fn test_stream_becomes_ready_through_tick() {
        let mut rig = Rig::new();
        let stream = shared();
        rig.editor
            .load_stream(Box::new(FakeStream(stream.clone())), "rtsp://cam/1");
        assert!(!rig.editor.is_source_ready());
        {
            let mut state = stream.borrow_mut();
            state.ready = true;
            state.time = 7.0;
            state.events.push_back(PlayerEvent::Ready);
            state
                .events
                .push_back(PlayerEvent::StateChange(PlayerState::Playing));
        }
        rig.editor.tick(rig.t0);
        assert!(rig.editor.is_source_ready());
        assert_eq!(rig.editor.status(), Some("Stream ready"));
        assert_eq!(rig.editor.next_wakeup(rig.t0), Some(Duration::from_millis(200)));
        rig.editor.tick(rig.at(200));
        assert_eq!(rig.editor.playhead(), 7.0);
    }

    #[test]
    fn test_save_failure_keeps_model_and_reports() {
        let mut editor = Editor::new(
            AppConfig::default(),
            None,
            Box::new(FailingStore),
            Box::new(CountingRender::default()),
        );
        let id = editor
            .add_segment(Segment::new(1.0, 1.0, "kept", Rgb::FALLBACK))
            .unwrap();
        assert!(editor.segments().unwrap().get(id).is_some());
        assert!(editor.status().unwrap().contains("disk full"));
    }

    #[test]
    fn test_template_with_no_project_creates_one() {
        let mut editor = Editor::new(
            AppConfig::default(),
            None,
            Box::new(MemoryStore::new()),
            Box::new(CountingRender::default()),
        );
        editor.session.projects.clear();
        editor.session.reset();
        assert!(editor.active_project().is_none());
        let id = editor.add_from_template("t1").unwrap();
        let project = editor.active_project().unwrap();
        assert_eq!(project.name, UNTITLED_PROJECT);
        assert_eq!(project.segments.get(id).unwrap().start, 0.0);
    }

    #[test]
    fn test_unreadable_files_are_set_aside_not_overwritten() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let projects_path = store.path_of(AppFile::Projects);
        let templates_path = store.path_of(AppFile::Templates);
        let broken_projects = r#"[{"id":"p1","name":"Keep me","segments":[{"start":"oops"}]}]"#;
        let broken_templates = "[{ broken";
        std::fs::write(&projects_path, broken_projects).unwrap();
        std::fs::write(&templates_path, broken_templates).unwrap();

        let mut editor = Editor::new(
            AppConfig::default(),
            None,
            Box::new(store),
            Box::new(CountingRender::default()),
        );
        assert!(editor.status().unwrap().contains("Corrupt data"));
        assert_eq!(editor.active_project().unwrap().id, "demo");
        assert_eq!(editor.templates().len(), 3);
        assert_eq!(std::fs::read_to_string(&projects_path).unwrap(), broken_projects);
        assert_eq!(std::fs::read_to_string(&templates_path).unwrap(), broken_templates);

        editor
            .add_segment(Segment::new(30.0, 2.0, "Outro", Rgb::FALLBACK))
            .unwrap();
        let backup = dir.path().join(AppFile::Projects.backup_name());
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), broken_projects);
        assert!(editor.status().unwrap().starts_with("Unreadable projects kept in"));
        let saved: Vec<Project> =
            serde_json::from_str(&std::fs::read_to_string(&projects_path).unwrap()).unwrap();
        assert_eq!(saved[0].segments.len(), 4);
        assert_eq!(std::fs::read_to_string(&templates_path).unwrap(), broken_templates);
    }

    #[test]
    fn test_project_switch_mid_drag_saves_original_range() {
        let mut rig = Rig::new();
        let intro = rig.segment_id("Intro");
        assert!(rig.editor.begin_drag(intro, DragTarget::Body, 10.0));
        rig.editor.drag_to(1510.0);
        assert_eq!(rig.editor.segments().unwrap().get(intro).unwrap().start, 25.0);

        rig.editor.create_project("Second cut").unwrap();
        assert!(!rig.editor.is_dragging());
        assert_eq!(rig.editor.end_drag(), None);
        let demo = rig.saved_demo();
        assert!(demo.segments.is_sorted());
        assert_eq!(demo.segments.get(intro).unwrap().start, 0.0);
        assert_eq!(demo.segments.position(intro), Some(0));

        assert!(rig.editor.select_project("demo"));
        assert_eq!(rig.editor.segments().unwrap().get(intro).unwrap().start, 0.0);
    }

    #[test]
    fn test_delete_mid_drag_does_not_save_live_range() {
        let mut rig = Rig::new();
        let intro = rig.segment_id("Intro");
        let scene_b = rig.segment_id("Scene B");
        assert!(rig.editor.begin_drag(intro, DragTarget::TrailingHandle, 360.0));
        rig.editor.drag_to(900.0);
        assert!(rig.editor.delete_segment(scene_b));
        assert!(!rig.editor.is_dragging());

        let demo = rig.saved_demo();
        assert_eq!(demo.segments.len(), 2);
        assert_eq!(demo.segments.get(intro).unwrap().duration, 6.0);
        assert!(demo.segments.is_sorted());
    }

    #[test]
    fn test_zoom_leaves_broken_config_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(AppFile::Config.file_name());
        let hand_edited = "scale_px_per_sec = \"wide\"\n";
        std::fs::write(&path, hand_edited).unwrap();

        let (config, config_path) = config::load_session(&path);
        let mut editor = Editor::new(
            config,
            config_path,
            Box::new(MemoryStore::new()),
            Box::new(CountingRender::default()),
        );
        assert!(editor.set_scale(100.0));
        assert_eq!(editor.scale(), 100.0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), hand_edited);
    }
}

use crate::ops::geometry::GeometryMapper;
use crate::ops::segment_store::SegmentStore;
use crate::types::playback_state::PlaybackSelection;
use crate::types::project::Project;

/// Default zoom, in pixels per second.
pub const DEFAULT_SCALE: f64 = 60.0;

/// SessionState groups the projects (persistent data) with the process-wide
/// editing state: which project is active, the zoom factor and the isolated
/// playback selection. Only the projects are serialized.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub projects: Vec<Project>,
    active_project: Option<String>,
    scale: f64,
    pub selection: PlaybackSelection,
}

impl SessionState {
    /// Starts a session over the loaded projects. An empty list is seeded with
    /// the demo project; the first project becomes active.
    pub fn init(mut projects: Vec<Project>, scale: f64) -> Self {
        if projects.is_empty() {
            projects.push(Project::demo());
        }
        let mut session = SessionState {
            projects,
            active_project: None,
            scale: DEFAULT_SCALE,
            selection: PlaybackSelection::new(),
        };
        session.set_scale(scale);
        session.reset();
        session
    }

    /// Drops transient state and re-resolves the active project, falling back
    /// to the first project when the current id no longer exists.
    pub fn reset(&mut self) {
        self.selection = PlaybackSelection::new();
        let dangling = match &self.active_project {
            Some(id) => !self.projects.iter().any(|p| &p.id == id),
            None => true,
        };
        if dangling {
            self.active_project = self.projects.first().map(|p| p.id.clone());
        }
    }

    pub fn active_project_id(&self) -> Option<&str> {
        self.active_project.as_deref()
    }

    pub fn active_project(&self) -> Option<&Project> {
        let id = self.active_project.as_deref()?;
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn active_project_mut(&mut self) -> Option<&mut Project> {
        let id = self.active_project.as_deref()?;
        self.projects.iter_mut().find(|p| p.id == id)
    }

    pub fn set_active_project(&mut self, id: &str) -> bool {
        if self.projects.iter().any(|p| p.id == id) {
            self.active_project = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Appends a project and makes it the active one.
    pub fn add_project(&mut self, project: Project) -> String {
        let id = project.id.clone();
        self.projects.push(project);
        self.active_project = Some(id.clone());
        id
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Sets the zoom. Non-finite or non-positive values are ignored; returns
    /// whether the scale changed.
    pub fn set_scale(&mut self, px_per_sec: f64) -> bool {
        if !px_per_sec.is_finite() || px_per_sec <= 0.0 || px_per_sec == self.scale {
            return false;
        }
        self.scale = px_per_sec;
        true
    }

    pub fn mapper(&self) -> GeometryMapper {
        GeometryMapper::new(self.scale)
    }

    /// Borrows the active project's segments alongside the mutable playback
    /// selection, as the playback watcher needs both at once.
    pub fn playback_parts(&mut self) -> (Option<&SegmentStore>, &mut PlaybackSelection) {
        let segments = self
            .active_project
            .as_deref()
            .and_then(|id| self.projects.iter().find(|p| p.id == id))
            .map(|p| &p.segments);
        (segments, &mut self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_session_is_seeded_with_demo() {
        let session = SessionState::init(Vec::new(), DEFAULT_SCALE);
        assert_eq!(session.projects.len(), 1);
        assert_eq!(session.active_project_id(), Some("demo"));
        let starts: Vec<f64> = session
            .active_project()
            .unwrap()
            .segments
            .iter()
            .map(|s| s.start)
            .collect();
        assert_eq!(starts, vec![0.0, 6.2, 19.0]);
    }

    #[test]
    fn test_reset_recovers_from_dangling_active_id() {
        let mut session = SessionState::init(vec![Project::new("A"), Project::new("B")], 60.0);
        let b = session.projects[1].id.clone();
        assert!(session.set_active_project(&b));
        session.projects.remove(1);
        session.reset();
        assert_eq!(session.active_project().unwrap().name, "A");
    }

    #[test]
    fn test_invalid_scale_is_ignored() {
        let mut session = SessionState::init(Vec::new(), -5.0);
        assert_eq!(session.scale(), DEFAULT_SCALE);
        assert!(!session.set_scale(f64::NAN));
        assert!(!session.set_scale(0.0));
        assert!(session.set_scale(120.0));
        assert_eq!(session.mapper().scale(), 120.0);
    }

    #[test]
    fn test_add_project_becomes_active() {
        let mut session = SessionState::init(Vec::new(), 60.0);
        let id = session.add_project(Project::new("Fresh"));
        assert_eq!(session.active_project_id(), Some(id.as_str()));
        assert!(!session.set_active_project("missing"));
    }
}

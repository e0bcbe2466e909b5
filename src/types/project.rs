use crate::ops::segment_store::SegmentStore;
use crate::types::segment::{Rgb, Segment};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "new_project_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub segments: SegmentStore,
}

pub fn new_project_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Project {
            id: new_project_id(),
            name: name.into(),
            segments: SegmentStore::new(),
        }
    }

    /// Project created on first launch so the timeline is not empty.
    pub fn demo() -> Self {
        Project {
            id: "demo".to_string(),
            name: "Demo project".to_string(),
            segments: SegmentStore::from_segments(vec![
                Segment::new(0.0, 6.0, "Intro", Rgb::new(0xff, 0xd1, 0x66)),
                Segment::new(6.2, 12.0, "Scene A", Rgb::new(0x06, 0xd6, 0xa0)),
                Segment::new(19.0, 8.0, "Scene B", Rgb::new(0x11, 0x8a, 0xb2)),
            ]),
        }
    }

    /// Summary line shown under the project title.
    pub fn summary(&self) -> String {
        format!("{} segments", self.segments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_project_json() {
        let project = Project::demo();
        let json = serde_json::to_string_pretty(&project).unwrap();
        let loaded: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.id, "demo");
        assert_eq!(loaded.segments, project.segments);
        assert_eq!(loaded.summary(), "3 segments");
    }

    #[test]
    fn test_project_without_id_gets_one() {
        let loaded: Project = serde_json::from_str(r#"{"name": "Imported"}"#).unwrap();
        assert!(!loaded.id.is_empty());
        assert!(loaded.segments.is_empty());
    }
}

//! Where projects and templates live between runs.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::app_dirs::{AppDirError, AppDirs, AppFile};
use crate::config::write_atomic;
use crate::types::project::Project;
use crate::types::template::Template;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage directory unavailable: {0}")]
    Dir(#[from] AppDirError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt data in {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to encode data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Load/save collaborator for the editor. Loads return `Ok(None)` when
/// nothing has been stored yet.
///
/// When a load fails the editor calls the matching `set_aside_*` before its
/// first save, so the unreadable data is kept rather than overwritten.
pub trait Persistence {
    fn load_projects(&self) -> Result<Option<Vec<Project>>, StorageError>;
    fn save_projects(&mut self, projects: &[Project]) -> Result<(), StorageError>;
    fn load_templates(&self) -> Result<Option<Vec<Template>>, StorageError>;
    fn save_templates(&mut self, templates: &[Template]) -> Result<(), StorageError>;

    /// Moves the stored projects out of the way. Returns where they went.
    fn set_aside_projects(&mut self) -> Result<Option<PathBuf>, StorageError> {
        Ok(None)
    }

    fn set_aside_templates(&mut self) -> Result<Option<PathBuf>, StorageError> {
        Ok(None)
    }
}

/// JSON files in one directory, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonStore { dir: dir.into() }
    }

    /// A store in the application directory.
    pub fn in_app_dir() -> Result<Self, StorageError> {
        Ok(JsonStore::new(AppDirs::resolve()?.root()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, file: AppFile) -> PathBuf {
        self.dir.join(file.file_name())
    }

    fn read<T: DeserializeOwned>(&self, file: AppFile) -> Result<Option<T>, StorageError> {
        let path = self.path_of(file);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Decode { path, source })
    }

    fn write<T: Serialize + ?Sized>(&self, file: AppFile, value: &T) -> Result<(), StorageError> {
        let path = self.path_of(file);
        let data = serde_json::to_vec_pretty(value)?;
        write_atomic(&path, &data).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;
        debug!("Saved {}", path.display());
        Ok(())
    }

    /// Renames `file` to its backup name, replacing an older backup.
    fn set_aside(&self, file: AppFile) -> Result<Option<PathBuf>, StorageError> {
        let path = self.path_of(file);
        let backup = self.dir.join(file.backup_name());
        match std::fs::rename(&path, &backup) {
            Ok(()) => {
                warn!("Moved unreadable {} to {}", path.display(), backup.display());
                Ok(Some(backup))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Write { path, source }),
        }
    }
}

impl Persistence for JsonStore {
    fn load_projects(&self) -> Result<Option<Vec<Project>>, StorageError> {
        self.read(AppFile::Projects)
    }

    fn save_projects(&mut self, projects: &[Project]) -> Result<(), StorageError> {
        self.write(AppFile::Projects, projects)
    }

    fn load_templates(&self) -> Result<Option<Vec<Template>>, StorageError> {
        self.read(AppFile::Templates)
    }

    fn save_templates(&mut self, templates: &[Template]) -> Result<(), StorageError> {
        self.write(AppFile::Templates, templates)
    }

    fn set_aside_projects(&mut self) -> Result<Option<PathBuf>, StorageError> {
        self.set_aside(AppFile::Projects)
    }

    fn set_aside_templates(&mut self) -> Result<Option<PathBuf>, StorageError> {
        self.set_aside(AppFile::Templates)
    }
}

#[derive(Debug, Default)]
pub struct MemoryContents {
    pub projects: Option<Vec<Project>>,
    pub templates: Option<Vec<Template>>,
    pub project_saves: usize,
    pub template_saves: usize,
}

/// Keeps everything in memory. Clones share the same contents so a test can
/// hand one to the editor and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Rc<RefCell<MemoryContents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> std::cell::Ref<'_, MemoryContents> {
        self.contents.borrow()
    }
}

impl Persistence for MemoryStore {
    fn load_projects(&self) -> Result<Option<Vec<Project>>, StorageError> {
        Ok(self.contents.borrow().projects.clone())
    }

    fn save_projects(&mut self, projects: &[Project]) -> Result<(), StorageError> {
        let mut contents = self.contents.borrow_mut();
        contents.projects = Some(projects.to_vec());
        contents.project_saves += 1;
        Ok(())
    }

    fn load_templates(&self) -> Result<Option<Vec<Template>>, StorageError> {
        Ok(self.contents.borrow().templates.clone())
    }

    fn save_templates(&mut self, templates: &[Template]) -> Result<(), StorageError> {
        let mut contents = self.contents.borrow_mut();
        contents.templates = Some(templates.to_vec());
        contents.template_saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::segment::{Rgb, Segment};
    use tempfile::tempdir;

    #[test]
    fn test_empty_dir_has_nothing_stored() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        assert!(store.load_projects().unwrap().is_none());
        assert!(store.load_templates().unwrap().is_none());
    }

    #[test]
    fn test_projects_survive_a_save() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::new(dir.path());
        let mut project = Project::new("Trailer");
        let id = project
            .segments
            .add(Segment::new(2.0, 3.0, "Logo", Rgb::new(1, 2, 3)).with_remarks("fade in"));
        store.save_projects(&[project.clone()]).unwrap();

        let loaded = store.load_projects().unwrap().unwrap();
        assert_eq!(loaded, vec![project]);
        let segment = loaded[0].segments.get(id).unwrap();
        assert_eq!(segment.remarks, "fade in");
    }

    #[test]
    fn test_templates_survive_a_save() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::new(dir.path());
        store.save_templates(&Template::defaults()).unwrap();
        assert_eq!(store.load_templates().unwrap().unwrap(), Template::defaults());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("projects.json"), "{ not json").unwrap();
        let store = JsonStore::new(dir.path());
        assert!(matches!(
            store.load_projects(),
            Err(StorageError::Decode { .. })
        ));
    }

    #[test]
    fn test_set_aside_keeps_the_unreadable_bytes() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::new(dir.path());
        assert_eq!(store.set_aside_templates().unwrap(), None);

        std::fs::write(store.path_of(AppFile::Templates), "[{ broken").unwrap();
        let backup = store.set_aside_templates().unwrap().unwrap();
        assert_eq!(backup, dir.path().join("templates.json.bak"));
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "[{ broken");
        assert!(store.load_templates().unwrap().is_none());
    }

    #[test]
    fn test_memory_store_shares_contents_between_clones() {
        let store = MemoryStore::new();
        let mut handle = store.clone();
        handle.save_projects(&[Project::demo()]).unwrap();
        assert_eq!(store.contents().project_saves, 1);
        assert_eq!(store.load_projects().unwrap().unwrap()[0].id, "demo");
    }
}

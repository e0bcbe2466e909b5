//! The `.cuelike` directory: `config.toml`, `projects.json`,
//! `templates.json`, backups of files that could not be read, and `logs/`.
//!
//! It lives under the OS config directory unless `CUELIKE_CONFIG_HOME` names
//! another base.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

pub const APP_DIR_NAME: &str = ".cuelike";
pub const CONFIG_HOME_ENV: &str = "CUELIKE_CONFIG_HOME";
const LOGS_DIR_NAME: &str = "logs";

/// Files the editor keeps directly in the application directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFile {
    Config,
    Projects,
    Templates,
}

impl AppFile {
    pub fn file_name(self) -> &'static str {
        match self {
            AppFile::Config => "config.toml",
            AppFile::Projects => "projects.json",
            AppFile::Templates => "templates.json",
        }
    }

    /// Name an unreadable copy is moved to before the file is written again.
    pub fn backup_name(self) -> String {
        format!("{}.bak", self.file_name())
    }
}

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A resolved `.cuelike` directory. The directory exists once this is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Resolves the directory from the environment, creating it if needed.
    pub fn resolve() -> Result<Self, AppDirError> {
        let env = std::env::var(CONFIG_HOME_ENV).ok();
        let base = base_dir(env.as_deref()).ok_or(AppDirError::NoBaseDir)?;
        Self::under(&base)
    }

    /// The `.cuelike` directory inside `base`.
    pub fn under(base: &Path) -> Result<Self, AppDirError> {
        Ok(AppDirs {
            root: ensure_dir(base.join(APP_DIR_NAME))?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file(&self, file: AppFile) -> PathBuf {
        self.root.join(file.file_name())
    }

    pub fn logs(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join(LOGS_DIR_NAME))
    }
}

/// Picks the base the `.cuelike` directory goes under. A blank override is
/// treated as unset.
fn base_dir(env_override: Option<&str>) -> Option<PathBuf> {
    match env_override.map(str::trim) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()),
    }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

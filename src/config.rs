//! `config.toml`: timeline zoom and playback timing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use crate::app_dirs::{AppDirError, AppDirs, AppFile};
use crate::renderer::playback_watcher::{END_TOLERANCE_SECS, WatcherConfig};
use crate::types::session::DEFAULT_SCALE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config directory unavailable: {0}")]
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
    #[error("Invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scale_px_per_sec: f64,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub poll_interval_ms: u64,
    pub grace_delay_ms: u64,
    pub end_tolerance_secs: f64,
    pub stream_poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            scale_px_per_sec: DEFAULT_SCALE,
            playback: PlaybackConfig::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            poll_interval_ms: 120,
            grace_delay_ms: 150,
            end_tolerance_secs: END_TOLERANCE_SECS,
            stream_poll_interval_ms: 200,
        }
    }
}

impl PlaybackConfig {
    pub fn watcher(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            grace_delay: Duration::from_millis(self.grace_delay_ms),
            end_tolerance: if self.end_tolerance_secs.is_finite() {
                self.end_tolerance_secs.max(0.0)
            } else {
                END_TOLERANCE_SECS
            },
        }
    }

    pub fn stream_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stream_poll_interval_ms.max(1))
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(AppDirs::resolve()?.file(AppFile::Config))
}

/// Reads the config for this session and decides where changes go.
///
/// A missing file yields defaults and keeps `path` as the save target. A file
/// that cannot be read or parsed also yields defaults, but no save target, so
/// the user's hand edits survive until they fix them.
pub fn load_session(path: &Path) -> (AppConfig, Option<PathBuf>) {
    match load_from(path) {
        Ok(Some(config)) => (config, Some(path.to_path_buf())),
        Ok(None) => (AppConfig::default(), Some(path.to_path_buf())),
        Err(err) => {
            warn!("{err}; using default settings and leaving the file untouched");
            (AppConfig::default(), None)
        }
    }
}

/// Returns `Ok(None)` when there is no file at `path`.
pub fn load_from(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&text)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes the config through a temp file in the same directory so a crash
/// never leaves a half-written file behind.
pub fn save_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    let data = toml::to_string_pretty(config)?;
    write_atomic(path, data.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(AppFile::Config.file_name());
        assert!(load_from(&path).unwrap().is_none());
        let (config, save_to_path) = load_session(&path);
        assert_eq!(save_to_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.scale_px_per_sec, 60.0);
        assert_eq!(config.playback.poll_interval_ms, 120);
        assert_eq!(config.playback.grace_delay_ms, 150);
        assert_eq!(config.playback.stream_poll_interval_ms, 200);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(AppFile::Config.file_name());
        std::fs::write(&path, "scale_px_per_sec = 90.0\n[playback]\ngrace_delay_ms = 300\n").unwrap();
        let config = load_from(&path).unwrap().unwrap();
        assert_eq!(config.scale_px_per_sec, 90.0);
        assert_eq!(config.playback.grace_delay_ms, 300);
        assert_eq!(config.playback.poll_interval_ms, 120);
        assert_eq!(
            config.playback.watcher().grace_delay,
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_malformed_file_is_reported_and_defaulted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(AppFile::Config.file_name());
        std::fs::write(&path, "scale_px_per_sec = \"wide\"").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse { .. })));
        let (config, save_to_path) = load_session(&path);
        assert_eq!(config, AppConfig::default());
        assert_eq!(save_to_path, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(AppFile::Config.file_name());
        let mut config = AppConfig::default();
        config.scale_px_per_sec = 125.0;
        config.playback.end_tolerance_secs = 0.1;
        save_to(&config, &path).unwrap();
        assert_eq!(load_from(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_watcher_defaults_match_playback_constants() {
        assert_eq!(PlaybackConfig::default().watcher(), WatcherConfig::default());
    }
}

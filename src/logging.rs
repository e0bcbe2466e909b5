//! Tracing setup: a stdout layer plus one log file per launch in the
//! application's `logs` directory, keeping only the newest few files.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use thiserror::Error;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{AppDirError, AppDirs};

const KEEP_LOG_FILES: usize = 10;
const LOG_PREFIX: &str = "cuelike";
const DEFAULT_FILTER: &str = "info";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Log directory unavailable: {0}")]
    Dir(#[from] AppDirError),
    #[error("Failed to list log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove old log file {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file name: {0}")]
    FileName(#[from] time::error::Format),
    #[error("Failed to install tracing subscriber: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs the global subscriber. Calling it again is a no-op.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init() -> Result<PathBuf, LoggingError> {
    let dir = AppDirs::resolve()?.logs()?;
    let file_name = log_file_name(OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()))?;
    let path = dir.join(&file_name);
    if FILE_GUARD.get().is_some() {
        return Ok(path);
    }

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&dir, &file_name));
    prune_logs(&dir, KEEP_LOG_FILES)?;

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    const STAMP: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let timer = fmt::time::OffsetTime::new(offset, STAMP);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_timer(timer.clone()).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = FILE_GUARD.set(guard);

    tracing::info!("Logging to {}", path.display());
    Ok(path)
}

fn log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    Ok(format!("{LOG_PREFIX}_{}.log", now.format(NAME)?))
}

/// Deletes the oldest `.log` files in `dir` until at most `keep` remain.
fn prune_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let read_dir = fs::read_dir(dir).map_err(|source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut logs: Vec<(SystemTime, PathBuf)> = read_dir
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "log"))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    if logs.len() <= keep {
        return Ok(());
    }
    logs.sort_by_key(|(modified, _)| *modified);
    let excess = logs.len() - keep;
    for (_, path) in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::Remove { path, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    #[test]
    fn test_log_file_name_is_timestamped() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(log_file_name(fixed).unwrap(), "cuelike_2023-11-14_22-13-20.log");
    }

    #[test]
    fn test_prune_keeps_newest_logs() {
        let dir = tempdir().unwrap();
        for idx in 0..13 {
            fs::write(dir.path().join(format!("cuelike_{idx:02}.log")), b"").unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        prune_logs(dir.path(), 10).unwrap();
        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 11);
        assert!(remaining.contains(&"notes.txt".to_string()));
        assert!(!remaining.contains(&"cuelike_00.log".to_string()));
        assert!(remaining.contains(&"cuelike_12.log".to_string()));
    }
}

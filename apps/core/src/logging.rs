use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::error;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "quarry.log";
const ARCHIVE_PREFIX: &str = "quarry-";
const MAX_LOG_BYTES: u64 = 1_000_000;
const MAX_ARCHIVES: usize = 5;

static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("log file error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn logs_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Routes `tracing` output to `<data_dir>/logs/quarry.log`. Calling it again
/// after a subscriber is installed leaves the existing one in place.
pub fn init(data_dir: &Path) -> Result<PathBuf, LoggingError> {
    let log_dir = logs_dir(data_dir);
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LoggingError::Io { path, source }
    };

    fs::create_dir_all(&log_dir).map_err(io_err(&log_dir))?;
    let log_path = log_dir.join(LOG_FILE_NAME);
    rotate_if_needed(&log_path, &log_dir).map_err(io_err(&log_path))?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(io_err(&log_path))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    install_panic_hook();
    Ok(log_path)
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn rotate_if_needed(log_path: &Path, log_dir: &Path) -> Result<(), std::io::Error> {
    let meta = match fs::metadata(log_path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    if meta.len() < MAX_LOG_BYTES {
        return Ok(());
    }

    let archived = log_dir.join(format!("{ARCHIVE_PREFIX}{}.log", now_secs()));
    fs::rename(log_path, archived)?;
    prune_old_archives(log_dir)?;
    Ok(())
}

fn prune_old_archives(log_dir: &Path) -> Result<(), std::io::Error> {
    let mut archives = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(ARCHIVE_PREFIX) && n.ends_with(".log"))
        })
        .collect::<Vec<_>>();

    archives.sort();
    let excess = archives.len().saturating_sub(MAX_ARCHIVES);
    for oldest in archives.drain(..excess) {
        let _ = fs::remove_file(oldest);
    }
    Ok(())
}

fn install_panic_hook() {
    let _ = PANIC_HOOK_INSTALLED.get_or_init(|| {
        let prior = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let location = panic_info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown".to_string());
            let payload = panic_info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic payload unavailable".to_string());
            error!(%location, %payload, "panic");
            prior(panic_info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{prune_old_archives, rotate_if_needed, MAX_ARCHIVES, MAX_LOG_BYTES};

    #[test]
    fn small_log_is_not_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("quarry.log");
        fs::write(&log, b"short").unwrap();

        rotate_if_needed(&log, dir.path()).unwrap();
        assert!(log.exists());
    }

    #[test]
    fn oversized_log_is_archived() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("quarry.log");
        fs::write(&log, vec![b'x'; MAX_LOG_BYTES as usize]).unwrap();

        rotate_if_needed(&log, dir.path()).unwrap();
        assert!(!log.exists());
        let archived = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(archived, 1);
    }

    #[test]
    fn keeps_newest_archives() {
        let dir = tempfile::tempdir().unwrap();
        for stamp in 100..108 {
            fs::write(dir.path().join(format!("quarry-{stamp}.log")), b"old").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), b"keep").unwrap();

        prune_old_archives(dir.path()).unwrap();

        assert!(!dir.path().join("quarry-100.log").exists());
        assert!(dir.path().join("quarry-107.log").exists());
        assert!(dir.path().join("unrelated.txt").exists());
        let remaining = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("quarry-"))
            .count();
        assert_eq!(remaining, MAX_ARCHIVES);
    }
}

//! Live identifier -> path index for a directory subtree.
//!
//! The index is filled from an enumeration pass at startup and then kept
//! current by two background threads: one applies watch events, the other
//! runs debounced consistency sweeps. Remove and rename events never delete
//! entries directly; they only schedule a sweep that stats every known path.

pub mod debounce;
pub mod enumerate;
pub mod watch;

use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, info};

use self::debounce::{DebounceTimings, Debouncer};
use self::watch::{FsEvent, NotifyWatchSet, WatchSet};

/// Change times older than this at startup are stored as unset.
pub const STALENESS_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("failed to enumerate '{root}': {source}")]
    Enumerate {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("filesystem watch failed: {0}")]
    Watch(#[from] notify::Error),
    #[error("failed to spawn indexer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndexEntry {
    pub identifier: String,
    pub path: String,
    /// `None` when the path has not changed recently.
    pub changed: Option<SystemTime>,
}

impl FileIndexEntry {
    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }

    pub fn file_name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        trimmed
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(trimmed)
    }

    pub fn parent(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) => "/",
            Some(index) => &trimmed[..index],
            None => "",
        }
    }
}

/// Stable identifier for an index path: hex blake3 digest of the path text.
pub fn path_identifier(path: &str) -> String {
    blake3::hash(path.as_bytes()).to_hex().to_string()
}

/// Path text as stored in the index; directories carry a trailing `/`.
pub fn index_path(path: &Path, is_dir: bool) -> String {
    let mut text = path.to_string_lossy().into_owned();
    if is_dir && !text.ends_with('/') {
        text.push('/');
    }
    text
}

#[cfg(unix)]
pub fn change_time(meta: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;

    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
pub fn change_time(meta: &Metadata) -> Option<SystemTime> {
    meta.modified().ok()
}

/// Change time kept for a path seen during the startup pass.
pub fn startup_change_time(changed: Option<SystemTime>, t0: SystemTime) -> Option<SystemTime> {
    let changed = changed?;
    match t0.duration_since(changed) {
        Ok(age) if age > STALENESS_WINDOW => None,
        _ => Some(changed),
    }
}

/// Shared handle to the index map. Every read and write goes through the
/// same lock.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    entries: Arc<Mutex<HashMap<String, FileIndexEntry>>>,
    sweeps: Arc<AtomicUsize>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, path: String, changed: Option<SystemTime>) -> String {
        let identifier = path_identifier(&path);
        let mut entries = self.entries.lock();
        match entries.get_mut(&identifier) {
            Some(entry) => entry.changed = changed,
            None => {
                entries.insert(
                    identifier.clone(),
                    FileIndexEntry {
                        identifier: identifier.clone(),
                        path,
                        changed,
                    },
                );
            }
        }
        identifier
    }

    pub fn get(&self, identifier: &str) -> Option<FileIndexEntry> {
        self.entries.lock().get(identifier).cloned()
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.entries.lock().contains_key(&path_identifier(path))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copies the entries out so callers can rank without holding the lock.
    pub fn snapshot(&self) -> Vec<FileIndexEntry> {
        self.entries.lock().values().cloned().collect()
    }

    /// Drops every entry whose path no longer stats. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| std::fs::metadata(&entry.path).is_ok());
        let removed = before - entries.len();
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        drop(entries);

        info!(removed, "index sweep finished");
        removed
    }

    pub fn sweep_count(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub root: PathBuf,
    pub timings: DebounceTimings,
}

impl IndexerOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            timings: DebounceTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: DebounceTimings) -> Self {
        self.timings = timings;
        self
    }
}

/// Owns the watch set and the background threads feeding a [`FileIndex`].
/// Dropping it stops the watcher; both threads exit once their channels close.
pub struct FileIndexer {
    index: FileIndex,
    watches: Arc<Mutex<Box<dyn WatchSet>>>,
}

impl FileIndexer {
    /// Enumerates `options.root`, starts watching it with the platform
    /// watcher, and spawns the maintenance threads.
    pub fn start(options: IndexerOptions) -> Result<Self, IndexerError> {
        let t0 = SystemTime::now();
        let paths = enumerate::list_paths(&options.root)?;
        let (event_tx, event_rx) = mpsc::channel();
        let watches = NotifyWatchSet::new(event_tx)?;
        Self::start_with(&options.root, paths, Box::new(watches), event_rx, options.timings, t0)
    }

    /// Same as [`FileIndexer::start`] with the enumeration result, watch set
    /// and event stream supplied by the caller.
    pub fn start_with(
        root: &Path,
        paths: Vec<PathBuf>,
        watches: Box<dyn WatchSet>,
        events: Receiver<FsEvent>,
        timings: DebounceTimings,
        t0: SystemTime,
    ) -> Result<Self, IndexerError> {
        let started = Instant::now();
        let index = FileIndex::new();
        let watches = Arc::new(Mutex::new(watches));

        watches.lock().watch(root)?;

        let (signal_tx, signal_rx) = mpsc::sync_channel::<()>(1);

        let sweeper_index = index.clone();
        thread::Builder::new()
            .name("index-sweeper".to_string())
            .spawn(move || run_debounce(signal_rx, sweeper_index, timings))
            .map_err(IndexerError::Spawn)?;

        let events_index = index.clone();
        let weak_watches = Arc::downgrade(&watches);
        thread::Builder::new()
            .name("index-events".to_string())
            .spawn(move || run_events(events, events_index, weak_watches, signal_tx))
            .map_err(IndexerError::Spawn)?;

        for path in paths {
            let Ok(meta) = std::fs::metadata(&path) else {
                debug!(path = %path.display(), "skipping path that failed to stat");
                continue;
            };
            if meta.is_dir() {
                if let Err(error) = watches.lock().watch(&path) {
                    debug!(path = %path.display(), %error, "failed to watch directory");
                }
            }
            let changed = startup_change_time(change_time(&meta), t0);
            index.upsert(index_path(&path, meta.is_dir()), changed);
        }

        info!(
            root = %root.display(),
            entries = index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "file index ready"
        );

        Ok(Self { index, watches })
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    pub fn sweep(&self) -> usize {
        self.index.sweep()
    }

    pub fn sweep_count(&self) -> usize {
        self.index.sweep_count()
    }

    pub fn watch(&self, dir: &Path) -> Result<(), IndexerError> {
        self.watches.lock().watch(dir)
    }
}

fn run_events(
    events: Receiver<FsEvent>,
    index: FileIndex,
    watches: Weak<Mutex<Box<dyn WatchSet>>>,
    signal: SyncSender<()>,
) {
    while let Ok(event) = events.recv() {
        apply_event(&event, &index, &watches, &signal);
    }
    debug!("watch event stream closed");
}

fn apply_event(
    event: &FsEvent,
    index: &FileIndex,
    watches: &Weak<Mutex<Box<dyn WatchSet>>>,
    signal: &SyncSender<()>,
) {
    if event.kind.is_deletion_adjacent() {
        // Blocks only while the sweeper holds an unread signal.
        let _ = signal.send(());
    }

    let Ok(meta) = std::fs::metadata(&event.path) else {
        return;
    };

    if meta.is_dir() {
        if let Some(watches) = watches.upgrade() {
            if let Err(error) = watches.lock().watch(&event.path) {
                debug!(path = %event.path.display(), %error, "failed to watch directory");
            }
        }
    }

    index.upsert(index_path(&event.path, meta.is_dir()), change_time(&meta));
}

fn run_debounce(signals: Receiver<()>, index: FileIndex, timings: DebounceTimings) {
    let mut debouncer = Debouncer::new(timings);

    loop {
        let received = match debouncer.deadline() {
            None => signals.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => {
                signals.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
        };

        match received {
            Ok(()) => {
                debouncer.signal(Instant::now());
            }
            Err(RecvTimeoutError::Timeout) => {
                if debouncer.poll(Instant::now()) {
                    index.sweep();
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("index sweeper stopped");
                return;
            }
        }
    }
}

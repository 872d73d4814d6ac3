use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

use super::IndexerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    /// Created, modified, or renamed into place.
    Changed,
    Removed,
    /// A rename whose direction is unknown, or away from this path.
    Renamed,
}

impl FsEventKind {
    pub fn is_deletion_adjacent(self) -> bool {
        matches!(self, Self::Removed | Self::Renamed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Set of watched directories that can grow while events are flowing.
pub trait WatchSet: Send {
    fn watch(&mut self, dir: &Path) -> Result<(), IndexerError>;
}

pub struct NotifyWatchSet {
    watcher: RecommendedWatcher,
}

impl NotifyWatchSet {
    pub fn new(events: Sender<FsEvent>) -> Result<Self, IndexerError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for translated in translate(event) {
                    if events.send(translated).is_err() {
                        return;
                    }
                }
            }
            Err(error) => warn!(%error, "filesystem watch error"),
        })
        .map_err(IndexerError::Watch)?;

        Ok(Self { watcher })
    }
}

impl WatchSet for NotifyWatchSet {
    fn watch(&mut self, dir: &Path) -> Result<(), IndexerError> {
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(IndexerError::Watch)
    }
}

pub fn translate(event: Event) -> Vec<FsEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => FsEventKind::Changed,
        EventKind::Remove(_) => FsEventKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                out.push(FsEvent::new(FsEventKind::Renamed, from));
            }
            if let Some(to) = paths.next() {
                out.push(FsEvent::new(FsEventKind::Changed, to));
            }
            return out;
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => FsEventKind::Changed,
        EventKind::Modify(ModifyKind::Name(_)) => FsEventKind::Renamed,
        EventKind::Modify(_) => FsEventKind::Changed,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|path| FsEvent::new(kind, path))
        .collect()
}

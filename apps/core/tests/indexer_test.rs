use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use quarry_core::indexer::debounce::DebounceTimings;
use quarry_core::indexer::enumerate::list_paths;
use quarry_core::indexer::watch::{FsEvent, FsEventKind, WatchSet};
use quarry_core::indexer::{
    index_path, path_identifier, FileIndexer, IndexerError, IndexerOptions,
};

#[derive(Clone, Default)]
struct RecordingWatchSet {
    watched: Arc<Mutex<Vec<PathBuf>>>,
}

impl WatchSet for RecordingWatchSet {
    fn watch(&mut self, dir: &Path) -> Result<(), IndexerError> {
        self.watched.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }
}

fn short_timings() -> DebounceTimings {
    DebounceTimings {
        initial: Duration::from_millis(300),
        reset: Duration::from_millis(150),
    }
}

fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    check()
}

fn populated_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("docs/nested")).unwrap();
    std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
    std::fs::write(dir.path().join("docs/Q4_Report.xlsx"), b"x").unwrap();
    std::fs::write(dir.path().join("docs/nested/notes.md"), b"x").unwrap();
    std::fs::write(dir.path().join(".git/HEAD"), b"x").unwrap();
    std::fs::write(dir.path().join("top.txt"), b"x").unwrap();
    dir
}

fn start_fake(
    root: &Path,
    watches: RecordingWatchSet,
) -> (FileIndexer, mpsc::Sender<FsEvent>) {
    let (tx, rx) = mpsc::channel();
    let paths = list_paths(root).unwrap();
    let indexer = FileIndexer::start_with(
        root,
        paths,
        Box::new(watches),
        rx,
        short_timings(),
        SystemTime::now(),
    )
    .unwrap();
    (indexer, tx)
}

#[test]
fn enumeration_skips_version_control_dirs() {
    let dir = populated_tree();
    let paths = list_paths(dir.path()).unwrap();

    assert!(paths.iter().any(|p| p.ends_with("docs/nested/notes.md")));
    assert!(paths.iter().any(|p| p.ends_with("docs")));
    assert!(paths.iter().all(|p| !p.to_string_lossy().contains(".git")));
}

#[test]
fn enumeration_of_missing_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(
        list_paths(&missing),
        Err(IndexerError::Enumerate { .. })
    ));
}

#[test]
fn startup_indexes_paths_and_watches_directories() {
    let dir = populated_tree();
    let watches = RecordingWatchSet::default();
    let (indexer, _tx) = start_fake(dir.path(), watches.clone());

    let report = dir.path().join("docs/Q4_Report.xlsx");
    let report_id = path_identifier(&index_path(&report, false));
    let entry = indexer.index().get(&report_id).unwrap();
    assert_eq!(entry.file_name(), "Q4_Report.xlsx");
    // Freshly written, so inside the staleness window.
    assert!(entry.changed.is_some());

    let docs = index_path(&dir.path().join("docs"), true);
    assert!(docs.ends_with('/'));
    assert!(indexer.index().contains_path(&docs));

    let watched = watches.watched.lock().unwrap().clone();
    assert_eq!(watched[0], dir.path());
    assert!(watched.contains(&dir.path().join("docs")));
    assert!(watched.contains(&dir.path().join("docs/nested")));
    assert_eq!(indexer.index().len(), 5);
}

#[test]
fn identifiers_are_stable_across_rebuilds() {
    let dir = populated_tree();
    let (first, _tx1) = start_fake(dir.path(), RecordingWatchSet::default());
    let (second, _tx2) = start_fake(dir.path(), RecordingWatchSet::default());

    let mut a: Vec<(String, String)> = first
        .index()
        .snapshot()
        .into_iter()
        .map(|e| (e.identifier, e.path))
        .collect();
    let mut b: Vec<(String, String)> = second
        .index()
        .snapshot()
        .into_iter()
        .map(|e| (e.identifier, e.path))
        .collect();
    a.sort();
    b.sort();

    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn change_events_add_entries_and_watch_new_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let watches = RecordingWatchSet::default();
    let (indexer, tx) = start_fake(dir.path(), watches.clone());
    assert!(indexer.index().is_empty());

    let created = dir.path().join("fresh.txt");
    std::fs::write(&created, b"x").unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();

    tx.send(FsEvent::new(FsEventKind::Changed, &created)).unwrap();
    tx.send(FsEvent::new(FsEventKind::Changed, &sub)).unwrap();

    let created_path = index_path(&created, false);
    let sub_path = index_path(&sub, true);
    assert!(wait_until(Duration::from_secs(3), || {
        indexer.index().contains_path(&created_path) && indexer.index().contains_path(&sub_path)
    }));
    assert!(watches.watched.lock().unwrap().contains(&sub));
    assert_eq!(indexer.sweep_count(), 0);
}

#[test]
fn remove_event_does_not_delete_before_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("doomed.txt");
    std::fs::write(&file, b"x").unwrap();

    let (indexer, tx) = start_fake(dir.path(), RecordingWatchSet::default());
    let path = index_path(&file, false);
    assert!(indexer.index().contains_path(&path));

    std::fs::remove_file(&file).unwrap();
    tx.send(FsEvent::new(FsEventKind::Removed, &file)).unwrap();

    thread::sleep(Duration::from_millis(100));
    assert!(indexer.index().contains_path(&path));

    assert!(wait_until(Duration::from_secs(3), || !indexer
        .index()
        .contains_path(&path)));
    assert_eq!(indexer.sweep_count(), 1);
}

#[test]
fn rename_away_is_swept_after_quiet_period() {
    let dir = tempfile::tempdir().unwrap();
    let draft = dir.path().join("draft.txt");
    let published = dir.path().join("published.txt");
    std::fs::write(&draft, b"x").unwrap();

    let (indexer, tx) = start_fake(dir.path(), RecordingWatchSet::default());
    let draft_path = index_path(&draft, false);
    let published_path = index_path(&published, false);
    assert!(indexer.index().contains_path(&draft_path));

    std::fs::rename(&draft, &published).unwrap();
    tx.send(FsEvent::new(FsEventKind::Renamed, &draft)).unwrap();
    tx.send(FsEvent::new(FsEventKind::Changed, &published)).unwrap();

    assert!(wait_until(Duration::from_secs(1), || indexer
        .index()
        .contains_path(&published_path)));
    assert!(indexer.index().contains_path(&draft_path));
    assert_eq!(indexer.sweep_count(), 0);

    assert!(wait_until(Duration::from_secs(3), || !indexer
        .index()
        .contains_path(&draft_path)));
    assert_eq!(indexer.sweep_count(), 1);
    assert!(indexer.index().contains_path(&published_path));
}

#[test]
fn burst_of_removals_triggers_one_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..8)
        .map(|i| {
            let path = dir.path().join(format!("file-{i}.txt"));
            std::fs::write(&path, b"x").unwrap();
            path
        })
        .collect();

    let (indexer, tx) = start_fake(dir.path(), RecordingWatchSet::default());
    assert_eq!(indexer.index().len(), files.len());

    for file in &files {
        std::fs::remove_file(file).unwrap();
        tx.send(FsEvent::new(FsEventKind::Removed, file)).unwrap();
    }

    assert!(wait_until(Duration::from_secs(3), || indexer.sweep_count() >= 1));
    assert!(indexer.index().is_empty());

    thread::sleep(Duration::from_millis(600));
    assert_eq!(indexer.sweep_count(), 1);
}

#[test]
fn direct_sweep_returns_removed_count() {
    let dir = tempfile::tempdir().unwrap();
    let keep = dir.path().join("keep.txt");
    let lose = dir.path().join("lose.txt");
    std::fs::write(&keep, b"x").unwrap();
    std::fs::write(&lose, b"x").unwrap();

    let (indexer, _tx) = start_fake(dir.path(), RecordingWatchSet::default());
    std::fs::remove_file(&lose).unwrap();

    assert_eq!(indexer.sweep(), 1);
    assert_eq!(indexer.sweep_count(), 1);
    assert!(indexer.index().contains_path(&index_path(&keep, false)));
}

#[test]
fn watched_file_deletion_is_swept_with_platform_watcher() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("watched.txt");
    std::fs::write(&file, b"x").unwrap();

    let indexer = FileIndexer::start(
        IndexerOptions::new(dir.path()).with_timings(short_timings()),
    )
    .unwrap();
    let path = index_path(&file, false);
    assert!(indexer.index().contains_path(&path));

    std::fs::remove_file(&file).unwrap();

    assert!(wait_until(Duration::from_secs(10), || !indexer
        .index()
        .contains_path(&path)));
}

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::IndexerError;

const VCS_DIRS: [&str; 5] = [".git", ".hg", ".svn", ".bzr", "_darcs"];

/// Lists every file and directory below `root`, skipping version-control
/// metadata directories. Entries that cannot be read are left out.
pub fn list_paths(root: &Path) -> Result<Vec<PathBuf>, IndexerError> {
    let meta = std::fs::metadata(root).map_err(|source| IndexerError::Enumerate {
        root: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(IndexerError::Enumerate {
            root: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_vcs_dir(entry));

    for entry in walker {
        match entry {
            Ok(entry) => out.push(entry.into_path()),
            Err(error) => debug!(%error, "skipping unreadable entry"),
        }
    }

    Ok(out)
}

fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| VCS_DIRS.contains(&name))
}

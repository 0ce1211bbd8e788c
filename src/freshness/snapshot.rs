//! File-system snapshots of the nested build's dependencies.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::hash::{ContentHash, compute_file_hash};
use super::mtime::{get_mtime, modified_after};
use crate::BoxFuture;

/// Recorded state of one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    Missing,
    Present { mtime: SystemTime, hash: ContentHash },
}

impl FileState {
    fn read(path: &Path) -> Self {
        match (get_mtime(path), compute_file_hash(path)) {
            (Some(mtime), Some(hash)) => Self::Present { mtime, hash },
            _ => Self::Missing,
        }
    }
}

/// Dependency states captured after a nested build.
#[derive(Debug, Clone)]
pub struct DependencySnapshot {
    pub files: BTreeMap<PathBuf, FileState>,
    /// When the build that produced the snapshot started.
    pub started: SystemTime,
    /// False when a dependency changed while the build was running.
    pub valid: bool,
}

impl DependencySnapshot {
    /// Capture `files` synchronously.
    pub fn capture(started: SystemTime, files: &BTreeSet<PathBuf>) -> Self {
        let mut valid = true;
        let files = files
            .iter()
            .map(|path| {
                if modified_after(path, started) {
                    crate::debug!("cache"; "{} changed during build", path.display());
                    valid = false;
                }
                (path.clone(), FileState::read(path))
            })
            .collect();

        Self {
            files,
            started,
            valid,
        }
    }

    /// Whether every recorded file still matches. An mtime change alone is
    /// not enough; the content has to differ.
    pub fn is_current(&self) -> bool {
        self.valid
            && self.files.iter().all(|(path, recorded)| match recorded {
                FileState::Missing => get_mtime(path).is_none(),
                FileState::Present { mtime, hash } => match get_mtime(path) {
                    None => false,
                    Some(now) if now == *mtime => true,
                    Some(_) => compute_file_hash(path).as_ref() == Some(hash),
                },
            })
    }
}

/// Host file-system collaborator used by the template cache.
pub trait FileSystemInfo: Send + Sync {
    fn create_snapshot<'a>(
        &'a self,
        started: SystemTime,
        files: &'a BTreeSet<PathBuf>,
    ) -> BoxFuture<'a, DependencySnapshot>;

    fn check_snapshot<'a>(&'a self, snapshot: &'a DependencySnapshot) -> BoxFuture<'a, bool>;
}

/// [`FileSystemInfo`] over the local disk, hashing on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSnapshotter;

impl FileSystemInfo for FsSnapshotter {
    fn create_snapshot<'a>(
        &'a self,
        started: SystemTime,
        files: &'a BTreeSet<PathBuf>,
    ) -> BoxFuture<'a, DependencySnapshot> {
        let owned = files.clone();
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || DependencySnapshot::capture(started, &owned))
                .await
            {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    crate::debug!("cache"; "spawn_blocking error: {}", e);
                    DependencySnapshot {
                        files: BTreeMap::new(),
                        started,
                        valid: false,
                    }
                }
            }
        })
    }

    fn check_snapshot<'a>(&'a self, snapshot: &'a DependencySnapshot) -> BoxFuture<'a, bool> {
        let snapshot = snapshot.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || snapshot.is_current())
                .await
                .unwrap_or(false)
        })
    }
}

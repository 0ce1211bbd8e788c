//! Modification times.

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Whether `path` was modified after `instant`.
///
/// Missing files are never newer.
pub fn modified_after(path: &Path, instant: SystemTime) -> bool {
    get_mtime(path).is_some_and(|mtime| mtime > instant)
}

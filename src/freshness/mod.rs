//! Freshness detection for the nested template build.
//!
//! A [`DependencySnapshot`] records every file the nested build read
//! (mtime + blake3 content hash, or absence). The next build asks the
//! [`FileSystemInfo`] collaborator whether the snapshot still holds.

mod hash;
pub mod mtime;
mod snapshot;

pub use hash::{ContentHash, compute_file_hash, hash_bytes};
pub use snapshot::{DependencySnapshot, FileState, FileSystemInfo, FsSnapshotter};

//! Entry selection and ordering.
//!
//! - [`filter_chunks`]: include list first, exclude list second
//! - [`sort`]: `none`, `manual` or comparator ordering of the survivors

pub mod sort;

pub use sort::{EntrySort, sort_entries};

use crate::config::Chunks;

/// Entries that should appear in a document.
///
/// Keeps the build's entry order; `include` only narrows the set.
pub fn filter_chunks(entries: &[String], include: &Chunks, exclude: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter(|name| match include {
            Chunks::All => true,
            Chunks::Only(list) => list.contains(name),
        })
        .filter(|name| !exclude.contains(name))
        .cloned()
        .collect()
}

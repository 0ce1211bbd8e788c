//! Entry sort policies.

use std::fmt;

use crate::config::{Chunks, ConfigError, EntryComparator, SortMode};

/// Resolved sort policy.
#[derive(Clone)]
pub enum EntrySort {
    /// Keep the incoming order.
    None,
    /// Explicit order, restricted to entries that exist.
    Manual(Vec<String>),
    /// User-supplied total order.
    Custom(EntryComparator),
}

impl EntrySort {
    /// Resolve a configured mode; `manual` takes its order from `chunks`.
    pub fn from_mode(mode: &SortMode, chunks: &Chunks) -> Result<Self, ConfigError> {
        match mode {
            SortMode::Auto | SortMode::None => Ok(Self::None),
            SortMode::Manual => Ok(match chunks {
                Chunks::All => Self::None,
                Chunks::Only(order) => Self::Manual(order.clone()),
            }),
            SortMode::Custom(compare) => Ok(Self::Custom(compare.clone())),
            SortMode::Unknown(name) => Err(ConfigError::UnknownSortMode(name.clone())),
        }
    }
}

impl fmt::Debug for EntrySort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Manual(order) => f.debug_tuple("Manual").field(order).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Order `entries` by `policy`.
///
/// `Manual` drops names that are not among `entries`.
pub fn sort_entries(mut entries: Vec<String>, policy: &EntrySort) -> Vec<String> {
    match policy {
        EntrySort::None => entries,
        EntrySort::Manual(order) => order
            .iter()
            .filter(|name| entries.contains(name))
            .cloned()
            .collect(),
        EntrySort::Custom(compare) => {
            entries.sort_by(|a, b| compare(a, b));
            entries
        }
    }
}

//! Output filename placeholders.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::utils::hash::{HashFunction, digest_hex};

/// `[templatehash]`, `[contenthash]`, with optional `hashType:` prefix,
/// `:digest` and `:length` suffixes.
static HASH_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(?:(\w+):)?(templatehash|contenthash)(?::([a-z]+\d*))?(?::(\d+))?\]").unwrap()
});

pub const DEFAULT_HASH_LENGTH: usize = 20;

/// Replace `[name]` with the entry name.
pub fn expand_entry_name(pattern: &str, entry: &str) -> String {
    pattern.replace("[name]", entry)
}

/// Digest names used in `name` that no [`HashFunction`] answers to.
pub fn unknown_hash_functions(name: &str) -> Vec<String> {
    HASH_PLACEHOLDER
        .captures_iter(name)
        .filter_map(|caps| caps.get(3))
        .map(|m| m.as_str())
        .filter(|digest| HashFunction::from_name(digest).is_none())
        .map(str::to_string)
        .collect()
}

/// Substitute hash placeholders with a digest of `html`.
pub fn resolve_hash_placeholders(name: &str, html: &str) -> String {
    HASH_PLACEHOLDER
        .replace_all(name, |caps: &Captures<'_>| {
            let function = caps
                .get(3)
                .and_then(|m| HashFunction::from_name(m.as_str()))
                .unwrap_or_default();
            let digest = digest_hex(function, html.as_bytes());
            let length = caps
                .get(4)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(DEFAULT_HASH_LENGTH)
                .min(digest.len());
            digest[..length].to_string()
        })
        .into_owned()
}

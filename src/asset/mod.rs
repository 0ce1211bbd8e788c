//! Asset references for one output document.
//!
//! # Module Structure
//!
//! ```text
//! asset/
//! ├── favicon    # Copy the favicon into the output once per build
//! └── mod.rs     # AssetBundle, public path, URL building
//! ```

mod favicon;

pub use favicon::emit_favicon;

use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use crate::compilation::Compilation;
use crate::config::PublicPath;

/// Characters left unescaped in a URL path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const MANIFEST_EXTENSION: &str = ".appcache";

/// Asset URLs exposed to hooks and templates (`htmlPlugin.files`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBundle {
    pub public_path: String,
    pub js: Vec<String>,
    pub css: Vec<String>,
    pub manifest: Option<String>,
    pub favicon: Option<String>,
}

impl AssetBundle {
    /// Cache key for the per-document output cache.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================================
// Public Path
// ============================================================================

/// Prefix for the asset URLs of the document written to `output_name`.
///
/// An explicit option wins, then the build's declared public path, then a
/// path from the document's directory back to the output root.
pub fn resolve_public_path(option: &PublicPath, declared: Option<&str>, output_name: &str) -> String {
    let mut prefix = match (option, declared) {
        (PublicPath::Explicit(prefix), _) => prefix.clone(),
        (PublicPath::Auto, Some(declared)) if declared != "auto" => declared.to_string(),
        (PublicPath::Auto, _) => relative_to_root(output_name),
    };

    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

fn relative_to_root(output_name: &str) -> String {
    let depth = Path::new(output_name)
        .parent()
        .map(|dir| {
            dir.components()
                .filter(|c| matches!(c, std::path::Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    vec![".."; depth].join("/")
}

// ============================================================================
// URLs
// ============================================================================

/// Percent-encode each path segment, keeping any query string.
pub fn encode_path(file: &str) -> String {
    let (path, query) = match file.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (file, None),
    };

    let mut encoded = path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");

    if let Some(query) = query {
        encoded.push('?');
        encoded.push_str(query);
    }
    encoded
}

/// Append the build hash as a query parameter.
pub fn append_hash(url: &str, hash: &str) -> String {
    if hash.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{hash}")
}

/// Public URL of an output file.
pub fn asset_url(public_path: &str, file: &str, hash: Option<&str>) -> String {
    let url = format!("{public_path}{}", encode_path(file));
    match hash {
        Some(hash) => append_hash(&url, hash),
        None => url,
    }
}

fn extension_of(file: &str) -> &str {
    let path = file.split_once('?').map_or(file, |(path, _)| path);
    path.rsplit_once('.').map_or("", |(_, ext)| ext)
}

// ============================================================================
// Collection
// ============================================================================

/// Script and style URLs for `entry_names`, in entry order.
///
/// Files shared between entries appear once; hot-update chunks and
/// unrecognized extensions are skipped.
pub fn collect_assets(
    compilation: &Compilation,
    entry_names: &[String],
    public_path: &str,
    append_build_hash: bool,
) -> AssetBundle {
    let hash = append_build_hash.then_some(compilation.hash.as_str());
    let mut bundle = AssetBundle {
        public_path: public_path.to_string(),
        ..AssetBundle::default()
    };

    for name in entry_names {
        for file in compilation.entry_files(name) {
            if file.contains(".hot-update.js") {
                continue;
            }
            let target = match extension_of(file) {
                "js" | "mjs" => &mut bundle.js,
                "css" => &mut bundle.css,
                _ => continue,
            };
            let url = asset_url(public_path, file, hash);
            if !target.contains(&url) {
                target.push(url);
            }
        }
    }

    bundle.manifest = compilation
        .asset_names()
        .into_iter()
        .find(|name| name.ends_with(MANIFEST_EXTENSION))
        .map(|name| asset_url(public_path, &name, hash));

    bundle
}

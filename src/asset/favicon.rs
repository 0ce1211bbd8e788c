//! Favicon copying.

use std::path::{Component, Path, PathBuf};

use super::asset_url;
use crate::compilation::Compilation;
use crate::error::HtmlError;

/// Copy `favicon` (relative to `context`) into the output and return its URL.
///
/// The file is emitted under its path relative to `context`, once per build,
/// so two icons with the same basename in different directories stay apart.
pub async fn emit_favicon(
    compilation: &Compilation,
    context: &Path,
    favicon: &Path,
    public_path: &str,
    append_build_hash: bool,
) -> Result<String, HtmlError> {
    let source = context.join(favicon);
    let name = output_name(context, &source);

    if !compilation.has_asset(&name) {
        let content = read(source.clone()).await.map_err(|source_err| HtmlError::AssetLoad {
            path: source,
            source: source_err,
        })?;
        compilation.emit_asset(name.as_str(), content);
        crate::debug!("html"; "copied favicon `{}`", name);
    }

    let hash = append_build_hash.then_some(compilation.hash.as_str());
    Ok(asset_url(public_path, &name, hash))
}

/// Output name of the favicon at `source`.
///
/// Parent and root components are dropped; an icon outside `context` is
/// named by its basename.
fn output_name(context: &Path, source: &Path) -> String {
    let relative = match source.strip_prefix(context) {
        Ok(relative) => relative,
        Err(_) => Path::new(source.file_name().unwrap_or(source.as_os_str())),
    };

    let name = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    match name.is_empty() {
        true => source.display().to_string(),
        false => name,
    }
}

async fn read(path: PathBuf) -> std::io::Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || std::fs::read(path))
        .await
        .map_err(std::io::Error::other)?
}

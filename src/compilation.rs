//! Host build instance.
//!
//! [`Compilation`] is the slice of the host bundler's build that document
//! generation needs: entry points with their output files, output location,
//! public path, build hash, and the emitted-assets map documents are added to.
//! [`BuildContext`] scopes per-build state (the hook set) to one compilation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::hooks::HtmlHooks;

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    #[inline]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// A named entry point and its output files, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entrypoint {
    pub name: String,
    pub files: Vec<String>,
}

impl Entrypoint {
    pub fn new<I, S>(name: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// One run of the host bundler.
#[derive(Debug, Default)]
pub struct Compilation {
    pub hash: String,
    pub mode: BuildMode,
    /// Absolute output directory.
    pub output_path: PathBuf,
    /// Public path declared by the host, if any.
    pub public_path: Option<String>,
    pub entrypoints: Vec<Entrypoint>,
    /// Host build configuration exposed to templates as `buildConfig`.
    pub config: Value,
    assets: Mutex<BTreeMap<String, Vec<u8>>>,
    errors: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    file_dependencies: Mutex<BTreeSet<PathBuf>>,
}

impl Compilation {
    pub fn new(hash: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            hash: hash.into(),
            output_path: output_path.into(),
            config: Value::Null,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = Some(public_path.into());
        self
    }

    pub fn with_entry(mut self, entry: Entrypoint) -> Self {
        self.entrypoints.push(entry);
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Add an asset produced by the host before document generation.
    pub fn with_asset(self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.emit_asset(name, content);
        self
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.entrypoints.iter().map(|e| e.name.clone()).collect()
    }

    pub fn entry_files(&self, name: &str) -> &[String] {
        self.entrypoints
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.files.as_slice())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Emitted assets
    // ------------------------------------------------------------------------

    /// Add or replace an output file.
    pub fn emit_asset(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.assets.lock().insert(name.into(), content.into());
    }

    pub fn has_asset(&self, name: &str) -> bool {
        self.assets.lock().contains_key(name)
    }

    pub fn asset(&self, name: &str) -> Option<Vec<u8>> {
        self.assets.lock().get(name).cloned()
    }

    /// UTF-8 view of an output file.
    pub fn asset_text(&self, name: &str) -> Option<String> {
        self.asset(name).and_then(|bytes| String::from_utf8(bytes).ok())
    }

    pub fn asset_names(&self) -> Vec<String> {
        self.assets.lock().keys().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    pub fn push_error(&self, message: impl Into<String>) {
        self.errors.lock().push(message.into());
    }

    pub fn push_warning(&self, message: impl Into<String>) {
        self.warnings.lock().push(message.into());
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    /// Files the host should watch for the next build.
    pub fn add_file_dependencies<I: IntoIterator<Item = PathBuf>>(&self, paths: I) {
        self.file_dependencies.lock().extend(paths);
    }

    pub fn file_dependencies(&self) -> BTreeSet<PathBuf> {
        self.file_dependencies.lock().clone()
    }

    /// Serializable view exposed to templates as `compilation`.
    pub fn summary(&self) -> Value {
        json!({
            "hash": self.hash,
            "mode": self.mode,
            "publicPath": self.public_path,
            "outputPath": self.output_path.display().to_string(),
            "entrypoints": self.entry_names(),
            "assets": self.asset_names(),
        })
    }
}

// ============================================================================
// BuildContext
// ============================================================================

/// Per-build scope. Dropping it releases the build's hooks.
#[derive(Debug)]
pub struct BuildContext {
    compilation: Arc<Compilation>,
    hooks: OnceLock<Arc<HtmlHooks>>,
}

impl BuildContext {
    pub fn new(compilation: Compilation) -> Self {
        Self::from_arc(Arc::new(compilation))
    }

    pub fn from_arc(compilation: Arc<Compilation>) -> Self {
        Self {
            compilation,
            hooks: OnceLock::new(),
        }
    }

    pub fn compilation(&self) -> &Arc<Compilation> {
        &self.compilation
    }

    /// The build's hook set, created on first access.
    pub fn hooks(&self) -> &Arc<HtmlHooks> {
        self.hooks.get_or_init(|| Arc::new(HtmlHooks::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_created_once_per_context() {
        let ctx = BuildContext::new(Compilation::new("h", "/out"));
        let a = Arc::clone(ctx.hooks());
        let b = Arc::clone(ctx.hooks());
        assert!(Arc::ptr_eq(&a, &b));

        let other = BuildContext::new(Compilation::new("h", "/out"));
        assert!(!Arc::ptr_eq(&a, other.hooks()));
    }

    #[test]
    fn test_hooks_released_with_context() {
        let ctx = BuildContext::new(Compilation::new("h", "/out"));
        let weak = Arc::downgrade(ctx.hooks());
        drop(ctx);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_assets_sorted_and_replaced() {
        let compilation = Compilation::new("h", "/out")
            .with_asset("b.js", "b")
            .with_asset("a.css", "a");
        compilation.emit_asset("b.js", "b2");

        assert_eq!(compilation.asset_names(), vec!["a.css", "b.js"]);
        assert_eq!(compilation.asset_text("b.js").as_deref(), Some("b2"));
        assert!(!compilation.has_asset("c.js"));
    }

    #[test]
    fn test_entry_files() {
        let compilation = Compilation::new("h", "/out")
            .with_entry(Entrypoint::new("main", ["main.js", "main.css"]));
        assert_eq!(compilation.entry_names(), vec!["main"]);
        assert_eq!(compilation.entry_files("main"), ["main.js", "main.css"]);
        assert!(compilation.entry_files("missing").is_empty());
    }

    #[test]
    fn test_summary_shape() {
        let compilation = Compilation::new("abc", "/out")
            .with_public_path("/static/")
            .with_entry(Entrypoint::new("main", ["main.js"]));
        let summary = compilation.summary();
        assert_eq!(summary["hash"], "abc");
        assert_eq!(summary["publicPath"], "/static/");
        assert_eq!(summary["entrypoints"], json!(["main"]));
        assert_eq!(summary["mode"], "development");
    }
}

//! Per-document options.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error      # ConfigError, ConfigDiagnostics
//! ├── options    # Multi-shape option values (inject, minify, chunks, ...)
//! └── mod.rs     # HtmlOptions (this file)
//! ```
//!
//! Options are plain serde structs; loading them from a file is up to the host.
//!
//! | Option               | Default        |
//! |----------------------|----------------|
//! | `title`              | `"Bundle App"` |
//! | `filename`           | `"index.html"` |
//! | `template`           | `"auto"`       |
//! | `inject`             | `true`         |
//! | `scriptLoading`      | `"blocking"`   |
//! | `publicPath`         | `"auto"`       |
//! | `minify`             | `"auto"`       |
//! | `cache`, `showErrors`| `true`         |
//! | `chunks`             | `"all"`        |
//! | `chunksSortMode`     | `"auto"`       |

mod error;
pub mod options;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use options::{
    Chunks, EntryComparator, Inject, Minify, PublicPath, ScriptLoading, SortMode,
    TemplateContent, TemplateContentFn, TemplateParameters, TemplateParamsFn,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pipeline::filename::unknown_hash_functions;
use crate::tag::generate::{base_tag, meta_tags};

/// Template id that picks `src/index.html` or the built-in default template.
pub const AUTO_TEMPLATE: &str = "auto";

// ============================================================================
// HtmlOptions
// ============================================================================

/// Options for one configured output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HtmlOptions {
    /// Title exposed to templates (`htmlPlugin.options.title`).
    pub title: String,
    /// Output filename; may contain `[name]` and `[templatehash]`.
    pub filename: String,
    /// Template request, optionally prefixed with `loader!` segments.
    pub template: String,
    pub template_content: TemplateContent,
    pub template_parameters: TemplateParameters,
    pub inject: Inject,
    pub script_loading: ScriptLoading,
    pub public_path: PublicPath,
    /// Favicon file copied into the output and linked from `<head>`.
    pub favicon: Option<PathBuf>,
    /// `name -> content | false | attribute object`, in declaration order.
    pub meta: Map<String, Value>,
    /// `false`, an href string or an attribute object.
    pub base: Value,
    pub minify: Minify,
    /// Append the build hash to every generated URL.
    pub hash: bool,
    /// Reuse the previous emission when neither template nor assets changed.
    pub cache: bool,
    /// Emit an error page instead of `ERROR` when rendering fails.
    pub show_errors: bool,
    pub chunks: Chunks,
    pub exclude_chunks: Vec<String>,
    pub chunks_sort_mode: SortMode,
    pub xhtml: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            title: "Bundle App".to_string(),
            filename: "index.html".to_string(),
            template: AUTO_TEMPLATE.to_string(),
            template_content: TemplateContent::Disabled,
            template_parameters: TemplateParameters::Default,
            inject: Inject::Auto,
            script_loading: ScriptLoading::Blocking,
            public_path: PublicPath::Auto,
            favicon: None,
            meta: Map::new(),
            base: Value::Bool(false),
            minify: Minify::Auto,
            hash: false,
            cache: true,
            show_errors: true,
            chunks: Chunks::All,
            exclude_chunks: Vec::new(),
            chunks_sort_mode: SortMode::Auto,
            xhtml: false,
        }
    }
}

impl HtmlOptions {
    /// Options writing to `filename`, everything else default.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Whether `filename` expands to one document per entry.
    pub fn is_per_entry(&self) -> bool {
        self.filename.contains("[name]")
    }

    /// Record every invalid option under `prefix` (e.g. `documents[0]`).
    pub fn validate(&self, prefix: &str, diag: &mut ConfigDiagnostics) {
        if self.filename.trim().is_empty() {
            diag.error(format!("{prefix}.filename"), "filename must not be empty");
        }
        for digest in unknown_hash_functions(&self.filename) {
            diag.error_with_hint(
                format!("{prefix}.filename"),
                format!("unknown hash function `{digest}`"),
                "use blake3 or fxhash",
            );
        }

        if self.template_content.is_set() && self.template != AUTO_TEMPLATE {
            diag.error_with_hint(
                format!("{prefix}.templateContent"),
                "cannot use both template and templateContent",
                "remove `template` or set `templateContent` to false",
            );
        }

        if let SortMode::Unknown(name) = &self.chunks_sort_mode {
            diag.error_with_hint(
                format!("{prefix}.chunksSortMode"),
                format!("unknown sort mode `{name}`"),
                "use \"auto\", \"none\", \"manual\" or a comparator",
            );
        }

        if let Err(e) = meta_tags(&self.meta) {
            diag.error(format!("{prefix}.meta"), e.to_string());
        }

        if let Err(e) = base_tag(&self.base) {
            diag.error(format!("{prefix}.base"), e.to_string());
        }

        if let TemplateParameters::Unsupported(value) = &self.template_parameters {
            diag.error_with_hint(
                format!("{prefix}.templateParameters"),
                format!("templateParameters has to be either a function or an object, got `{value}`"),
                "use true, false, an object or TemplateParameters::dynamic",
            );
        }
    }
}

//! Per-document jobs and their cached state.

use std::sync::Arc;

use crate::config::HtmlOptions;

/// One output document of one build.
#[derive(Debug, Clone)]
pub struct DocumentJob {
    /// Stable across builds; keys [`DocumentState`].
    pub key: String,
    pub options: Arc<HtmlOptions>,
    /// Template request, `None` when `templateContent` is used.
    pub template_id: Option<String>,
    /// Output filename with `[name]` expanded; hash placeholders remain.
    pub filename: String,
    /// Filtered entry names, not yet sorted.
    pub entries: Vec<String>,
}

impl DocumentJob {
    /// Name used in errors about this document's template.
    pub fn template_label(&self) -> &str {
        self.template_id.as_deref().unwrap_or("templateContent")
    }
}

/// What the previous build emitted for a document.
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub template_hash: String,
    pub asset_fingerprint: String,
    pub output_name: String,
    pub html: String,
}

impl DocumentState {
    pub fn matches(&self, template_hash: &str, asset_fingerprint: &str) -> bool {
        self.template_hash == template_hash && self.asset_fingerprint == asset_fingerprint
    }
}

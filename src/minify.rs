//! HTML minification.
//!
//! The minifier is an external collaborator behind [`Minifier`]; the default
//! [`HtmlMinifier`] uses the `minify_html` crate. It only runs when the
//! document's `minify` option resolves to an options object.

use serde::{Deserialize, Serialize};

/// Minifier settings, mapped onto `minify_html::Cfg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MinifyOptions {
    pub remove_comments: bool,
    pub minify_css: bool,
    pub minify_js: bool,
    pub keep_closing_tags: bool,
    pub keep_html_and_head_opening_tags: bool,
    pub remove_bangs: bool,
    pub remove_processing_instructions: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            remove_comments: true,
            minify_css: true,
            minify_js: true,
            keep_closing_tags: true,
            keep_html_and_head_opening_tags: true,
            remove_bangs: true,
            remove_processing_instructions: true,
        }
    }
}

/// `(html, options) -> html`.
pub trait Minifier: Send + Sync {
    fn minify(&self, html: &str, options: &MinifyOptions) -> anyhow::Result<String>;
}

/// Default minifier backed by `minify_html`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMinifier;

impl Minifier for HtmlMinifier {
    fn minify(&self, html: &str, options: &MinifyOptions) -> anyhow::Result<String> {
        let mut cfg = minify_html::Cfg::new();
        cfg.keep_closing_tags = options.keep_closing_tags;
        cfg.keep_html_and_head_opening_tags = options.keep_html_and_head_opening_tags;
        cfg.keep_comments = !options.remove_comments;
        cfg.minify_css = options.minify_css;
        cfg.minify_js = options.minify_js;
        cfg.remove_bangs = options.remove_bangs;
        cfg.remove_processing_instructions = options.remove_processing_instructions;

        let minified = minify_html::minify(html.as_bytes(), &cfg);
        Ok(String::from_utf8(minified)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

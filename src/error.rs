//! Error types for document generation.
//!
//! Every per-document failure ends up as an [`HtmlError`]: the orchestrator
//! records its [`pretty`](HtmlError::pretty) form on the build's error list
//! and emits either an error page or a plain `ERROR` marker in its place.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::PLUGIN_NAME;
use crate::config::ConfigError;
use crate::hooks::Stage;
use crate::utils::html::escape;

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum HtmlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not load file `{}`", path.display())]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template `{template}` failed to compile: {message}")]
    TemplateCompilation { template: String, message: String },

    #[error("template `{template}` failed to evaluate: {message}")]
    TemplateEvaluation { template: String, message: String },

    #[error("{0}")]
    Sequencing(String),

    // NOTE: no #[source] here - the handler error is already part of the message
    #[error("`{stage}` handler `{handler}` failed: {source:#}")]
    Hook {
        stage: Stage,
        handler: String,
        source: anyhow::Error,
    },

    #[error("minification failed: {0}")]
    Minify(String),
}

impl HtmlError {
    /// Diagnostic line recorded on the build's error list.
    ///
    /// Absolute paths under `context` are shortened to `./relative` form.
    pub fn pretty(&self, context: &Path) -> String {
        let message = self.to_string();
        let prefix = context.display().to_string();
        let message = if prefix.is_empty() {
            message
        } else {
            message.replace(&format!("{prefix}/"), "./")
        };
        format!("{PLUGIN_NAME}: {message}")
    }

    /// HTML error page emitted in place of a failed document.
    pub fn to_error_page(&self, context: &Path) -> String {
        format!("{PLUGIN_NAME}:\n<pre>\n{}</pre>", escape(&self.pretty(context)))
    }
}

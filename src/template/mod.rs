//! Template language.
//!
//! Nested build output is compiled ahead of time into a handlebars
//! [`Template`] instead of being evaluated as code. Rendering only sees the
//! template parameters and is strict: a path they do not provide is an error.
//!
//! # Syntax
//!
//! ```text
//! {{path}}                       HTML-escaped interpolation
//! {{{path}}}                     raw interpolation
//! {{! comment }}                 dropped
//! {{#if path}}..{{else}}..{{/if}}
//! {{#each path}}..{{this}}..{{/each}}
//! {{tags path}}                  tag objects as markup
//! ```

pub mod default;
mod helpers;

pub use handlebars::{RenderError, TemplateError};

use handlebars::Handlebars;
use serde_json::Value;

use crate::BoxFuture;

/// Registry name of the template being rendered.
const DOCUMENT: &str = "document";

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    compiled: handlebars::Template,
}

impl Template {
    /// Compile template source.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let compiled = handlebars::Template::compile(source)?;
        Ok(Self {
            source: source.to_string(),
            compiled,
        })
    }

    /// Whether rendering is independent of the parameters.
    pub fn is_static(&self) -> bool {
        !self.source.contains("{{")
    }

    /// Render with `params` as the only visible bindings.
    pub fn render(&self, params: &Value, xhtml: bool) -> Result<String, RenderError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        helpers::register(&mut registry, xhtml);
        registry.register_template(DOCUMENT, self.compiled.clone());
        registry.render(DOCUMENT, params)
    }

    /// Evaluate into a literal or a callable template.
    pub fn evaluate(self) -> TemplateValue {
        if self.is_static() {
            TemplateValue::Literal(self.source)
        } else {
            TemplateValue::Function(self)
        }
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Template {}

// =============================================================================
// Evaluation Results
// =============================================================================

/// What an evaluated artifact yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    /// Markup that needs no parameters.
    Literal(String),
    /// Markup computed from the template parameters.
    Function(Template),
}

/// Result of a user `templateContent` callback.
pub enum TemplateOutput {
    Literal(String),
    Deferred(BoxFuture<'static, anyhow::Result<String>>),
}

impl TemplateOutput {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    /// Wait for the markup.
    pub async fn resolve(self) -> anyhow::Result<String> {
        match self {
            Self::Literal(html) => Ok(html),
            Self::Deferred(future) => future.await,
        }
    }
}

impl From<String> for TemplateOutput {
    fn from(html: String) -> Self {
        Self::Literal(html)
    }
}

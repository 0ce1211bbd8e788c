//! Nested template build.
//!
//! Templates go through a secondary build (the [`ChildCompiler`]) that turns
//! each template request into source text, using the same loaders as the
//! host. [`TemplateCache`] runs that build at most once per build instance
//! and reuses its result until a tracked file changes.
//!
//! # Module Structure
//!
//! ```text
//! child/
//! ├── cache      # TemplateCache: registration, memoized compile, staleness
//! ├── fs         # FsChildCompiler: disk-backed nested build with loaders
//! └── mod.rs     # Collaborator trait, request/output types, artifacts
//! ```

mod cache;
mod fs;

pub use cache::{TemplateCache, TemplateCompilation};
pub use fs::{FsChildCompiler, Loader, LoaderContext};

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::error::HtmlError;
use crate::freshness::hash_bytes;
use crate::template::{Template, TemplateValue};
use crate::{BoxFuture, PLUGIN_NAME};

// ============================================================================
// Collaborator
// ============================================================================

/// One template requested from the nested build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    /// Template request, e.g. `src/index.html` or `upper!src/index.html`.
    pub id: String,
    pub output_name: String,
}

#[derive(Debug, Clone)]
pub struct ChildCompileRequest {
    /// Directory template requests are resolved against.
    pub context: PathBuf,
    pub entries: Vec<ChildEntry>,
}

/// Output of the nested build for one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledEntry {
    pub source: String,
    /// Extra files the nested build produced for this entry.
    pub assets: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct ChildCompileOutput {
    /// Per template id: compiled source or the failure message.
    pub entries: FxHashMap<String, Result<CompiledEntry, String>>,
    /// Every file the nested build read, including ones it failed to find.
    pub file_dependencies: BTreeSet<PathBuf>,
    pub errors: Vec<String>,
}

/// The host's nested-build primitive.
pub trait ChildCompiler: Send + Sync {
    fn compile<'a>(
        &'a self,
        request: &'a ChildCompileRequest,
    ) -> BoxFuture<'a, anyhow::Result<ChildCompileOutput>>;
}

/// Output name of the `index`-th template in a nested build.
pub fn child_output_name(index: usize, id: &str) -> String {
    format!("__child-{PLUGIN_NAME}_{index}-{id}")
}

// ============================================================================
// Artifacts
// ============================================================================

/// Compiled, not yet evaluated, template.
#[derive(Debug, Clone)]
pub struct TemplateArtifact {
    pub source_id: String,
    pub content: String,
    /// blake3 hex digest of `content`.
    pub content_hash: String,
    pub emitted_files: BTreeMap<String, Vec<u8>>,
    template: Template,
}

impl TemplateArtifact {
    pub fn compile(source_id: &str, entry: CompiledEntry) -> Result<Self, ArtifactFailure> {
        let template = Template::compile(&entry.source).map_err(|e| ArtifactFailure {
            template: source_id.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source_id: source_id.to_string(),
            content_hash: hash_bytes(entry.source.as_bytes()).to_hex(),
            content: entry.source,
            emitted_files: entry.assets,
            template,
        })
    }

    /// A literal string or a function of the template parameters.
    pub fn evaluate(&self) -> TemplateValue {
        self.template.clone().evaluate()
    }
}

/// A template the nested build could not turn into an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFailure {
    pub template: String,
    pub message: String,
}

impl ArtifactFailure {
    pub fn to_error(&self) -> HtmlError {
        HtmlError::TemplateCompilation {
            template: self.template.clone(),
            message: self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_output_name() {
        assert_eq!(
            child_output_name(2, "src/index.html"),
            "__child-HtmlPlugin_2-src/index.html"
        );
    }

    #[test]
    fn test_artifact_hash_tracks_content() {
        let a = TemplateArtifact::compile("a", CompiledEntry {
            source: "<p>{{x}}</p>".into(),
            ..CompiledEntry::default()
        })
        .unwrap();
        let b = TemplateArtifact::compile("b", CompiledEntry {
            source: "<p>{{x}}</p>".into(),
            ..CompiledEntry::default()
        })
        .unwrap();
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.content_hash.len(), 64);
        assert!(matches!(a.evaluate(), TemplateValue::Function(_)));
    }

    #[test]
    fn test_artifact_parse_failure() {
        let failure = TemplateArtifact::compile("broken.html", CompiledEntry {
            source: "{{#if x}}".into(),
            ..CompiledEntry::default()
        })
        .unwrap_err();
        assert_eq!(failure.template, "broken.html");
        assert!(matches!(failure.to_error(), HtmlError::TemplateCompilation { .. }));
    }
}

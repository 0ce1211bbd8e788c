//! Memoized nested build with snapshot-based invalidation.
//!
//! Lifecycle per build:
//!
//! ```text
//! begin_build ─▶ register_template* ─▶ is_stale ─▶ compile_all (shared)
//! ```
//!
//! The compiled result survives across builds until [`TemplateCache::is_stale`]
//! finds a changed dependency or a new template id shows up.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;

use super::{
    ArtifactFailure, ChildCompileRequest, ChildCompiler, ChildEntry, TemplateArtifact,
    child_output_name,
};
use crate::error::HtmlError;
use crate::freshness::{DependencySnapshot, FileSystemInfo};

/// Result of one nested build.
#[derive(Debug, Default)]
pub struct TemplateCompilation {
    pub artifacts: FxHashMap<String, Result<Arc<TemplateArtifact>, ArtifactFailure>>,
    pub file_dependencies: BTreeSet<PathBuf>,
    /// Nested build diagnostics, not tied to one template.
    pub errors: Vec<String>,
}

impl TemplateCompilation {
    pub fn artifact(&self, id: &str) -> Result<Arc<TemplateArtifact>, HtmlError> {
        match self.artifacts.get(id) {
            Some(Ok(artifact)) => Ok(Arc::clone(artifact)),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Err(HtmlError::TemplateCompilation {
                template: id.to_string(),
                message: "template was not part of the nested build".to_string(),
            }),
        }
    }
}

type SharedCompilation = Arc<OnceCell<Arc<TemplateCompilation>>>;

#[derive(Default)]
struct CacheState {
    /// Registered ids in registration order.
    templates: Vec<String>,
    started: bool,
    compiled: Option<SharedCompilation>,
    /// Ids covered by `compiled`.
    compiled_templates: BTreeSet<String>,
    snapshot: Option<DependencySnapshot>,
    file_dependencies: BTreeSet<PathBuf>,
    /// Bumped on every invalidation; late results of older builds are ignored.
    generation: u64,
}

/// Nested template compiler cache for one plugin instance.
pub struct TemplateCache {
    context: PathBuf,
    compiler: Arc<dyn ChildCompiler>,
    fs: Arc<dyn FileSystemInfo>,
    state: Mutex<CacheState>,
}

impl TemplateCache {
    pub fn new(
        context: impl Into<PathBuf>,
        compiler: Arc<dyn ChildCompiler>,
        fs: Arc<dyn FileSystemInfo>,
    ) -> Self {
        Self {
            context: context.into(),
            compiler,
            fs,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Reopen registration for a new build.
    pub fn begin_build(&self) {
        self.state.lock().started = false;
    }

    /// Add a template to the next nested build.
    ///
    /// Returns `false` if the id was already registered. Fails once
    /// [`compile_all`](Self::compile_all) has been called for this build.
    pub fn register_template(&self, id: &str) -> Result<bool, HtmlError> {
        let mut state = self.state.lock();
        if state.templates.iter().any(|t| t == id) {
            return Ok(false);
        }
        if state.started {
            return Err(HtmlError::Sequencing(format!(
                "too late to add template `{id}`: the nested build already started"
            )));
        }

        state.templates.push(id.to_string());
        if state.compiled.is_some() && !state.compiled_templates.contains(id) {
            crate::debug!("cache"; "new template `{}`, dropping previous nested build", id);
            state.compiled = None;
        }
        Ok(true)
    }

    pub fn templates(&self) -> Vec<String> {
        self.state.lock().templates.clone()
    }

    /// Compiled artifacts for every registered template.
    ///
    /// The first call of a build starts the nested build; every other call
    /// awaits the same result.
    pub async fn compile_all(&self) -> Arc<TemplateCompilation> {
        let (cell, templates, generation) = {
            let mut state = self.state.lock();
            state.started = true;
            let cell = Arc::clone(
                state
                    .compiled
                    .get_or_insert_with(|| Arc::new(OnceCell::new())),
            );
            (cell, state.templates.clone(), state.generation)
        };

        let compiled = cell
            .get_or_init(|| self.run_nested_build(templates, generation))
            .await;
        Arc::clone(compiled)
    }

    /// Files read by the last nested build.
    pub fn file_dependencies(&self) -> BTreeSet<PathBuf> {
        self.state.lock().file_dependencies.clone()
    }

    /// Whether the nested build has to run again. Invalidates when it does.
    pub async fn is_stale(&self) -> bool {
        let snapshot = self.state.lock().snapshot.clone();
        let current = match &snapshot {
            Some(snapshot) => self.fs.check_snapshot(snapshot).await,
            None => false,
        };

        if current {
            crate::debug!("cache"; "nested build is up to date");
        } else {
            crate::debug!("cache"; "nested build is stale");
            self.invalidate();
        }
        !current
    }

    /// Discard the memoized nested build and its snapshot.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.compiled = None;
        state.compiled_templates.clear();
        state.snapshot = None;
        state.generation += 1;
    }

    async fn run_nested_build(
        &self,
        templates: Vec<String>,
        generation: u64,
    ) -> Arc<TemplateCompilation> {
        let started = SystemTime::now();

        let (compilation, completed) = if templates.is_empty() {
            (TemplateCompilation::default(), true)
        } else {
            crate::debug!("cache"; "nested build for {} template(s)", templates.len());
            self.compile_templates(&templates).await
        };

        // a failed nested build has no dependency set to watch; the next
        // build finds no snapshot and compiles again
        let snapshot = match completed {
            true => Some(
                self.fs
                    .create_snapshot(started, &compilation.file_dependencies)
                    .await,
            ),
            false => None,
        };

        let mut state = self.state.lock();
        if state.generation == generation {
            state.snapshot = snapshot;
            state.file_dependencies = compilation.file_dependencies.clone();
            state.compiled_templates = templates.into_iter().collect();
        }
        Arc::new(compilation)
    }

    /// Run the nested build. The flag is `false` when it failed as a whole.
    async fn compile_templates(&self, templates: &[String]) -> (TemplateCompilation, bool) {
        let request = ChildCompileRequest {
            context: self.context.clone(),
            entries: templates
                .iter()
                .enumerate()
                .map(|(index, id)| ChildEntry {
                    id: id.clone(),
                    output_name: child_output_name(index, id),
                })
                .collect(),
        };

        let mut output = match self.compiler.compile(&request).await {
            Ok(output) => output,
            Err(e) => {
                let message = format!("{:#}", e);
                crate::debug!("cache"; "nested build failed: {}", message);
                let failed = TemplateCompilation {
                    artifacts: templates
                        .iter()
                        .map(|id| {
                            let failure = ArtifactFailure {
                                template: id.clone(),
                                message: message.clone(),
                            };
                            (id.clone(), Err(failure))
                        })
                        .collect(),
                    file_dependencies: BTreeSet::new(),
                    errors: vec![message],
                };
                return (failed, false);
            }
        };

        let artifacts = templates
            .iter()
            .map(|id| {
                let result = match output.entries.remove(id) {
                    Some(Ok(entry)) => TemplateArtifact::compile(id, entry).map(Arc::new),
                    Some(Err(message)) => Err(ArtifactFailure {
                        template: id.clone(),
                        message,
                    }),
                    None => Err(ArtifactFailure {
                        template: id.clone(),
                        message: "the nested build produced no output".to_string(),
                    }),
                };
                (id.clone(), result)
            })
            .collect();

        let compilation = TemplateCompilation {
            artifacts,
            file_dependencies: output.file_dependencies,
            errors: output.errors,
        };
        (compilation, true)
    }
}

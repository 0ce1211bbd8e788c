//! Document generation for one build.
//!
//! # Architecture
//!
//! ```text
//! process(ctx)
//!   ├── expand documents ([name] → one job per entry)
//!   ├── register templates ─▶ TemplateCache (one staleness check per build)
//!   └── per document, concurrently:
//!         entries → sort → AssetBundle → favicon
//!         ── output cache check ──
//!         beforeAssetTagGeneration → tags → alterAssetTags
//!         → groups → alterAssetTagGroups → evaluate template
//!         → afterTemplateExecution → inject → minify
//!         → beforeEmit → emit → afterEmit
//! ```
//!
//! A failing document is still emitted (error page or `ERROR`) and the
//! failure is appended to the build's error list; other documents continue.

mod document;
pub mod filename;
pub mod inject;
pub mod params;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::asset::{collect_assets, emit_favicon, resolve_public_path};
use crate::child::{ChildCompiler, FsChildCompiler, TemplateArtifact, TemplateCache};
use crate::compilation::{BuildContext, Compilation};
use crate::config::{AUTO_TEMPLATE, ConfigDiagnostics, HtmlOptions, TemplateContent};
use crate::entry::{EntrySort, filter_chunks, sort_entries};
use crate::error::HtmlError;
use crate::freshness::{FileSystemInfo, FsSnapshotter, hash_bytes};
use crate::hooks::{
    AfterEmit, AfterTemplateExecution, AlterAssetTagGroups, AlterAssetTags,
    BeforeAssetTagGeneration, BeforeEmit,
};
use crate::minify::{HtmlMinifier, Minifier};
use crate::tag::generate::{base_tag, favicon_tag, meta_tags, script_tags, style_tags};
use crate::tag::{AssetTags, TagGroups};
use crate::template::TemplateValue;
use crate::template::default::DEFAULT_TEMPLATE_ID;

use document::{DocumentJob, DocumentState};
use filename::{expand_entry_name, resolve_hash_placeholders};
use inject::{dedupe_viewport, inject, inject_manifest};
use params::{TemplateParamsInput, template_params};

/// Template used for `"auto"` when it exists under the context directory.
const AUTO_TEMPLATE_PATH: &str = "src/index.html";

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Rendered and emitted.
    Emitted,
    /// Previous emission reused.
    Cached,
    /// Error page or `ERROR` emitted; carries the recorded diagnostic.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitResult {
    pub output_name: String,
    pub outcome: EmitOutcome,
}

// ============================================================================
// HtmlPlugin
// ============================================================================

/// Generates the configured documents for every build it is given.
///
/// Cloning is cheap; clones share the template cache and document state.
#[derive(Clone)]
pub struct HtmlPlugin {
    inner: Arc<PluginInner>,
}

struct PluginInner {
    context: PathBuf,
    documents: Vec<Arc<HtmlOptions>>,
    templates: TemplateCache,
    minifier: Arc<dyn Minifier>,
    states: DashMap<String, DocumentState>,
}

/// Builder for [`HtmlPlugin`] with custom collaborators.
pub struct HtmlPluginBuilder {
    context: PathBuf,
    documents: Vec<HtmlOptions>,
    compiler: Option<Arc<dyn ChildCompiler>>,
    file_system: Option<Arc<dyn FileSystemInfo>>,
    minifier: Option<Arc<dyn Minifier>>,
}

impl HtmlPluginBuilder {
    pub fn document(mut self, options: HtmlOptions) -> Self {
        self.documents.push(options);
        self
    }

    pub fn documents<I: IntoIterator<Item = HtmlOptions>>(mut self, documents: I) -> Self {
        self.documents.extend(documents);
        self
    }

    pub fn child_compiler(mut self, compiler: Arc<dyn ChildCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn file_system(mut self, file_system: Arc<dyn FileSystemInfo>) -> Self {
        self.file_system = Some(file_system);
        self
    }

    pub fn minifier(mut self, minifier: Arc<dyn Minifier>) -> Self {
        self.minifier = Some(minifier);
        self
    }

    /// Validate every document and build the plugin.
    pub fn build(self) -> Result<HtmlPlugin, HtmlError> {
        let mut diag = ConfigDiagnostics::new();
        for (index, options) in self.documents.iter().enumerate() {
            options.validate(&format!("documents[{index}]"), &mut diag);
        }
        diag.into_result()?;

        let compiler = self
            .compiler
            .unwrap_or_else(|| Arc::new(FsChildCompiler::new()));
        let file_system = self.file_system.unwrap_or_else(|| Arc::new(FsSnapshotter));
        let documents = if self.documents.is_empty() {
            vec![Arc::new(HtmlOptions::default())]
        } else {
            self.documents.into_iter().map(Arc::new).collect()
        };

        Ok(HtmlPlugin {
            inner: Arc::new(PluginInner {
                templates: TemplateCache::new(self.context.clone(), compiler, file_system),
                context: self.context,
                documents,
                minifier: self.minifier.unwrap_or_else(|| Arc::new(HtmlMinifier)),
                states: DashMap::new(),
            }),
        })
    }
}

impl HtmlPlugin {
    /// Plugin with the default disk-backed collaborators.
    pub fn new<I>(context: impl Into<PathBuf>, documents: I) -> Result<Self, HtmlError>
    where
        I: IntoIterator<Item = HtmlOptions>,
    {
        Self::builder(context).documents(documents).build()
    }

    pub fn builder(context: impl Into<PathBuf>) -> HtmlPluginBuilder {
        HtmlPluginBuilder {
            context: context.into(),
            documents: Vec::new(),
            compiler: None,
            file_system: None,
            minifier: None,
        }
    }

    pub fn context(&self) -> &Path {
        &self.inner.context
    }

    pub fn template_cache(&self) -> &TemplateCache {
        &self.inner.templates
    }

    /// Generate every document for the build behind `ctx`.
    ///
    /// Per-document failures end up in the results and on the build's error
    /// list; only usage errors are returned.
    pub async fn process(&self, ctx: &Arc<BuildContext>) -> Result<Vec<EmitResult>, HtmlError> {
        let inner = &self.inner;
        let compilation = ctx.compilation();
        let jobs = inner.expand_documents(compilation);

        inner.templates.begin_build();
        for id in jobs.iter().filter_map(|job| job.template_id.as_deref()) {
            if inner.templates.register_template(id)? {
                crate::debug!("html"; "registered template `{}`", id);
            }
        }
        inner.templates.is_stale().await;

        let mut set = JoinSet::new();
        for (index, job) in jobs.into_iter().enumerate() {
            let inner = Arc::clone(inner);
            let ctx = Arc::clone(ctx);
            set.spawn(async move { (index, inner.render_document(&ctx, job).await) });
        }

        let mut results = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    let message = format!("{}: document task failed: {}", crate::PLUGIN_NAME, e);
                    crate::log!("error"; "{}", message);
                    compilation.push_error(message);
                }
            }
        }
        results.sort_by_key(|(index, _)| *index);

        let compiled = inner.templates.compile_all().await;
        for artifact in compiled.artifacts.values().flatten() {
            for (name, content) in &artifact.emitted_files {
                compilation.emit_asset(name.as_str(), content.clone());
            }
        }
        for message in &compiled.errors {
            crate::debug!("cache"; "nested build: {}", message);
            compilation.push_warning(format!("{}: nested build: {}", crate::PLUGIN_NAME, message));
        }

        compilation.add_file_dependencies(inner.templates.file_dependencies());
        compilation.add_file_dependencies(
            inner
                .documents
                .iter()
                .filter_map(|options| options.favicon.as_ref())
                .map(|favicon| inner.context.join(favicon)),
        );

        Ok(results.into_iter().map(|(_, result)| result).collect())
    }
}

// ============================================================================
// Document Rendering
// ============================================================================

impl PluginInner {
    fn expand_documents(&self, compilation: &Compilation) -> Vec<DocumentJob> {
        let entry_names = compilation.entry_names();
        let mut jobs = Vec::new();

        for (index, options) in self.documents.iter().enumerate() {
            let template_id = (!options.template_content.is_set()).then(|| self.resolve_template(options));
            let entries = filter_chunks(&entry_names, &options.chunks, &options.exclude_chunks);

            if options.is_per_entry() {
                for entry in entries {
                    let filename = expand_entry_name(&options.filename, &entry);
                    jobs.push(DocumentJob {
                        key: format!("{index}:{filename}"),
                        options: Arc::clone(options),
                        template_id: template_id.clone(),
                        filename,
                        entries: vec![entry],
                    });
                }
            } else {
                jobs.push(DocumentJob {
                    key: format!("{index}:{}", options.filename),
                    options: Arc::clone(options),
                    template_id,
                    filename: options.filename.clone(),
                    entries,
                });
            }
        }
        jobs
    }

    fn resolve_template(&self, options: &HtmlOptions) -> String {
        if options.template != AUTO_TEMPLATE {
            return options.template.clone();
        }
        if self.context.join(AUTO_TEMPLATE_PATH).is_file() {
            AUTO_TEMPLATE_PATH.to_string()
        } else {
            DEFAULT_TEMPLATE_ID.to_string()
        }
    }

    async fn render_document(&self, ctx: &BuildContext, job: DocumentJob) -> EmitResult {
        match self.render(ctx, &job).await {
            Ok(result) => result,
            Err(e) => self.emit_failure(ctx.compilation(), &job, &e),
        }
    }

    fn emit_failure(&self, compilation: &Compilation, job: &DocumentJob, error: &HtmlError) -> EmitResult {
        let pretty = error.pretty(&self.context);
        crate::log!("error"; "{}", pretty);
        compilation.push_error(pretty.clone());

        let html = if job.options.show_errors {
            error.to_error_page(&self.context)
        } else {
            "ERROR".to_string()
        };
        let output_name = resolve_hash_placeholders(&job.filename, &html);
        compilation.emit_asset(output_name.as_str(), html);
        self.states.remove(&job.key);

        EmitResult {
            output_name,
            outcome: EmitOutcome::Failed(pretty),
        }
    }

    async fn render(&self, ctx: &BuildContext, job: &DocumentJob) -> Result<EmitResult, HtmlError> {
        let compilation = ctx.compilation();
        let hooks = ctx.hooks();
        let options = &job.options;

        let policy = EntrySort::from_mode(&options.chunks_sort_mode, &options.chunks)?;
        let entries = sort_entries(job.entries.clone(), &policy);

        let public_path = resolve_public_path(
            &options.public_path,
            compilation.public_path.as_deref(),
            &job.filename,
        );
        let mut assets = collect_assets(compilation, &entries, &public_path, options.hash);
        if let Some(favicon) = &options.favicon {
            let url = emit_favicon(compilation, &self.context, favicon, &public_path, options.hash).await?;
            assets.favicon = Some(url);
        }

        let artifact = match (&options.template_content, &job.template_id) {
            (TemplateContent::Disabled, Some(id)) => {
                Some(self.templates.compile_all().await.artifact(id)?)
            }
            _ => None,
        };

        // per-document output cache
        let template_hash = match (&options.template_content, &artifact) {
            (TemplateContent::Static(content), _) => Some(hash_bytes(content.as_bytes()).to_hex()),
            (TemplateContent::Disabled, Some(artifact)) => Some(artifact.content_hash.clone()),
            _ => None,
        };
        let asset_fingerprint = assets.fingerprint();
        if options.cache
            && let Some(hash) = &template_hash
            && let Some(previous) = self.cached(&job.key, hash, &asset_fingerprint)
        {
            crate::debug!("cache"; "`{}` unchanged, reusing previous output", previous.output_name);
            compilation.emit_asset(previous.output_name.as_str(), previous.html);
            return Ok(EmitResult {
                output_name: previous.output_name,
                outcome: EmitOutcome::Cached,
            });
        }

        let payload = hooks
            .before_asset_tag_generation
            .call(BeforeAssetTagGeneration {
                assets,
                output_name: job.filename.clone(),
                options: Arc::clone(options),
            })
            .await?;
        let assets = payload.assets;

        let mut meta = Vec::new();
        meta.extend(base_tag(&options.base)?);
        meta.extend(meta_tags(&options.meta)?);
        meta.extend(assets.favicon.as_deref().map(favicon_tag));
        let asset_tags = AssetTags {
            scripts: script_tags(&assets.js, options.script_loading),
            styles: style_tags(&assets.css),
            meta,
        };

        let altered = hooks
            .alter_asset_tags
            .call(AlterAssetTags {
                asset_tags,
                public_path: public_path.clone(),
                output_name: job.filename.clone(),
                options: Arc::clone(options),
            })
            .await?;

        let groups = TagGroups::from_asset_tags(altered.asset_tags, options.inject.scripts_in_head());
        let grouped = hooks
            .alter_asset_tag_groups
            .call(AlterAssetTagGroups {
                head_tags: groups.head_tags,
                body_tags: groups.body_tags,
                public_path,
                output_name: job.filename.clone(),
                options: Arc::clone(options),
            })
            .await?;
        let tags = TagGroups {
            head_tags: grouped.head_tags,
            body_tags: grouped.body_tags,
        };

        let input = TemplateParamsInput {
            compilation: Arc::clone(compilation),
            assets: assets.clone(),
            tags: tags.clone(),
            options: Arc::clone(options),
        };
        let html = self.evaluate(job, artifact.as_deref(), input).await?;

        let executed = hooks
            .after_template_execution
            .call(AfterTemplateExecution {
                html,
                head_tags: tags.head_tags,
                body_tags: tags.body_tags,
                output_name: job.filename.clone(),
                options: Arc::clone(options),
            })
            .await?;

        let mut html = executed.html;
        if options.inject.is_enabled() {
            let head_tags = dedupe_viewport(&html, executed.head_tags);
            html = inject(&html, &head_tags, &executed.body_tags, options.xhtml);
            if let Some(manifest) = &assets.manifest {
                html = inject_manifest(&html, manifest);
            }
        }

        if let Some(minify) = options.minify.resolve(compilation.mode) {
            html = self
                .minifier
                .minify(&html, &minify)
                .map_err(|e| HtmlError::Minify(format!("{e:#}")))?;
        }

        let emitted = hooks
            .before_emit
            .call(BeforeEmit {
                html,
                output_name: job.filename.clone(),
                options: Arc::clone(options),
            })
            .await?;
        let output_name = resolve_hash_placeholders(&job.filename, &emitted.html);
        compilation.emit_asset(output_name.as_str(), emitted.html.clone());
        crate::debug!("html"; "emitted `{}`", output_name);

        if let Some(hash) = template_hash {
            self.states.insert(job.key.clone(), DocumentState {
                template_hash: hash,
                asset_fingerprint,
                output_name: output_name.clone(),
                html: emitted.html,
            });
        } else {
            self.states.remove(&job.key);
        }

        let after = AfterEmit {
            output_name: output_name.clone(),
            options: Arc::clone(options),
        };
        if let Err(e) = hooks.after_emit.call(after).await {
            crate::log!("hook"; "{}", e);
        }

        Ok(EmitResult {
            output_name,
            outcome: EmitOutcome::Emitted,
        })
    }

    fn cached(&self, key: &str, template_hash: &str, asset_fingerprint: &str) -> Option<DocumentState> {
        self.states
            .get(key)
            .filter(|state| state.matches(template_hash, asset_fingerprint))
            .map(|state| state.clone())
    }

    /// Markup from `templateContent` or the compiled template.
    async fn evaluate(
        &self,
        job: &DocumentJob,
        artifact: Option<&TemplateArtifact>,
        input: TemplateParamsInput,
    ) -> Result<String, HtmlError> {
        let options = &job.options;
        let template = job.template_label();
        let evaluation_error = |message: String| HtmlError::TemplateEvaluation {
            template: template.to_string(),
            message,
        };

        match (&options.template_content, artifact) {
            (TemplateContent::Static(content), _) => Ok(content.clone()),
            (TemplateContent::Dynamic(render), _) => {
                let params = template_params(&options.template_parameters, input, template).await?;
                render(params)
                    .resolve()
                    .await
                    .map_err(|e| evaluation_error(format!("{e:#}")))
            }
            (TemplateContent::Disabled, Some(artifact)) => match artifact.evaluate() {
                TemplateValue::Literal(html) => Ok(html),
                TemplateValue::Function(render) => {
                    let params: Value =
                        template_params(&options.template_parameters, input, template).await?;
                    render
                        .render(&params, options.xhtml)
                        .map_err(|e| evaluation_error(e.to_string()))
                }
            },
            (TemplateContent::Disabled, None) => Err(evaluation_error(
                "no template was compiled for this document".to_string(),
            )),
        }
    }
}

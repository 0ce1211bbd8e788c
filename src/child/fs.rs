//! Disk-backed nested build.
//!
//! A template request is `[loader!]*path`. Loaders run right to left over the
//! file's text; files without explicit loaders use the loaders registered
//! for their extension. After the loaders, `{{> "path"}}` includes are
//! replaced by the referenced file (relative to the file
//! containing the directive).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use rustc_hash::FxHashMap;

use super::{ChildCompileOutput, ChildCompileRequest, ChildCompiler, CompiledEntry};
use crate::BoxFuture;
use crate::template::default::{DEFAULT_TEMPLATE, DEFAULT_TEMPLATE_ID};

static INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\{>\s*"([^"]+)"\s*\}\}"#).unwrap());

// ============================================================================
// Loaders
// ============================================================================

/// State a loader can touch while transforming one file.
pub struct LoaderContext<'a> {
    resource: &'a Path,
    dependencies: &'a mut BTreeSet<PathBuf>,
    emitted: &'a mut BTreeMap<String, Vec<u8>>,
}

impl LoaderContext<'_> {
    pub fn resource(&self) -> &Path {
        self.resource
    }

    /// Track an extra file; changing it invalidates the nested build.
    pub fn add_dependency(&mut self, path: impl Into<PathBuf>) {
        self.dependencies.insert(path.into());
    }

    /// Emit an extra output file next to the documents.
    pub fn emit_file(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.emitted.insert(name.into(), content.into());
    }
}

/// Source transform applied during the nested build.
pub trait Loader: Send + Sync {
    fn name(&self) -> &str;
    fn load(&self, source: String, cx: &mut LoaderContext<'_>) -> anyhow::Result<String>;
}

// ============================================================================
// FsChildCompiler
// ============================================================================

/// Default [`ChildCompiler`] reading templates from disk.
#[derive(Clone, Default)]
pub struct FsChildCompiler {
    loaders: FxHashMap<String, Arc<dyn Loader>>,
    /// extension -> loader names
    rules: FxHashMap<String, Vec<String>>,
}

impl FsChildCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.insert(loader.name().to_string(), Arc::new(loader));
        self
    }

    /// Apply `loaders` to requests for files ending in `.{extension}`.
    pub fn with_rule<I, S>(mut self, extension: &str, loaders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.insert(
            extension.trim_start_matches('.').to_string(),
            loaders.into_iter().map(Into::into).collect(),
        );
        self
    }

    fn compile_blocking(&self, request: &ChildCompileRequest) -> ChildCompileOutput {
        let mut output = ChildCompileOutput::default();

        for entry in &request.entries {
            let mut assets = BTreeMap::new();
            let result = self.compile_one(
                &request.context,
                &entry.id,
                &mut output.file_dependencies,
                &mut assets,
            );

            let result = match result {
                Ok(source) => Ok(CompiledEntry { source, assets }),
                Err(e) => {
                    let message = format!("{:#}", e);
                    output.errors.push(format!("{}: {}", entry.output_name, message));
                    Err(message)
                }
            };
            output.entries.insert(entry.id.clone(), result);
        }

        output
    }

    fn compile_one(
        &self,
        context: &Path,
        id: &str,
        dependencies: &mut BTreeSet<PathBuf>,
        emitted: &mut BTreeMap<String, Vec<u8>>,
    ) -> anyhow::Result<String> {
        if id == DEFAULT_TEMPLATE_ID {
            return Ok(DEFAULT_TEMPLATE.to_string());
        }

        let (explicit, resource) = split_request(id);
        let path = context.join(resource);
        dependencies.insert(path.clone());

        let mut source = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("could not load `{}`: {}", path.display(), e))?;

        let names: Vec<String> = if explicit.is_empty() {
            path.extension()
                .and_then(|ext| self.rules.get(ext.to_string_lossy().as_ref()))
                .cloned()
                .unwrap_or_default()
        } else {
            explicit
        };

        for name in names.iter().rev() {
            let loader = self
                .loaders
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("unknown loader `{name}`"))?;
            let mut cx = LoaderContext {
                resource: &path,
                dependencies: &mut *dependencies,
                emitted: &mut *emitted,
            };
            source = loader
                .load(source, &mut cx)
                .map_err(|e| e.context(format!("loader `{name}` failed on `{}`", path.display())))?;
        }

        let mut stack = vec![path.clone()];
        expand_includes(&source, &path, &mut stack, dependencies)
    }
}

impl ChildCompiler for FsChildCompiler {
    fn compile<'a>(
        &'a self,
        request: &'a ChildCompileRequest,
    ) -> BoxFuture<'a, anyhow::Result<ChildCompileOutput>> {
        let compiler = self.clone();
        let request = request.clone();
        Box::pin(async move {
            let output =
                tokio::task::spawn_blocking(move || compiler.compile_blocking(&request)).await?;
            Ok(output)
        })
    }
}

/// `a!b!path` -> (`[a, b]`, `path`)
fn split_request(id: &str) -> (Vec<String>, &str) {
    let mut parts: Vec<&str> = id.split('!').collect();
    let resource = parts.pop().unwrap_or(id);
    let loaders = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    (loaders, resource)
}

fn expand_includes(
    source: &str,
    file: &Path,
    stack: &mut Vec<PathBuf>,
    dependencies: &mut BTreeSet<PathBuf>,
) -> anyhow::Result<String> {
    let base = file.parent().unwrap_or(Path::new(""));
    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for caps in INCLUDE.captures_iter(source) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let path = base.join(target.as_str());
        dependencies.insert(path.clone());

        if stack.contains(&path) {
            anyhow::bail!("include cycle through `{}`", path.display());
        }
        let included = std::fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!(
                "could not include `{}` from `{}`: {}",
                path.display(),
                file.display(),
                e
            )
        })?;

        stack.push(path.clone());
        let expanded = expand_includes(&included, &path, stack, dependencies)?;
        stack.pop();

        out.push_str(&source[last..whole.start()]);
        out.push_str(&expanded);
        last = whole.end();
    }

    out.push_str(&source[last..]);
    Ok(out)
}

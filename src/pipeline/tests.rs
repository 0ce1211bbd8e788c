//! Scenario tests driving whole builds through `HtmlPlugin`.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::BoxFuture;
use crate::child::{ChildCompileOutput, ChildCompileRequest, Loader, LoaderContext};
use crate::compilation::{BuildMode, Entrypoint};
use crate::config::{Chunks, Inject, PublicPath, SortMode, TemplateParameters};
use crate::hooks::Stage;
use crate::template::TemplateOutput;

/// Counts nested builds and delegates to the disk compiler.
struct Counting {
    inner: FsChildCompiler,
    calls: AtomicUsize,
}

impl Counting {
    fn new(inner: FsChildCompiler) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChildCompiler for Counting {
    fn compile<'a>(
        &'a self,
        request: &'a ChildCompileRequest,
    ) -> BoxFuture<'a, anyhow::Result<ChildCompileOutput>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compile(request)
    }
}

fn plugin(dir: &TempDir, documents: Vec<HtmlOptions>) -> (HtmlPlugin, Arc<Counting>) {
    let compiler = Counting::new(FsChildCompiler::new());
    let plugin = HtmlPlugin::builder(dir.path())
        .documents(documents)
        .child_compiler(Arc::clone(&compiler) as Arc<dyn ChildCompiler>)
        .build()
        .unwrap();
    (plugin, compiler)
}

fn build() -> Arc<BuildContext> {
    Arc::new(BuildContext::new(
        Compilation::new("h4sh", "/out")
            .with_entry(Entrypoint::new("main", ["main.js", "main.css"])),
    ))
}

fn page(dir: &TempDir, name: &str, content: &str) {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn html_of(ctx: &BuildContext, name: &str) -> String {
    ctx.compilation().asset_text(name).unwrap()
}

fn with_template(filename: &str, template: &str) -> HtmlOptions {
    HtmlOptions {
        template: template.into(),
        ..HtmlOptions::new(filename)
    }
}

const PAGE: &str = "<html><head><title>{{htmlPlugin.options.title}}</title></head><body></body></html>";

// ============================================================================
// Rendering
// ============================================================================

#[tokio::test]
async fn test_default_template_document() {
    let dir = TempDir::new().unwrap();
    let (plugin, _) = plugin(&dir, vec![HtmlOptions::default()]);
    let ctx = build();

    let results = plugin.process(&ctx).await.unwrap();
    assert_eq!(results, vec![EmitResult {
        output_name: "index.html".into(),
        outcome: EmitOutcome::Emitted,
    }]);

    let html = html_of(&ctx, "index.html");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Bundle App</title>"));
    assert!(html.contains(r#"<link href="main.css" rel="stylesheet"></head>"#));
    assert!(html.contains(r#"<script src="main.js"></script></body>"#));
    assert!(ctx.compilation().errors().is_empty());
}

#[tokio::test]
async fn test_auto_template_prefers_src_index() {
    let dir = TempDir::new().unwrap();
    page(&dir, "src/index.html", PAGE);
    let (plugin, _) = plugin(&dir, vec![HtmlOptions {
        title: "Mine".into(),
        ..HtmlOptions::default()
    }]);
    let ctx = build();

    plugin.process(&ctx).await.unwrap();
    assert_eq!(
        html_of(&ctx, "index.html"),
        r#"<html><head><title>Mine</title><link href="main.css" rel="stylesheet"></head><body><script src="main.js"></script></body></html>"#
    );
    assert!(
        ctx.compilation()
            .file_dependencies()
            .contains(&dir.path().join("src/index.html"))
    );
}

#[tokio::test]
async fn test_inject_targets() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<head></head><body></body>");
    let (plugin, _) = plugin(&dir, vec![
        HtmlOptions {
            inject: Inject::Disabled,
            ..with_template("off.html", "page.html")
        },
        HtmlOptions {
            inject: Inject::Head,
            ..with_template("head.html", "page.html")
        },
    ]);
    let ctx = build();

    plugin.process(&ctx).await.unwrap();
    assert_eq!(html_of(&ctx, "off.html"), "<head></head><body></body>");
    assert_eq!(
        html_of(&ctx, "head.html"),
        r#"<head><link href="main.css" rel="stylesheet"><script src="main.js"></script></head><body></body>"#
    );
}

#[tokio::test]
async fn test_per_entry_documents() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let (plugin, _) = plugin(&dir, vec![with_template("[name].html", "page.html")]);
    let ctx = Arc::new(BuildContext::new(
        Compilation::new("h", "/out")
            .with_entry(Entrypoint::new("a", ["a.js"]))
            .with_entry(Entrypoint::new("b", ["b.js"])),
    ));

    let results = plugin.process(&ctx).await.unwrap();
    let names: Vec<_> = results.iter().map(|r| r.output_name.as_str()).collect();
    assert_eq!(names, vec!["a.html", "b.html"]);
    assert_eq!(html_of(&ctx, "a.html"), r#"<body><script src="a.js"></script></body>"#);
    assert_eq!(html_of(&ctx, "b.html"), r#"<body><script src="b.js"></script></body>"#);
}

#[tokio::test]
async fn test_chunk_filtering_and_manual_sort() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let (plugin, _) = plugin(&dir, vec![HtmlOptions {
        chunks: Chunks::Only(vec!["c".into(), "b".into(), "a".into()]),
        exclude_chunks: vec!["c".into()],
        chunks_sort_mode: SortMode::Manual,
        ..with_template("index.html", "page.html")
    }]);
    let ctx = Arc::new(BuildContext::new(
        Compilation::new("h", "/out")
            .with_entry(Entrypoint::new("a", ["a.js"]))
            .with_entry(Entrypoint::new("b", ["b.js"]))
            .with_entry(Entrypoint::new("c", ["c.js"])),
    ));

    plugin.process(&ctx).await.unwrap();
    assert_eq!(
        html_of(&ctx, "index.html"),
        r#"<body><script src="b.js"></script><script src="a.js"></script></body>"#
    );
}

#[tokio::test]
async fn test_favicon_public_path_and_hash() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<head></head>");
    page(&dir, "favicon.ico", "icon");
    let (plugin, _) = plugin(&dir, vec![HtmlOptions {
        favicon: Some("favicon.ico".into()),
        public_path: PublicPath::Explicit("/static".into()),
        hash: true,
        ..with_template("index.html", "page.html")
    }]);
    let ctx = build();

    plugin.process(&ctx).await.unwrap();
    assert_eq!(
        html_of(&ctx, "index.html"),
        r#"<head><link rel="shortcut icon" href="/static/favicon.ico?h4sh"><link href="/static/main.css?h4sh" rel="stylesheet"></head><script src="/static/main.js?h4sh"></script>"#
    );
    assert!(ctx.compilation().has_asset("favicon.ico"));
}

#[tokio::test]
async fn test_relative_public_path_for_nested_document() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let (plugin, _) = plugin(&dir, vec![with_template("docs/guide/index.html", "page.html")]);
    let ctx = build();

    plugin.process(&ctx).await.unwrap();
    assert_eq!(
        html_of(&ctx, "docs/guide/index.html"),
        r#"<head><link href="../../main.css" rel="stylesheet"></head><body><script src="../../main.js"></script></body>"#
    );
}

#[tokio::test]
async fn test_template_hash_in_filename() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let (plugin, _) = plugin(&dir, vec![with_template("index.[templatehash:8].html", "page.html")]);
    let ctx = build();

    let results = plugin.process(&ctx).await.unwrap();
    let name = &results[0].output_name;
    assert_eq!(name.len(), "index.12345678.html".len());
    let html = html_of(&ctx, name);
    assert_eq!(name, &filename::resolve_hash_placeholders("index.[templatehash:8].html", &html));
}

#[tokio::test]
async fn test_template_content_and_parameters() {
    let dir = TempDir::new().unwrap();
    let (plugin, compiler) = plugin(&dir, vec![
        HtmlOptions {
            template_content: TemplateContent::dynamic(|params| {
                let first = params["htmlPlugin"]["files"]["js"][0].as_str().unwrap_or_default().to_string();
                TemplateOutput::deferred(async move {
                    anyhow::Ok(format!("<body data-first=\"{first}\"></body>"))
                })
            }),
            inject: Inject::Disabled,
            ..HtmlOptions::new("dynamic.html")
        },
        HtmlOptions {
            template_content: TemplateContent::Static("<p>static</p>".into()),
            inject: Inject::Disabled,
            ..HtmlOptions::new("static.html")
        },
    ]);
    let ctx = build();

    plugin.process(&ctx).await.unwrap();
    assert_eq!(html_of(&ctx, "dynamic.html"), r#"<body data-first="main.js"></body>"#);
    assert_eq!(html_of(&ctx, "static.html"), "<p>static</p>");
    assert_eq!(compiler.calls(), 0);
}

#[tokio::test]
async fn test_static_template_parameters() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<p>{{greeting}}</p>");
    let (plugin, _) = plugin(&dir, vec![HtmlOptions {
        template_parameters: TemplateParameters::from(json!({"greeting": "<hi>"})),
        inject: Inject::Disabled,
        ..with_template("index.html", "page.html")
    }]);
    let ctx = build();

    plugin.process(&ctx).await.unwrap();
    assert_eq!(html_of(&ctx, "index.html"), "<p>&lt;hi&gt;</p>");
}

#[tokio::test]
async fn test_minify_in_production() {
    let dir = TempDir::new().unwrap();
    let (dev_plugin, _) = plugin(&dir, vec![HtmlOptions::default()]);
    let (prod_plugin, _) = plugin(&dir, vec![HtmlOptions::default()]);

    let dev = build();
    dev_plugin.process(&dev).await.unwrap();

    let prod = Arc::new(BuildContext::new(
        Compilation::new("h4sh", "/out")
            .with_mode(BuildMode::Production)
            .with_entry(Entrypoint::new("main", ["main.js", "main.css"])),
    ));
    prod_plugin.process(&prod).await.unwrap();

    assert!(html_of(&prod, "index.html").len() < html_of(&dev, "index.html").len());
}

#[tokio::test]
async fn test_loader_files_are_emitted() {
    struct Stamp;

    impl Loader for Stamp {
        fn name(&self) -> &str {
            "stamp"
        }

        fn load(&self, source: String, cx: &mut LoaderContext<'_>) -> anyhow::Result<String> {
            cx.emit_file("stamp.txt", "stamped");
            Ok(source)
        }
    }

    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let plugin = HtmlPlugin::builder(dir.path())
        .document(with_template("index.html", "stamp!page.html"))
        .child_compiler(Arc::new(FsChildCompiler::new().with_loader(Stamp)))
        .build()
        .unwrap();
    let ctx = build();

    plugin.process(&ctx).await.unwrap();
    assert_eq!(ctx.compilation().asset_text("stamp.txt").as_deref(), Some("stamped"));
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn test_shared_template_compiled_once() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", PAGE);
    let (plugin, compiler) = plugin(&dir, vec![
        with_template("index.html", "page.html"),
        with_template("about.html", "page.html"),
        with_template("[name].html", "page.html"),
    ]);
    let ctx = build();

    let results = plugin.process(&ctx).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.outcome == EmitOutcome::Emitted));
    assert_eq!(compiler.calls(), 1);
    assert_eq!(plugin.template_cache().templates(), vec!["page.html"]);
}

#[tokio::test]
async fn test_unchanged_build_reuses_output() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", PAGE);
    let (plugin, compiler) = plugin(&dir, vec![
        with_template("index.html", "page.html"),
        with_template("about.html", "page.html"),
    ]);

    let first = build();
    plugin.process(&first).await.unwrap();

    let second = build();
    let results = plugin.process(&second).await.unwrap();
    assert!(results.iter().all(|r| r.outcome == EmitOutcome::Cached));
    assert_eq!(compiler.calls(), 1);
    assert_eq!(html_of(&second, "index.html"), html_of(&first, "index.html"));
}

#[tokio::test]
async fn test_cache_disabled_rerenders_without_recompiling() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", PAGE);
    let (plugin, compiler) = plugin(&dir, vec![HtmlOptions {
        cache: false,
        ..with_template("index.html", "page.html")
    }]);

    plugin.process(&build()).await.unwrap();
    let results = plugin.process(&build()).await.unwrap();
    assert_eq!(results[0].outcome, EmitOutcome::Emitted);
    assert_eq!(compiler.calls(), 1);
}

#[tokio::test]
async fn test_changed_assets_rerender() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", PAGE);
    let (plugin, _) = plugin(&dir, vec![with_template("index.html", "page.html")]);

    plugin.process(&build()).await.unwrap();

    let next = Arc::new(BuildContext::new(
        Compilation::new("h5sh", "/out")
            .with_entry(Entrypoint::new("main", ["main.2.js"])),
    ));
    let results = plugin.process(&next).await.unwrap();
    assert_eq!(results[0].outcome, EmitOutcome::Emitted);
    assert!(html_of(&next, "index.html").contains("main.2.js"));
}

#[tokio::test]
async fn test_changed_template_recompiles() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", PAGE);
    page(&dir, "other.html", "<p>other</p>");
    let (plugin, compiler) = plugin(&dir, vec![
        with_template("index.html", "page.html"),
        HtmlOptions {
            inject: Inject::Disabled,
            ..with_template("other.html", "other.html")
        },
    ]);

    plugin.process(&build()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    page(&dir, "page.html", "<html><head></head><body>v2</body></html>");

    let ctx = build();
    let results = plugin.process(&ctx).await.unwrap();
    assert_eq!(compiler.calls(), 2);
    assert_eq!(results[0].outcome, EmitOutcome::Emitted);
    // the sibling template's output did not change
    assert_eq!(results[1].outcome, EmitOutcome::Cached);
    assert!(html_of(&ctx, "index.html").contains("v2"));
}

// ============================================================================
// Hooks & Errors
// ============================================================================

fn record(log: &Arc<Mutex<Vec<String>>>, stage: Stage) {
    log.lock().push(stage.to_string());
}

#[tokio::test]
async fn test_hooks_fire_in_order() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", PAGE);
    let (plugin, _) = plugin(&dir, vec![with_template("index.html", "page.html")]);
    let ctx = build();
    let log = Arc::new(Mutex::new(Vec::new()));
    let hooks = ctx.hooks();

    let l = Arc::clone(&log);
    hooks.before_asset_tag_generation.tap_sync("log", move |p| {
        record(&l, Stage::BeforeAssetTagGeneration);
        Ok(p)
    });
    let l = Arc::clone(&log);
    hooks.alter_asset_tags.tap_sync("log", move |p| {
        record(&l, Stage::AlterAssetTags);
        Ok(p)
    });
    let l = Arc::clone(&log);
    hooks.alter_asset_tag_groups.tap_sync("log", move |p| {
        record(&l, Stage::AlterAssetTagGroups);
        Ok(p)
    });
    let l = Arc::clone(&log);
    hooks.after_template_execution.tap_sync("log", move |p| {
        record(&l, Stage::AfterTemplateExecution);
        Ok(p)
    });
    let l = Arc::clone(&log);
    hooks.before_emit.tap_sync("log", move |p| {
        record(&l, Stage::BeforeEmit);
        Ok(p)
    });
    let l = Arc::clone(&log);
    hooks.after_emit.tap_sync("log", move |p| {
        record(&l, Stage::AfterEmit);
        Ok(p)
    });

    plugin.process(&ctx).await.unwrap();
    let expected: Vec<String> = Stage::ALL.iter().map(|s| s.to_string()).collect();
    assert_eq!(*log.lock(), expected);
}

#[tokio::test]
async fn test_hooks_rewrite_tags_and_html() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let (plugin, _) = plugin(&dir, vec![with_template("index.html", "page.html")]);
    let ctx = build();

    ctx.hooks().alter_asset_tags.tap_sync("defer", |mut p| {
        for tag in &mut p.asset_tags.scripts {
            tag.set_attr("defer", true);
        }
        Ok(p)
    });
    ctx.hooks().before_emit.tap("banner", |mut p: crate::hooks::BeforeEmit| async move {
        p.html.insert_str(0, "<!-- built -->");
        anyhow::Ok(p)
    });

    plugin.process(&ctx).await.unwrap();
    assert_eq!(
        html_of(&ctx, "index.html"),
        r#"<!-- built --><head><link href="main.css" rel="stylesheet"></head><body><script src="main.js" defer></script></body>"#
    );
}

#[tokio::test]
async fn test_hook_failure_emits_error_page_for_that_document_only() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let (plugin, _) = plugin(&dir, vec![
        with_template("broken.html", "page.html"),
        with_template("fine.html", "page.html"),
    ]);
    let ctx = build();

    ctx.hooks().before_emit.tap_sync("picky", |p| {
        if p.output_name == "broken.html" {
            anyhow::bail!("refusing {}", p.output_name);
        }
        Ok(p)
    });

    let results = plugin.process(&ctx).await.unwrap();
    assert!(matches!(results[0].outcome, EmitOutcome::Failed(_)));
    assert_eq!(results[1].outcome, EmitOutcome::Emitted);

    let page = html_of(&ctx, "broken.html");
    assert!(page.starts_with("HtmlPlugin:\n<pre>\n"));
    assert!(page.contains("refusing broken.html"));

    let errors = ctx.compilation().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("`beforeEmit` handler `picky` failed"));
}

#[tokio::test]
async fn test_after_emit_failure_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let (plugin, _) = plugin(&dir, vec![with_template("index.html", "page.html")]);
    let ctx = build();
    ctx.hooks()
        .after_emit
        .tap_sync("flaky", |_| Err(anyhow::anyhow!("offline")));

    let results = plugin.process(&ctx).await.unwrap();
    assert_eq!(results[0].outcome, EmitOutcome::Emitted);
    assert!(ctx.compilation().errors().is_empty());
}

#[tokio::test]
async fn test_missing_template_without_show_errors() {
    let dir = TempDir::new().unwrap();
    let (plugin, _) = plugin(&dir, vec![HtmlOptions {
        show_errors: false,
        ..with_template("index.html", "src/missing.html")
    }]);
    let ctx = build();

    let results = plugin.process(&ctx).await.unwrap();
    assert!(matches!(results[0].outcome, EmitOutcome::Failed(_)));
    assert_eq!(html_of(&ctx, "index.html"), "ERROR");

    let errors = ctx.compilation().errors();
    assert!(errors[0].starts_with("HtmlPlugin: template `src/missing.html` failed to compile"));
    // creating the file later must trigger a rebuild
    assert!(
        ctx.compilation()
            .file_dependencies()
            .contains(&dir.path().join("src/missing.html"))
    );
}

#[tokio::test]
async fn test_failed_document_does_not_block_siblings() {
    let dir = TempDir::new().unwrap();
    page(&dir, "good.html", "<p>good</p>");
    page(&dir, "bad.html", "{{#if x}}never closed");
    let (plugin, compiler) = plugin(&dir, vec![
        HtmlOptions {
            inject: Inject::Disabled,
            ..with_template("good.html", "good.html")
        },
        with_template("bad.html", "bad.html"),
    ]);
    let ctx = build();

    let results = plugin.process(&ctx).await.unwrap();
    assert_eq!(compiler.calls(), 1);
    assert_eq!(results[0].outcome, EmitOutcome::Emitted);
    assert!(matches!(&results[1].outcome, EmitOutcome::Failed(msg) if msg.contains("failed to compile")));
    assert_eq!(html_of(&ctx, "good.html"), "<p>good</p>");
}

#[tokio::test]
async fn test_undefined_binding_is_evaluation_error() {
    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<p>{{process.env}}</p>");
    let (plugin, _) = plugin(&dir, vec![with_template("index.html", "page.html")]);
    let ctx = build();

    let results = plugin.process(&ctx).await.unwrap();
    let EmitOutcome::Failed(message) = &results[0].outcome else {
        panic!("expected failure");
    };
    assert!(message.contains("failed to evaluate"));
    assert!(message.contains("process"));
}

#[tokio::test]
async fn test_nested_build_crash_is_reported_as_warning() {
    struct Crashing;

    impl ChildCompiler for Crashing {
        fn compile<'a>(
            &'a self,
            _: &'a ChildCompileRequest,
        ) -> BoxFuture<'a, anyhow::Result<ChildCompileOutput>> {
            Box::pin(async { Err(anyhow::anyhow!("compiler process exited")) })
        }
    }

    let dir = TempDir::new().unwrap();
    page(&dir, "page.html", "<body></body>");
    let plugin = HtmlPlugin::builder(dir.path())
        .documents(vec![with_template("index.html", "page.html")])
        .child_compiler(Arc::new(Crashing))
        .build()
        .unwrap();
    let ctx = build();

    let results = plugin.process(&ctx).await.unwrap();
    assert!(matches!(&results[0].outcome, EmitOutcome::Failed(msg) if msg.contains("compiler process exited")));

    let warnings = ctx.compilation().warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("HtmlPlugin: nested build:"));
    assert!(warnings[0].contains("compiler process exited"));
}

#[test]
fn test_invalid_options_rejected() {
    let err = HtmlPlugin::new("/project", [HtmlOptions {
        template: "src/page.html".into(),
        template_content: TemplateContent::Static("<p></p>".into()),
        ..HtmlOptions::default()
    }])
    .err()
    .unwrap();
    assert!(matches!(err, HtmlError::Config(_)));
}

//! bundle-html - HTML documents for bundler builds.
//!
//! Turns a template into one or more output documents per build and injects
//! the build's script, stylesheet, favicon and app-cache references into it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  register   ┌──────────────────┐  nested build  ┌───────────────┐
//! │  HtmlPlugin   │ ──────────▶ │  TemplateCache   │ ─────────────▶ │ ChildCompiler │
//! │ (per document)│ ◀────────── │ (snapshot-gated) │ ◀───────────── │  (host/fs)    │
//! └──────┬────────┘  artifacts  └──────────────────┘  sources+deps  └───────────────┘
//!        │
//!        ▼  beforeAssetTagGeneration → alterAssetTags → alterAssetTagGroups
//!           → afterTemplateExecution → beforeEmit → afterEmit
//! ```
//!
//! - [`HtmlPlugin`]: orchestrates every configured document of a build
//! - [`TemplateCache`]: memoized nested build, invalidated by file snapshots
//! - [`HtmlHooks`]: per-build waterfall stages for extensions
//! - [`pipeline::inject`]: string-level tag injection into rendered markup

pub mod logger;

pub mod asset;
pub mod child;
pub mod compilation;
pub mod config;
pub mod entry;
pub mod error;
pub mod freshness;
pub mod hooks;
pub mod minify;
pub mod pipeline;
pub mod tag;
pub mod template;
pub mod utils;

use std::future::Future;
use std::pin::Pin;

pub use child::{ChildCompiler, FsChildCompiler, Loader, TemplateArtifact, TemplateCache};
pub use compilation::{BuildContext, BuildMode, Compilation};
pub use config::{HtmlOptions, Inject, ScriptLoading};
pub use error::HtmlError;
pub use hooks::{HtmlHooks, Stage};
pub use pipeline::{EmitOutcome, EmitResult, HtmlPlugin};
pub use tag::{AttrValue, HtmlTag};

/// Name used as the prefix of recorded diagnostics and error pages.
pub const PLUGIN_NAME: &str = "HtmlPlugin";

/// Owned, sendable future used at every async trait seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

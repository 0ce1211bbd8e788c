//! Extension points.
//!
//! Each build owns one [`HtmlHooks`] set (see
//! [`BuildContext::hooks`](crate::BuildContext::hooks)). Every stage is an
//! explicit list of named async handlers called in registration order; each
//! handler receives the payload returned by the previous one.
//!
//! ```text
//! beforeAssetTagGeneration → alterAssetTags → alterAssetTagGroups
//!     → afterTemplateExecution → beforeEmit → afterEmit
//! ```

mod payload;

pub use payload::{
    AfterEmit, AfterTemplateExecution, AlterAssetTagGroups, AlterAssetTags,
    BeforeAssetTagGeneration, BeforeEmit,
};

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::BoxFuture;
use crate::error::HtmlError;

// ============================================================================
// Stage
// ============================================================================

/// One of the six fixed extension points, in firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    BeforeAssetTagGeneration,
    AlterAssetTags,
    AlterAssetTagGroups,
    AfterTemplateExecution,
    BeforeEmit,
    AfterEmit,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::BeforeAssetTagGeneration,
        Stage::AlterAssetTags,
        Stage::AlterAssetTagGroups,
        Stage::AfterTemplateExecution,
        Stage::BeforeEmit,
        Stage::AfterEmit,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeAssetTagGeneration => "beforeAssetTagGeneration",
            Self::AlterAssetTags => "alterAssetTags",
            Self::AlterAssetTagGroups => "alterAssetTagGroups",
            Self::AfterTemplateExecution => "afterTemplateExecution",
            Self::BeforeEmit => "beforeEmit",
            Self::AfterEmit => "afterEmit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Waterfall
// ============================================================================

type Handler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Sequential payload-transforming pipeline for one stage.
pub struct AsyncWaterfall<T> {
    stage: Stage,
    handlers: RwLock<Vec<(String, Handler<T>)>>,
}

impl<T: Send + 'static> AsyncWaterfall<T> {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Register an async handler after the existing ones.
    pub fn tap<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let handler: Handler<T> = Arc::new(move |payload| Box::pin(handler(payload)));
        self.handlers.write().push((name.into(), handler));
    }

    /// Register a synchronous handler.
    pub fn tap_sync<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(T) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.tap(name, move |payload| {
            let handler = Arc::clone(&handler);
            async move { handler(payload) }
        });
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Run every handler in order. The first failure aborts the stage.
    pub async fn call(&self, payload: T) -> Result<T, HtmlError> {
        // handlers tapped while running only apply to later calls
        let handlers = self.handlers.read().clone();

        let mut payload = payload;
        for (name, handler) in handlers {
            payload = handler(payload).await.map_err(|source| HtmlError::Hook {
                stage: self.stage,
                handler: name,
                source,
            })?;
        }
        Ok(payload)
    }
}

impl<T> fmt::Debug for AsyncWaterfall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.handlers.read().iter().map(|(n, _)| n.clone()).collect();
        f.debug_struct("AsyncWaterfall")
            .field("stage", &self.stage)
            .field("handlers", &names)
            .finish()
    }
}

// ============================================================================
// HtmlHooks
// ============================================================================

/// The six stages of one build.
#[derive(Debug)]
pub struct HtmlHooks {
    pub before_asset_tag_generation: AsyncWaterfall<BeforeAssetTagGeneration>,
    pub alter_asset_tags: AsyncWaterfall<AlterAssetTags>,
    pub alter_asset_tag_groups: AsyncWaterfall<AlterAssetTagGroups>,
    pub after_template_execution: AsyncWaterfall<AfterTemplateExecution>,
    pub before_emit: AsyncWaterfall<BeforeEmit>,
    pub after_emit: AsyncWaterfall<AfterEmit>,
}

impl HtmlHooks {
    pub fn new() -> Self {
        Self {
            before_asset_tag_generation: AsyncWaterfall::new(Stage::BeforeAssetTagGeneration),
            alter_asset_tags: AsyncWaterfall::new(Stage::AlterAssetTags),
            alter_asset_tag_groups: AsyncWaterfall::new(Stage::AlterAssetTagGroups),
            after_template_execution: AsyncWaterfall::new(Stage::AfterTemplateExecution),
            before_emit: AsyncWaterfall::new(Stage::BeforeEmit),
            after_emit: AsyncWaterfall::new(Stage::AfterEmit),
        }
    }
}

impl Default for HtmlHooks {
    fn default() -> Self {
        Self::new()
    }
}

//! Stage payloads.
//!
//! Handlers take the payload by value and return it, possibly modified.

use std::sync::Arc;

use crate::asset::AssetBundle;
use crate::config::HtmlOptions;
use crate::tag::{AssetTags, HtmlTag};

#[derive(Debug, Clone)]
pub struct BeforeAssetTagGeneration {
    pub assets: AssetBundle,
    pub output_name: String,
    pub options: Arc<HtmlOptions>,
}

#[derive(Debug, Clone)]
pub struct AlterAssetTags {
    pub asset_tags: AssetTags,
    pub public_path: String,
    pub output_name: String,
    pub options: Arc<HtmlOptions>,
}

#[derive(Debug, Clone)]
pub struct AlterAssetTagGroups {
    pub head_tags: Vec<HtmlTag>,
    pub body_tags: Vec<HtmlTag>,
    pub public_path: String,
    pub output_name: String,
    pub options: Arc<HtmlOptions>,
}

#[derive(Debug, Clone)]
pub struct AfterTemplateExecution {
    pub html: String,
    pub head_tags: Vec<HtmlTag>,
    pub body_tags: Vec<HtmlTag>,
    pub output_name: String,
    pub options: Arc<HtmlOptions>,
}

#[derive(Debug, Clone)]
pub struct BeforeEmit {
    pub html: String,
    pub output_name: String,
    pub options: Arc<HtmlOptions>,
}

#[derive(Debug, Clone)]
pub struct AfterEmit {
    pub output_name: String,
    pub options: Arc<HtmlOptions>,
}

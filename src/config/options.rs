//! Option value types.
//!
//! Most options accept several JSON shapes (`true`, `"head"`, an object, ...).
//! Each type here deserializes from every accepted shape and serializes back
//! to the same shape, so the options can be handed to templates verbatim.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::BoxFuture;
use crate::compilation::BuildMode;
use crate::minify::MinifyOptions;
use crate::pipeline::params::TemplateParamsInput;
use crate::template::TemplateOutput;

/// Marker serialized in place of user callbacks.
const FUNCTION_MARKER: &str = "[function]";

// ============================================================================
// Inject
// ============================================================================

/// Where generated tags go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inject {
    /// `true`: head tags into `<head>`, scripts before `</body>`.
    #[default]
    Auto,
    /// `false`: leave the rendered markup untouched.
    Disabled,
    /// `"head"`: scripts go into `<head>` too.
    Head,
    /// `"body"`: same placement as `Auto`.
    Body,
}

impl Inject {
    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    pub fn scripts_in_head(self) -> bool {
        self == Self::Head
    }
}

impl<'de> Deserialize<'de> for Inject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Target(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Self::Auto),
            Raw::Flag(false) => Ok(Self::Disabled),
            Raw::Target(target) => match target.as_str() {
                "head" => Ok(Self::Head),
                "body" => Ok(Self::Body),
                other => Err(D::Error::custom(format!("unknown inject target `{other}`"))),
            },
        }
    }
}

impl Serialize for Inject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_bool(true),
            Self::Disabled => serializer.serialize_bool(false),
            Self::Head => serializer.serialize_str("head"),
            Self::Body => serializer.serialize_str("body"),
        }
    }
}

// ============================================================================
// Script Loading
// ============================================================================

/// How generated `<script>` tags load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptLoading {
    #[default]
    Blocking,
    Defer,
    Module,
    SystemjsModule,
}

// ============================================================================
// Public Path
// ============================================================================

/// Prefix for every generated asset URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PublicPath {
    /// Use the build's declared public path, else a path relative to the document.
    #[default]
    Auto,
    Explicit(String),
}

impl<'de> Deserialize<'de> for PublicPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "auto" {
            Self::Auto
        } else {
            Self::Explicit(raw)
        })
    }
}

impl Serialize for PublicPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Explicit(prefix) => serializer.serialize_str(prefix),
        }
    }
}

// ============================================================================
// Chunks
// ============================================================================

/// Entry include list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Chunks {
    #[default]
    All,
    Only(Vec<String>),
}

impl<'de> Deserialize<'de> for Chunks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Keyword(String),
            List(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Keyword(k) if k == "all" => Ok(Self::All),
            Raw::Keyword(k) => Err(D::Error::custom(format!(
                "chunks must be \"all\" or a list, got `{k}`"
            ))),
            Raw::List(list) => Ok(Self::Only(list)),
        }
    }
}

impl Serialize for Chunks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::Only(list) => list.serialize(serializer),
        }
    }
}

// ============================================================================
// Sort Mode
// ============================================================================

/// User comparator for `chunksSortMode`.
pub type EntryComparator = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// `chunksSortMode` as configured.
///
/// Unknown names are kept so validation can report them with their option path.
#[derive(Clone, Default)]
pub enum SortMode {
    #[default]
    Auto,
    None,
    Manual,
    Custom(EntryComparator),
    Unknown(String),
}

impl SortMode {
    pub fn custom(compare: impl Fn(&str, &str) -> Ordering + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(compare))
    }
}

impl From<String> for SortMode {
    fn from(name: String) -> Self {
        match name.as_str() {
            "auto" => Self::Auto,
            "none" => Self::None,
            "manual" => Self::Manual,
            _ => Self::Unknown(name),
        }
    }
}

impl<'de> Deserialize<'de> for SortMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for SortMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::None => serializer.serialize_str("none"),
            Self::Manual => serializer.serialize_str("manual"),
            Self::Custom(_) => serializer.serialize_str(FUNCTION_MARKER),
            Self::Unknown(name) => serializer.serialize_str(name),
        }
    }
}

impl fmt::Debug for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::None => f.write_str("None"),
            Self::Manual => f.write_str("Manual"),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Unknown(name) => f.debug_tuple("Unknown").field(name).finish(),
        }
    }
}

// ============================================================================
// Minify
// ============================================================================

/// `minify` toggle or options object.
#[derive(Debug, Clone, Default)]
pub enum Minify {
    /// Default options in production builds, off otherwise.
    #[default]
    Auto,
    Enabled(bool),
    Options(MinifyOptions),
}

impl Minify {
    /// Options handed to the minifier, if any.
    pub fn resolve(&self, mode: BuildMode) -> Option<MinifyOptions> {
        match self {
            Self::Auto if mode.is_production() => Some(MinifyOptions::default()),
            Self::Auto | Self::Enabled(false) => None,
            Self::Enabled(true) => Some(MinifyOptions::default()),
            Self::Options(options) => Some(options.clone()),
        }
    }
}

impl<'de> Deserialize<'de> for Minify {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Keyword(String),
            Options(MinifyOptions),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(flag) => Ok(Self::Enabled(flag)),
            Raw::Keyword(k) if k == "auto" => Ok(Self::Auto),
            Raw::Keyword(k) => Err(D::Error::custom(format!(
                "minify must be \"auto\", a boolean or an options object, got `{k}`"
            ))),
            Raw::Options(options) => Ok(Self::Options(options)),
        }
    }
}

impl Serialize for Minify {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Enabled(flag) => serializer.serialize_bool(*flag),
            Self::Options(options) => options.serialize(serializer),
        }
    }
}

// ============================================================================
// Template Content
// ============================================================================

/// Callback producing the document markup from the template parameters.
pub type TemplateContentFn = Arc<dyn Fn(Value) -> TemplateOutput + Send + Sync>;

/// Inline markup used instead of a compiled template.
#[derive(Clone, Default)]
pub enum TemplateContent {
    #[default]
    Disabled,
    Static(String),
    Dynamic(TemplateContentFn),
}

impl TemplateContent {
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Build from a synchronous or deferred callback.
    pub fn dynamic(render: impl Fn(Value) -> TemplateOutput + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(render))
    }
}

impl<'de> Deserialize<'de> for TemplateContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Ok(Self::Disabled),
            Raw::Flag(true) => Err(D::Error::custom(
                "templateContent must be false, a string or a function",
            )),
            Raw::Text(text) => Ok(Self::Static(text)),
        }
    }
}

impl Serialize for TemplateContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Disabled => serializer.serialize_bool(false),
            Self::Static(text) => serializer.serialize_str(text),
            Self::Dynamic(_) => serializer.serialize_str(FUNCTION_MARKER),
        }
    }
}

impl fmt::Debug for TemplateContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

// ============================================================================
// Template Parameters
// ============================================================================

/// Callback computing the full template parameter object.
pub type TemplateParamsFn =
    Arc<dyn Fn(TemplateParamsInput) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// `templateParameters` as configured.
#[derive(Clone, Default)]
pub enum TemplateParameters {
    /// `true`: the default parameter object.
    #[default]
    Default,
    /// `false`: an empty parameter object.
    Disabled,
    /// Object merged over the defaults.
    Static(Map<String, Value>),
    Dynamic(TemplateParamsFn),
    /// Any other JSON shape; rejected by validation.
    Unsupported(Value),
}

impl TemplateParameters {
    pub fn dynamic<F, Fut>(compute: F) -> Self
    where
        F: Fn(TemplateParamsInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::Dynamic(Arc::new(move |input| Box::pin(compute(input))))
    }
}

impl From<Value> for TemplateParameters {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(true) => Self::Default,
            Value::Bool(false) => Self::Disabled,
            Value::Object(map) => Self::Static(map),
            other => Self::Unsupported(other),
        }
    }
}

impl<'de> Deserialize<'de> for TemplateParameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for TemplateParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Default => serializer.serialize_bool(true),
            Self::Disabled => serializer.serialize_bool(false),
            Self::Static(map) => map.serialize(serializer),
            Self::Dynamic(_) => serializer.serialize_str(FUNCTION_MARKER),
            Self::Unsupported(value) => value.serialize(serializer),
        }
    }
}

impl fmt::Debug for TemplateParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Static(map) => f.debug_tuple("Static").field(map).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::Unsupported(value) => f.debug_tuple("Unsupported").field(value).finish(),
        }
    }
}

//! Initial tag lists from assets and options.

use serde_json::{Map, Value};

use super::{AttrValue, HtmlTag};
use crate::config::{ConfigError, ScriptLoading};

/// One `<script>` per URL.
pub fn script_tags(urls: &[String], loading: ScriptLoading) -> Vec<HtmlTag> {
    urls.iter()
        .map(|src| {
            let mut tag = HtmlTag::new("script");
            match loading {
                ScriptLoading::Blocking => {}
                ScriptLoading::Defer => tag.set_attr("defer", true),
                ScriptLoading::Module => tag.set_attr("type", "module"),
                ScriptLoading::SystemjsModule => tag.set_attr("type", "systemjs-module"),
            }
            tag.set_attr("src", src.as_str());
            tag
        })
        .collect()
}

/// One `<link rel="stylesheet">` per URL.
pub fn style_tags(urls: &[String]) -> Vec<HtmlTag> {
    urls.iter()
        .map(|href| {
            HtmlTag::new("link")
                .with_attr("href", href.as_str())
                .with_attr("rel", "stylesheet")
        })
        .collect()
}

/// `<meta>` tags from `name -> content | false | attribute object`.
///
/// `false` entries produce no tag.
pub fn meta_tags(meta: &Map<String, Value>) -> Result<Vec<HtmlTag>, ConfigError> {
    let mut tags = Vec::with_capacity(meta.len());

    for (name, value) in meta {
        match value {
            Value::Bool(false) => {}
            Value::String(content) => tags.push(
                HtmlTag::new("meta")
                    .with_attr("name", name.as_str())
                    .with_attr("content", content.as_str()),
            ),
            Value::Object(attributes) => {
                let mut tag = HtmlTag::new("meta");
                tag.attributes = attributes_from_object(attributes)
                    .map_err(|e| ConfigError::Validation(format!("meta `{name}`: {e}")))?;
                tags.push(tag);
            }
            other => {
                return Err(ConfigError::Validation(format!(
                    "meta `{name}` must be a string, false or an attribute object, got `{other}`"
                )));
            }
        }
    }

    Ok(tags)
}

/// `<base>` from `false`, an href string, or an attribute object.
pub fn base_tag(base: &Value) -> Result<Option<HtmlTag>, ConfigError> {
    match base {
        Value::Bool(false) | Value::Null => Ok(None),
        Value::String(href) => Ok(Some(HtmlTag::new("base").with_attr("href", href.as_str()))),
        Value::Object(attributes) => {
            let mut tag = HtmlTag::new("base");
            tag.attributes = attributes_from_object(attributes)
                .map_err(|e| ConfigError::Validation(format!("base: {e}")))?;
            Ok(Some(tag))
        }
        other => Err(ConfigError::Validation(format!(
            "base must be false, an href string or an attribute object, got `{other}`"
        ))),
    }
}

/// `<link rel="shortcut icon">` for a resolved favicon URL.
pub fn favicon_tag(href: &str) -> HtmlTag {
    HtmlTag::new("link")
        .with_attr("rel", "shortcut icon")
        .with_attr("href", href)
}

fn attributes_from_object(object: &Map<String, Value>) -> Result<Vec<(String, AttrValue)>, String> {
    object
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Bool(flag) => AttrValue::Flag(*flag),
                Value::String(text) => AttrValue::Text(text.clone()),
                Value::Number(n) => AttrValue::Text(n.to_string()),
                other => return Err(format!("attribute `{name}` has unsupported value `{other}`")),
            };
            Ok((name.clone(), value))
        })
        .collect()
}

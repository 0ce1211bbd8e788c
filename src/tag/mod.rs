//! Tag model.
//!
//! An [`HtmlTag`] is one element to inject, kept as data until it is
//! serialized into the document:
//!
//! - attribute `false` omits the attribute
//! - attribute `true` renders bare (`defer`), or `defer="defer"` in xhtml mode
//! - void elements never get a closing tag, and close with `/>` in xhtml mode

pub mod generate;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::utils::html::escape_quotes;

/// Elements that never have content or a closing tag.
const VOID_TAGS: [&str; 15] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Check whether `tag` is a void element.
#[inline]
pub fn is_void_element(tag: &str) -> bool {
    VOID_TAGS.contains(&tag.to_ascii_lowercase().as_str())
}

// ============================================================================
// Attribute Value
// ============================================================================

/// Value of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Text(String),
}

impl From<bool> for AttrValue {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

// ============================================================================
// HtmlTag
// ============================================================================

/// One HTML element to inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    tag_name: String,
    void_tag: bool,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, AttrValue)>,
    pub inner_html: Option<String>,
}

impl HtmlTag {
    pub fn new(tag_name: impl Into<String>) -> Self {
        let tag_name = tag_name.into();
        let void_tag = is_void_element(&tag_name);
        Self {
            tag_name,
            void_tag,
            attributes: Vec::new(),
            inner_html: None,
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_inner_html(mut self, html: impl Into<String>) -> Self {
        self.inner_html = Some(html.into());
        self
    }

    /// Set an attribute, replacing an existing one in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Text value of an attribute, if it has one.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        match self.attr(name)? {
            AttrValue::Text(text) => Some(text),
            AttrValue::Flag(_) => None,
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn is_void(&self) -> bool {
        self.void_tag
    }

    /// Serialize to markup.
    pub fn to_html(&self, xhtml: bool) -> String {
        let mut out = String::with_capacity(32);
        out.push('<');
        out.push_str(&self.tag_name);

        for (name, value) in &self.attributes {
            match value {
                AttrValue::Flag(false) => {}
                AttrValue::Flag(true) if xhtml => {
                    out.push_str(&format!(" {name}=\"{name}\""));
                }
                AttrValue::Flag(true) => {
                    out.push(' ');
                    out.push_str(name);
                }
                AttrValue::Text(text) => {
                    out.push_str(&format!(" {name}=\"{}\"", escape_quotes(text)));
                }
            }
        }

        if self.void_tag && xhtml {
            out.push('/');
        }
        out.push('>');

        if let Some(inner) = &self.inner_html {
            out.push_str(inner);
        }
        if !self.void_tag {
            out.push_str(&format!("</{}>", self.tag_name));
        }
        out
    }

    /// Rebuild a tag from its serialized JSON form.
    ///
    /// Templates receive tags as objects; this lets them print as markup.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut tag = Self::new(object.get("tagName")?.as_str()?);

        if let Some(Value::Object(attributes)) = object.get("attributes") {
            for (name, value) in attributes {
                let value = match value {
                    Value::Bool(flag) => AttrValue::Flag(*flag),
                    Value::String(text) => AttrValue::Text(text.clone()),
                    Value::Null => continue,
                    other => AttrValue::Text(other.to_string()),
                };
                tag.attributes.push((name.clone(), value));
            }
        }

        tag.inner_html = object
            .get("innerHTML")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(tag)
    }
}

impl Serialize for HtmlTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Attributes<'a>(&'a [(String, AttrValue)]);

        impl Serialize for Attributes<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (name, value) in self.0 {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("tagName", &self.tag_name)?;
        map.serialize_entry("voidTag", &self.void_tag)?;
        map.serialize_entry("attributes", &Attributes(&self.attributes))?;
        map.serialize_entry("innerHTML", &self.inner_html)?;
        map.end()
    }
}

/// Serialize a tag list back to back.
pub fn render_tags(tags: &[HtmlTag], xhtml: bool) -> String {
    tags.iter().map(|tag| tag.to_html(xhtml)).collect()
}

// ============================================================================
// Tag Groups
// ============================================================================

/// Tags by kind, before grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTags {
    pub scripts: Vec<HtmlTag>,
    pub styles: Vec<HtmlTag>,
    pub meta: Vec<HtmlTag>,
}

/// Tags by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagGroups {
    pub head_tags: Vec<HtmlTag>,
    pub body_tags: Vec<HtmlTag>,
}

impl TagGroups {
    /// Meta and styles go to the head; scripts to the body unless `scripts_in_head`.
    pub fn from_asset_tags(tags: AssetTags, scripts_in_head: bool) -> Self {
        let mut head_tags = tags.meta;
        head_tags.extend(tags.styles);

        let body_tags = if scripts_in_head {
            head_tags.extend(tags.scripts);
            Vec::new()
        } else {
            tags.scripts
        };

        Self {
            head_tags,
            body_tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_tag() {
        let tag = HtmlTag::new("script").with_attr("src", "x.js");
        assert_eq!(tag.to_html(false), r#"<script src="x.js"></script>"#);
        assert!(!tag.is_void());
    }

    #[test]
    fn test_boolean_attributes() {
        let tag = HtmlTag::new("script")
            .with_attr("defer", true)
            .with_attr("async", false)
            .with_attr("src", "a.js");
        assert_eq!(tag.to_html(false), r#"<script defer src="a.js"></script>"#);
        assert_eq!(
            tag.to_html(true),
            r#"<script defer="defer" src="a.js"></script>"#
        );
    }

    #[test]
    fn test_void_tag_xhtml() {
        let tag = HtmlTag::new("link")
            .with_attr("rel", "stylesheet")
            .with_attr("href", "a.css");
        assert_eq!(tag.to_html(false), r#"<link rel="stylesheet" href="a.css">"#);
        assert_eq!(tag.to_html(true), r#"<link rel="stylesheet" href="a.css"/>"#);
    }

    #[test]
    fn test_set_attr_replaces_in_place() {
        let mut tag = HtmlTag::new("meta").with_attr("name", "a").with_attr("content", "b");
        tag.set_attr("name", "c");
        assert_eq!(tag.to_html(false), r#"<meta name="c" content="b">"#);
    }

    #[test]
    fn test_inner_html() {
        let tag = HtmlTag::new("style").with_inner_html("body{}");
        assert_eq!(tag.to_html(false), "<style>body{}</style>");
    }

    #[test]
    fn test_value_roundtrip_renders_same() {
        let tag = HtmlTag::new("script")
            .with_attr("type", "module")
            .with_attr("src", "m.js");
        let value = serde_json::to_value(&tag).unwrap();
        assert_eq!(value["tagName"], json!("script"));
        assert_eq!(value["attributes"]["type"], json!("module"));

        let back = HtmlTag::from_value(&value).unwrap();
        assert_eq!(back.to_html(false), tag.to_html(false));
    }

    #[test]
    fn test_group_scripts_placement() {
        let tags = AssetTags {
            scripts: vec![HtmlTag::new("script").with_attr("src", "a.js")],
            styles: vec![HtmlTag::new("link").with_attr("href", "a.css")],
            meta: vec![HtmlTag::new("meta").with_attr("charset", "utf-8")],
        };

        let body = TagGroups::from_asset_tags(tags.clone(), false);
        assert_eq!(body.head_tags.len(), 2);
        assert_eq!(body.head_tags[0].tag_name(), "meta");
        assert_eq!(body.body_tags.len(), 1);

        let head = TagGroups::from_asset_tags(tags, true);
        assert_eq!(head.head_tags.len(), 3);
        assert!(head.body_tags.is_empty());
    }
}

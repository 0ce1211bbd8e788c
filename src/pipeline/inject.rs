//! String-level tag injection.
//!
//! Templates are not guaranteed to be well-formed, so injection works on the
//! first matching closing tag instead of a parsed tree.

use std::sync::LazyLock;

use regex::Regex;

use crate::tag::{HtmlTag, render_tags};

static BODY_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<\s*/\s*body\s*>").unwrap());
static HEAD_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<\s*/\s*head\s*>").unwrap());
static HTML_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<html(\s[^>]*)?>").unwrap());
static MANIFEST_ATTR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\smanifest\s*=").unwrap());
static VIEWPORT_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+name\s*=\s*["']?viewport["']?[^>]*>"#).unwrap()
});

/// Insert `body_tags` before `</body>` and `head_tags` before `</head>`.
///
/// Missing `</body>`: tags are appended. Missing `</head>`: a head element
/// is created after `<html>`, or at the very start.
pub fn inject(html: &str, head_tags: &[HtmlTag], body_tags: &[HtmlTag], xhtml: bool) -> String {
    let mut html = html.to_string();

    if !body_tags.is_empty() {
        let body = render_tags(body_tags, xhtml);
        match BODY_CLOSE.find(&html) {
            Some(m) => html.insert_str(m.start(), &body),
            None => html.push_str(&body),
        }
    }

    if !head_tags.is_empty() {
        let head = render_tags(head_tags, xhtml);
        match HEAD_CLOSE.find(&html) {
            Some(m) => html.insert_str(m.start(), &head),
            None => match HTML_OPEN.find(&html) {
                Some(m) => html.insert_str(m.end(), &format!("<head>{head}</head>")),
                None => html.insert_str(0, &format!("<head>{head}</head>")),
            },
        }
    }

    html
}

/// Add `manifest="url"` to `<html>` unless it already declares one.
pub fn inject_manifest(html: &str, url: &str) -> String {
    let Some(m) = HTML_OPEN.find(html) else {
        return html.to_string();
    };
    if MANIFEST_ATTR.is_match(m.as_str()) {
        return html.to_string();
    }

    // right after `<html`
    let at = m.start() + "<html".len();
    let mut out = String::with_capacity(html.len() + url.len() + 12);
    out.push_str(&html[..at]);
    out.push_str(&format!(r#" manifest="{url}""#));
    out.push_str(&html[at..]);
    out
}

/// Drop generated viewport metas when the markup already has one.
pub fn dedupe_viewport(html: &str, head_tags: Vec<HtmlTag>) -> Vec<HtmlTag> {
    if !VIEWPORT_META.is_match(html) {
        return head_tags;
    }
    head_tags
        .into_iter()
        .filter(|tag| !(tag.tag_name() == "meta" && tag.attr_str("name") == Some("viewport")))
        .collect()
}

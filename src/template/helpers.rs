//! Helpers registered on every template.

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::Value;

use crate::tag::HtmlTag;

/// Register `tags`, which prints tag objects as markup.
///
/// `{{tags htmlPlugin.tags.headTags}}`
pub(super) fn register(registry: &mut Handlebars<'_>, xhtml: bool) {
    registry.register_helper(
        "tags",
        Box::new(
            move |h: &Helper,
                  _: &Handlebars,
                  _: &Context,
                  _: &mut RenderContext,
                  out: &mut dyn Output|
                  -> HelperResult {
                let value = h.param(0).map(|p| p.value()).unwrap_or(&Value::Null);
                out.write(&display(value, xhtml))?;
                Ok(())
            },
        ),
    );
}

/// Text form of a value: tag objects as markup, arrays concatenated.
fn display(value: &Value, xhtml: bool) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(|v| display(v, xhtml)).collect(),
        Value::Object(_) => match HtmlTag::from_value(value) {
            Some(tag) => tag.to_html(xhtml),
            None => value.to_string(),
        },
    }
}

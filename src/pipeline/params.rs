//! Template parameter object.
//!
//! Default shape:
//!
//! ```text
//! { compilation, buildConfig, htmlPlugin: { tags: { headTags, bodyTags }, files, options } }
//! ```

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::asset::AssetBundle;
use crate::compilation::Compilation;
use crate::config::{ConfigError, HtmlOptions, TemplateParameters};
use crate::error::HtmlError;
use crate::tag::TagGroups;

/// What a `templateParameters` callback receives.
#[derive(Debug, Clone)]
pub struct TemplateParamsInput {
    pub compilation: Arc<Compilation>,
    pub assets: AssetBundle,
    pub tags: TagGroups,
    pub options: Arc<HtmlOptions>,
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// The default parameter object.
pub fn default_params(input: &TemplateParamsInput) -> Map<String, Value> {
    let mut plugin = Map::new();
    plugin.insert("tags".into(), to_value(&input.tags));
    plugin.insert("files".into(), to_value(&input.assets));
    plugin.insert("options".into(), to_value(input.options.as_ref()));

    let mut params = Map::new();
    params.insert("compilation".into(), input.compilation.summary());
    params.insert("buildConfig".into(), input.compilation.config.clone());
    params.insert("htmlPlugin".into(), Value::Object(plugin));
    params
}

/// Parameters for one render, per the document's `templateParameters`.
pub async fn template_params(
    parameters: &TemplateParameters,
    input: TemplateParamsInput,
    template: &str,
) -> Result<Value, HtmlError> {
    match parameters {
        TemplateParameters::Default => Ok(Value::Object(default_params(&input))),
        TemplateParameters::Disabled => Ok(Value::Object(Map::new())),
        TemplateParameters::Static(overrides) => {
            let mut params = default_params(&input);
            for (key, value) in overrides {
                params.insert(key.clone(), value.clone());
            }
            Ok(Value::Object(params))
        }
        TemplateParameters::Dynamic(compute) => {
            compute(input)
                .await
                .map_err(|e| HtmlError::TemplateEvaluation {
                    template: template.to_string(),
                    message: format!("templateParameters failed: {e:#}"),
                })
        }
        TemplateParameters::Unsupported(value) => Err(ConfigError::Validation(format!(
            "templateParameters has to be either a function or an object, got `{value}`"
        ))
        .into()),
    }
}

//! Built-in template used when no `src/index.html` exists.

/// Request id of the built-in template.
pub const DEFAULT_TEMPLATE_ID: &str = "bundle-html:default.html";

pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{{htmlPlugin.options.title}}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
  </head>
  <body>
  </body>
</html>
"#;

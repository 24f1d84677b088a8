//! Config templating - `{{variable}}` substitution via Minijinja
//!
//! Every string-valued config field is rendered against the execution
//! context before its node handler runs. Rendering is non-fatal by
//! design: an undefined variable becomes the empty string, and a template
//! that fails to compile or render falls back to the raw string. An
//! automation must not halt on a single unset variable.

use minijinja::{Environment, UndefinedBehavior};
use once_cell::sync::Lazy;
use serde_json::Value;

use super::context::ExecutionContext;

static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    // Undefined variables render as "" instead of erroring
    env.set_undefined_behavior(UndefinedBehavior::Lenient);
    env
});

/// Render a single template string against the context.
///
/// Missing variables substitute as empty strings. Malformed templates are
/// returned unrendered.
pub fn render(template: &str, context: &ExecutionContext) -> String {
    // Fast path: nothing to substitute
    if !template.contains("{{") && !template.contains("{%") {
        return template.to_string();
    }

    let ctx = minijinja::Value::from_serialize(context.to_json());
    match ENV.template_from_str(template) {
        Ok(tmpl) => match tmpl.render(ctx) {
            Ok(rendered) => rendered,
            Err(e) => {
                log::warn!("Template render failed, keeping raw value: {}", e);
                template.to_string()
            }
        },
        Err(e) => {
            log::warn!("Template compile failed, keeping raw value: {}", e);
            template.to_string()
        }
    }
}

/// Render every string leaf of a config value, recursively.
pub fn render_config(config: &Value, context: &ExecutionContext) -> Value {
    match config {
        Value::String(s) => Value::String(render(s, context)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_config(item, context))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_config(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

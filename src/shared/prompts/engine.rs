//! Template engine for prompt management using Jinja2 syntax.
//!
//! Prompt templates live under `templates/prompts/` and are compiled into the
//! binary, so a deployed service never depends on its working directory.

use minijinja::{Environment, Value};
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Global template environment
static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

macro_rules! embedded_template {
    ($name:literal) => {
        (
            $name,
            include_str!(concat!("../../../templates/prompts/", $name)),
        )
    };
}

const EMBEDDED_TEMPLATES: &[(&str, &str)] = &[
    embedded_template!("complaint_intake/image_analysis.jinja"),
    embedded_template!("complaint_intake/audio_transcription.jinja"),
    embedded_template!("complaint_intake/text_analysis.jinja"),
    embedded_template!("complaint_intake/formal_report.jinja"),
];

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();

    for (name, source) in EMBEDDED_TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::warn!("Failed to load template {}: {}", name, e);
        } else {
            tracing::debug!("Loaded template: {}", name);
        }
    }

    env
}

/// Get the global template environment
fn get_environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Render a template with the given context.
///
/// # Arguments
/// * `template_name` - The template path relative to `templates/prompts/` (e.g., "complaint_intake/text_analysis.jinja")
/// * `ctx` - A HashMap of variable names to values
pub fn render_template(
    template_name: &str,
    ctx: &HashMap<&str, Value>,
) -> Result<String, TemplateError> {
    let template = get_environment()
        .get_template(template_name)
        .map_err(|_| TemplateError::NotFound(template_name.to_string()))?;

    let render_ctx = Value::from_iter(ctx.iter().map(|(k, v)| (*k, v.clone())));

    template
        .render(render_ctx)
        .map_err(|e| TemplateError::RenderError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_template_is_not_found() {
        let result = render_template("nonexistent.jinja", &HashMap::new());
        assert!(matches!(result, Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_all_embedded_templates_compile() {
        let env = get_environment();
        for (name, _) in EMBEDDED_TEMPLATES {
            assert!(env.get_template(name).is_ok(), "{} failed to load", name);
        }
    }
}

//! Prompt templates for the complaint-intake stages.
//!
//! Each render function fills one template from
//! `templates/prompts/complaint_intake/` with the stage's inputs and the JSON
//! schema the model's answer must follow.

pub mod engine;

pub use engine::{render_template, TemplateError};

use minijinja::Value;
use std::collections::HashMap;

pub fn render_image_analysis_prompt(
    categories: &[&str],
    json_schema: &str,
) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("categories", Value::from_serialize(categories));
    ctx.insert("json_schema", Value::from(json_schema));

    render_template("complaint_intake/image_analysis.jinja", &ctx)
}

pub fn render_audio_transcription_prompt() -> Result<String, TemplateError> {
    render_template("complaint_intake/audio_transcription.jinja", &HashMap::new())
}

pub fn render_text_analysis_prompt(
    categories: &[&str],
    description: &str,
    json_schema: &str,
) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("categories", Value::from_serialize(categories));
    ctx.insert("description", Value::from(description));
    ctx.insert("json_schema", Value::from(json_schema));

    render_template("complaint_intake/text_analysis.jinja", &ctx)
}

/// Inputs to the report synthesis prompt, each already rendered as text
pub struct ReportPromptContext<'a> {
    pub image_analysis: &'a str,
    pub voice_transcription: &'a str,
    pub text_analysis: &'a str,
    pub location: &'a str,
}

pub fn render_formal_report_prompt(
    report: &ReportPromptContext<'_>,
    json_schema: &str,
) -> Result<String, TemplateError> {
    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("image_analysis", Value::from(report.image_analysis));
    ctx.insert("voice_transcription", Value::from(report.voice_transcription));
    ctx.insert("text_analysis", Value::from(report.text_analysis));
    ctx.insert("location", Value::from(report.location));
    ctx.insert("json_schema", Value::from(json_schema));

    render_template("complaint_intake/formal_report.jinja", &ctx)
}

//! Typed results of the four intake stages.
//!
//! Every field is optional: models omit keys, and the intake merge decides
//! what an absent value falls back to.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::shared::llm::{is_blank, LlmResponse};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageAnalysis {
    /// One-sentence summary of the scene
    pub summary: Option<String>,
    /// One of the fixed complaint categories
    pub category: Option<String>,
}

impl LlmResponse for ImageAnalysis {
    fn is_empty(&self) -> bool {
        is_blank(&self.summary) && is_blank(&self.category)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub transcription: String,
}

/// Actionable steps arrive either as a list or as one block of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ActionableSteps {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextAnalysis {
    /// One of the fixed complaint categories
    pub category: Option<String>,
    /// Low, Medium or High
    pub priority: Option<String>,
    /// One-sentence summary of the core problem
    pub summary: Option<String>,
    /// 2-3 brief steps for the municipal team
    pub actionable_steps: Option<ActionableSteps>,
}

impl LlmResponse for TextAnalysis {
    fn is_empty(&self) -> bool {
        is_blank(&self.category)
            && is_blank(&self.priority)
            && is_blank(&self.summary)
            && self.actionable_steps.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormalReport {
    /// Short formal subject line
    pub subject: Option<String>,
    /// Formal description of the problem
    pub description: Option<String>,
    /// GHMC zone of the location, or "Unknown"
    pub zone: Option<String>,
}

impl LlmResponse for FormalReport {
    fn is_empty(&self) -> bool {
        is_blank(&self.subject) && is_blank(&self.description) && is_blank(&self.zone)
    }
}

/// Everything the report synthesis stage sees
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub image: &'a ImageAnalysis,
    pub transcription: Option<&'a str>,
    pub text: &'a TextAnalysis,
    pub location: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actionable_steps_accepts_list_or_text() {
        let listed: TextAnalysis =
            serde_json::from_str(r#"{"actionable_steps": ["Fill pothole", "Add signage"]}"#)
                .unwrap();
        assert_eq!(
            listed.actionable_steps,
            Some(ActionableSteps::List(vec![
                "Fill pothole".to_string(),
                "Add signage".to_string()
            ]))
        );

        let text: TextAnalysis =
            serde_json::from_str(r#"{"actionable_steps": "Fill the pothole."}"#).unwrap();
        assert_eq!(
            text.actionable_steps,
            Some(ActionableSteps::Text("Fill the pothole.".to_string()))
        );
    }

    #[test]
    fn test_missing_keys_are_none() {
        let report: FormalReport = serde_json::from_str(r#"{"subject": "Pothole"}"#).unwrap();
        assert_eq!(report.subject.as_deref(), Some("Pothole"));
        assert!(report.description.is_none());
        assert!(report.zone.is_none());
        assert!(!report.is_empty());
    }

    #[test]
    fn test_empty_replies_are_detected() {
        let image: ImageAnalysis = serde_json::from_str("{}").unwrap();
        assert!(image.is_empty());

        let text: TextAnalysis =
            serde_json::from_str(r#"{"category": "  ", "summary": null}"#).unwrap();
        assert!(text.is_empty());

        let steps_only: TextAnalysis =
            serde_json::from_str(r#"{"actionable_steps": ["Clear the drain"]}"#).unwrap();
        assert!(!steps_only.is_empty());

        let report: FormalReport = serde_json::from_str(r#"{"zone": ""}"#).unwrap();
        assert!(report.is_empty());
    }
}

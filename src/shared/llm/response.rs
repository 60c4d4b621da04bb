use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// Structured answer expected from a generative model.
///
/// Implementors describe themselves with a JSON schema that is embedded in
/// the prompt, and are parsed back out of the model's free-form reply.
pub trait LlmResponse: DeserializeOwned + JsonSchema {
    /// Generate JSON schema string for use in LLM prompts
    fn json_schema_string() -> String {
        let mut gen = SchemaGenerator::default();
        let schema = gen.root_schema_for::<Self>();
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
    }

    /// True when the reply carried none of the expected fields. An empty
    /// answer counts as a failed call, not as a result with defaults.
    fn is_empty(&self) -> bool {
        false
    }
}

/// A string field the model left out or answered with whitespace only
pub fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

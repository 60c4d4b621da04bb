use lazy_static::lazy_static;
use regex::Regex;

use super::LlmResponse;

lazy_static! {
    /// Trailing commas before } or ]
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();

    /// JavaScript string concatenation ("str1" + "str2")
    static ref JS_STRING_CONCAT_RE: Regex = Regex::new(r#""\s*\+\s*""#).unwrap();
}

/// Pull the JSON object out of a model reply.
///
/// Tries in order:
/// 1. ```json fenced block
/// 2. any other fenced block
/// 3. the whole reply, when it already starts with `{`
/// 4. the span from the first `{` to the last `}`
pub fn extract_json_string(text: &str) -> Result<String, String> {
    if let Some((_, rest)) = text.split_once("```json") {
        let body = rest.split("```").next().unwrap_or(rest);
        return Ok(body.trim().to_string());
    }

    if let Some((_, rest)) = text.split_once("```") {
        // Skip an optional language tag on the fence line
        if let Some((_, block)) = rest.split_once('\n') {
            if let Some((body, _)) = block.split_once("```") {
                return Ok(body.trim().to_string());
            }
        }
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed.to_string());
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(text[start..=end].to_string()),
        (None, _) => Err("No JSON object found in response".to_string()),
        _ => Err("Incomplete JSON object in response".to_string()),
    }
}

/// `{"priority": "High",}` -> `{"priority": "High"}`
pub fn fix_trailing_commas(json_str: &str) -> String {
    TRAILING_COMMA_RE.replace_all(json_str, "$1").to_string()
}

/// `"Water" + " Logging"` -> `"Water Logging"`
pub fn fix_js_string_concatenation(json_str: &str) -> String {
    JS_STRING_CONCAT_RE.replace_all(json_str, "").to_string()
}

fn repair_json(json_str: &str) -> Option<String> {
    let options = llm_json::RepairOptions::default();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        llm_json::repair_json(json_str, &options)
    }));

    match result {
        Ok(Ok(repaired)) => Some(repaired),
        Ok(Err(e)) => {
            tracing::debug!("JSON repair failed: {:?}", e);
            None
        }
        Err(_) => {
            tracing::warn!("JSON repair panicked");
            None
        }
    }
}

/// Parse a model reply into `T`.
///
/// The extracted JSON is tried as-is, then after the quick fixes, then after
/// `llm_json` repair. An error means every strategy failed; it is final and
/// callers must not retry the request because of it.
pub fn parse_response<T>(text: &str) -> Result<T, String>
where
    T: LlmResponse,
{
    let json_str = extract_json_string(text)?;

    tracing::debug!(
        "Extracted JSON (first 500 chars): {}",
        json_str.chars().take(500).collect::<String>()
    );

    if let Ok(parsed) = serde_json::from_str::<T>(&json_str) {
        return Ok(parsed);
    }

    let fixed = fix_trailing_commas(&fix_js_string_concatenation(&json_str));
    if let Ok(parsed) = serde_json::from_str::<T>(&fixed) {
        tracing::debug!("JSON parsed after quick fixes");
        return Ok(parsed);
    }

    if let Some(repaired) = repair_json(&json_str) {
        if let Ok(parsed) = serde_json::from_str::<T>(&repaired) {
            tracing::debug!("JSON parsed after llm_json repair");
            return Ok(parsed);
        }
    }

    Err(format!(
        "Failed to parse JSON after all repair attempts. Original: {}",
        json_str.chars().take(200).collect::<String>()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Triage {
        category: Option<String>,
        priority: Option<String>,
        votes: Option<i32>,
    }

    impl LlmResponse for Triage {}

    #[test]
    fn test_extract_from_json_fence() {
        let reply = "Here is my analysis:\n\n```json\n{\"category\": \"Fallen Tree\"}\n```\n\nStay safe.";
        assert_eq!(
            extract_json_string(reply).unwrap(),
            r#"{"category": "Fallen Tree"}"#
        );
    }

    #[test]
    fn test_extract_from_untagged_fence() {
        let reply = "```\n{\"priority\": \"Low\"}\n```";
        assert_eq!(extract_json_string(reply).unwrap(), r#"{"priority": "Low"}"#);
    }

    #[test]
    fn test_extract_plain_and_embedded() {
        assert_eq!(
            extract_json_string("  {\"votes\": 1}\n").unwrap(),
            r#"{"votes": 1}"#
        );
        assert_eq!(
            extract_json_string("Result: {\"votes\": 2} (done)").unwrap(),
            r#"{"votes": 2}"#
        );
    }

    #[test]
    fn test_extract_without_object_fails() {
        assert!(extract_json_string("I could not see any civic issue.").is_err());
        assert!(extract_json_string("} backwards {").is_err());
    }

    #[test]
    fn test_quick_fixes() {
        assert_eq!(
            fix_trailing_commas(r#"{"steps": ["clear drain", "inspect",],}"#),
            r#"{"steps": ["clear drain", "inspect"]}"#
        );
        assert_eq!(
            fix_js_string_concatenation(r#"{"category": "Water" + " Logging"}"#),
            r#"{"category": "Water Logging"}"#
        );
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"category\": \"Sewage Leak/Overflow\", \"priority\": \"High\"}\n```";
        let triage: Triage = parse_response(reply).unwrap();
        assert_eq!(triage.category.as_deref(), Some("Sewage Leak/Overflow"));
        assert_eq!(triage.priority.as_deref(), Some("High"));
        assert_eq!(triage.votes, None);
    }

    #[test]
    fn test_parse_after_quick_fixes() {
        let reply = r#"{"category": "Stray" + " Animals", "priority": "Low",}"#;
        let triage: Triage = parse_response(reply).unwrap();
        assert_eq!(triage.category.as_deref(), Some("Stray Animals"));
    }

    #[test]
    fn test_parse_prose_reply_is_error() {
        assert!(parse_response::<Triage>("Sorry, I cannot help with that.").is_err());
    }

    #[test]
    fn test_schema_lists_fields() {
        let schema = Triage::json_schema_string();
        assert!(schema.contains("category"));
        assert!(schema.contains("priority"));
        assert!(schema.contains("votes"));
    }
}

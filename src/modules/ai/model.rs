//! Seam between the intake stages and whatever generative model serves them.

use async_trait::async_trait;

use crate::shared::prompts::TemplateError;

/// Error types for generative model calls.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The service answered with a non-success status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    /// The service answered but carried no text
    #[error("Empty response from model")]
    EmptyResponse,

    /// The model's text could not be read as the expected JSON
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Prompt error: {0}")]
    Prompt(#[from] TemplateError),
}

impl AiError {
    /// Quota exhaustion is the only transient failure: the message carries a
    /// 429 status or mentions a quota.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::ParseError(_) | AiError::Prompt(_) => false,
            other => {
                let message = other.to_string();
                message.contains("429") || message.to_lowercase().contains("quota")
            }
        }
    }
}

/// Binary content sent alongside the prompt
#[derive(Debug, Clone)]
pub struct InlineData {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub attachments: Vec<InlineData>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.attachments.push(InlineData {
            mime_type: mime_type.into(),
            data,
        });
        self
    }
}

/// A text-generating model reachable over the network.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logs
    fn id(&self) -> &str;

    /// One generation call. Returns the model's raw text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, AiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_failures_are_retryable() {
        assert!(AiError::RequestFailed("HTTP 429: Too Many Requests".into()).is_retryable());
        assert!(AiError::RequestFailed("RESOURCE_EXHAUSTED: Quota exceeded".into()).is_retryable());
        assert!(AiError::NetworkError("daily QUOTA reached".into()).is_retryable());
    }

    #[test]
    fn test_other_failures_are_not_retryable() {
        assert!(!AiError::RequestFailed("HTTP 400: API key not valid".into()).is_retryable());
        assert!(!AiError::NetworkError("connection refused".into()).is_retryable());
        assert!(!AiError::EmptyResponse.is_retryable());
        assert!(!AiError::ParseError("quota of braces exceeded".into()).is_retryable());
    }
}

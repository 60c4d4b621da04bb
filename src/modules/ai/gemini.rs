//! Google Gemini backend over the `generateContent` REST endpoint.

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::model::{AiError, GenerationRequest, GenerativeModel};
use crate::core::config::AiConfig;

/// Keeps the key out of URLs, which end up in logs and error messages
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(config: &AiConfig, api_key: impl Into<String>) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AiError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model_name.clone(),
            api_key: api_key.into(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentRequest {
    fn from_request(request: GenerationRequest) -> Self {
        let mut parts = vec![Part {
            text: Some(request.prompt),
            ..Default::default()
        }];

        parts.extend(request.attachments.into_iter().map(|attachment| Part {
            inline_data: Some(Blob {
                mime_type: attachment.mime_type,
                data: BASE64_STANDARD.encode(attachment.data),
            }),
            ..Default::default()
        }));

        Self {
            contents: vec![Content { parts }],
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiBackend {
    fn id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::RequestFailed("API key is not configured".to_string()));
        }

        let body = GenerateContentRequest::from_request(request);

        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::NetworkError(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| {
                AiError::NetworkError(format!("Invalid response body: {}", e.without_url()))
            })?;

        parsed.into_text().ok_or(AiError::EmptyResponse)
    }
}

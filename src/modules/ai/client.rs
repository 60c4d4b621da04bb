use std::path::Path;
use std::sync::Arc;

use super::analysis::{
    FormalReport, ImageAnalysis, ReportInput, TextAnalysis, Transcription,
};
use super::gemini::GeminiBackend;
use super::model::{AiError, GenerationRequest, GenerativeModel};
use super::retry::RetryPolicy;
use crate::core::config::AiConfig;
use crate::shared::constants::{AUDIO_FALLBACK_TRANSCRIPTION, COMPLAINT_CATEGORIES};
use crate::shared::llm::{parse_response, LlmResponse};
use crate::shared::prompts::{
    render_audio_transcription_prompt, render_formal_report_prompt, render_image_analysis_prompt,
    render_text_analysis_prompt, ReportPromptContext,
};

/// The four intake operations against the generative model, each wrapped in
/// the shared quota-aware retry policy.
#[derive(Clone)]
pub struct AiClient {
    image_model: Arc<dyn GenerativeModel>,
    audio_model: Arc<dyn GenerativeModel>,
    text_model: Arc<dyn GenerativeModel>,
    report_model: Arc<dyn GenerativeModel>,
    retry: RetryPolicy,
}

impl AiClient {
    /// Gemini-backed client with one backend per stage key
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        Ok(Self {
            image_model: Arc::new(GeminiBackend::new(config, &config.image_api_key)?),
            audio_model: Arc::new(GeminiBackend::new(config, &config.audio_api_key)?),
            text_model: Arc::new(GeminiBackend::new(config, &config.text_api_key)?),
            report_model: Arc::new(GeminiBackend::new(config, &config.report_api_key)?),
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    /// Client serving every stage from the same model
    pub fn with_model(model: Arc<dyn GenerativeModel>, retry: RetryPolicy) -> Self {
        Self {
            image_model: model.clone(),
            audio_model: model.clone(),
            text_model: model.clone(),
            report_model: model,
            retry,
        }
    }

    async fn generate_parsed<T: LlmResponse>(
        &self,
        stage: &'static str,
        model: &Arc<dyn GenerativeModel>,
        request: GenerationRequest,
    ) -> Result<T, AiError> {
        let text = self
            .retry
            .run(stage, || model.generate(request.clone()))
            .await?;

        let parsed = parse_response::<T>(&text).map_err(|e| {
            tracing::error!(stage, model = model.id(), "Unparseable AI response: {}", e);
            AiError::ParseError(e)
        })?;

        if parsed.is_empty() {
            tracing::error!(stage, model = model.id(), "AI response carried no fields");
            return Err(AiError::EmptyResponse);
        }

        Ok(parsed)
    }

    pub async fn classify_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ImageAnalysis, AiError> {
        let prompt =
            render_image_analysis_prompt(&COMPLAINT_CATEGORIES, &ImageAnalysis::json_schema_string())?;
        let request = GenerationRequest::text(prompt).with_attachment(mime_type, image.to_vec());

        self.generate_parsed("image_analysis", &self.image_model, request)
            .await
    }

    /// Transcribe the audio file at `path`. Never fails: any terminal failure,
    /// or an empty transcription, yields the fallback transcription.
    pub async fn transcribe_audio(&self, path: &Path, mime_type: &str) -> Transcription {
        match self.try_transcribe_audio(path, mime_type).await {
            Ok(text) if !text.trim().is_empty() => Transcription {
                transcription: text.trim().to_string(),
            },
            Ok(_) => {
                tracing::warn!("Audio transcription was empty, using fallback");
                Self::fallback_transcription()
            }
            Err(e) => {
                tracing::warn!("Audio transcription failed, using fallback: {}", e);
                Self::fallback_transcription()
            }
        }
    }

    async fn try_transcribe_audio(&self, path: &Path, mime_type: &str) -> Result<String, AiError> {
        let audio = tokio::fs::read(path)
            .await
            .map_err(|e| AiError::RequestFailed(format!("Failed to read audio file: {}", e)))?;

        let request = GenerationRequest::text(render_audio_transcription_prompt()?)
            .with_attachment(mime_type, audio);

        self.retry
            .run("audio_transcription", || {
                self.audio_model.generate(request.clone())
            })
            .await
    }

    fn fallback_transcription() -> Transcription {
        Transcription {
            transcription: AUDIO_FALLBACK_TRANSCRIPTION.to_string(),
        }
    }

    pub async fn classify_text(&self, description: &str) -> Result<TextAnalysis, AiError> {
        let prompt = render_text_analysis_prompt(
            &COMPLAINT_CATEGORIES,
            description,
            &TextAnalysis::json_schema_string(),
        )?;

        self.generate_parsed("text_analysis", &self.text_model, GenerationRequest::text(prompt))
            .await
    }

    pub async fn synthesize_report(&self, input: &ReportInput<'_>) -> Result<FormalReport, AiError> {
        let image_analysis = serde_json::to_string(input.image)
            .map_err(|e| AiError::ParseError(format!("Failed to encode image analysis: {}", e)))?;
        let text_analysis = serde_json::to_string(input.text)
            .map_err(|e| AiError::ParseError(format!("Failed to encode text analysis: {}", e)))?;

        let context = ReportPromptContext {
            image_analysis: &image_analysis,
            voice_transcription: input.transcription.unwrap_or("Not provided"),
            text_analysis: &text_analysis,
            location: input.location,
        };
        let prompt = render_formal_report_prompt(&context, &FormalReport::json_schema_string())?;

        self.generate_parsed("report_synthesis", &self.report_model, GenerationRequest::text(prompt))
            .await
    }
}

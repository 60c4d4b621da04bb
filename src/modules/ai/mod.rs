//! Generative AI client for complaint intake.

pub mod analysis;
pub mod client;
pub mod gemini;
pub mod model;
pub mod retry;
#[cfg(test)]
pub mod testing;

pub use analysis::{ActionableSteps, FormalReport, ImageAnalysis, ReportInput, TextAnalysis, Transcription};
pub use client::AiClient;
pub use model::{AiError, GenerativeModel};
pub use retry::RetryPolicy;

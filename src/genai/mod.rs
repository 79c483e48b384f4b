//! Generative model clients
//!
//! Provides:
//! - `TextModel` and `VisionModel` seams the pipeline is written against
//! - Gemini REST client implementing both

mod gemini;

use async_trait::async_trait;
use thiserror::Error;

use crate::campaign::Upload;

pub use gemini::GeminiClient;

/// Errors from generative backends
#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("{0} API key not configured")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status}")]
    Status { status: u16, body: String },

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("empty response")]
    Empty,
}

/// Single-instruction text generation
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Generate a completion for one instruction
    async fn generate(&self, prompt: &str) -> Result<String, GenAiError>;

    /// Whether credentials are present
    fn is_configured(&self) -> bool {
        true
    }
}

/// Multimodal description of an uploaded image
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn describe(&self, instruction: &str, image: &Upload) -> Result<String, GenAiError>;
}

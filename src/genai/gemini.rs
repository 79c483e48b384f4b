//! Gemini REST client
//!
//! Text generation and image description via `models/{model}:generateContent`.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GenAiError, TextModel, VisionModel};
use crate::campaign::Upload;
use crate::config::GeminiConfig;

/// generateContent request
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

/// generateContent response
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Result<String, GenAiError> {
        let content = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .ok_or(GenAiError::Empty)?;

        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        let text = text.trim();
        if text.is_empty() {
            return Err(GenAiError::Empty);
        }
        Ok(text.to_string())
    }
}

/// Gemini API client
#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    vision_model: String,
}

impl GeminiClient {
    /// Create a client from configuration
    pub fn new(config: &GeminiConfig) -> Result<Self, GenAiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            vision_model: config.vision_model.clone(),
        })
    }

    async fn generate_content(&self, model: &str, parts: Vec<Part>) -> Result<String, GenAiError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(GenAiError::NotConfigured("Gemini"))?;

        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        debug!("Sending generateContent request to Gemini model {}", model);

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API error: {} - {}", status, body);
            return Err(GenAiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenAiError::Malformed(e.to_string()))?;

        parsed.text()
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenAiError> {
        self.generate_content(
            &self.text_model,
            vec![Part::Text {
                text: prompt.to_string(),
            }],
        )
        .await
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn describe(&self, instruction: &str, image: &Upload) -> Result<String, GenAiError> {
        let parts = vec![
            Part::Text {
                text: instruction.to_string(),
            },
            Part::Inline {
                inline_data: InlineData {
                    mime_type: image.media_type.clone(),
                    data: BASE64.encode(&image.bytes),
                },
            },
        ];
        self.generate_content(&self.vision_model, parts).await
    }
}

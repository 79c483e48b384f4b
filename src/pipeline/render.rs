//! Image rendering
//!
//! Two backends:
//! - Pollinations: the image is addressed by URL, nothing is fetched here
//! - Hugging Face inference: image bytes come back inline as a data URI

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::campaign::{AspectRatio, StyleSlot};
use crate::config::{RendererBackend, RendererConfig};
use crate::genai::GenAiError;

/// Upper bound (exclusive) of the random seed base
const SEED_RANGE: u64 = 100_000;

/// Seeds for one batch: a base plus the variant index, so no two
/// variants of the same batch share a seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSource {
    base: u64,
}

impl SeedSource {
    pub fn random() -> Self {
        Self {
            base: rand::rng().random_range(0..SEED_RANGE),
        }
    }

    pub fn fixed(base: u64) -> Self {
        Self { base }
    }

    pub fn seed_for(&self, index: usize) -> u64 {
        self.base.wrapping_add(index as u64)
    }
}

/// A single render request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
}

impl RenderRequest {
    pub fn new(prompt: &str, ratio: AspectRatio, seed: u64) -> Self {
        let (width, height) = ratio.dimensions();
        Self {
            prompt: prompt.to_string(),
            width,
            height,
            seed,
        }
    }
}

/// Image synthesis backend
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    /// Render one image, returning a URL or data URI
    async fn render(&self, request: &RenderRequest) -> Result<String, GenAiError>;

    fn name(&self) -> &'static str;
}

/// Build the configured renderer
pub fn build_renderer(config: &RendererConfig) -> Result<Arc<dyn ImageRenderer>, GenAiError> {
    let renderer: Arc<dyn ImageRenderer> = match config.backend {
        RendererBackend::Pollinations => Arc::new(PollinationsRenderer::new(
            &config.pollinations_url,
            &config.pollinations_model,
        )?),
        RendererBackend::HuggingFace => Arc::new(HuggingFaceRenderer::new(config)?),
    };
    Ok(renderer)
}

/// URL-addressed renderer (`/prompt/{prompt}?width=..&height=..&seed=..`)
#[derive(Debug, Clone)]
pub struct PollinationsRenderer {
    base_url: Url,
    model: String,
}

impl PollinationsRenderer {
    pub fn new(base_url: &str, model: &str) -> Result<Self, GenAiError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(GenAiError::Malformed(format!(
                "renderer URL cannot be a base: {}",
                base_url
            )));
        }
        Ok(Self {
            base_url,
            model: model.to_string(),
        })
    }

    /// Build the image URL for a request
    pub fn image_url(&self, request: &RenderRequest) -> Result<String, GenAiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GenAiError::Malformed("renderer URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("prompt")
            .push(&request.prompt);
        url.query_pairs_mut()
            .append_pair("width", &request.width.to_string())
            .append_pair("height", &request.height.to_string())
            .append_pair("seed", &request.seed.to_string())
            .append_pair("nologo", "true")
            .append_pair("model", &self.model);
        Ok(url.into())
    }
}

#[async_trait]
impl ImageRenderer for PollinationsRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, GenAiError> {
        let url = self.image_url(request)?;
        debug!("Pollinations image URL (seed {}): {}", request.seed, url);
        Ok(url)
    }

    fn name(&self) -> &'static str {
        RendererBackend::Pollinations.name()
    }
}

/// Hugging Face inference request body
#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    num_inference_steps: u32,
    width: u32,
    height: u32,
    seed: u64,
}

/// Binary inference renderer
#[derive(Debug)]
pub struct HuggingFaceRenderer {
    client: Client,
    base_url: String,
    model: String,
    token: String,
}

impl HuggingFaceRenderer {
    /// Fails when no access token is configured
    pub fn new(config: &RendererConfig) -> Result<Self, GenAiError> {
        let token = config
            .huggingface_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(GenAiError::NotConfigured("Hugging Face"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.huggingface_url.trim_end_matches('/').to_string(),
            model: config.huggingface_model.clone(),
            token,
        })
    }
}

#[async_trait]
impl ImageRenderer for HuggingFaceRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, GenAiError> {
        // sdxl-turbo is tuned for a single step
        let body = InferenceRequest {
            inputs: &request.prompt,
            parameters: InferenceParameters {
                num_inference_steps: 1,
                width: request.width,
                height: request.height,
                seed: request.seed,
            },
        };

        debug!("Sending inference request to Hugging Face model {}", self.model);

        let response = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.model))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Hugging Face API error: {} - {}", status, body);
            return Err(GenAiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mime_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        if !mime_type.starts_with("image/") {
            return Err(GenAiError::Malformed(format!(
                "expected image bytes, got {}",
                mime_type
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(GenAiError::Empty);
        }

        Ok(format!("data:{};base64,{}", mime_type, BASE64.encode(&bytes)))
    }

    fn name(&self) -> &'static str {
        RendererBackend::HuggingFace.name()
    }
}

/// Inline SVG standing in for a render that failed
pub fn placeholder_image(slot: StyleSlot, ratio: AspectRatio) -> String {
    let (width, height) = ratio.dimensions();
    let font_size = width.min(height) / 20;
    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="100%" height="100%" fill="#1e293b"/><text x="50%" y="50%" fill="#94a3b8" font-family="sans-serif" font-size="{fs}" text-anchor="middle" dominant-baseline="middle">{label} - render unavailable</text></svg>"##,
        w = width,
        h = height,
        fs = font_size,
        label = slot.label(),
    );
    format!("data:image/svg+xml;base64,{}", BASE64.encode(svg))
}

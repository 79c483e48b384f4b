//! Campaign pipeline
//!
//! vision (optional) -> creative direction -> N x (render || caption) -> assembly.
//! The whole run is bounded by the configured timeout; on expiry nothing
//! partial is returned.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::copywriter::{Copywriter, FallbackCaptions};
use super::director::{CreativeDirector, VariantPrompt};
use super::render::{build_renderer, placeholder_image, ImageRenderer, RenderRequest, SeedSource};
use super::vision::{describe_product, enrich_brief};
use crate::campaign::{AspectRatio, CampaignConfig, CampaignError, StyleSlot};
use crate::config::{Config, PipelineConfig};
use crate::genai::{GeminiClient, GenAiError, TextModel, VisionModel};

/// Pipeline errors surfaced to the caller
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Campaign(#[from] CampaignError),

    #[error("image rendering failed: {0}")]
    RenderFailed(String),

    #[error("generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// One finished creative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeResult {
    /// URL or data URI
    pub image: String,
    pub caption: String,
    /// Style slot label
    pub style: String,
    /// Prompt the image was rendered from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt: String,
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct CampaignOutcome {
    /// Base brief after vision enrichment
    pub brief: String,
    /// e.g. "1024×1024"
    pub dimensions: String,
    pub variations: Vec<CreativeResult>,
}

/// A branch result and whether its render succeeded
struct Branch {
    result: CreativeResult,
    rendered: bool,
}

/// Runs the campaign pipeline
pub struct Orchestrator {
    text: Arc<dyn TextModel>,
    vision: Arc<dyn VisionModel>,
    renderer: Arc<dyn ImageRenderer>,
    director: CreativeDirector,
    copywriter: Copywriter,
    limits: PipelineConfig,
    seed_base: Option<u64>,
}

impl Orchestrator {
    pub fn new(
        text: Arc<dyn TextModel>,
        vision: Arc<dyn VisionModel>,
        renderer: Arc<dyn ImageRenderer>,
        captions: FallbackCaptions,
        limits: PipelineConfig,
    ) -> Self {
        let director = CreativeDirector::new(text.clone());
        let copywriter = Copywriter::new(text.clone(), captions, limits.caption_min_len);
        Self {
            text,
            vision,
            renderer,
            director,
            copywriter,
            limits,
            seed_base: None,
        }
    }

    /// Build the production pipeline from configuration
    pub fn from_config(config: &Config) -> Result<Self, GenAiError> {
        let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
        let renderer = build_renderer(&config.renderer)?;
        Ok(Self::new(
            gemini.clone(),
            gemini,
            renderer,
            FallbackCaptions::from(&config.captions),
            config.pipeline.clone(),
        ))
    }

    /// Use a fixed seed base instead of a random one per run
    pub fn with_seed_base(mut self, base: u64) -> Self {
        self.seed_base = Some(base);
        self
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub fn text_model_configured(&self) -> bool {
        self.text.is_configured()
    }

    fn seeds(&self) -> SeedSource {
        self.seed_base
            .map(SeedSource::fixed)
            .unwrap_or_else(SeedSource::random)
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(self.limits.timeout_secs)
    }

    /// Run the full pipeline for one campaign
    pub async fn run(&self, campaign: CampaignConfig) -> Result<CampaignOutcome, PipelineError> {
        let count = campaign.validate(self.limits.default_variations, self.limits.max_variations)?;
        let run_id = Uuid::new_v4();
        let budget = self.budget();

        let run = self
            .execute(&campaign, count)
            .instrument(info_span!("campaign", %run_id));
        match tokio::time::timeout(budget, run).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Campaign run {} exceeded {}s budget", run_id, budget.as_secs());
                Err(PipelineError::Timeout(budget))
            }
        }
    }

    async fn execute(
        &self,
        campaign: &CampaignConfig,
        count: usize,
    ) -> Result<CampaignOutcome, PipelineError> {
        info!(
            "Starting campaign run: {} variations, {} ({})",
            count,
            campaign.aspect_ratio.ratio(),
            self.renderer.name()
        );

        let brief = self.prepare_brief(campaign).await;
        let variants = self.director.direct(&brief, count).await;
        let seeds = self.seeds();

        let branches = variants
            .iter()
            .map(|variant| self.branch(variant, seeds.seed_for(variant.index), campaign));
        let branches = join_all(branches).await;

        let rendered = branches.iter().filter(|b| b.rendered).count();
        if rendered == 0 {
            return Err(PipelineError::RenderFailed(format!(
                "all {} renders failed",
                count
            )));
        }
        if rendered < count {
            warn!("{} of {} renders replaced by placeholders", count - rendered, count);
        }

        info!("Campaign run complete: {} creatives", branches.len());
        Ok(CampaignOutcome {
            brief,
            dimensions: campaign.aspect_ratio.dimensions_label(),
            variations: branches.into_iter().map(|b| b.result).collect(),
        })
    }

    /// Base brief, enriched with the product description when one is available
    async fn prepare_brief(&self, campaign: &CampaignConfig) -> String {
        let brief = campaign.brief();
        let description = match campaign.product_image() {
            Some(image) => describe_product(self.vision.as_ref(), image).await,
            None => None,
        };
        enrich_brief(&brief, description.as_deref())
    }

    /// Render and caption one variant concurrently
    async fn branch(
        &self,
        variant: &VariantPrompt,
        seed: u64,
        campaign: &CampaignConfig,
    ) -> Branch {
        let request = RenderRequest::new(&variant.prompt, campaign.aspect_ratio, seed);
        let (image, caption) = tokio::join!(
            self.render(&request, variant.slot, campaign.aspect_ratio),
            self.copywriter.write(variant, campaign)
        );

        match image {
            Some(image) => Branch {
                result: CreativeResult {
                    image,
                    caption,
                    style: variant.slot.label().to_string(),
                    prompt: variant.prompt.clone(),
                },
                rendered: true,
            },
            None => Branch {
                result: CreativeResult {
                    image: placeholder_image(variant.slot, campaign.aspect_ratio),
                    caption: self.copywriter.fallback(variant.slot, campaign),
                    style: variant.slot.label().to_string(),
                    prompt: variant.prompt.clone(),
                },
                rendered: false,
            },
        }
    }

    async fn render(
        &self,
        request: &RenderRequest,
        slot: StyleSlot,
        ratio: AspectRatio,
    ) -> Option<String> {
        match self.renderer.render(request).await {
            Ok(image) if !image.is_empty() => Some(image),
            Ok(_) => {
                warn!("Renderer returned no image for {} ({})", slot.label(), ratio.ratio());
                None
            }
            Err(e) => {
                warn!("Render failed for {} (seed {}): {}", slot.label(), request.seed, e);
                None
            }
        }
    }

    /// Images only: N renders of the brief with distinct seeds
    pub async fn render_only(
        &self,
        campaign: CampaignConfig,
    ) -> Result<Vec<String>, PipelineError> {
        let count = campaign.validate(self.limits.default_variations, self.limits.max_variations)?;
        let run_id = Uuid::new_v4();
        let budget = self.budget();

        let run = async {
            let brief = self.prepare_brief(&campaign).await;
            let seeds = self.seeds();
            let ratio = campaign.aspect_ratio;
            info!("Rendering {} images without creative direction", count);

            let renders = (0..count).map(|index| {
                let request = RenderRequest::new(&brief, ratio, seeds.seed_for(index));
                let slot = StyleSlot::for_index(index);
                async move { self.render(&request, slot, ratio).await.ok_or(slot) }
            });
            let images = join_all(renders).await;

            if images.iter().all(Result::is_err) {
                return Err(PipelineError::RenderFailed(format!("all {} renders failed", count)));
            }
            Ok(images
                .into_iter()
                .map(|image| image.unwrap_or_else(|slot| placeholder_image(slot, ratio)))
                .collect())
        }
        .instrument(info_span!("images", %run_id));

        match tokio::time::timeout(budget, run).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Image run {} exceeded {}s budget", run_id, budget.as_secs());
                Err(PipelineError::Timeout(budget))
            }
        }
    }
}

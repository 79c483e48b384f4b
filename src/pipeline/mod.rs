//! Creative generation pipeline
//!
//! Provides:
//! - Product image description (vision)
//! - Creative direction into N variant prompts
//! - Image rendering backends
//! - Caption writing with style fallbacks
//! - The orchestrator tying them together

mod copywriter;
mod director;
mod orchestrator;
mod render;
mod vision;

#[cfg(test)]
pub(crate) mod test_utils;

pub use copywriter::{build_caption_instruction, clean_caption, Copywriter, FallbackCaptions};
pub use director::{
    build_instruction, parse_variants, CreativeDirector, VariantPrompt, SEPARATOR,
};
pub use orchestrator::{CampaignOutcome, CreativeResult, Orchestrator, PipelineError};
pub use render::{
    build_renderer, placeholder_image, HuggingFaceRenderer, ImageRenderer, PollinationsRenderer,
    RenderRequest, SeedSource,
};
pub use vision::{describe_product, enrich_brief, VISION_INSTRUCTION};

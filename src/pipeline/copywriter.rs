//! Ad caption writing
//!
//! The fallback caption for the variant's style slot is chosen before the
//! model is asked, so a failed or too-short answer just leaves it in place.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::campaign::{CampaignConfig, StyleSlot};
use crate::config::CaptionConfig;
use crate::genai::TextModel;
use crate::pipeline::VariantPrompt;

/// Stand-in for `{brand}` when the campaign names no brand
const DEFAULT_BRAND: &str = "our collection";
/// Stand-in for `{brand_tag}` when the campaign names no brand
const DEFAULT_BRAND_TAG: &str = "NewArrivals";

/// Pre-written captions keyed by style slot
#[derive(Debug, Clone)]
pub struct FallbackCaptions {
    templates: Vec<String>,
}

impl FallbackCaptions {
    /// Blank templates are dropped; an empty set falls back to the built-ins
    pub fn new(templates: Vec<String>) -> Self {
        let templates: Vec<String> = templates
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if templates.is_empty() {
            return Self::default();
        }
        Self { templates }
    }

    /// Caption for a slot with brand placeholders filled in
    pub fn for_slot(&self, slot: StyleSlot, brand: Option<&str>) -> String {
        let template = &self.templates[slot.position() % self.templates.len()];
        let brand_tag = brand
            .map(|b| b.split_whitespace().collect::<String>())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_BRAND_TAG.to_string());
        template
            .replace("{brand_tag}", &brand_tag)
            .replace("{brand}", brand.unwrap_or(DEFAULT_BRAND))
    }
}

impl Default for FallbackCaptions {
    fn default() -> Self {
        Self {
            templates: CaptionConfig::default().fallbacks,
        }
    }
}

impl From<&CaptionConfig> for FallbackCaptions {
    fn from(config: &CaptionConfig) -> Self {
        Self::new(config.fallbacks.clone())
    }
}

/// Writes one caption per variant
pub struct Copywriter {
    model: Arc<dyn TextModel>,
    fallbacks: FallbackCaptions,
    min_len: usize,
}

impl Copywriter {
    pub fn new(model: Arc<dyn TextModel>, fallbacks: FallbackCaptions, min_len: usize) -> Self {
        Self {
            model,
            fallbacks,
            min_len,
        }
    }

    /// The caption used when generation is skipped or fails
    pub fn fallback(&self, slot: StyleSlot, campaign: &CampaignConfig) -> String {
        self.fallbacks.for_slot(slot, campaign.brand())
    }

    /// Caption for a variant. Never empty.
    pub async fn write(&self, variant: &VariantPrompt, campaign: &CampaignConfig) -> String {
        let fallback = self.fallback(variant.slot, campaign);

        if !campaign.generate_captions || !self.model.is_configured() {
            return fallback;
        }

        let instruction = build_caption_instruction(variant, campaign);
        match self.model.generate(&instruction).await {
            Ok(text) => {
                let caption = clean_caption(&text);
                if caption.is_empty() || caption.chars().count() < self.min_len {
                    warn!(
                        "Caption for variant {} too short ({:?}), using fallback",
                        variant.index + 1,
                        caption
                    );
                    return fallback;
                }
                debug!("Caption for variant {}: {}", variant.index + 1, caption);
                caption
            }
            Err(e) => {
                warn!(
                    "Caption generation failed for variant {}, using fallback: {}",
                    variant.index + 1,
                    e
                );
                fallback
            }
        }
    }
}

/// Build the copywriting instruction for one variant
pub fn build_caption_instruction(variant: &VariantPrompt, campaign: &CampaignConfig) -> String {
    let mut lines = vec![
        "You are an expert advertising copywriter.".to_string(),
        format!(
            "Write a {} ad caption in {} for {}.",
            campaign.tone(),
            campaign.language(),
            campaign.brand().unwrap_or("the product")
        ),
    ];
    if let Some(tagline) = campaign.tagline.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(format!("Tagline: {}", tagline.trim()));
    }
    if let Some(name) = campaign.campaign_name.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("Campaign: {}", name.trim()));
    }
    if let Some(goal) = campaign.campaign_goal.as_deref().filter(|g| !g.trim().is_empty()) {
        lines.push(format!("Campaign goal: {}", goal.trim()));
    }
    if let Some(guidelines) = campaign.guidelines.as_deref().filter(|g| !g.trim().is_empty()) {
        lines.push(format!("Brand guidelines: {}", guidelines.trim()));
    }
    lines.push(format!(
        "The caption accompanies this {} visual: {}",
        variant.slot.label(),
        variant.prompt
    ));
    lines.push(
        "Match the visual's style. At most two short sentences followed by 2-3 relevant hashtags. \
         Output only the caption text: no quotation marks, no preamble, no explanations."
            .to_string(),
    );
    lines.join("\n")
}

/// Trim whitespace and wrapping quotes
pub fn clean_caption(text: &str) -> String {
    const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’', '`'];
    text.trim().trim_matches(QUOTES).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_utils::ScriptedText;

    fn variant(index: usize) -> VariantPrompt {
        VariantPrompt {
            index,
            slot: StyleSlot::for_index(index),
            prompt: "a green bottle on wet sand at sunrise".to_string(),
        }
    }

    fn campaign() -> CampaignConfig {
        CampaignConfig {
            brand_name: Some("Eco Bottle".to_string()),
            tone: Some("energetic".to_string()),
            language: Some("Spanish".to_string()),
            ..CampaignConfig::from_brief("launch ad for EcoBottle")
        }
    }

    #[test]
    fn test_fallback_substitutes_brand() {
        let fallbacks = FallbackCaptions::new(vec!["Try {brand} today #{brand_tag}".to_string()]);
        assert_eq!(
            fallbacks.for_slot(StyleSlot::LifestyleAction, Some("Eco Bottle")),
            "Try Eco Bottle today #EcoBottle"
        );
        assert_eq!(
            fallbacks.for_slot(StyleSlot::StudioMinimalist, None),
            "Try our collection today #NewArrivals"
        );
    }

    #[test]
    fn test_fallbacks_per_slot_are_distinct() {
        let fallbacks = FallbackCaptions::default();
        let captions: Vec<String> = StyleSlot::ALL
            .iter()
            .map(|slot| fallbacks.for_slot(*slot, Some("Brand")))
            .collect();
        for (i, a) in captions.iter().enumerate() {
            assert!(!a.is_empty());
            for b in &captions[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_blank_templates_fall_back_to_builtins() {
        let fallbacks = FallbackCaptions::new(vec!["  ".to_string()]);
        assert_eq!(
            fallbacks.for_slot(StyleSlot::LuxuryCinematic, Some("X")),
            FallbackCaptions::default().for_slot(StyleSlot::LuxuryCinematic, Some("X"))
        );
    }

    #[test]
    fn test_clean_caption() {
        assert_eq!(clean_caption("  \"Sip the future. #Eco\"\n"), "Sip the future. #Eco");
        assert_eq!(clean_caption("“Fresh.”"), "Fresh.");
        assert_eq!(clean_caption("plain"), "plain");
    }

    #[test]
    fn test_instruction_contents() {
        let instruction = build_caption_instruction(&variant(3), &campaign());
        assert!(instruction.contains("energetic ad caption in Spanish for Eco Bottle"));
        assert!(instruction.contains("Luxury Cinematic"));
        assert!(instruction.contains("wet sand"));
        assert!(instruction.contains("no quotation marks"));
    }

    #[tokio::test]
    async fn test_generated_caption_used() {
        let model = ScriptedText::new(vec![Ok(
            "\"Hydration, upgraded. #EcoBottle #Fresh\"".to_string(),
        )]);
        let writer = Copywriter::new(model, FallbackCaptions::default(), 10);
        let caption = writer.write(&variant(0), &campaign()).await;
        assert_eq!(caption, "Hydration, upgraded. #EcoBottle #Fresh");
    }

    #[tokio::test]
    async fn test_failure_uses_slot_fallback() {
        let writer = Copywriter::new(ScriptedText::failing(), FallbackCaptions::default(), 10);
        let campaign = campaign();
        for index in 0..4 {
            let v = variant(index);
            let caption = writer.write(&v, &campaign).await;
            let expected = FallbackCaptions::default().for_slot(v.slot, Some("Eco Bottle"));
            assert_eq!(caption, expected);
            assert!(!caption.is_empty());
        }
    }

    #[tokio::test]
    async fn test_short_caption_uses_fallback() {
        let model = ScriptedText::new(vec![Ok("\"Wow\"".to_string())]);
        let writer = Copywriter::new(model, FallbackCaptions::default(), 10);
        let v = variant(1);
        let caption = writer.write(&v, &campaign()).await;
        assert_eq!(caption, writer.fallback(v.slot, &campaign()));
    }

    #[tokio::test]
    async fn test_empty_caption_uses_fallback_without_length_floor() {
        let model = ScriptedText::always("\"\"");
        let writer = Copywriter::new(model, FallbackCaptions::default(), 0);
        let v = variant(0);
        let caption = writer.write(&v, &campaign()).await;
        assert!(!caption.is_empty());
        assert_eq!(caption, writer.fallback(v.slot, &campaign()));
    }

    #[test]
    fn test_instruction_includes_campaign_name() {
        let mut campaign = campaign();
        campaign.campaign_name = Some("Winter Launch".to_string());
        let instruction = build_caption_instruction(&variant(0), &campaign);
        assert!(instruction.contains("Campaign: Winter Launch"));

        campaign.campaign_name = Some("  ".to_string());
        let instruction = build_caption_instruction(&variant(0), &campaign);
        assert!(!instruction.contains("Campaign: "));
    }

    #[tokio::test]
    async fn test_disabled_captions_skip_model() {
        let model = ScriptedText::always("A perfectly good caption #ad");
        let writer = Copywriter::new(model.clone(), FallbackCaptions::default(), 10);
        let mut campaign = campaign();
        campaign.generate_captions = false;

        let v = variant(2);
        let caption = writer.write(&v, &campaign).await;
        assert_eq!(model.calls(), 0);
        assert_eq!(caption, writer.fallback(v.slot, &campaign));
    }
}

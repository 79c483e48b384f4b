//! Creative direction
//!
//! One text-generation call produces all variant prompts, joined by a fixed
//! separator. A short answer is rejected and asked for once more; if it is
//! still short the list is padded from the brief.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::campaign::StyleSlot;
use crate::genai::TextModel;

/// Token the model must place between prompts
pub const SEPARATOR: &str = "|||";

/// Suffix appended to the brief for padded variants
const QUALITY_SUFFIX: &str = "high quality, professional advertising photography";

/// Leading enumeration the model sometimes adds despite instructions
static ENUMERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+[.)]|[-*•])\s+").expect("valid regex"));

/// A finalized per-variant image prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPrompt {
    pub index: usize,
    pub slot: StyleSlot,
    pub prompt: String,
}

/// Turns one brief into N distinct variant prompts
pub struct CreativeDirector {
    model: Arc<dyn TextModel>,
}

impl CreativeDirector {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Produce exactly `count` variant prompts for the brief
    pub async fn direct(&self, brief: &str, count: usize) -> Vec<VariantPrompt> {
        if !self.model.is_configured() {
            warn!("Text model not configured, using the brief for every variant");
            return duplicate_brief(brief, count);
        }

        let instruction = build_instruction(brief, count);
        debug!("Requesting {} variant prompts", count);

        let first = match self.model.generate(&instruction).await {
            Ok(text) => parse_variants(&text),
            Err(e) => {
                warn!("Creative direction failed, using the brief for every variant: {}", e);
                return duplicate_brief(brief, count);
            }
        };
        if first.len() >= count {
            info!("Creative direction produced {} prompts", first.len());
            return assemble(first, count);
        }

        warn!(
            "Creative direction returned {} of {} prompts, retrying once",
            first.len(),
            count
        );
        let retry = match self.model.generate(&build_retry_instruction(brief, count)).await {
            Ok(text) => parse_variants(&text),
            Err(e) => {
                warn!("Creative direction retry failed: {}", e);
                Vec::new()
            }
        };
        if retry.len() >= count {
            return assemble(retry, count);
        }

        let best = if retry.len() > first.len() { retry } else { first };
        if best.is_empty() {
            warn!("No usable prompts from creative direction, using the brief for every variant");
            return duplicate_brief(brief, count);
        }

        warn!("Padding {} prompts up to {}", best.len(), count);
        pad_variants(best, brief, count)
    }
}

/// Build the instruction for `count` distinct directions
pub fn build_instruction(brief: &str, count: usize) -> String {
    let directions: Vec<String> = (0..count)
        .map(|i| {
            let slot = StyleSlot::for_index(i);
            format!("{}. {}: {}", i + 1, slot.label(), slot.descriptor())
        })
        .collect();

    format!(
        r#"You are the creative director of an advertising agency.

Client brief: {brief}

Write {count} distinct image-generation prompts for this campaign, one for each creative direction below, in this order:
{directions}

Each prompt must be a single vivid paragraph describing the product, composition, lighting, color palette and mood.
Do not ask for text, captions or logos inside the image.

Respond with ONLY the {count} prompts separated by "{SEPARATOR}". No numbering, no titles, no commentary."#,
        brief = brief,
        count = count,
        directions = directions.join("\n"),
        SEPARATOR = SEPARATOR,
    )
}

fn build_retry_instruction(brief: &str, count: usize) -> String {
    format!(
        "Your previous answer did not contain exactly {} prompts separated by \"{}\". Follow the format strictly.\n\n{}",
        count,
        SEPARATOR,
        build_instruction(brief, count)
    )
}

/// Split a separator-delimited response into cleaned prompts
pub fn parse_variants(text: &str) -> Vec<String> {
    text.split(SEPARATOR)
        .map(|segment| ENUMERATION.replace(segment.trim(), "").trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Pad a short list with variants derived from the brief
pub fn pad_variants(prompts: Vec<String>, brief: &str, count: usize) -> Vec<VariantPrompt> {
    let mut prompts = prompts;
    while prompts.len() < count {
        let slot = StyleSlot::for_index(prompts.len());
        prompts.push(format!("{}, {}, {}", brief, slot.descriptor(), QUALITY_SUFFIX));
    }
    assemble(prompts, count)
}

fn duplicate_brief(brief: &str, count: usize) -> Vec<VariantPrompt> {
    assemble(vec![brief.to_string(); count], count)
}

fn assemble(prompts: Vec<String>, count: usize) -> Vec<VariantPrompt> {
    prompts
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(index, prompt)| VariantPrompt {
            index,
            slot: StyleSlot::for_index(index),
            prompt,
        })
        .collect()
}

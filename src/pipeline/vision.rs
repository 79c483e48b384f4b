//! Product image description
//!
//! Optional enrichment step: a failure leaves the brief untouched.

use tracing::{debug, info, warn};

use crate::campaign::Upload;
use crate::genai::VisionModel;

/// Instruction sent alongside the product image
pub const VISION_INSTRUCTION: &str = "Describe this product visually in 2 sentences so an AI \
    artist can recreate it perfectly. Focus on colors, materials, and shape.";

/// Describe the uploaded product image. Returns None on any failure.
pub async fn describe_product(model: &dyn VisionModel, image: &Upload) -> Option<String> {
    info!(
        "Analyzing product image ({}, {} bytes)",
        image.media_type,
        image.bytes.len()
    );

    match model.describe(VISION_INSTRUCTION, image).await {
        Ok(description) => {
            let description = description.trim();
            if description.is_empty() {
                warn!("Vision step returned no description, continuing with text brief only");
                return None;
            }
            debug!("Product description: {}", description);
            Some(description.to_string())
        }
        Err(e) => {
            warn!("Vision step failed, continuing with text brief only: {}", e);
            None
        }
    }
}

/// Fold a product description into the brief
pub fn enrich_brief(brief: &str, description: Option<&str>) -> String {
    match description {
        Some(description) => format!(
            "{}. The product looks like: {}",
            brief.trim_end_matches('.'),
            description
        ),
        None => brief.to_string(),
    }
}

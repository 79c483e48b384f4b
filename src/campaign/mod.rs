//! Campaign model
//!
//! Provides:
//! - `CampaignConfig`, the immutable input of one pipeline run
//! - Aspect ratio labels and their pixel dimensions
//! - The four creative directions (style slots) variants are spread across
//! - Base brief construction and validation

use thiserror::Error;

/// Campaign configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CampaignError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("variation count must be between 1 and {max}, got {requested}")]
    VariationCount { requested: u32, max: u32 },
}

/// Uploaded binary asset (product image, brand logo)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl Upload {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URI
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

        let rest = uri.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let media_type = meta.strip_suffix(";base64")?;
        let bytes = BASE64.decode(payload.trim()).ok()?;
        if bytes.is_empty() {
            return None;
        }
        let media_type = if media_type.is_empty() {
            "application/octet-stream"
        } else {
            media_type
        };
        Some(Self::new(bytes, media_type))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Output aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    /// 1:1, 1024x1024
    #[default]
    Square,
    /// 4:5, 1024x1280
    Portrait,
    /// 16:9, 1440x810
    Landscape,
    /// 9:16, 810x1440
    Story,
}

impl AspectRatio {
    /// Parse a ratio label. Accepts "16:9", "16:9 Landscape" or "landscape".
    /// Anything unrecognized maps to Square.
    pub fn parse(label: Option<&str>) -> AspectRatio {
        let Some(label) = label else {
            return AspectRatio::Square;
        };
        let key = label.split_whitespace().next().unwrap_or("").to_lowercase();
        match key.as_str() {
            "1:1" | "square" => AspectRatio::Square,
            "4:5" | "portrait" => AspectRatio::Portrait,
            "16:9" | "landscape" => AspectRatio::Landscape,
            "9:16" | "story" => AspectRatio::Story,
            _ => AspectRatio::Square,
        }
    }

    /// Pixel dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1024, 1024),
            AspectRatio::Portrait => (1024, 1280),
            AspectRatio::Landscape => (1440, 810),
            AspectRatio::Story => (810, 1440),
        }
    }

    pub fn ratio(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "4:5",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Story => "9:16",
        }
    }

    /// Display label, e.g. "1024×1024"
    pub fn dimensions_label(&self) -> String {
        let (w, h) = self.dimensions();
        format!("{}×{}", w, h)
    }
}

/// Creative direction assigned to a variant by its position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleSlot {
    StudioMinimalist,
    LifestyleAction,
    FuturisticArtistic,
    LuxuryCinematic,
}

impl StyleSlot {
    pub const ALL: [StyleSlot; 4] = [
        StyleSlot::StudioMinimalist,
        StyleSlot::LifestyleAction,
        StyleSlot::FuturisticArtistic,
        StyleSlot::LuxuryCinematic,
    ];

    /// Slot for the variant at `index` (cycles after four)
    pub fn for_index(index: usize) -> StyleSlot {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn position(&self) -> usize {
        match self {
            StyleSlot::StudioMinimalist => 0,
            StyleSlot::LifestyleAction => 1,
            StyleSlot::FuturisticArtistic => 2,
            StyleSlot::LuxuryCinematic => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StyleSlot::StudioMinimalist => "Studio Minimalist",
            StyleSlot::LifestyleAction => "Lifestyle Action",
            StyleSlot::FuturisticArtistic => "Futuristic Artistic",
            StyleSlot::LuxuryCinematic => "Luxury Cinematic",
        }
    }

    /// Short art-direction phrase used in prompts
    pub fn descriptor(&self) -> &'static str {
        match self {
            StyleSlot::StudioMinimalist => {
                "minimalist studio product shot, clean seamless background, soft diffused lighting"
            }
            StyleSlot::LifestyleAction => {
                "lifestyle scene with people using the product, natural light, candid energy"
            }
            StyleSlot::FuturisticArtistic => {
                "futuristic artistic composition, bold neon accents, surreal digital art"
            }
            StyleSlot::LuxuryCinematic => {
                "luxury cinematic shot, dramatic moody lighting, rich textures, shallow depth of field"
            }
        }
    }

    /// Filesystem-friendly label
    pub fn slug(&self) -> &'static str {
        match self {
            StyleSlot::StudioMinimalist => "studio_minimalist",
            StyleSlot::LifestyleAction => "lifestyle_action",
            StyleSlot::FuturisticArtistic => "futuristic_artistic",
            StyleSlot::LuxuryCinematic => "luxury_cinematic",
        }
    }
}

/// Campaign configuration for a single pipeline run
#[derive(Debug, Clone, Default)]
pub struct CampaignConfig {
    /// Explicit brief; when empty the brief is built from the campaign fields
    pub prompt: Option<String>,
    pub campaign_name: Option<String>,
    pub brand_name: Option<String>,
    pub tagline: Option<String>,
    pub campaign_goal: Option<String>,
    /// Visual style selected by the user (e.g. "Minimal", "Bold")
    pub style: Option<String>,
    pub aspect_ratio: AspectRatio,
    /// Requested variation count; None uses the configured default
    pub variations: Option<u32>,
    pub generate_captions: bool,
    pub tone: Option<String>,
    pub guidelines: Option<String>,
    pub language: Option<String>,
    pub brand_logo: Option<Upload>,
    pub product_image: Option<Upload>,
}

/// Return the trimmed value if present and non-blank
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl CampaignConfig {
    /// Create a config from a plain brief
    pub fn from_brief(brief: impl Into<String>) -> Self {
        Self {
            prompt: Some(brief.into()),
            generate_captions: true,
            ..Default::default()
        }
    }

    pub fn brand(&self) -> Option<&str> {
        non_blank(&self.brand_name)
    }

    pub fn tone(&self) -> &str {
        non_blank(&self.tone).unwrap_or("professional")
    }

    pub fn language(&self) -> &str {
        non_blank(&self.language).unwrap_or("English")
    }

    /// Product image, if one with content was supplied
    pub fn product_image(&self) -> Option<&Upload> {
        self.product_image.as_ref().filter(|u| !u.is_empty())
    }

    /// Check required fields and resolve the variation count
    pub fn validate(
        &self,
        default_variations: u32,
        max_variations: u32,
    ) -> Result<usize, CampaignError> {
        if non_blank(&self.prompt).is_none() && self.brand().is_none() {
            return Err(CampaignError::MissingField("prompt"));
        }

        let requested = self.variations.unwrap_or(default_variations);
        if requested == 0 || requested > max_variations {
            return Err(CampaignError::VariationCount {
                requested,
                max: max_variations,
            });
        }
        Ok(requested as usize)
    }

    /// Build the base brief shared by every variant
    pub fn brief(&self) -> String {
        let mut brief = match non_blank(&self.prompt) {
            Some(prompt) => prompt.to_string(),
            None => {
                let style = non_blank(&self.style)
                    .map(str::to_lowercase)
                    .unwrap_or_else(|| "modern".to_string());
                format!(
                    "Create a {} advertisement for {}. Product: {}. Campaign: {}. Style: Professional, high-quality, campaign-ready. Aspect ratio: {}. Mood: trendy, modern, engaging.",
                    style,
                    self.brand().unwrap_or("the brand"),
                    non_blank(&self.tagline).unwrap_or("flagship product"),
                    non_blank(&self.campaign_goal).unwrap_or("brand awareness"),
                    self.aspect_ratio.ratio(),
                )
            }
        };

        if let Some(guidelines) = non_blank(&self.guidelines) {
            brief.push_str(&format!(" Guidelines: {}", guidelines));
        }
        if self.brand_logo.as_ref().is_some_and(|l| !l.is_empty()) {
            brief.push_str(" Leave clean negative space for the brand logo.");
        }
        brief
    }
}

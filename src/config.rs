//! Layered server configuration
//!
//! Defaults, then an optional TOML file, then `ADCRAFT_` environment variables
//! (nested keys split on `__`, e.g. `ADCRAFT_PIPELINE__TIMEOUT_SECS`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file used when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "adcraft.toml";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    #[error("invalid setting {key}: {reason}")]
    Setting { key: &'static str, reason: String },
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub gemini: GeminiConfig,
    pub renderer: RendererConfig,
    pub pipeline: PipelineConfig,
    pub captions: CaptionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            gemini: GeminiConfig::default(),
            renderer: RendererConfig::default(),
            pipeline: PipelineConfig::default(),
            captions: CaptionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, TOML file and environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let file = match path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed("ADCRAFT_").split("__"))
            .extract()
            .map_err(Box::new)?;

        config.apply_well_known_env();
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make every run fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        if pipeline.timeout_secs == 0 {
            return Err(setting("pipeline.timeout_secs", "must be at least 1"));
        }
        if pipeline.max_variations == 0 {
            return Err(setting("pipeline.max_variations", "must be at least 1"));
        }
        let default = pipeline.default_variations;
        if default == 0 || default > pipeline.max_variations {
            return Err(setting(
                "pipeline.default_variations",
                format!("must be between 1 and {}", pipeline.max_variations),
            ));
        }
        if self.gemini.timeout_secs == 0 {
            return Err(setting("gemini.timeout_secs", "must be at least 1"));
        }
        if self.renderer.timeout_secs == 0 {
            return Err(setting("renderer.timeout_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// Fill unset credentials from the conventional provider variables
    fn apply_well_known_env(&mut self) {
        if self.gemini.api_key.is_none() {
            self.gemini.api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        if self.renderer.huggingface_token.is_none() {
            self.renderer.huggingface_token = std::env::var("HF_TOKEN").ok();
        }
    }
}

fn setting(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Setting {
        key,
        reason: reason.into(),
    }
}

/// Gemini text and vision settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub vision_model: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-1.5-flash".to_string(),
            vision_model: "gemini-1.5-flash".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Image synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererBackend {
    /// URL-addressed rendering, no request at generation time
    #[default]
    Pollinations,
    /// Binary inference endpoint returning image bytes
    HuggingFace,
}

impl RendererBackend {
    pub fn name(&self) -> &'static str {
        match self {
            RendererBackend::Pollinations => "pollinations",
            RendererBackend::HuggingFace => "huggingface",
        }
    }
}

/// Renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub backend: RendererBackend,
    pub pollinations_url: String,
    pub pollinations_model: String,
    pub huggingface_url: String,
    pub huggingface_model: String,
    pub huggingface_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: RendererBackend::Pollinations,
            pollinations_url: "https://image.pollinations.ai".to_string(),
            pollinations_model: "flux".to_string(),
            huggingface_url: "https://api-inference.huggingface.co".to_string(),
            huggingface_model: "stabilityai/sdxl-turbo".to_string(),
            huggingface_token: None,
            timeout_secs: 45,
        }
    }
}

/// Pipeline limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Overall budget for one run
    pub timeout_secs: u64,
    pub default_variations: u32,
    pub max_variations: u32,
    /// Generated captions shorter than this are replaced by the fallback
    pub caption_min_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            default_variations: 4,
            max_variations: 8,
            caption_min_len: 10,
        }
    }
}

/// Fallback captions, one per style slot. `{brand}` and `{brand_tag}` are substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub fallbacks: Vec<String>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            fallbacks: vec![
                "Clean lines, zero noise, pure quality from {brand}. #Minimal #{brand_tag}".to_string(),
                "Made for real life and every moment in between. Take {brand} wherever you go. #Lifestyle #{brand_tag}".to_string(),
                "The future just arrived. Step into what's next with {brand}. #Innovation #{brand_tag}".to_string(),
                "Crafted for those who expect more. Indulge in {brand}. #Luxury #{brand_tag}".to_string(),
            ],
        }
    }
}

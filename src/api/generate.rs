//! Generation endpoints
//!
//! `POST /api/generate` accepts either `multipart/form-data` (text fields plus
//! `productImage` / `brandLogo` file parts) or a JSON body with the same
//! camelCase fields, where images are sent as data URIs.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ApiError, AppState};
use crate::campaign::{AspectRatio, CampaignConfig, Upload};
use crate::pipeline::CampaignOutcome;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/generate-images", post(generate_images))
}

/// Campaign form as sent by the browser
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateForm {
    pub prompt: Option<String>,
    pub campaign_name: Option<String>,
    pub brand_name: Option<String>,
    pub tagline: Option<String>,
    pub campaign_goal: Option<String>,
    pub style: Option<String>,
    pub aspect_ratio: Option<String>,
    #[serde(alias = "numImages")]
    pub variations: Option<u32>,
    pub generate_captions: Option<bool>,
    pub tone: Option<String>,
    pub guidelines: Option<String>,
    pub language: Option<String>,
    /// Data URI
    pub product_image: Option<String>,
    /// Data URI
    pub brand_logo: Option<String>,
}

fn data_uri_field(name: &str, value: Option<String>) -> Result<Option<Upload>, ApiError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(uri) => Upload::from_data_uri(uri).map(Some).ok_or_else(|| {
            ApiError::bad_request(format!("{} is not a valid base64 data URI", name))
        }),
    }
}

impl GenerateForm {
    /// Convert into a pipeline input. File parts take precedence over data URIs.
    pub fn into_campaign(
        self,
        product_image: Option<Upload>,
        brand_logo: Option<Upload>,
    ) -> Result<CampaignConfig, ApiError> {
        let product_image = match product_image {
            Some(upload) => Some(upload),
            None => data_uri_field("productImage", self.product_image)?,
        };
        let brand_logo = match brand_logo {
            Some(upload) => Some(upload),
            None => data_uri_field("brandLogo", self.brand_logo)?,
        };

        Ok(CampaignConfig {
            prompt: self.prompt,
            campaign_name: self.campaign_name,
            brand_name: self.brand_name,
            tagline: self.tagline,
            campaign_goal: self.campaign_goal,
            style: self.style,
            aspect_ratio: AspectRatio::parse(self.aspect_ratio.as_deref()),
            variations: self.variations,
            generate_captions: self.generate_captions.unwrap_or(true),
            tone: self.tone,
            guidelines: self.guidelines,
            language: self.language,
            brand_logo,
            product_image,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

/// Read a multipart campaign form
async fn read_multipart(mut multipart: Multipart) -> Result<CampaignConfig, ApiError> {
    let mut form = GenerateForm::default();
    let mut product_image: Option<Upload> = None;
    let mut brand_logo: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::unprocessable(err.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        let is_upload = matches!(field_name.as_str(), "productImage" | "brandLogo");
        if is_upload && field.file_name().is_some() {
            let media_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|err| ApiError::unprocessable(err.to_string()))?;
            debug!("Received {} upload: {} bytes ({})", field_name, bytes.len(), media_type);
            let upload = Some(Upload::new(bytes.to_vec(), media_type)).filter(|u| !u.is_empty());
            if field_name == "productImage" {
                product_image = upload;
            } else {
                brand_logo = upload;
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| ApiError::unprocessable(err.to_string()))?;
        match field_name.as_str() {
            "prompt" => form.prompt = Some(value),
            "campaignName" => form.campaign_name = Some(value),
            "brandName" => form.brand_name = Some(value),
            "tagline" => form.tagline = Some(value),
            "campaignGoal" => form.campaign_goal = Some(value),
            "style" => form.style = Some(value),
            "aspectRatio" => form.aspect_ratio = Some(value),
            "variations" | "numImages" => {
                let count = value.trim().parse::<u32>().map_err(|_| {
                    ApiError::bad_request(format!("invalid variation count: {}", value))
                })?;
                form.variations = Some(count);
            }
            "generateCaptions" => form.generate_captions = Some(parse_flag(&value)),
            "tone" => form.tone = Some(value),
            "guidelines" => form.guidelines = Some(value),
            "language" => form.language = Some(value),
            "productImage" => form.product_image = Some(value),
            "brandLogo" => form.brand_logo = Some(value),
            _ => {}
        }
    }

    form.into_campaign(product_image, brand_logo)
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Run the full campaign pipeline
async fn generate(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<CampaignOutcome>, ApiError> {
    let campaign = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|err| ApiError::unprocessable(err.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let Json(form) = Json::<GenerateForm>::from_request(request, &state)
            .await
            .map_err(|err| ApiError::unprocessable(err.body_text()))?;
        form.into_campaign(None, None)?
    };

    let outcome = state.orchestrator.run(campaign).await?;
    Ok(Json(outcome))
}

/// Legacy images-only request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagesRequest {
    prompt: Option<String>,
    num_images: Option<u32>,
    aspect_ratio: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImagesResponse {
    images: Vec<String>,
}

async fn generate_images(
    State(state): State<AppState>,
    payload: Result<Json<ImagesRequest>, JsonRejection>,
) -> Result<Json<ImagesResponse>, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::unprocessable(err.body_text()))?;

    let prompt = request.prompt.filter(|p| !p.trim().is_empty());
    let (Some(prompt), Some(num_images)) = (prompt, request.num_images) else {
        return Err(ApiError::bad_request("prompt and numImages are required"));
    };

    let campaign = CampaignConfig {
        prompt: Some(prompt),
        aspect_ratio: AspectRatio::parse(request.aspect_ratio.as_deref()),
        variations: Some(num_images),
        ..Default::default()
    };
    let images = state.orchestrator.render_only(campaign).await?;
    Ok(Json(ImagesResponse { images }))
}

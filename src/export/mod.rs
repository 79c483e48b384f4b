//! Campaign asset bundles
//!
//! Packs creatives into a zip: one image and one caption file per variation
//! under `ad_campaign_assets/`. An image that cannot be obtained is logged and
//! its entry skipped; the archive is still produced.

use std::io::{Cursor, Write};
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::campaign::Upload;
use crate::pipeline::CreativeResult;

/// Download name of the archive
pub const ARCHIVE_NAME: &str = "Campaign_Assets.zip";

/// Folder inside the archive
pub const ARCHIVE_FOLDER: &str = "ad_campaign_assets";

/// Bundle errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A finished archive
#[derive(Debug)]
pub struct Bundle {
    pub bytes: Vec<u8>,
    pub included: usize,
    pub skipped: usize,
}

/// Client for fetching images into bundles. Stalled hosts are cut off after `timeout`.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Image bytes ready to be written
struct ImageAsset {
    bytes: Vec<u8>,
    extension: &'static str,
}

/// File extension for an image media type
pub fn extension_for(media_type: &str) -> &'static str {
    let media_type = media_type.split(';').next().unwrap_or("").trim();
    match media_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        _ => "jpg",
    }
}

/// Filesystem-friendly version of a style label
pub fn style_slug(style: &str) -> String {
    let slug: String = style
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if slug.is_empty() {
        "creative".to_string()
    } else {
        slug
    }
}

/// Resolve an image reference to bytes
async fn fetch_image(client: &Client, image: &str) -> Result<ImageAsset, String> {
    if image.starts_with("data:") {
        let upload = Upload::from_data_uri(image).ok_or("invalid data URI")?;
        return Ok(ImageAsset {
            extension: extension_for(&upload.media_type),
            bytes: upload.bytes,
        });
    }

    if !(image.starts_with("http://") || image.starts_with("https://")) {
        return Err("unsupported image reference".to_string());
    }

    debug!("Downloading image from: {}", image);
    let response = client
        .get(image)
        .send()
        .await
        .map_err(|e| format!("Failed to fetch image: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    let extension = extension_for(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg"),
    );

    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("Failed to read image bytes: {}", e))?;
    if bytes.is_empty() {
        return Err("empty image body".to_string());
    }

    Ok(ImageAsset {
        bytes: bytes.to_vec(),
        extension,
    })
}

/// Fetch every image concurrently and write the archive
pub async fn build_bundle(
    client: &Client,
    creatives: &[CreativeResult],
) -> Result<Bundle, ExportError> {
    let assets = join_all(creatives.iter().map(|c| fetch_image(client, &c.image))).await;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.add_directory(format!("{}/", ARCHIVE_FOLDER), options)?;

    let mut included = 0;
    let mut skipped = 0;
    for (index, (creative, asset)) in creatives.iter().zip(assets).enumerate() {
        let number = index + 1;
        let asset = match asset {
            Ok(asset) => asset,
            Err(e) => {
                warn!("Skipping variation {} in bundle: {}", number, e);
                skipped += 1;
                continue;
            }
        };

        zip.start_file(
            format!(
                "{}/variation_{}_{}.{}",
                ARCHIVE_FOLDER,
                number,
                style_slug(&creative.style),
                asset.extension
            ),
            options,
        )?;
        zip.write_all(&asset.bytes)?;

        zip.start_file(
            format!("{}/variation_{}_caption.txt", ARCHIVE_FOLDER, number),
            options,
        )?;
        zip.write_all(creative.caption.as_bytes())?;
        included += 1;
    }

    let bytes = zip.finish()?.into_inner();
    info!(
        "Built bundle: {} variations, {} skipped, {} bytes",
        included,
        skipped,
        bytes.len()
    );

    Ok(Bundle {
        bytes,
        included,
        skipped,
    })
}

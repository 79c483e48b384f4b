//! adcraft_bundle - run one campaign from the command line
//!
//! Generates the creatives, writes the asset bundle and prints the results as JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use adcraft::campaign::{AspectRatio, CampaignConfig, Upload};
use adcraft::export::{build_bundle, http_client, ARCHIVE_NAME};
use adcraft::pipeline::Orchestrator;
use adcraft::Config;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One-shot campaign generation
#[derive(Parser, Debug)]
#[command(
    name = "adcraft_bundle",
    version,
    about = "Generate an ad campaign and write its asset bundle"
)]
struct Args {
    /// Free-form campaign brief
    #[arg(long)]
    brief: Option<String>,

    #[arg(long)]
    brand: Option<String>,

    #[arg(long)]
    tagline: Option<String>,

    /// Campaign goal, e.g. "product launch"
    #[arg(long)]
    goal: Option<String>,

    /// Visual style, e.g. "Minimal"
    #[arg(long)]
    style: Option<String>,

    /// 1:1, 4:5, 16:9 or 9:16
    #[arg(long, default_value = "1:1")]
    aspect_ratio: String,

    /// Number of variations (configured default when omitted)
    #[arg(short = 'n', long)]
    variations: Option<u32>,

    #[arg(long)]
    tone: Option<String>,

    #[arg(long)]
    language: Option<String>,

    /// Product photo used to enrich the brief
    #[arg(long)]
    product_image: Option<PathBuf>,

    /// Where to write the zip
    #[arg(short, long, default_value = ARCHIVE_NAME)]
    output: PathBuf,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adcraft=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if args.brief.is_none() && args.brand.is_none() {
        bail!("Either --brief or --brand is required");
    }

    let product_image = match &args.product_image {
        Some(path) => {
            if !path.exists() {
                bail!("Product image not found: {}", path.display());
            }
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(Upload::new(bytes, media_type_for(path)))
        }
        None => None,
    };

    let config = Config::load(args.config.as_deref())?;
    let orchestrator = Orchestrator::from_config(&config)?;

    let campaign = CampaignConfig {
        prompt: args.brief,
        brand_name: args.brand,
        tagline: args.tagline,
        campaign_goal: args.goal,
        style: args.style,
        aspect_ratio: AspectRatio::parse(Some(&args.aspect_ratio)),
        variations: args.variations,
        generate_captions: true,
        tone: args.tone,
        language: args.language,
        product_image,
        ..Default::default()
    };

    let outcome = orchestrator.run(campaign).await?;

    let client = http_client(Duration::from_secs(config.renderer.timeout_secs))?;
    let bundle = build_bundle(&client, &outcome.variations).await?;
    tokio::fs::write(&args.output, &bundle.bytes)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(
        "Wrote {} ({} variations, {} skipped)",
        args.output.display(),
        bundle.included,
        bundle.skipped
    );

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

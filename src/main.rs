//! adcraft - ad creative generation daemon

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use adcraft::{Config, Server};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ad creative generation server
#[derive(Parser, Debug)]
#[command(name = "adcraft", version, about = "Serve the ad creative generation API")]
struct Args {
    /// Configuration file (defaults to ./adcraft.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding the configuration
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "adcraft=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    info!("Using {} renderer", config.renderer.backend.name());

    // Create and run server
    let server = Server::new(config)?;
    server.run().await?;

    Ok(())
}

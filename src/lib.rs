//! adcraft - ad creative generation daemon
//!
//! Turns a campaign brief (and optionally a product photo) into a set of
//! styled ad images with captions, and packs them into downloadable bundles.

pub mod api;
pub mod campaign;
pub mod config;
pub mod export;
pub mod genai;
pub mod pipeline;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub use config::Config;
use pipeline::Orchestrator;

/// The adcraft server instance
pub struct Server {
    config: Config,
    orchestrator: Arc<Orchestrator>,
    /// Fetches images for bundle exports
    http: reqwest::Client,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server with the production pipeline built from `config`
    pub fn new(config: Config) -> Result<Self> {
        let orchestrator = Orchestrator::from_config(&config)?;
        Self::with_orchestrator(config, orchestrator)
    }

    /// Create a server around an already assembled pipeline
    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Result<Self> {
        let http = export::http_client(Duration::from_secs(config.renderer.timeout_secs))?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            http,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(api::AppState::new(
            self.orchestrator.clone(),
            self.http.clone(),
        ))
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            "adcraft listening on {} (renderer: {}, text model configured: {})",
            local_addr,
            self.orchestrator.renderer_name(),
            self.orchestrator.text_model_configured()
        );

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("adcraft shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

//! Common test utilities - AdcraftTest harness for end-to-end testing
//!
//! `FakeUpstream` stands in for the Gemini REST API and the Pollinations image
//! host on a random local port, so the real clients are exercised.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use adcraft::pipeline::Orchestrator;
use adcraft::{Config, Server};
use anyhow::Result;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const API_KEY: &str = "test-key";

pub const PRODUCT_DESCRIPTION: &str = "a matte green aluminium bottle with a bamboo cap";

pub const DIRECTOR_ANSWER: &str = "EcoBottle on a white plinth, soft shadows \
    ||| hiker sipping from EcoBottle on a ridge at sunrise \
    ||| EcoBottle floating in a neon-lit zero gravity chamber \
    ||| EcoBottle on black marble under a single spotlight";

pub const CAPTION: &str = "Hydration that keeps up with you. #EcoBottle #StayFresh";

/// Bytes served for every rendered image
pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

#[derive(Default)]
struct UpstreamState {
    vision_fails: AtomicBool,
    text_calls: AtomicUsize,
    vision_calls: AtomicUsize,
    image_hits: AtomicUsize,
    prompts: std::sync::Mutex<Vec<String>>,
}

/// Local stand-in for the generative backends
pub struct FakeUpstream {
    pub addr: SocketAddr,
    state: Arc<UpstreamState>,
    _handle: JoinHandle<()>,
}

impl FakeUpstream {
    pub async fn start() -> Result<Self> {
        let state = Arc::new(UpstreamState::default());
        let router = Router::new()
            .route("/models/{call}", post(generate_content))
            .route("/prompt/{*prompt}", get(serve_image))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("Upstream error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make image description requests fail with a 500
    pub fn fail_vision(&self) {
        self.state.vision_fails.store(true, Ordering::SeqCst);
    }

    pub fn text_calls(&self) -> usize {
        self.state.text_calls.load(Ordering::SeqCst)
    }

    pub fn vision_calls(&self) -> usize {
        self.state.vision_calls.load(Ordering::SeqCst)
    }

    pub fn image_hits(&self) -> usize {
        self.state.image_hits.load(Ordering::SeqCst)
    }

    /// Every text prompt received so far
    pub fn prompts(&self) -> Vec<String> {
        self.state.prompts.lock().unwrap().clone()
    }

    /// Configuration pointing both backends at this upstream
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.gemini.api_key = Some(API_KEY.to_string());
        config.gemini.base_url = self.base_url();
        config.renderer.pollinations_url = self.base_url();
        config.pipeline.timeout_secs = 10;
        config
    }
}

fn candidate(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
    })
}

async fn generate_content(
    State(state): State<Arc<UpstreamState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (StatusCode::FORBIDDEN, Json(serde_json::json!({"error": "bad key"})));
    }

    let parts = body["contents"][0]["parts"].as_array().cloned().unwrap_or_default();
    let has_image = parts.iter().any(|p| p.get("inline_data").is_some());
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if has_image {
        state.vision_calls.fetch_add(1, Ordering::SeqCst);
        if state.vision_fails.load(Ordering::SeqCst) {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "vision backend down"})),
            );
        }
        return (StatusCode::OK, Json(candidate(PRODUCT_DESCRIPTION)));
    }

    state.text_calls.fetch_add(1, Ordering::SeqCst);
    state.prompts.lock().unwrap().push(text.clone());
    let answer = if text.contains("|||") { DIRECTOR_ANSWER } else { CAPTION };
    (StatusCode::OK, Json(candidate(answer)))
}

async fn serve_image(State(state): State<Arc<UpstreamState>>) -> impl IntoResponse {
    state.image_hits.fetch_add(1, Ordering::SeqCst);
    ([(CONTENT_TYPE, "image/png")], IMAGE_BYTES)
}

/// Test harness that spawns a real adcraft server on a random port
pub struct AdcraftTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl AdcraftTest {
    /// Start a server with the production pipeline built from `config`
    pub async fn start(config: Config) -> Result<Self> {
        let orchestrator = Orchestrator::from_config(&config)?;
        Self::start_with(config, orchestrator).await
    }

    /// Start a server around a prepared pipeline
    pub async fn start_with(mut config: Config, orchestrator: Orchestrator) -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);
        config.bind_addr = addr;

        let server = Arc::new(Server::with_orchestrator(config, orchestrator)?);
        let server_clone = server.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a POST request with a multipart form
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .multipart(form)
            .send()
            .await?)
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

impl Drop for AdcraftTest {
    fn drop(&mut self) {
        self.shutdown();
    }
}

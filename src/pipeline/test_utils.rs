//! Scripted model fakes for pipeline unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::render::{ImageRenderer, RenderRequest};
use crate::campaign::Upload;
use crate::genai::{GenAiError, TextModel, VisionModel};

/// Text model answering from a queue, then from `default` (or failing)
pub struct ScriptedText {
    responses: Mutex<VecDeque<Result<String, String>>>,
    default: Option<String>,
    configured: bool,
    calls: AtomicUsize,
}

impl ScriptedText {
    pub fn new(responses: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            default: None,
            configured: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(text: &str) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            default: Some(text.to_string()),
            configured: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            default: None,
            configured: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextModel for ScriptedText {
    async fn generate(&self, _prompt: &str) -> Result<String, GenAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenAiError::Malformed(message)),
            None => self
                .default
                .clone()
                .ok_or_else(|| GenAiError::Malformed("scripted failure".to_string())),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// Vision model returning a fixed description or failing
pub struct FixedVision {
    description: Option<String>,
    calls: AtomicUsize,
}

impl FixedVision {
    pub fn describing(description: &str) -> Arc<Self> {
        Arc::new(Self {
            description: Some(description.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            description: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for FixedVision {
    async fn describe(&self, _instruction: &str, _image: &Upload) -> Result<String, GenAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.description
            .clone()
            .ok_or_else(|| GenAiError::Malformed("connection reset".to_string()))
    }
}

/// Renderer recording requests; fails prompts containing `fail_marker`
pub struct RecordingRenderer {
    fail_marker: Option<String>,
    requests: Mutex<Vec<RenderRequest>>,
}

impl RecordingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_marker: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_on(marker: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_marker: Some(marker.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        let mut requests = self.requests.lock().unwrap().clone();
        requests.sort_by_key(|r| r.seed);
        requests
    }
}

#[async_trait]
impl ImageRenderer for RecordingRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, GenAiError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(marker) = &self.fail_marker {
            if request.prompt.contains(marker.as_str()) {
                return Err(GenAiError::Status {
                    status: 503,
                    body: "model loading".to_string(),
                });
            }
        }
        Ok(format!("https://img.test/{}.png", request.seed))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

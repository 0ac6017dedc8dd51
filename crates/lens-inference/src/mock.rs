//! Mock backends for deterministic testing.
//!
//! Available to this crate's tests and, through the `mock` feature, to
//! dependent crates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lens_inference::mock::MockGenerationBackend;
//!
//! let backend = MockGenerationBackend::new()
//!     .with_fixed_response("## Analysis")
//!     .with_response_when("Creative Content Strategist", "[]");
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lens_core::{Error, GenerationBackend, GenerationOptions, Result};

use crate::image::ImageGenerationBackend;
use crate::vision::VisionBackend;

/// One recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

#[derive(Debug, Clone, Default)]
struct CallLog(Arc<Mutex<Vec<MockCall>>>);

impl CallLog {
    fn push(&self, operation: &str, input: &str) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(MockCall {
                operation: operation.to_string(),
                input: input.to_string(),
            });
        }
    }

    fn snapshot(&self) -> Vec<MockCall> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn clear(&self) {
        if let Ok(mut calls) = self.0.lock() {
            calls.clear();
        }
    }
}

async fn simulate_latency(latency_ms: u64) {
    if latency_ms > 0 {
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;
    }
}

// =============================================================================
// GENERATION
// =============================================================================

#[derive(Debug, Clone)]
struct GenerationConfig {
    default_response: String,
    /// (substring of prompt, response); first match wins.
    rules: Vec<(String, String)>,
    failure: Option<String>,
    latency_ms: u64,
}

/// Mock text generation backend.
#[derive(Debug, Clone)]
pub struct MockGenerationBackend {
    config: Arc<GenerationConfig>,
    calls: CallLog,
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(GenerationConfig {
                default_response: "Mock response".to_string(),
                rules: Vec::new(),
                failure: None,
                latency_ms: 0,
            }),
            calls: CallLog::default(),
        }
    }

    /// Response for prompts matching no rule.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Respond with `response` when the prompt contains `needle`.
    pub fn with_response_when(
        mut self,
        needle: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .rules
            .push((needle.into(), response.into()));
        self
    }

    /// Fail every call with `Error::Inference(message)`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(message.into());
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.snapshot()
    }

    pub fn clear_calls(&self) {
        self.calls.clear()
    }

    pub fn generate_call_count(&self) -> usize {
        self.get_calls()
            .iter()
            .filter(|c| c.operation == "generate")
            .count()
    }

    fn respond(&self, prompt: &str) -> Result<String> {
        if let Some(ref message) = self.config.failure {
            return Err(Error::Inference(message.clone()));
        }
        let response = self
            .config
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.config.default_response.clone());
        Ok(response)
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_options("", prompt, &GenerationOptions::default())
            .await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_with_options(system, prompt, &GenerationOptions::default())
            .await
    }

    async fn generate_with_options(
        &self,
        _system: &str,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String> {
        self.calls.push("generate", prompt);
        simulate_latency(self.config.latency_ms).await;
        self.respond(prompt)
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

// =============================================================================
// VISION
// =============================================================================

#[derive(Debug, Clone)]
struct VisionConfig {
    response: String,
    failure: Option<String>,
    latency_ms: u64,
}

/// Mock image description backend.
#[derive(Debug, Clone)]
pub struct MockVisionBackend {
    config: Arc<VisionConfig>,
    calls: CallLog,
}

impl MockVisionBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(VisionConfig {
                response: "A mock image description".to_string(),
                failure: None,
                latency_ms: 0,
            }),
            calls: CallLog::default(),
        }
    }

    /// Description returned for every image.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).response = response.into();
        self
    }

    /// Fail every call with `Error::Inference(message)`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(message.into());
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.snapshot()
    }
}

impl Default for MockVisionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionBackend for MockVisionBackend {
    async fn describe_image(
        &self,
        _image_data: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
    ) -> Result<String> {
        self.calls
            .push("describe_image", &format!("{}|{}", mime_type, prompt.unwrap_or("")));
        simulate_latency(self.config.latency_ms).await;
        match self.config.failure {
            Some(ref message) => Err(Error::Inference(message.clone())),
            None => Ok(self.config.response.clone()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}

// =============================================================================
// IMAGE GENERATION
// =============================================================================

#[derive(Debug, Clone)]
struct ImageConfig {
    image_url: String,
    failure: Option<String>,
    latency_ms: u64,
}

/// Mock image generation backend.
#[derive(Debug, Clone)]
pub struct MockImageBackend {
    config: Arc<ImageConfig>,
    calls: CallLog,
}

impl MockImageBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(ImageConfig {
                image_url: "data:image/png;base64,bW9jaw==".to_string(),
                failure: None,
                latency_ms: 0,
            }),
            calls: CallLog::default(),
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).image_url = url.into();
        self
    }

    /// Fail every call with `Error::ImageGeneration(message)`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(message.into());
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.snapshot()
    }
}

impl Default for MockImageBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationBackend for MockImageBackend {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        self.calls.push("generate_image", prompt);
        simulate_latency(self.config.latency_ms).await;
        match self.config.failure {
            Some(ref message) => Err(Error::ImageGeneration(message.clone())),
            None => Ok(self.config.image_url.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock-image"
    }
}

//! OpenAI-compatible backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use lens_core::defaults::{
    GEN_MODEL, GEN_TIMEOUT_SECS, HEALTH_CHECK_TIMEOUT_SECS, IMAGE_MODEL, IMAGE_SIZE, OPENAI_URL,
    VISION_MODEL, VISION_TEMPERATURE,
};
use lens_core::intake::data_url;
use lens_core::{Error, GenerationBackend, GenerationOptions, Result};

use super::error::{to_lens_error, OpenAIErrorCode};
use super::types::*;
use crate::image::ImageGenerationBackend;
use crate::vision::{VisionBackend, DEFAULT_VISION_PROMPT};

/// Configuration for OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use for text generation.
    pub gen_model: String,
    /// Model to use for image description.
    pub vision_model: String,
    /// Model to use for image generation.
    pub image_model: String,
    /// Size of generated images, e.g. `1024x1024`.
    pub image_size: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Skip TLS verification (for self-signed certs in local environments).
    pub skip_tls_verify: bool,
    /// HTTP-Referer header for OpenRouter.ai rankings (optional).
    pub http_referer: Option<String>,
    /// X-Title header for app name on OpenRouter.ai (optional).
    pub x_title: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_URL.to_string(),
            api_key: None,
            gen_model: GEN_MODEL.to_string(),
            vision_model: VISION_MODEL.to_string(),
            image_model: IMAGE_MODEL.to_string(),
            image_size: IMAGE_SIZE.to_string(),
            timeout_seconds: GEN_TIMEOUT_SECS,
            skip_tls_verify: false,
            http_referer: None,
            x_title: None,
        }
    }
}

impl OpenAIConfig {
    /// Read configuration from `OPENAI_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            gen_model: std::env::var("OPENAI_GEN_MODEL").unwrap_or(defaults.gen_model),
            vision_model: std::env::var("OPENAI_VISION_MODEL").unwrap_or(defaults.vision_model),
            image_model: std::env::var("OPENAI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            image_size: std::env::var("OPENAI_IMAGE_SIZE").unwrap_or(defaults.image_size),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_seconds),
            skip_tls_verify: std::env::var("OPENAI_SKIP_TLS_VERIFY")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(false),
            http_referer: std::env::var("OPENAI_HTTP_REFERER").ok(),
            x_title: std::env::var("OPENAI_X_TITLE").ok(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_gen_model(mut self, model: impl Into<String>) -> Self {
        self.gen_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }
}

/// OpenAI-compatible backend for generation, vision, and image generation.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Create a new OpenAI backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let mut client_builder =
            Client::builder().timeout(Duration::from_secs(config.timeout_seconds));

        if config.skip_tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "openai",
            url = %config.base_url,
            gen_model = %config.gen_model,
            vision_model = %config.vision_model,
            image_model = %config.image_model,
            "Initializing OpenAI backend"
        );

        Ok(Self { client, config })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OpenAIConfig::default())
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(self.url(endpoint));

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        // OpenRouter attribution headers
        if let Some(ref referer) = self.config.http_referer {
            req = req.header("HTTP-Referer", referer);
        }

        if let Some(ref title) = self.config.x_title {
            req = req.header("X-Title", title);
        }

        req.header("Content-Type", "application/json")
    }

    /// Build a GET request with authentication.
    fn build_get_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(self.url(endpoint));

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req
    }

    /// Turn a non-success response into a classified error.
    async fn error_from_response(response: reqwest::Response) -> (OpenAIErrorCode, Error) {
        let status = response.status();
        let body: OpenAIErrorResponse = response.json().await.unwrap_or(OpenAIErrorResponse {
            error: OpenAIError::unknown(),
        });
        let code = OpenAIErrorCode::from_response(status.as_u16(), &body.error);
        let message = format!("OpenAI returned {}: {}", status, body.error.message);
        (code, to_lens_error(code, &message))
    }

    /// Check if the endpoint is reachable and the key is accepted.
    pub async fn probe_models(&self) -> Result<bool> {
        let response = self
            .build_get_request("/models")
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI health check passed");
                Ok(true)
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "OpenAI health check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "OpenAI health check error");
                Ok(false)
            }
        }
    }

    /// Send a chat completion and return the first choice's text.
    async fn chat(&self, request: ChatCompletionRequest) -> Result<String> {
        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let (_, err) = Self::error_from_response(response).await;
            return Err(err);
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let message = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::Inference("Response contained no choices".to_string()))?;

        match (message.content, message.refusal) {
            (Some(content), _) => Ok(content),
            (None, Some(refusal)) => Err(Error::Inference(format!("Model refused: {}", refusal))),
            (None, None) => Ok(String::new()),
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_with_options(system, prompt, &GenerationOptions::default())
            .await
    }

    async fn generate_with_options(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        debug!(
            model = %self.config.gen_model,
            prompt_len = prompt.len(),
            json_mode = options.json_mode,
            "Generating"
        );

        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(ChatMessage::text("system", system));
        }
        messages.push(ChatMessage::text("user", prompt));

        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: None,
            response_format: options.json_mode.then(ResponseFormat::json_object),
        };

        let content = self.chat(request).await?;
        debug!(response_len = content.len(), "Generation complete");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}

#[async_trait]
impl VisionBackend for OpenAIBackend {
    async fn describe_image(
        &self,
        image_data: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
    ) -> Result<String> {
        debug!(
            model = %self.config.vision_model,
            bytes = image_data.len(),
            mime_type = mime_type,
            "Describing image"
        );

        let request = ChatCompletionRequest {
            model: self.config.vision_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: prompt.unwrap_or(DEFAULT_VISION_PROMPT).to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(mime_type, image_data),
                        },
                    },
                ]),
            }],
            temperature: Some(VISION_TEMPERATURE),
            max_tokens: None,
            response_format: None,
        };

        let description = self.chat(request).await?;
        Ok(description.trim().to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        self.probe_models().await
    }

    fn model_name(&self) -> &str {
        &self.config.vision_model
    }
}

#[async_trait]
impl ImageGenerationBackend for OpenAIBackend {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        debug!(
            model = %self.config.image_model,
            prompt_len = prompt.len(),
            "Generating image"
        );

        let request = ImageGenerationRequest {
            model: self.config.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.config.image_size.clone(),
            response_format: self
                .config
                .image_model
                .starts_with("dall-e")
                .then(|| "b64_json".to_string()),
        };

        let response = self
            .build_request("/images/generations")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::ImageGeneration(format!("Error during image generation: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(match Self::error_from_response(response).await {
                (OpenAIErrorCode::ContentPolicy, err) => err,
                (_, err) => Error::ImageGeneration(format!(
                    "Error during image generation: {}",
                    err.detail()
                )),
            });
        }

        let result: ImageGenerationResponse = response.json().await.map_err(|e| {
            Error::ImageGeneration(format!("Failed to parse image response: {}", e))
        })?;

        let image = result.data.into_iter().next();
        match image {
            Some(ImageData {
                b64_json: Some(b64),
                ..
            }) => Ok(format!(
                "data:{};base64,{}",
                lens_core::defaults::GENERATED_IMAGE_MIME,
                b64
            )),
            Some(ImageData { url: Some(url), .. }) => Ok(url),
            _ => Err(Error::ImageGeneration(
                "Image generation succeeded but returned no images.".to_string(),
            )),
        }
    }

    fn model_name(&self) -> &str {
        &self.config.image_model
    }
}

//! Vision backend trait and a local Ollama implementation for image description.

use async_trait::async_trait;
use lens_core::defaults::{ENV_OLLAMA_VISION_MODEL, OLLAMA_URL};
use lens_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Prompt used when the caller supplies none.
pub const DEFAULT_VISION_PROMPT: &str =
    "Describe this image in detail. Include any text visible in the image.";

/// Build the campaign-aware description prompt for an uploaded image.
pub fn campaign_image_prompt(campaign_name: &str, file_name: &str) -> String {
    format!(
        "Analyze this image for a campaign titled '{campaign}'.\n\
         Describe key objects, the overall scene, dominant colors, visual style, any discernible \
         sentiment or emotion conveyed, and potential themes or ideas relevant to the campaign.\n\
         Focus ONLY on aspects crucial for inspiring content creation.\n\
         File name for context: {file}.\n\
         Provide a very concise textual description and analysis, strictly under 150 words. \
         Be brief and to the point.",
        campaign = campaign_name,
        file = file_name,
    )
}

/// Backend for describing images using vision LLMs.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Describe an image, optionally with a custom prompt.
    async fn describe_image(
        &self,
        image_data: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
    ) -> Result<String>;

    /// Check if the vision backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Ollama-based vision backend (e.g., llava, qwen2.5-vl).
pub struct OllamaVisionBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaVisionBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: 120,
        }
    }

    /// Create from environment variables.
    /// Returns None if OLLAMA_VISION_MODEL is not set.
    pub fn from_env() -> Option<Self> {
        let model = std::env::var(ENV_OLLAMA_VISION_MODEL).ok()?;
        if model.is_empty() {
            return None;
        }
        let base_url = std::env::var("OLLAMA_BASE").unwrap_or_else(|_| OLLAMA_URL.to_string());
        Some(Self::new(base_url, model))
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>, // base64 encoded
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl VisionBackend for OllamaVisionBackend {
    async fn describe_image(
        &self,
        image_data: &[u8],
        _mime_type: &str,
        prompt: Option<&str>,
    ) -> Result<String> {
        use base64::Engine;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.unwrap_or(DEFAULT_VISION_PROMPT).to_string(),
            images: vec![image_b64],
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Vision API returned {}: {}",
                status, body
            )));
        }

        let result: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse vision response: {}", e)))?;

        Ok(result.response.trim().to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(
                lens_core::defaults::HEALTH_CHECK_TIMEOUT_SECS,
            ))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_prompt_mentions_campaign_and_file() {
        let prompt = campaign_image_prompt("Summer Splash", "beach.png");
        assert!(prompt.contains("'Summer Splash'"));
        assert!(prompt.contains("File name for context: beach.png."));
        assert!(prompt.contains("under 150 words"));
    }

    #[test]
    fn test_ollama_vision_backend_new() {
        let backend =
            OllamaVisionBackend::new("http://localhost:11434".to_string(), "llava".to_string())
                .with_timeout_secs(30);
        assert_eq!(backend.base_url, "http://localhost:11434");
        assert_eq!(backend.timeout_secs, 30);
        assert_eq!(backend.model_name(), "llava");
    }

    #[test]
    fn test_ollama_generate_request_serialization() {
        let request = OllamaGenerateRequest {
            model: "llava".to_string(),
            prompt: "Describe this image".to_string(),
            images: vec!["base64data".to_string()],
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llava");
        assert_eq!(json["images"][0], "base64data");
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_ollama_describe_image_against_mock_server() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "  A dog on grass \n"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = OllamaVisionBackend::new(server.uri(), "llava".to_string());
        let description = backend
            .describe_image(b"\x89PNG", "image/png", Some("What is this?"))
            .await
            .unwrap();
        assert_eq!(description, "A dog on grass");
    }

    #[tokio::test]
    async fn test_ollama_error_status() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let backend = OllamaVisionBackend::new(server.uri(), "llava".to_string());
        let err = backend
            .describe_image(b"data", "image/png", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }
}

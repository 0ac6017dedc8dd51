//! Image generation backend trait.

use async_trait::async_trait;
use lens_core::Result;

/// Backend for turning a text prompt into an image.
#[async_trait]
pub trait ImageGenerationBackend: Send + Sync {
    /// Generate one image and return a reference to it (a `data:` URL or a
    /// remote URL). Safety rejections surface as `Error::ImageGeneration`
    /// carrying the standard blocked message.
    async fn generate_image(&self, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

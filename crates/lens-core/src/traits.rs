//! Port traits for the campaign workspace.
//!
//! Generation, extraction, and persistence collaborators are reached only
//! through these interfaces so that tests can swap in mock backends.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::{ExtractionResult, ExtractionStrategy};
use crate::snapshot::StoreSnapshot;

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Per-call generation options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature. `None` leaves the backend default.
    pub temperature: Option<f32>,
    /// Ask the backend to return a JSON object.
    pub json_mode: bool,
}

impl GenerationOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate with explicit options. Backends that cannot honor the
    /// options fall back to [`GenerationBackend::generate_with_system`].
    async fn generate_with_options(
        &self,
        system: &str,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String> {
        self.generate_with_system(system, prompt).await
    }

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// EXTRACTION ADAPTER TRAITS
// =============================================================================

/// Adapter for extracting text from uploaded documents.
///
/// Each adapter handles one [`ExtractionStrategy`]. Adapters are registered in
/// an extraction registry and dispatched on the strategy detected for a file.
#[async_trait]
pub trait ExtractionAdapter: Send + Sync {
    /// The extraction strategy this adapter handles.
    fn strategy(&self) -> ExtractionStrategy;

    /// Extract content from raw file data.
    async fn extract(
        &self,
        data: &[u8],
        filename: &str,
        mime_type: &str,
        config: &JsonValue,
    ) -> Result<ExtractionResult>;

    /// Check if the adapter's external dependencies are available.
    async fn health_check(&self) -> Result<bool>;

    /// Human-readable name of this adapter.
    fn name(&self) -> &str;
}

// =============================================================================
// PERSISTENCE TRAITS
// =============================================================================

/// Durable storage for the whole workspace.
///
/// The snapshot already excludes transient fields; implementations store it
/// as-is and report `QuotaExceeded` when the backing store is full.
#[async_trait]
pub trait NotebookRepository: Send + Sync {
    /// Load the last saved snapshot. An absent store yields an empty snapshot.
    async fn load(&self) -> Result<StoreSnapshot>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &StoreSnapshot) -> Result<()>;
}

//! Extraction registry: routes an upload to the adapter for its strategy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use lens_core::defaults::EXTRACTION_CMD_TIMEOUT_SECS;
use lens_core::{Error, ExtractionAdapter, ExtractionResult, ExtractionStrategy, Result};

use crate::adapters::{OfficeConvertAdapter, PdfTextAdapter, TextNativeAdapter};

/// Health of one registered adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterHealth {
    pub strategy: ExtractionStrategy,
    pub adapter: String,
    pub healthy: bool,
}

/// Adapters keyed by the strategy they implement.
pub struct ExtractionRegistry {
    adapters: HashMap<ExtractionStrategy, Arc<dyn ExtractionAdapter>>,
    timeout_secs: u64,
}

impl ExtractionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            timeout_secs: EXTRACTION_CMD_TIMEOUT_SECS,
        }
    }

    /// Registry with the text, PDF, and Word adapters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextNativeAdapter));
        registry.register(Arc::new(PdfTextAdapter));
        registry.register(Arc::new(OfficeConvertAdapter));
        registry
    }

    /// Default per-command timeout handed to adapters by [`Self::extract_upload`].
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    /// Register an adapter, replacing any previous one for its strategy.
    pub fn register(&mut self, adapter: Arc<dyn ExtractionAdapter>) {
        debug!(adapter = adapter.name(), strategy = %adapter.strategy(), "Extraction adapter registered");
        self.adapters.insert(adapter.strategy(), adapter);
    }

    /// Strategy for an upload, or `None` when no text extraction applies.
    pub fn strategy_for(&self, file_name: &str, file_type: &str) -> Option<ExtractionStrategy> {
        ExtractionStrategy::for_file(file_name, file_type)
    }

    /// Run the adapter for `strategy` with an explicit adapter config.
    pub async fn extract(
        &self,
        strategy: ExtractionStrategy,
        data: &[u8],
        filename: &str,
        mime_type: &str,
        config: &JsonValue,
    ) -> Result<ExtractionResult> {
        let adapter = self.adapters.get(&strategy).ok_or_else(|| {
            Error::Extraction(format!(
                "No extraction adapter registered for strategy: {}",
                strategy
            ))
        })?;
        adapter.extract(data, filename, mime_type, config).await
    }

    /// Extract an uploaded file's text.
    ///
    /// `timeout_secs` overrides the registry default when given. Extraction
    /// that yields no text at all is reported as a failure.
    pub async fn extract_upload(
        &self,
        strategy: ExtractionStrategy,
        file_name: &str,
        file_type: &str,
        data: &[u8],
        timeout_secs: Option<u64>,
    ) -> Result<ExtractionResult> {
        let start = Instant::now();
        let config = json!({ "timeout_secs": timeout_secs.unwrap_or(self.timeout_secs) });

        let result = self
            .extract(strategy, data, file_name, file_type, &config)
            .await?;
        if result.extracted_text.is_none() {
            return Err(Error::Extraction(format!(
                "No text could be extracted from '{}'",
                file_name
            )));
        }

        info!(
            strategy = %strategy,
            file_name,
            duration_ms = start.elapsed().as_millis() as u64,
            fallback = result.warning.is_some(),
            "Text extracted"
        );
        Ok(result)
    }

    pub fn available_strategies(&self) -> Vec<ExtractionStrategy> {
        self.adapters.keys().copied().collect()
    }

    pub fn has_adapter(&self, strategy: ExtractionStrategy) -> bool {
        self.adapters.contains_key(&strategy)
    }

    /// Probe every adapter's external tools, sorted by strategy name.
    pub async fn health_check_all(&self) -> Vec<AdapterHealth> {
        let mut report = Vec::with_capacity(self.adapters.len());
        for (strategy, adapter) in &self.adapters {
            report.push(AdapterHealth {
                strategy: *strategy,
                adapter: adapter.name().to_string(),
                healthy: adapter.health_check().await.unwrap_or(false),
            });
        }
        report.sort_by_key(|h| h.strategy.to_string());
        report
    }
}

impl Default for ExtractionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

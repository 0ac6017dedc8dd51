//! Plain text and CSV extraction.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use lens_core::{ExtractionAdapter, ExtractionResult, ExtractionStrategy, Result};

/// Reads `.txt` and `.csv` uploads as UTF-8, replacing invalid sequences.
pub struct TextNativeAdapter;

#[async_trait]
impl ExtractionAdapter for TextNativeAdapter {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::TextNative
    }

    async fn extract(
        &self,
        data: &[u8],
        _filename: &str,
        _mime_type: &str,
        _config: &JsonValue,
    ) -> Result<ExtractionResult> {
        let text = String::from_utf8_lossy(data).into_owned();
        let char_count = text.chars().count();
        let line_count = text.lines().count();

        Ok(ExtractionResult {
            extracted_text: Some(text),
            metadata: serde_json::json!({
                "char_count": char_count,
                "line_count": line_count,
            }),
            warning: None,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "text_native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_csv_extraction() {
        let adapter = TextNativeAdapter;
        let result = adapter
            .extract(
                b"name,likes\nsurf,12\n",
                "stats.csv",
                "text/csv",
                &serde_json::json!({}),
            )
            .await
            .unwrap();

        assert_eq!(
            result.extracted_text.as_deref(),
            Some("name,likes\nsurf,12\n")
        );
        assert_eq!(result.metadata["line_count"], 2);
        assert!(result.warning.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let adapter = TextNativeAdapter;
        let result = adapter
            .extract(b"caf\xE9 menu", "menu.txt", "text/plain", &serde_json::json!({}))
            .await
            .unwrap();

        let text = result.extracted_text.unwrap();
        assert!(text.starts_with("caf"));
        assert!(text.ends_with(" menu"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let adapter = TextNativeAdapter;
        let result = adapter
            .extract(b"", "empty.txt", "text/plain", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(result.extracted_text.as_deref(), Some(""));
        assert_eq!(result.metadata["char_count"], 0);
    }

    #[test]
    fn test_strategy_and_name() {
        assert_eq!(TextNativeAdapter.strategy(), ExtractionStrategy::TextNative);
        assert_eq!(TextNativeAdapter.name(), "text_native");
    }
}

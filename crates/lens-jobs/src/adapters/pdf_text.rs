//! PDF text extraction using `pdftotext` (poppler-utils).

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::process::Command;
use tracing::debug;

use lens_core::{Error, ExtractionAdapter, ExtractionResult, ExtractionStrategy, Result};

use super::{run_cmd_with_timeout, timeout_from_config, write_temp};

/// Extracts the text layer of a PDF.
///
/// The upload must start with the `%PDF` magic. Output is trimmed; pages are
/// separated by form feeds as `pdftotext` emits them.
pub struct PdfTextAdapter;

#[async_trait]
impl ExtractionAdapter for PdfTextAdapter {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::PdfText
    }

    async fn extract(
        &self,
        data: &[u8],
        filename: &str,
        _mime_type: &str,
        config: &JsonValue,
    ) -> Result<ExtractionResult> {
        if data.is_empty() {
            return Err(Error::Extraction(
                "Cannot extract text from empty PDF data".to_string(),
            ));
        }

        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::Extraction(format!(
                "File '{}' is not a valid PDF (missing %PDF header)",
                filename
            )));
        }

        // pdftotext reads from a path
        let tmpfile = write_temp(data, ".pdf")?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();
        let timeout_secs = timeout_from_config(config);

        debug!(filename, timeout_secs, "Running pdftotext");
        let raw = run_cmd_with_timeout(
            Command::new("pdftotext")
                .arg("-enc")
                .arg("UTF-8")
                .arg(&tmp_path)
                .arg("-"),
            timeout_secs,
        )
        .await?;

        let page_count = raw.matches('\u{000C}').count().max(1);
        let text = raw.trim().to_string();

        Ok(ExtractionResult {
            metadata: serde_json::json!({
                "converter": "pdftotext",
                "pages": page_count,
                "char_count": text.chars().count(),
            }),
            extracted_text: Some(text),
            warning: None,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match Command::new("pdftotext").arg("-v").output().await {
            // pdftotext -v exits with 0 or 99 depending on the version
            Ok(output) => Ok(output.status.success() || output.status.code() == Some(99)),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "pdf_text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_PDF: &[u8] = b"%PDF-1.0
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj

2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj

3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792]
   /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>
endobj

4 0 obj
<< /Length 44 >>
stream
BT /F1 12 Tf 100 700 Td (Hello World) Tj ET
endstream
endobj

5 0 obj
<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>
endobj

xref
0 6
0000000000 65535 f
0000000009 00000 n
0000000058 00000 n
0000000115 00000 n
0000000266 00000 n
0000000360 00000 n

trailer
<< /Size 6 /Root 1 0 R >>
startxref
434
%%EOF";

    #[test]
    fn test_strategy_and_name() {
        assert_eq!(PdfTextAdapter.strategy(), ExtractionStrategy::PdfText);
        assert_eq!(PdfTextAdapter.name(), "pdf_text");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let err = PdfTextAdapter
            .extract(b"", "empty.pdf", "application/pdf", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.detail().contains("empty"));
    }

    #[tokio::test]
    async fn test_missing_magic() {
        let err = PdfTextAdapter
            .extract(
                b"not a pdf at all",
                "bad.pdf",
                "application/pdf",
                &serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.detail().contains("not a valid PDF"));
    }

    #[tokio::test]
    async fn test_extraction_when_pdftotext_installed() {
        if !PdfTextAdapter.health_check().await.unwrap_or(false) {
            eprintln!("Skipping: pdftotext not installed");
            return;
        }

        let result = PdfTextAdapter
            .extract(
                HELLO_PDF,
                "hello.pdf",
                "application/pdf",
                &serde_json::json!({"timeout_secs": 30}),
            )
            .await
            .unwrap();
        assert!(result.extracted_text.unwrap().contains("Hello World"));
        assert_eq!(result.metadata["converter"], "pdftotext");
    }
}

//! Word document extraction.
//!
//! DOCX goes through `pandoc`. Legacy DOC goes through `antiword` and, when
//! that fails, is read as plain text with a warning attached.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tokio::process::Command;
use tracing::{debug, warn};

use lens_core::defaults::DOC_FALLBACK_WARNING;
use lens_core::intake::extension;
use lens_core::{Error, ExtractionAdapter, ExtractionResult, ExtractionStrategy, Result};

use super::{binary_available, run_cmd_with_timeout, timeout_from_config, write_temp};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOC_MIME: &str = "application/msword";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordFormat {
    Docx,
    Doc,
}

impl WordFormat {
    /// Extension wins over the declared MIME.
    fn detect(filename: &str, mime_type: &str) -> Option<Self> {
        match extension(filename).as_deref() {
            Some(".docx") => return Some(Self::Docx),
            Some(".doc") => return Some(Self::Doc),
            _ => {}
        }
        match mime_type.to_lowercase().as_str() {
            DOCX_MIME => Some(Self::Docx),
            DOC_MIME => Some(Self::Doc),
            _ => None,
        }
    }
}

pub struct OfficeConvertAdapter;

impl OfficeConvertAdapter {
    async fn convert_docx(&self, data: &[u8], timeout_secs: u64) -> Result<String> {
        let tmpfile = write_temp(data, ".docx")?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        run_cmd_with_timeout(
            Command::new("pandoc")
                .arg("-f")
                .arg("docx")
                .arg("-t")
                .arg("plain")
                .arg("--wrap=none")
                .arg(&tmp_path),
            timeout_secs,
        )
        .await
    }

    async fn convert_doc(&self, data: &[u8], timeout_secs: u64) -> Result<String> {
        let tmpfile = write_temp(data, ".doc")?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        let text = run_cmd_with_timeout(
            Command::new("antiword").arg("-w").arg("0").arg(&tmp_path),
            timeout_secs,
        )
        .await?;
        if text.trim().is_empty() {
            return Err(Error::Extraction("antiword produced no text".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl ExtractionAdapter for OfficeConvertAdapter {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::OfficeConvert
    }

    async fn extract(
        &self,
        data: &[u8],
        filename: &str,
        mime_type: &str,
        config: &JsonValue,
    ) -> Result<ExtractionResult> {
        if data.is_empty() {
            return Err(Error::Extraction(
                "Cannot convert empty document".to_string(),
            ));
        }

        let format = WordFormat::detect(filename, mime_type).ok_or_else(|| {
            Error::Extraction(format!(
                "File '{}' is not a Word document ({})",
                filename, mime_type
            ))
        })?;
        let timeout_secs = timeout_from_config(config);
        debug!(filename, format = ?format, timeout_secs, "Converting Word document");

        match format {
            WordFormat::Docx => {
                let text = self.convert_docx(data, timeout_secs).await?;
                let text = text.trim().to_string();
                Ok(ExtractionResult {
                    metadata: json!({
                        "format": "docx",
                        "converter": "pandoc",
                        "char_count": text.chars().count(),
                    }),
                    extracted_text: Some(text),
                    warning: None,
                })
            }
            WordFormat::Doc => match self.convert_doc(data, timeout_secs).await {
                Ok(text) => {
                    let text = text.trim().to_string();
                    Ok(ExtractionResult {
                        metadata: json!({
                            "format": "doc",
                            "converter": "antiword",
                            "char_count": text.chars().count(),
                        }),
                        extracted_text: Some(text),
                        warning: None,
                    })
                }
                Err(e) => {
                    warn!(filename, error = %e, "DOC conversion failed, reading as plain text");
                    let text = String::from_utf8_lossy(data).into_owned();
                    Ok(ExtractionResult {
                        metadata: json!({
                            "format": "doc",
                            "fallback": true,
                            "char_count": text.chars().count(),
                        }),
                        extracted_text: Some(text),
                        warning: Some(DOC_FALLBACK_WARNING.to_string()),
                    })
                }
            },
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(binary_available("pandoc", "--version").await)
    }

    fn name(&self) -> &str {
        "office_convert"
    }
}

//! Extraction adapter implementations.

pub mod office_convert;
pub mod pdf_text;
pub mod text_native;

pub use office_convert::OfficeConvertAdapter;
pub use pdf_text::PdfTextAdapter;
pub use text_native::TextNativeAdapter;

use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::process::Command;

use lens_core::defaults::EXTRACTION_CMD_TIMEOUT_SECS;
use lens_core::{Error, Result};

/// Per-command timeout from the extraction config, e.g. `{"timeout_secs": 30}`.
pub(crate) fn timeout_from_config(config: &JsonValue) -> u64 {
    config
        .get("timeout_secs")
        .and_then(JsonValue::as_u64)
        .filter(|t| *t > 0)
        .unwrap_or(EXTRACTION_CMD_TIMEOUT_SECS)
}

/// Run a command with a timeout, returning stdout as a string.
pub(crate) async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Extraction(format!("External command timed out after {}s", timeout_secs))
        })?
        .map_err(|e| Error::Extraction(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Whether a binary can be spawned at all.
pub(crate) async fn binary_available(program: &str, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .output()
        .await
        .is_ok()
}

/// Write bytes to a named temp file with the given suffix.
pub(crate) fn write_temp(data: &[u8], suffix: &str) -> Result<tempfile::NamedTempFile> {
    use std::io::Write;

    let mut tmpfile = tempfile::Builder::new()
        .prefix("viral-lens-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| Error::Extraction(format!("Failed to create temp file: {}", e)))?;
    tmpfile
        .write_all(data)
        .map_err(|e| Error::Extraction(format!("Failed to write temp file: {}", e)))?;
    Ok(tmpfile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_from_config() {
        assert_eq!(timeout_from_config(&serde_json::json!({})), EXTRACTION_CMD_TIMEOUT_SECS);
        assert_eq!(timeout_from_config(&serde_json::json!({"timeout_secs": 7})), 7);
        assert_eq!(
            timeout_from_config(&serde_json::json!({"timeout_secs": 0})),
            EXTRACTION_CMD_TIMEOUT_SECS
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_extraction_error() {
        let err = run_cmd_with_timeout(&mut Command::new("definitely-not-a-real-binary-xyz"), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.detail().contains("Failed to execute command"));
    }

    #[test]
    fn test_write_temp_keeps_suffix() {
        let tmp = write_temp(b"abc", ".docx").unwrap();
        assert!(tmp.path().to_string_lossy().ends_with(".docx"));
        assert_eq!(std::fs::read(tmp.path()).unwrap(), b"abc");
    }
}

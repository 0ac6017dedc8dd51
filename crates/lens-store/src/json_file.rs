//! JSON file repository.
//!
//! The snapshot lives in a single file. Saves write a sibling temp file and
//! rename it over the target, so a crash mid-write never leaves a truncated
//! document behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use lens_core::defaults::STORE_PATH;
use lens_core::{Error, NotebookRepository, Result, StoreSnapshot};

use crate::check_quota;

/// `ENOSPC` on Linux and macOS.
const NO_SPACE_OS_ERROR: i32 = 28;

/// Repository backed by a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
    quota_bytes: Option<u64>,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota_bytes: None,
        }
    }

    /// Create a repository from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LENS_STORE_PATH` | `viral-lens-notebooks.json` | Snapshot file |
    /// | `LENS_STORE_QUOTA_BYTES` | unset | Maximum snapshot size |
    pub fn from_env() -> Self {
        let path = std::env::var("LENS_STORE_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| STORE_PATH.to_string());
        let quota_bytes = std::env::var("LENS_STORE_QUOTA_BYTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok());

        let repo = Self::new(path);
        match quota_bytes {
            Some(quota) => repo.with_quota(quota),
            None => repo,
        }
    }

    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, e: std::io::Error) -> Error {
        if e.raw_os_error() == Some(NO_SPACE_OS_ERROR) {
            Error::QuotaExceeded(format!("No space left writing {}", self.path.display()))
        } else {
            Error::Storage(format!("Failed to write {}: {}", self.path.display(), e))
        }
    }
}

#[async_trait]
impl NotebookRepository for JsonFileRepository {
    async fn load(&self) -> Result<StoreSnapshot> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored workspace, starting empty");
                return Ok(StoreSnapshot::default());
            }
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoreSnapshot::default());
        }

        let snapshot: StoreSnapshot = serde_json::from_slice(&data)?;
        info!(
            subsystem = "store",
            component = "json_file",
            op = "load",
            path = %self.path.display(),
            item_count = snapshot.notebooks.len(),
            "Workspace snapshot loaded"
        );
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let data = serde_json::to_vec(snapshot)?;
        check_quota(data.len(), self.quota_bytes)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let tmp = self.temp_path();
        if let Err(e) = fs::write(&tmp, &data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(self.write_error(e));
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            warn!(path = %self.path.display(), error = %e, "Snapshot rename failed");
            let _ = fs::remove_file(&tmp).await;
            return Err(self.write_error(e));
        }

        debug!(
            subsystem = "store",
            component = "json_file",
            op = "save",
            size = data.len(),
            "Workspace snapshot saved"
        );
        Ok(())
    }
}

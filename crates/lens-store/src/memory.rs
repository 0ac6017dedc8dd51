//! In-memory repository.

use async_trait::async_trait;
use tokio::sync::Mutex;

use lens_core::{NotebookRepository, Result, StoreSnapshot};

use crate::check_quota;

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    snapshot: Mutex<Option<StoreSnapshot>>,
    quota_bytes: Option<u64>,
    saves: Mutex<usize>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, as if it had been saved earlier.
    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// The last successfully saved snapshot.
    pub async fn stored(&self) -> Option<StoreSnapshot> {
        self.snapshot.lock().await.clone()
    }

    /// Number of successful saves.
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl NotebookRepository for MemoryRepository {
    async fn load(&self) -> Result<StoreSnapshot> {
        Ok(self.snapshot.lock().await.clone().unwrap_or_default())
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let data = serde_json::to_vec(snapshot)?;
        check_quota(data.len(), self.quota_bytes)?;

        *self.snapshot.lock().await = Some(snapshot.clone());
        *self.saves.lock().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_core::{Error, Workspace};

    fn snapshot() -> StoreSnapshot {
        let mut ws = Workspace::default();
        ws.create_notebook("Launch", "Spring Drop").unwrap();
        StoreSnapshot::from(&ws)
    }

    #[tokio::test]
    async fn test_load_empty() {
        let repo = MemoryRepository::new();
        assert!(repo.load().await.unwrap().is_empty());
        assert!(repo.stored().await.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let repo = MemoryRepository::new();
        let snap = snapshot();
        repo.save(&snap).await.unwrap();

        assert_eq!(repo.load().await.unwrap(), snap);
        assert_eq!(repo.save_count().await, 1);
    }

    #[tokio::test]
    async fn test_quota_keeps_previous_snapshot() {
        let repo = MemoryRepository::with_snapshot(StoreSnapshot::default()).with_quota(16);
        let err = repo.save(&snapshot()).await.unwrap_err();

        assert!(matches!(err, Error::QuotaExceeded(_)));
        assert!(repo.load().await.unwrap().is_empty());
        assert_eq!(repo.save_count().await, 0);
    }
}

//! Workspace event bus.
//!
//! Every observable step of the workflow is broadcast so a UI (or the CLI in
//! verbose mode) can follow progress without polling the workspace.

use serde::Serialize;
use tokio::sync::broadcast;

use lens_core::defaults::EVENT_BUS_CAPACITY;

/// Events emitted by the pipeline and the campaign service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    NotebookCreated { notebook_id: String },
    NotebookDeleted { notebook_id: String },
    NotebookSelected { notebook_id: String },
    /// A reducer update changed a notebook.
    NotebookUpdated { notebook_id: String, kind: String },

    /// Accepted uploads were attached; `rejected` did not pass the allow-list.
    FilesAdded {
        notebook_id: String,
        file_ids: Vec<String>,
        rejected: usize,
    },
    FileStarted { notebook_id: String, file_id: String },
    FileProgress {
        notebook_id: String,
        file_id: String,
        message: String,
    },
    FileCompleted { notebook_id: String, file_id: String },
    FileFailed {
        notebook_id: String,
        file_id: String,
        error: String,
    },
    /// The file or its notebook was removed while it was being processed.
    FileOrphaned { notebook_id: String, file_id: String },
    /// The processing queue ran empty.
    QueueDrained { processed: usize },

    ResearchSynthesized {
        notebook_id: String,
        truncated: bool,
    },
    ResearchFailed { notebook_id: String, error: String },

    IdeasGenerated { notebook_id: String, count: usize },
    IdeaGenerationFailed { notebook_id: String, error: String },

    VisualStarted { notebook_id: String, idea_id: String },
    VisualCompleted { notebook_id: String, idea_id: String },
    VisualFailed {
        notebook_id: String,
        idea_id: String,
        error: String,
    },
    VisualOrphaned { notebook_id: String, idea_id: String },

    /// Saving the workspace failed. Not retried.
    PersistFailed { error: String },
}

/// Cloneable sender side of the event bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkspaceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send an event. Having no subscribers is not an error.
    pub fn emit(&self, event: WorkspaceEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

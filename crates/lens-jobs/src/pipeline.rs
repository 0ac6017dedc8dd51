//! Sequential per-file processing pipeline.
//!
//! Accepted files are queued and processed strictly one at a time in upload
//! order. Each file moves `pending -> processing -> completed | error`, with
//! every intermediate step written back to the shared workspace so observers
//! see progress as it happens. The workspace lock is never held across an
//! extraction or vision call.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use lens_core::defaults::{
    EXTRACTION_CMD_TIMEOUT_SECS, IMAGE_ANALYSIS_FAILED, NO_PROCESSING_NOTE,
    OVERALL_PROCESSING_FAILED, PROGRESS_ANALYZING_IMAGE, PROGRESS_COMPLETE,
    PROGRESS_ERROR_PREVIEW_CHARS, PROGRESS_EXTRACTED, PROGRESS_EXTRACTING,
    PROGRESS_IMAGE_ANALYZED, PROGRESS_NOT_APPLICABLE, PROGRESS_STARTING,
};
use lens_core::intake::is_image;
use lens_core::{
    Error, FilePatch, FileStatus, NotebookUpdate, Result, Workspace,
};
use lens_inference::{campaign_image_prompt, VisionBackend};

use crate::events::{EventBus, WorkspaceEvent};
use crate::extraction::ExtractionRegistry;

/// Configuration for the file pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Describe images with the vision backend when one is configured.
    pub describe_images: bool,
    /// Timeout for each external extraction command.
    pub extraction_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            describe_images: true,
            extraction_timeout_secs: EXTRACTION_CMD_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LENS_DESCRIBE_IMAGES` | `true` | Send images to the vision backend |
    /// | `LENS_EXTRACTION_TIMEOUT_SECS` | `120` | Per-command extraction timeout |
    pub fn from_env() -> Self {
        let describe_images = std::env::var("LENS_DESCRIBE_IMAGES")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let extraction_timeout_secs = std::env::var("LENS_EXTRACTION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|t| *t > 0)
            .unwrap_or(EXTRACTION_CMD_TIMEOUT_SECS);

        Self {
            describe_images,
            extraction_timeout_secs,
        }
    }

    pub fn with_describe_images(mut self, enabled: bool) -> Self {
        self.describe_images = enabled;
        self
    }

    pub fn with_extraction_timeout_secs(mut self, secs: u64) -> Self {
        self.extraction_timeout_secs = secs;
        self
    }
}

/// One file waiting to be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub notebook_id: String,
    pub file_id: String,
}

/// FIFO of files awaiting processing.
#[derive(Debug, Default)]
pub struct FileQueue {
    jobs: VecDeque<FileJob>,
}

impl FileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue files of one notebook, keeping their order.
    pub fn enqueue<I>(&mut self, notebook_id: &str, file_ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.jobs.extend(file_ids.into_iter().map(|file_id| FileJob {
            notebook_id: notebook_id.to_string(),
            file_id,
        }));
    }

    /// Take the oldest job.
    pub fn next_job(&mut self) -> Option<FileJob> {
        self.jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// How processing of one file ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum FileOutcome {
    Completed,
    Failed(String),
    /// The file or its notebook disappeared mid-flight; nothing was written.
    Orphaned,
    /// The file was no longer pending when its turn came.
    Skipped,
}

impl FileOutcome {
    fn label(&self) -> &'static str {
        match self {
            FileOutcome::Completed => "completed",
            FileOutcome::Failed(_) => "failed",
            FileOutcome::Orphaned => "orphaned",
            FileOutcome::Skipped => "skipped",
        }
    }
}

/// What the pipeline needs from a file, copied out under the read lock.
struct FileSnapshot {
    name: String,
    file_type: String,
    status: FileStatus,
    content: Option<Arc<Vec<u8>>>,
    campaign_name: String,
}

/// Processes queued files against the shared workspace.
pub struct FilePipeline {
    workspace: Arc<RwLock<Workspace>>,
    registry: Arc<ExtractionRegistry>,
    vision: Option<Arc<dyn VisionBackend>>,
    events: EventBus,
    config: PipelineConfig,
}

impl FilePipeline {
    pub fn new(
        workspace: Arc<RwLock<Workspace>>,
        registry: Arc<ExtractionRegistry>,
        events: EventBus,
    ) -> Self {
        Self {
            workspace,
            registry,
            vision: None,
            events,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionBackend>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn image_backend(&self) -> Option<&Arc<dyn VisionBackend>> {
        if self.config.describe_images {
            self.vision.as_ref()
        } else {
            None
        }
    }

    /// Process one file to a terminal status.
    #[instrument(skip(self, job), fields(
        subsystem = "jobs",
        component = "pipeline",
        op = "process_file",
        notebook_id = %job.notebook_id,
        file_id = %job.file_id,
    ))]
    pub async fn process(&self, job: &FileJob) -> FileOutcome {
        let start = Instant::now();

        let outcome = match self.run_stages(job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let detail = e.detail();
                let message = if detail.trim().is_empty() {
                    OVERALL_PROCESSING_FAILED.to_string()
                } else {
                    detail
                };
                error!(error = %message, "File processing failed unexpectedly");
                match self.fail(job, message.clone(), FilePatch::default()).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(error = %e, "Could not record processing failure");
                        FileOutcome::Failed(message)
                    }
                }
            }
        };

        info!(
            outcome = outcome.label(),
            duration_ms = start.elapsed().as_millis() as u64,
            "File processed"
        );
        outcome
    }

    /// Process every queued job in order. Returns outcomes in the same order.
    ///
    /// `on_settled` runs after each job, before the next one starts.
    pub async fn drain<F, Fut>(
        &self,
        queue: &mut FileQueue,
        mut on_settled: F,
    ) -> Vec<(FileJob, FileOutcome)>
    where
        F: FnMut(&FileJob, &FileOutcome) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut outcomes = Vec::with_capacity(queue.len());
        while let Some(job) = queue.next_job() {
            let outcome = self.process(&job).await;
            on_settled(&job, &outcome).await;
            outcomes.push((job, outcome));
        }
        self.events.emit(WorkspaceEvent::QueueDrained {
            processed: outcomes.len(),
        });
        outcomes
    }

    async fn run_stages(&self, job: &FileJob) -> Result<FileOutcome> {
        let Some(file) = self.snapshot(job).await else {
            return Ok(self.orphaned(job));
        };
        if file.status != FileStatus::Pending {
            warn!(status = %file.status, "File is not pending, skipping");
            return Ok(FileOutcome::Skipped);
        }

        let started = FilePatch::status(FileStatus::Processing).with_progress(PROGRESS_STARTING);
        if !self.apply(job, started).await? {
            return Ok(self.orphaned(job));
        }
        self.events.emit(WorkspaceEvent::FileStarted {
            notebook_id: job.notebook_id.clone(),
            file_id: job.file_id.clone(),
        });

        let content = file.content.clone().ok_or_else(|| {
            Error::Internal(format!(
                "Content of '{}' is not available for processing.",
                file.name
            ))
        })?;

        let strategy = self.registry.strategy_for(&file.name, &file.file_type);
        let mut text_note: Option<String> = None;

        if let Some(strategy) = strategy {
            if !self.progress(job, PROGRESS_EXTRACTING).await? {
                return Ok(self.orphaned(job));
            }
            debug!(strategy = %strategy, file_name = %file.name, "Extracting text");

            let extracted = self
                .registry
                .extract_upload(
                    strategy,
                    &file.name,
                    &file.file_type,
                    &content,
                    Some(self.config.extraction_timeout_secs),
                )
                .await;

            match extracted {
                Ok(result) => {
                    text_note = result.warning;
                    let patch = FilePatch::progress(PROGRESS_EXTRACTED)
                        .with_extracted_text(result.extracted_text);
                    if !self.apply(job, patch).await? {
                        return Ok(self.orphaned(job));
                    }
                    self.emit_progress(job, PROGRESS_EXTRACTED);
                }
                Err(e) => {
                    warn!(error = %e, "Text extraction failed");
                    let clear_text = FilePatch::default().with_extracted_text(None);
                    return self.fail(job, e.detail(), clear_text).await;
                }
            }
        }

        if is_image(&file.file_type) {
            if let Some(vision) = self.image_backend() {
                return self
                    .describe(job, vision.as_ref(), &file, &content, text_note)
                    .await;
            }
            debug!("Image description disabled");
        }

        let finished = if strategy.is_some() {
            FilePatch::status(FileStatus::Completed)
                .with_processing_error(text_note)
                .with_progress(PROGRESS_COMPLETE)
        } else {
            FilePatch::status(FileStatus::Completed)
                .with_processing_error(Some(NO_PROCESSING_NOTE.to_string()))
                .with_progress(PROGRESS_NOT_APPLICABLE)
        };
        self.complete(job, finished).await
    }

    async fn describe(
        &self,
        job: &FileJob,
        vision: &dyn VisionBackend,
        file: &FileSnapshot,
        content: &[u8],
        text_note: Option<String>,
    ) -> Result<FileOutcome> {
        if !self.progress(job, PROGRESS_ANALYZING_IMAGE).await? {
            return Ok(self.orphaned(job));
        }

        let prompt = campaign_image_prompt(&file.campaign_name, &file.name);
        let described = vision
            .describe_image(content, &file.file_type, Some(&prompt))
            .await;

        let failure = match described {
            Ok(description) if description.trim().to_lowercase().starts_with("error:") => {
                description
            }
            Ok(description) => {
                let patch = FilePatch::status(FileStatus::Completed)
                    .with_image_analysis(Some(description))
                    .with_processing_error(text_note)
                    .with_progress(PROGRESS_IMAGE_ANALYZED);
                return self.complete(job, patch).await;
            }
            Err(e) => {
                let detail = e.detail();
                if detail.trim().is_empty() {
                    IMAGE_ANALYSIS_FAILED.to_string()
                } else {
                    detail
                }
            }
        };

        warn!(error = %failure, model = vision.model_name(), "Image description failed");
        let message = match text_note {
            Some(note) => format!("{}; {}", note, failure),
            None => failure,
        };
        let clear_analysis = FilePatch::default().with_image_analysis(None);
        self.fail(job, message, clear_analysis).await
    }

    async fn snapshot(&self, job: &FileJob) -> Option<FileSnapshot> {
        let workspace = self.workspace.read().await;
        let notebook = workspace.notebook(&job.notebook_id)?;
        let file = notebook.file(&job.file_id)?;
        Some(FileSnapshot {
            name: file.name.clone(),
            file_type: file.file_type.clone(),
            status: file.status,
            content: file.content.clone(),
            campaign_name: notebook.campaign_name.clone(),
        })
    }

    /// Write a patch. `Ok(false)` means the file or notebook is gone.
    async fn apply(&self, job: &FileJob, patch: FilePatch) -> Result<bool> {
        let mut workspace = self.workspace.write().await;
        workspace.update(
            &job.notebook_id,
            NotebookUpdate::UpdateFile {
                file_id: job.file_id.clone(),
                patch,
            },
        )
    }

    async fn progress(&self, job: &FileJob, message: &str) -> Result<bool> {
        let applied = self.apply(job, FilePatch::progress(message)).await?;
        if applied {
            self.emit_progress(job, message);
        }
        Ok(applied)
    }

    fn emit_progress(&self, job: &FileJob, message: &str) {
        self.events.emit(WorkspaceEvent::FileProgress {
            notebook_id: job.notebook_id.clone(),
            file_id: job.file_id.clone(),
            message: message.to_string(),
        });
    }

    async fn complete(&self, job: &FileJob, patch: FilePatch) -> Result<FileOutcome> {
        if !self.apply(job, patch).await? {
            return Ok(self.orphaned(job));
        }
        self.events.emit(WorkspaceEvent::FileCompleted {
            notebook_id: job.notebook_id.clone(),
            file_id: job.file_id.clone(),
        });
        Ok(FileOutcome::Completed)
    }

    async fn fail(&self, job: &FileJob, message: String, extra: FilePatch) -> Result<FileOutcome> {
        let preview: String = message.chars().take(PROGRESS_ERROR_PREVIEW_CHARS).collect();
        let patch = FilePatch {
            status: Some(FileStatus::Error),
            processing_error: Some(Some(message.clone())),
            progress: Some(format!("Error: {}", preview)),
            ..extra
        };
        if !self.apply(job, patch).await? {
            return Ok(self.orphaned(job));
        }
        self.events.emit(WorkspaceEvent::FileFailed {
            notebook_id: job.notebook_id.clone(),
            file_id: job.file_id.clone(),
            error: message.clone(),
        });
        Ok(FileOutcome::Failed(message))
    }

    fn orphaned(&self, job: &FileJob) -> FileOutcome {
        debug!("File removed during processing, result discarded");
        self.events.emit(WorkspaceEvent::FileOrphaned {
            notebook_id: job.notebook_id.clone(),
            file_id: job.file_id.clone(),
        });
        FileOutcome::Orphaned
    }
}

//! Campaign service: the single entry point for every notebook operation.
//!
//! Owns the shared workspace, the file pipeline, and the generation
//! collaborators. Each mutation goes through the workspace reducer, is
//! broadcast on the event bus, and is followed by a save when a repository is
//! configured. Save failures are reported and logged but never retried.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use lens_core::defaults::{
    FILES_STILL_PROCESSING, IDEA_COUNT, NO_RESEARCH_DATA, SYNTHESIS_REQUIRED,
};
use lens_core::{
    intake_files, AcceptPolicy, ContentIdea, Error, GenerationBackend, IdeaAction,
    IncomingFile, Notebook, NotebookRepository, NotebookUpdate, ParameterPatch, Result,
    StoreSnapshot, VisualPatch, Workspace,
};
use lens_inference::{
    collect_research_items, compose_visual_prompt, IdeaGenerator, IdeaRequest,
    ImageGenerationBackend, ResearchSynthesizer, SynthesisOutcome, VisionBackend,
};

use crate::events::{EventBus, WorkspaceEvent};
use crate::extraction::ExtractionRegistry;
use crate::pipeline::{FileOutcome, FilePipeline, FileQueue, PipelineConfig};

/// Configuration for the campaign service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Number of ideas requested per generation.
    pub idea_count: usize,
    /// Resolve generic upload types from magic bytes.
    pub sniff_content: bool,
    /// Ask the generation backend for a JSON response when generating ideas.
    pub idea_json_mode: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            idea_count: IDEA_COUNT,
            sniff_content: false,
            idea_json_mode: false,
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LENS_IDEA_COUNT` | `5` | Ideas requested per generation |
    /// | `LENS_SNIFF_CONTENT` | `false` | Detect generic upload types from content |
    /// | `LENS_IDEA_JSON_MODE` | `false` | Request JSON responses for ideas |
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            std::env::var(name)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        let idea_count = std::env::var("LENS_IDEA_COUNT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(IDEA_COUNT)
            .max(1);

        Self {
            idea_count,
            sniff_content: flag("LENS_SNIFF_CONTENT"),
            idea_json_mode: flag("LENS_IDEA_JSON_MODE"),
        }
    }

    pub fn with_idea_count(mut self, count: usize) -> Self {
        self.idea_count = count.max(1);
        self
    }

    pub fn with_sniff_content(mut self, enabled: bool) -> Self {
        self.sniff_content = enabled;
        self
    }

    pub fn with_idea_json_mode(mut self, enabled: bool) -> Self {
        self.idea_json_mode = enabled;
        self
    }
}

/// Result of an upload batch.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeReport {
    /// Ids of the accepted files, in upload order.
    pub accepted: Vec<String>,
    /// Aggregated rejection message, if any upload was refused.
    pub rejection_message: Option<String>,
    /// Processing outcome per file id.
    pub outcomes: Vec<(String, FileOutcome)>,
}

/// Result of a visual generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VisualOutcome {
    Generated { image_url: String },
    Failed { error: String },
    /// The idea or its notebook was removed before the image arrived.
    Orphaned,
}

/// Builder for [`CampaignService`].
pub struct CampaignServiceBuilder {
    generation: Arc<dyn GenerationBackend>,
    images: Arc<dyn ImageGenerationBackend>,
    vision: Option<Arc<dyn VisionBackend>>,
    repository: Option<Arc<dyn NotebookRepository>>,
    registry: Option<ExtractionRegistry>,
    config: ServiceConfig,
    pipeline_config: PipelineConfig,
    policy: Option<AcceptPolicy>,
    events: EventBus,
}

impl CampaignServiceBuilder {
    pub fn new(
        generation: Arc<dyn GenerationBackend>,
        images: Arc<dyn ImageGenerationBackend>,
    ) -> Self {
        Self {
            generation,
            images,
            vision: None,
            repository: None,
            registry: None,
            config: ServiceConfig::default(),
            pipeline_config: PipelineConfig::default(),
            policy: None,
            events: EventBus::default(),
        }
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionBackend>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn NotebookRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_registry(mut self, registry: ExtractionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// Replace the upload allow-list.
    pub fn with_policy(mut self, policy: AcceptPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn build(self) -> CampaignService {
        let workspace = Arc::new(RwLock::new(Workspace::default()));
        let registry = Arc::new(self.registry.unwrap_or_else(ExtractionRegistry::with_defaults));

        let mut pipeline = FilePipeline::new(workspace.clone(), registry, self.events.clone())
            .with_config(self.pipeline_config);
        if let Some(vision) = self.vision {
            pipeline = pipeline.with_vision(vision);
        }

        let mut policy = self.policy.unwrap_or_default();
        if self.config.sniff_content {
            policy = policy.with_sniffing(true);
        }

        CampaignService {
            workspace,
            pipeline,
            queue: Mutex::new(FileQueue::new()),
            synthesizer: ResearchSynthesizer::new(self.generation.clone()),
            ideas: IdeaGenerator::new(self.generation)
                .with_json_mode(self.config.idea_json_mode),
            images: self.images,
            repository: self.repository,
            events: self.events,
            policy,
            config: self.config,
        }
    }
}

/// Orchestrates every notebook operation against the shared workspace.
pub struct CampaignService {
    workspace: Arc<RwLock<Workspace>>,
    pipeline: FilePipeline,
    queue: Mutex<FileQueue>,
    synthesizer: ResearchSynthesizer,
    ideas: IdeaGenerator,
    images: Arc<dyn ImageGenerationBackend>,
    repository: Option<Arc<dyn NotebookRepository>>,
    events: EventBus,
    policy: AcceptPolicy,
    config: ServiceConfig,
}

impl CampaignService {
    pub fn builder(
        generation: Arc<dyn GenerationBackend>,
        images: Arc<dyn ImageGenerationBackend>,
    ) -> CampaignServiceBuilder {
        CampaignServiceBuilder::new(generation, images)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Subscribe to workspace events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Replace the in-memory workspace with the stored one.
    ///
    /// Returns the number of notebooks loaded. Without a repository this is a
    /// no-op returning the current count.
    #[instrument(skip(self), fields(subsystem = "jobs", component = "service", op = "load"))]
    pub async fn load(&self) -> Result<usize> {
        let Some(repository) = &self.repository else {
            return Ok(self.workspace.read().await.notebooks.len());
        };

        let snapshot = repository.load().await?;
        let restored = snapshot.restore();
        let count = restored.notebooks.len();
        *self.workspace.write().await = restored;

        info!(item_count = count, "Workspace loaded");
        Ok(count)
    }

    /// Save the workspace now. Errors are returned to the caller.
    pub async fn save(&self) -> Result<()> {
        let Some(repository) = &self.repository else {
            return Ok(());
        };
        let snapshot = StoreSnapshot::from(&*self.workspace.read().await);
        repository.save(&snapshot).await
    }

    /// Save after a mutation. Failures are broadcast and logged only.
    async fn persist(&self) {
        if let Err(e) = self.save().await {
            warn!(
                subsystem = "jobs",
                component = "service",
                op = "save",
                error = %e,
                "Failed to persist workspace"
            );
            self.events.emit(WorkspaceEvent::PersistFailed {
                error: e.detail(),
            });
        }
    }

    // =========================================================================
    // NOTEBOOKS
    // =========================================================================

    pub async fn notebooks(&self) -> Vec<Notebook> {
        self.workspace.read().await.notebooks.clone()
    }

    pub async fn notebook(&self, notebook_id: &str) -> Option<Notebook> {
        self.workspace.read().await.notebook(notebook_id).cloned()
    }

    pub async fn selected_notebook(&self) -> Option<Notebook> {
        self.workspace.read().await.selected_notebook().cloned()
    }

    pub async fn create_notebook(&self, name: &str, campaign_name: &str) -> Result<Notebook> {
        let notebook = {
            let mut workspace = self.workspace.write().await;
            workspace.create_notebook(name, campaign_name)?.clone()
        };
        info!(
            subsystem = "jobs",
            component = "service",
            notebook_id = %notebook.id,
            "Notebook created"
        );
        self.events.emit(WorkspaceEvent::NotebookCreated {
            notebook_id: notebook.id.clone(),
        });
        self.persist().await;
        Ok(notebook)
    }

    pub async fn select_notebook(&self, notebook_id: &str) -> Result<()> {
        self.workspace.write().await.select_notebook(notebook_id)?;
        self.events.emit(WorkspaceEvent::NotebookSelected {
            notebook_id: notebook_id.to_string(),
        });
        self.persist().await;
        Ok(())
    }

    pub async fn delete_notebook(&self, notebook_id: &str) -> Result<Notebook> {
        let removed = self.workspace.write().await.delete_notebook(notebook_id)?;
        info!(
            subsystem = "jobs",
            component = "service",
            notebook_id = %removed.id,
            "Notebook deleted"
        );
        self.events.emit(WorkspaceEvent::NotebookDeleted {
            notebook_id: removed.id.clone(),
        });
        self.persist().await;
        Ok(removed)
    }

    /// Apply a reducer update to an existing notebook and save on change.
    async fn mutate(&self, notebook_id: &str, update: NotebookUpdate) -> Result<bool> {
        let kind = update.kind();
        let changed = {
            let mut workspace = self.workspace.write().await;
            if workspace.notebook(notebook_id).is_none() {
                return Err(Error::NotFound(format!("Notebook {}", notebook_id)));
            }
            workspace.update(notebook_id, update)?
        };

        debug!(notebook_id, kind, changed, "Notebook update applied");
        if changed {
            self.events.emit(WorkspaceEvent::NotebookUpdated {
                notebook_id: notebook_id.to_string(),
                kind: kind.to_string(),
            });
            self.persist().await;
        }
        Ok(changed)
    }

    // =========================================================================
    // FILES
    // =========================================================================

    /// Validate uploads, attach the accepted ones, and process them in order.
    ///
    /// Rejected uploads never block accepted ones; their aggregated message is
    /// returned in the report. Adding files clears the analysis and ideas.
    #[instrument(skip(self, files), fields(
        subsystem = "jobs",
        component = "service",
        op = "add_files",
        notebook_id = %notebook_id,
        item_count = files.len(),
    ))]
    pub async fn add_files(
        &self,
        notebook_id: &str,
        files: Vec<IncomingFile>,
    ) -> Result<IntakeReport> {
        if self.workspace.read().await.notebook(notebook_id).is_none() {
            return Err(Error::NotFound(format!("Notebook {}", notebook_id)));
        }

        let outcome = intake_files(files, &self.policy);
        let rejection_message = outcome.error_message();
        if let Some(ref message) = rejection_message {
            warn!(rejected = outcome.rejected.len(), error = %message, "Uploads rejected");
        }

        let accepted: Vec<String> = outcome.accepted.iter().map(|f| f.id.clone()).collect();
        let rejected = outcome.rejected.len();
        if !accepted.is_empty() {
            self.mutate(notebook_id, NotebookUpdate::AddFiles(outcome.accepted))
                .await?;
            self.events.emit(WorkspaceEvent::FilesAdded {
                notebook_id: notebook_id.to_string(),
                file_ids: accepted.clone(),
                rejected,
            });
        }

        let outcomes = self.process_files(notebook_id, accepted.clone()).await;
        Ok(IntakeReport {
            accepted,
            rejection_message,
            outcomes,
        })
    }

    /// Run queued files one at a time, saving after each.
    ///
    /// The queue lock is held for the whole drain, so concurrent batches are
    /// processed back to back rather than interleaved.
    async fn process_files(
        &self,
        notebook_id: &str,
        file_ids: Vec<String>,
    ) -> Vec<(String, FileOutcome)> {
        if file_ids.is_empty() {
            return Vec::new();
        }

        let mut queue = self.queue.lock().await;
        queue.enqueue(notebook_id, file_ids);

        self.pipeline
            .drain(&mut queue, |_, outcome| {
                let settled = *outcome != FileOutcome::Orphaned;
                async move {
                    if settled {
                        self.persist().await;
                    }
                }
            })
            .await
            .into_iter()
            .map(|(job, outcome)| (job.file_id, outcome))
            .collect()
    }

    /// Remove a file. Clears the analysis and ideas when the file existed.
    pub async fn remove_file(&self, notebook_id: &str, file_id: &str) -> Result<bool> {
        self.mutate(notebook_id, NotebookUpdate::RemoveFile(file_id.to_string()))
            .await
    }

    // =========================================================================
    // PARAMETERS & RESEARCH
    // =========================================================================

    /// Update generation parameters. Clears ideas when anything changed.
    pub async fn update_parameters(&self, notebook_id: &str, patch: ParameterPatch) -> Result<bool> {
        self.mutate(notebook_id, NotebookUpdate::UpdateParameters(patch))
            .await
    }

    /// Synthesize a research analysis from every processed file.
    ///
    /// Requires at least one file, all finished processing. The previous analysis
    /// and ideas are cleared before the backend is called.
    #[instrument(skip(self), fields(
        subsystem = "jobs",
        component = "service",
        op = "synthesize_research",
        notebook_id = %notebook_id,
    ))]
    pub async fn synthesize_research(&self, notebook_id: &str) -> Result<SynthesisOutcome> {
        let (campaign_name, bundle) = {
            let workspace = self.workspace.read().await;
            let notebook = workspace
                .notebook(notebook_id)
                .ok_or_else(|| Error::NotFound(format!("Notebook {}", notebook_id)))?;
            if notebook.files.is_empty() {
                return Err(Error::Synthesis(NO_RESEARCH_DATA.to_string()));
            }
            if !notebook.all_files_processed() {
                return Err(Error::Synthesis(FILES_STILL_PROCESSING.to_string()));
            }
            (
                notebook.campaign_name.clone(),
                collect_research_items(&notebook.files),
            )
        };

        self.mutate(notebook_id, NotebookUpdate::SetResearchAnalysis(None))
            .await?;

        let outcome = match self.synthesizer.synthesize(&campaign_name, &bundle).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.events.emit(WorkspaceEvent::ResearchFailed {
                    notebook_id: notebook_id.to_string(),
                    error: e.detail(),
                });
                return Err(e);
            }
        };

        let stored = self
            .workspace
            .write()
            .await
            .update(
                notebook_id,
                NotebookUpdate::SetResearchAnalysis(Some(outcome.analysis.clone())),
            )?;
        if !stored {
            return Err(Error::NotFound(format!(
                "Notebook {} was deleted during synthesis",
                notebook_id
            )));
        }

        self.events.emit(WorkspaceEvent::ResearchSynthesized {
            notebook_id: notebook_id.to_string(),
            truncated: outcome.warning().is_some(),
        });
        self.persist().await;
        Ok(outcome)
    }

    // =========================================================================
    // IDEAS
    // =========================================================================

    /// Generate content ideas from the stored analysis.
    ///
    /// Without an analysis this fails and leaves the current ideas untouched.
    /// Otherwise existing ideas are cleared before the backend is called.
    #[instrument(skip(self), fields(
        subsystem = "jobs",
        component = "service",
        op = "generate_ideas",
        notebook_id = %notebook_id,
    ))]
    pub async fn generate_ideas(&self, notebook_id: &str) -> Result<Vec<ContentIdea>> {
        let (analysis, campaign_name, parameters) = {
            let workspace = self.workspace.read().await;
            let notebook = workspace
                .notebook(notebook_id)
                .ok_or_else(|| Error::NotFound(format!("Notebook {}", notebook_id)))?;
            let analysis = notebook
                .research_analysis
                .clone()
                .filter(|a| !a.trim().is_empty())
                .ok_or_else(|| Error::IdeaGeneration(SYNTHESIS_REQUIRED.to_string()))?;
            (analysis, notebook.campaign_name.clone(), notebook.parameters.clone())
        };

        self.mutate(notebook_id, NotebookUpdate::SetIdeas(Vec::new()))
            .await?;

        let request = IdeaRequest::new(&analysis, &campaign_name, &parameters)
            .with_count(self.config.idea_count);
        let ideas = match self.ideas.generate(&request).await {
            Ok(ideas) => ideas,
            Err(e) => {
                self.events.emit(WorkspaceEvent::IdeaGenerationFailed {
                    notebook_id: notebook_id.to_string(),
                    error: e.detail(),
                });
                return Err(e);
            }
        };

        let stored = self
            .workspace
            .write()
            .await
            .update(notebook_id, NotebookUpdate::SetIdeas(ideas.clone()))?;
        if !stored {
            return Err(Error::NotFound(format!(
                "Notebook {} was deleted during idea generation",
                notebook_id
            )));
        }

        self.events.emit(WorkspaceEvent::IdeasGenerated {
            notebook_id: notebook_id.to_string(),
            count: ideas.len(),
        });
        self.persist().await;
        Ok(ideas)
    }

    /// Apply an idea-list action. `Ok(false)` when nothing changed.
    pub async fn apply_idea_action(&self, notebook_id: &str, action: IdeaAction) -> Result<bool> {
        self.mutate(notebook_id, NotebookUpdate::Ideas(action)).await
    }

    // =========================================================================
    // VISUALS
    // =========================================================================

    /// Generate a visual mockup for one idea.
    ///
    /// The idea is flagged as generating (clearing any previous image and
    /// error) before the backend is called. Visuals for different ideas may
    /// run concurrently.
    #[instrument(skip(self), fields(
        subsystem = "jobs",
        component = "service",
        op = "generate_visual",
        notebook_id = %notebook_id,
        idea_id = %idea_id,
    ))]
    pub async fn generate_visual(&self, notebook_id: &str, idea_id: &str) -> Result<VisualOutcome> {
        let prompt = self.prepare_visual(notebook_id, idea_id).await?;
        self.events.emit(WorkspaceEvent::VisualStarted {
            notebook_id: notebook_id.to_string(),
            idea_id: idea_id.to_string(),
        });
        self.persist().await;
        debug!(prompt_len = prompt.len(), "Visual prompt composed");

        let result = self.images.generate_image(&prompt).await;
        self.complete_visual(notebook_id, idea_id, result).await
    }

    async fn prepare_visual(&self, notebook_id: &str, idea_id: &str) -> Result<String> {
        let mut workspace = self.workspace.write().await;
        let notebook = workspace
            .notebook(notebook_id)
            .ok_or_else(|| Error::NotFound(format!("Notebook {}", notebook_id)))?;
        let idea = notebook
            .idea(idea_id)
            .ok_or_else(|| Error::NotFound(format!("Idea {}", idea_id)))?;
        let prompt = compose_visual_prompt(idea, notebook.parameters.visual_style);

        workspace.update(
            notebook_id,
            NotebookUpdate::UpdateVisual {
                idea_id: idea_id.to_string(),
                patch: VisualPatch::Started,
            },
        )?;
        Ok(prompt)
    }

    async fn complete_visual(
        &self,
        notebook_id: &str,
        idea_id: &str,
        result: Result<String>,
    ) -> Result<VisualOutcome> {
        let (patch, outcome) = match result {
            Ok(image_url) => (
                VisualPatch::Finished {
                    image_url: Some(image_url.clone()),
                    error: None,
                },
                VisualOutcome::Generated { image_url },
            ),
            Err(e) => {
                let error = e.detail();
                warn!(error = %error, "Visual generation failed");
                (
                    VisualPatch::Finished {
                        image_url: None,
                        error: Some(error.clone()),
                    },
                    VisualOutcome::Failed { error },
                )
            }
        };

        let stored = self.workspace.write().await.update(
            notebook_id,
            NotebookUpdate::UpdateVisual {
                idea_id: idea_id.to_string(),
                patch,
            },
        )?;
        if !stored {
            debug!("Idea removed before visual completed, result discarded");
            self.events.emit(WorkspaceEvent::VisualOrphaned {
                notebook_id: notebook_id.to_string(),
                idea_id: idea_id.to_string(),
            });
            return Ok(VisualOutcome::Orphaned);
        }

        let event = match &outcome {
            VisualOutcome::Failed { error } => WorkspaceEvent::VisualFailed {
                notebook_id: notebook_id.to_string(),
                idea_id: idea_id.to_string(),
                error: error.clone(),
            },
            _ => WorkspaceEvent::VisualCompleted {
                notebook_id: notebook_id.to_string(),
                idea_id: idea_id.to_string(),
            },
        };
        self.events.emit(event);
        self.persist().await;
        Ok(outcome)
    }
}

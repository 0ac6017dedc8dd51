//! viral-lens: command-line front end for the ViralLens campaign workspace.
//!
//! Every invocation loads the stored workspace, runs one command through the
//! campaign service, and prints the result as pretty JSON on stdout. Logs go
//! to stderr (or `LOG_FILE`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lens_core::{
    AcceptPolicy, Complexity, ContentStyle, IdeaAction, IdeaColor, IdeaDraft, IncomingFile, Notebook,
    ParameterPatch, Platform, RefinementPatch, Tone, Urgency, VisualStyle,
};
use lens_inference::{OllamaVisionBackend, OpenAIBackend, VisionBackend};
use lens_jobs::{CampaignService, ExtractionRegistry, PipelineConfig, ServiceConfig};
use lens_store::JsonFileRepository;

#[derive(Parser)]
#[command(name = "viral-lens")]
#[command(author, version, about = "Research-to-content campaign workspace")]
#[command(propagate_version = true)]
struct Cli {
    /// Snapshot file (overrides LENS_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Print workspace events to stderr as JSON lines
    #[arg(long, global = true)]
    events: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list, select, or delete notebooks
    #[command(subcommand)]
    Notebook(NotebookCommand),

    /// Upload or remove research files
    #[command(subcommand)]
    Files(FilesCommand),

    /// Change generation parameters
    Params(ParamsArgs),

    /// Synthesize a research analysis from the processed files
    Research(NotebookArg),

    /// Generate and curate content ideas
    #[command(subcommand)]
    Ideas(IdeasCommand),

    /// Generate a visual mockup for an idea
    Visual {
        #[command(flatten)]
        notebook: NotebookArg,
        /// Idea id
        idea: String,
    },

    /// Check extraction tools and generation backends
    Health,
}

#[derive(Args)]
struct NotebookArg {
    /// Notebook id (default: the selected notebook)
    #[arg(short, long)]
    notebook: Option<String>,
}

#[derive(Subcommand)]
enum NotebookCommand {
    /// Create a notebook and select it
    Create {
        /// Notebook name
        #[arg(long)]
        name: String,
        /// Campaign name
        #[arg(long)]
        campaign: String,
    },
    /// List notebooks
    List,
    /// Select a notebook
    Select { id: String },
    /// Delete a notebook
    Delete { id: String },
}

#[derive(Subcommand)]
enum FilesCommand {
    /// Upload files and process them in order
    Add {
        #[command(flatten)]
        notebook: NotebookArg,
        /// Files to upload
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
        /// Declared MIME type for every file (default: resolved from the extension)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Remove a file
    Remove {
        #[command(flatten)]
        notebook: NotebookArg,
        /// File id
        file: String,
    },
}

#[derive(Args)]
struct ParamsArgs {
    #[command(flatten)]
    notebook: NotebookArg,
    #[arg(long)]
    tone: Option<Tone>,
    #[arg(long)]
    content_style: Option<ContentStyle>,
    #[arg(long)]
    complexity: Option<Complexity>,
    #[arg(long)]
    urgency: Option<Urgency>,
    #[arg(long)]
    visual_style: Option<VisualStyle>,
    #[arg(long)]
    platform: Option<Platform>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MoveDirection {
    Up,
    Down,
}

#[derive(Subcommand)]
enum IdeasCommand {
    /// Generate ideas from the research analysis
    Generate(NotebookArg),
    /// List ideas
    List(NotebookArg),
    /// Toggle selection
    Select {
        #[command(flatten)]
        notebook: NotebookArg,
        idea: String,
    },
    /// Toggle pin
    Pin {
        #[command(flatten)]
        notebook: NotebookArg,
        idea: String,
    },
    /// Set the highlight color
    Color {
        #[command(flatten)]
        notebook: NotebookArg,
        idea: String,
        color: IdeaColor,
    },
    /// Move an idea within its pinned or unpinned group
    Move {
        #[command(flatten)]
        notebook: NotebookArg,
        idea: String,
        #[arg(value_enum)]
        direction: MoveDirection,
    },
    /// Edit an idea, or create a manual one when --id is omitted
    Edit {
        #[command(flatten)]
        notebook: NotebookArg,
        /// Idea to edit
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        text: String,
        #[arg(long)]
        content_type: String,
        #[arg(long, default_value = "")]
        platform: String,
        #[arg(long, default_value = "")]
        visual: String,
        /// Comma-separated hashtags
        #[arg(long, default_value = "")]
        hashtags: String,
        #[arg(long)]
        color: Option<IdeaColor>,
        #[arg(long, action = clap::ArgAction::Set)]
        pinned: Option<bool>,
    },
    /// Delete an idea
    Delete {
        #[command(flatten)]
        notebook: NotebookArg,
        idea: String,
    },
    /// Discard every unselected idea
    KeepSelected(NotebookArg),
    /// Discard every selected idea
    DiscardSelected(NotebookArg),
    /// Set visual refinements for an idea
    Refine {
        #[command(flatten)]
        notebook: NotebookArg,
        idea: String,
        #[arg(long)]
        lighting: Option<String>,
        #[arg(long)]
        scenery: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Use this prompt verbatim for the visual
        #[arg(long)]
        prompt_override: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    let service = build_service(&cli)?;
    service.load().await.context("Failed to load workspace")?;

    let watcher = cli.events.then(|| {
        let mut rx = service.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&event) {
                    eprintln!("{}", line);
                }
            }
        })
    });

    let output = run(&service, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(handle) = watcher {
        tokio::task::yield_now().await;
        handle.abort();
    }
    Ok(())
}

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   RUST_LOG    - standard env filter (default: "viral_lens=info,lens_jobs=info")
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "viral_lens=info,lens_jobs=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match log_file {
        Some(ref path) => {
            let path = Path::new(path);
            let dir = path.parent().unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("viral-lens.log");
            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            if log_format == "json" {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .init();
            } else {
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init();
            }
            Some(guard)
        }
        None => {
            if log_format == "json" {
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            } else {
                registry
                    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                    .init();
            }
            None
        }
    }
}

fn build_service(cli: &Cli) -> anyhow::Result<CampaignService> {
    let openai = Arc::new(OpenAIBackend::from_env().context("Failed to configure OpenAI backend")?);
    let vision: Arc<dyn VisionBackend> = match OllamaVisionBackend::from_env() {
        Some(ollama) => Arc::new(ollama),
        None => openai.clone(),
    };

    let repository = match cli.store {
        Some(ref path) => JsonFileRepository::new(path),
        None => JsonFileRepository::from_env(),
    };
    debug!(path = %repository.path().display(), "Using snapshot store");

    Ok(CampaignService::builder(openai.clone(), openai)
        .with_vision(vision)
        .with_repository(Arc::new(repository))
        .with_registry(ExtractionRegistry::with_defaults())
        .with_config(ServiceConfig::from_env())
        .with_pipeline_config(PipelineConfig::from_env())
        .build())
}

/// Resolve an explicit notebook id or fall back to the selected notebook.
async fn notebook_id(service: &CampaignService, arg: NotebookArg) -> anyhow::Result<String> {
    if let Some(id) = arg.notebook {
        return Ok(id);
    }
    service
        .selected_notebook()
        .await
        .map(|nb| nb.id)
        .ok_or_else(|| anyhow!("No notebook selected; pass --notebook or run `notebook select`"))
}

fn summary(notebook: &Notebook, selected: Option<&str>) -> serde_json::Value {
    json!({
        "id": notebook.id,
        "name": notebook.name,
        "campaign_name": notebook.campaign_name,
        "files": notebook.files.len(),
        "ideas": notebook.content_ideas.len(),
        "has_analysis": notebook.research_analysis.is_some(),
        "selected": selected == Some(notebook.id.as_str()),
        "updated_at": notebook.updated_at,
    })
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

fn changed(changed: bool) -> serde_json::Value {
    json!({ "changed": changed })
}

async fn idea_action(
    service: &CampaignService,
    notebook: NotebookArg,
    action: IdeaAction,
) -> anyhow::Result<serde_json::Value> {
    let id = notebook_id(service, notebook).await?;
    Ok(changed(service.apply_idea_action(&id, action).await?))
}

async fn read_upload(path: &Path, mime: Option<&str>) -> anyhow::Result<IncomingFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))?;
    let declared = match mime {
        Some(mime) => mime.to_string(),
        // Unknown files stay untyped so the rejection reads "unknown type".
        None => AcceptPolicy::default()
            .guess_type(name, &data)
            .unwrap_or_default(),
    };
    debug!(file_name = name, mime_type = %declared, "Upload read");
    Ok(IncomingFile::new(name, declared, data))
}

async fn run(service: &CampaignService, command: Commands) -> anyhow::Result<serde_json::Value> {
    match command {
        Commands::Notebook(cmd) => match cmd {
            NotebookCommand::Create { name, campaign } => {
                let notebook = service.create_notebook(&name, &campaign).await?;
                info!(notebook_id = %notebook.id, "Notebook ready");
                to_json(&notebook)
            }
            NotebookCommand::List => {
                let selected = service.selected_notebook().await.map(|nb| nb.id);
                let list: Vec<_> = service
                    .notebooks()
                    .await
                    .iter()
                    .map(|nb| summary(nb, selected.as_deref()))
                    .collect();
                Ok(serde_json::Value::Array(list))
            }
            NotebookCommand::Select { id } => {
                service.select_notebook(&id).await?;
                Ok(json!({ "selected": id }))
            }
            NotebookCommand::Delete { id } => {
                let removed = service.delete_notebook(&id).await?;
                Ok(json!({ "deleted": removed.id }))
            }
        },

        Commands::Files(cmd) => match cmd {
            FilesCommand::Add {
                notebook,
                paths,
                mime,
            } => {
                let id = notebook_id(service, notebook).await?;
                let mut uploads = Vec::with_capacity(paths.len());
                for path in &paths {
                    uploads.push(read_upload(path, mime.as_deref()).await?);
                }
                let report = service.add_files(&id, uploads).await?;
                let files = service.notebook(&id).await.map(|nb| nb.files);
                Ok(json!({ "report": report, "files": files }))
            }
            FilesCommand::Remove { notebook, file } => {
                let id = notebook_id(service, notebook).await?;
                Ok(changed(service.remove_file(&id, &file).await?))
            }
        },

        Commands::Params(args) => {
            let id = notebook_id(service, args.notebook).await?;
            let patch = ParameterPatch {
                tone: args.tone,
                content_style: args.content_style,
                complexity: args.complexity,
                urgency: args.urgency,
                visual_style: args.visual_style,
                platform: args.platform,
            };
            if patch.is_empty() {
                bail!("No parameters given");
            }
            let was_changed = service.update_parameters(&id, patch).await?;
            let parameters = service.notebook(&id).await.map(|nb| nb.parameters);
            Ok(json!({ "changed": was_changed, "parameters": parameters }))
        }

        Commands::Research(notebook) => {
            let id = notebook_id(service, notebook).await?;
            let outcome = service.synthesize_research(&id).await?;
            Ok(json!({
                "analysis": outcome.analysis,
                "warning": outcome.warning(),
                "items_used": outcome.items_used,
                "items_total": outcome.items_total,
            }))
        }

        Commands::Ideas(cmd) => match cmd {
            IdeasCommand::Generate(notebook) => {
                let id = notebook_id(service, notebook).await?;
                to_json(&service.generate_ideas(&id).await?)
            }
            IdeasCommand::List(notebook) => {
                let id = notebook_id(service, notebook).await?;
                let notebook = service
                    .notebook(&id)
                    .await
                    .ok_or_else(|| anyhow!("Notebook not found: {}", id))?;
                to_json(&notebook.content_ideas)
            }
            IdeasCommand::Select { notebook, idea } => {
                idea_action(service, notebook, IdeaAction::ToggleSelect(idea)).await
            }
            IdeasCommand::Pin { notebook, idea } => {
                idea_action(service, notebook, IdeaAction::TogglePin(idea)).await
            }
            IdeasCommand::Color {
                notebook,
                idea,
                color,
            } => idea_action(service, notebook, IdeaAction::SetColor(idea, color)).await,
            IdeasCommand::Move {
                notebook,
                idea,
                direction,
            } => {
                let action = match direction {
                    MoveDirection::Up => IdeaAction::MoveUp(idea),
                    MoveDirection::Down => IdeaAction::MoveDown(idea),
                };
                idea_action(service, notebook, action).await
            }
            IdeasCommand::Edit {
                notebook,
                id,
                text,
                content_type,
                platform,
                visual,
                hashtags,
                color,
                pinned,
            } => {
                let draft = IdeaDraft {
                    post_text: text,
                    platform,
                    content_type,
                    visual_concept_prompt: visual,
                    hashtags: IdeaDraft::hashtags_from_csv(&hashtags),
                    color,
                    is_pinned: pinned,
                    refinement: None,
                };
                idea_action(service, notebook, IdeaAction::Edit { id, draft }).await
            }
            IdeasCommand::Delete { notebook, idea } => {
                idea_action(service, notebook, IdeaAction::Delete(idea)).await
            }
            IdeasCommand::KeepSelected(notebook) => {
                idea_action(service, notebook, IdeaAction::KeepSelected).await
            }
            IdeasCommand::DiscardSelected(notebook) => {
                idea_action(service, notebook, IdeaAction::DiscardSelected).await
            }
            IdeasCommand::Refine {
                notebook,
                idea,
                lighting,
                scenery,
                notes,
                prompt_override,
            } => {
                let patch = RefinementPatch {
                    lighting,
                    scenery,
                    storyboard_notes: notes,
                    custom_prompt_override: prompt_override,
                };
                idea_action(service, notebook, IdeaAction::UpdateRefinement(idea, patch)).await
            }
        },

        Commands::Visual { notebook, idea } => {
            let id = notebook_id(service, notebook).await?;
            to_json(&service.generate_visual(&id, &idea).await?)
        }

        Commands::Health => health(service).await,
    }
}

async fn health(service: &CampaignService) -> anyhow::Result<serde_json::Value> {
    let extraction = ExtractionRegistry::with_defaults().health_check_all().await;

    let openai = OpenAIBackend::from_env()?;
    let generation = openai.probe_models().await.unwrap_or(false);
    let vision = match OllamaVisionBackend::from_env() {
        Some(ollama) => ollama.health_check().await.unwrap_or(false),
        None => generation,
    };
    let notebooks = service.notebooks().await.len();

    Ok(json!({
        "extraction": extraction,
        "generation": generation,
        "vision": vision,
        "notebooks": notebooks,
    }))
}

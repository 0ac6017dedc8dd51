//! # lens-jobs
//!
//! File processing and campaign orchestration for ViralLens.
//!
//! This crate provides:
//! - Extraction adapters for plain text, PDF, and Word documents
//! - A sequential per-file processing pipeline with progress events
//! - The campaign service that drives synthesis, idea generation, and visuals
//! - Workspace events via broadcast channels
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lens_jobs::{CampaignService, IncomingFile};
//! use lens_inference::OpenAIBackend;
//!
//! let backend = Arc::new(OpenAIBackend::from_env()?);
//! let service = CampaignService::builder(backend.clone(), backend.clone())
//!     .with_vision(backend)
//!     .build();
//!
//! let mut events = service.subscribe();
//! let notebook = service.create_notebook("Launch", "Summer Drop").await?;
//! service
//!     .add_files(&notebook.id, vec![IncomingFile::new("brief.txt", "text/plain", data)])
//!     .await?;
//! service.synthesize_research(&notebook.id).await?;
//! let ideas = service.generate_ideas(&notebook.id).await?;
//! ```

pub mod adapters;
pub mod events;
pub mod extraction;
pub mod pipeline;
pub mod service;

// Re-export core types
pub use lens_core::*;

pub use adapters::{OfficeConvertAdapter, PdfTextAdapter, TextNativeAdapter};
pub use events::{EventBus, WorkspaceEvent};
pub use extraction::{AdapterHealth, ExtractionRegistry};
pub use pipeline::{FileJob, FileOutcome, FilePipeline, FileQueue, PipelineConfig};
pub use service::{
    CampaignService, CampaignServiceBuilder, IntakeReport, ServiceConfig, VisualOutcome,
};
